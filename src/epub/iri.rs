//! 绝对标识符（IRI）模块

use std::fmt;

/// 不可变的绝对标识符，可比较、可作为映射键
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Iri(String);

impl Iri {
    /// 由完整字符串创建标识符
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// 由词汇词干与引用拼接
    pub fn from_stem(stem: &str, reference: &str) -> Self {
        let mut value = String::with_capacity(stem.len() + reference.len());
        value.push_str(stem);
        value.push_str(reference);
        Self(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Iri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Iri {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Iri {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl AsRef<str> for Iri {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
