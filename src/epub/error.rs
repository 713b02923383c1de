use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, EpubError>;

/// 包文档模型与CFI寻址相关的错误类型
///
/// 查找类操作（按ID、索引、标题）的"未找到"不属于错误，统一以`Option::None`返回。
#[derive(Error, Debug)]
pub enum EpubError {
    #[error("IO错误: {0}")]
    Io(#[from] io::Error),

    #[error("Zip文件错误: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("文件不是有效的EPUB格式: {0}")]
    InvalidEpub(String),

    #[error("XML解析错误: {0}")]
    XmlError(#[from] quick_xml::Error),

    #[error("container.xml解析错误: {0}")]
    ContainerParseError(String),

    #[error("包文档解析错误: {0}")]
    OpfParseError(String),

    #[error("NCX文件解析错误: {0}")]
    NcxParseError(String),

    #[error("导航文档解析错误: {0}")]
    NavParseError(String),

    #[error("配置文件错误: {0}")]
    ConfigError(String),

    #[error("找不到资源: {0}")]
    ResourceNotFound(String),

    #[error("无效的CFI: {0}")]
    InvalidCfi(#[from] CfiError),

    #[error("未知的词汇前缀: {0}")]
    UnknownPrefix(String),

    #[error("属性值格式错误: {0}")]
    MalformedValue(String),

    #[error("清单项ID重复: {0}")]
    DuplicateManifestId(String),
}

/// CFI解析或解析定位失败的详细信息
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{reason} ({}`{fragment}`)", position_label(.position))]
pub struct CfiError {
    /// 失败原因
    pub reason: String,
    /// 出错的片段
    pub fragment: String,
    /// 语法错误时光标所在的字节位置
    pub position: Option<usize>,
}

impl CfiError {
    /// 语法错误，携带光标位置
    pub fn syntax(reason: impl Into<String>, fragment: impl Into<String>, position: usize) -> Self {
        Self {
            reason: reason.into(),
            fragment: fragment.into(),
            position: Some(position),
        }
    }

    /// 语法正确但无法定位到包内结构
    pub fn unresolvable(reason: impl Into<String>, fragment: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            fragment: fragment.into(),
            position: None,
        }
    }
}

fn position_label(position: &Option<usize>) -> String {
    match position {
        Some(position) => format!("位置 {}: ", position),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cfi_error_display() {
        let syntax = CfiError::syntax("缺少步进值", "/x", 3);
        assert_eq!(syntax.to_string(), "缺少步进值 (位置 3: `/x`)");

        let unresolvable = CfiError::unresolvable("没有匹配的脊柱项", "/6/40");
        assert_eq!(unresolvable.to_string(), "没有匹配的脊柱项 (`/6/40`)");

        let wrapped: EpubError = unresolvable.into();
        assert!(wrapped.to_string().starts_with("无效的CFI: 没有匹配的脊柱项"));
    }
}
