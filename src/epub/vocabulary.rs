//! 属性词汇前缀解析模块
//!
//! 把`prefix:reference`形式的简短属性记号展开为完整IRI。查找分两级：
//! 先查文档级映射（来自包文档的`prefix`属性或显式注册），再查进程级的保留词汇表。

use crate::epub::error::{EpubError, Result};
use crate::epub::iri::Iri;
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// 前缀到IRI词干的映射
pub type PropertyVocabularyMap = HashMap<String, String>;

/// 默认词汇（空前缀）的词干
pub const DEFAULT_VOCABULARY_STEM: &str = "http://idpf.org/epub/vocab/package/#";

/// EPUB保留前缀，文档无需声明即可使用
static RESERVED_VOCABULARIES: Lazy<PropertyVocabularyMap> = Lazy::new(|| {
    [
        ("", DEFAULT_VOCABULARY_STEM),
        ("a11y", "http://www.idpf.org/epub/vocab/package/a11y/#"),
        ("dcterms", "http://purl.org/dc/terms/"),
        ("marc", "http://id.loc.gov/vocabulary/"),
        ("media", "http://www.idpf.org/epub/vocab/overlays/#"),
        ("onix", "http://www.editeur.org/ONIX/book/codelists/current.html#"),
        ("rendition", "http://www.idpf.org/vocab/rendition/#"),
        ("schema", "http://schema.org/"),
        ("xsd", "http://www.w3.org/2001/XMLSchema#"),
    ]
    .into_iter()
    .map(|(prefix, stem)| (prefix.to_string(), stem.to_string()))
    .collect()
});

/// 两级属性词汇解析器
#[derive(Debug, Clone, Default)]
pub struct PropertyVocabularyResolver {
    /// 文档级映射，优先于保留映射
    document: PropertyVocabularyMap,
}

impl PropertyVocabularyResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// 保留词汇映射（只读）
    pub fn reserved() -> &'static PropertyVocabularyMap {
        &RESERVED_VOCABULARIES
    }

    /// 文档级映射
    pub fn document_prefixes(&self) -> &PropertyVocabularyMap {
        &self.document
    }

    /// 注册或覆盖一个文档级前缀，可重复调用，后写入者生效
    pub fn register_prefix_iri_stem(&mut self, prefix: &str, stem: &str) {
        self.document.insert(prefix.to_string(), stem.to_string());
    }

    /// 查找前缀对应的词干
    ///
    /// 空前缀始终选择保留的默认词汇。
    pub fn stem_for_prefix(&self, prefix: &str) -> Option<&str> {
        if prefix.is_empty() {
            return RESERVED_VOCABULARIES.get("").map(String::as_str);
        }
        self.document
            .get(prefix)
            .or_else(|| RESERVED_VOCABULARIES.get(prefix))
            .map(String::as_str)
    }

    /// 将引用与前缀对应的词干拼接为属性IRI
    ///
    /// # 参数
    /// * `reference` - 属性引用（如`title`）
    /// * `prefix` - 词汇前缀，空字符串表示默认词汇
    ///
    /// # 返回值
    /// * `Result<Iri>` - 前缀在两级映射中都不存在时返回`UnknownPrefix`
    pub fn make_property_iri(&self, reference: &str, prefix: &str) -> Result<Iri> {
        let stem = self
            .stem_for_prefix(prefix)
            .ok_or_else(|| EpubError::UnknownPrefix(prefix.to_string()))?;
        Ok(Iri::from_stem(stem, reference))
    }

    /// 解析`reference`或`prefix:reference`形式的属性值
    pub fn property_iri_from_attribute_value(&self, attr_value: &str) -> Result<Iri> {
        let value = attr_value.trim();
        if value.is_empty() || value.contains(char::is_whitespace) {
            return Err(EpubError::MalformedValue(attr_value.to_string()));
        }

        let mut parts = value.split(':');
        let (prefix, reference) = match (parts.next(), parts.next(), parts.next()) {
            (Some(reference), None, None) => ("", reference),
            (Some(prefix), Some(reference), None) if !prefix.is_empty() => (prefix, reference),
            _ => return Err(EpubError::MalformedValue(attr_value.to_string())),
        };

        if reference.is_empty() {
            return Err(EpubError::MalformedValue(attr_value.to_string()));
        }

        self.make_property_iri(reference, prefix)
    }

    /// 解析包文档`prefix`属性中以空白分隔的`prefix: stem`对，逐对注册
    ///
    /// 任何一对格式错误都返回`MalformedValue`，包的构建随之终止。
    pub fn install_prefixes_from_attribute_value(&mut self, attr_value: &str) -> Result<()> {
        let malformed = || EpubError::MalformedValue(attr_value.to_string());
        let mut tokens = attr_value.split_whitespace().peekable();

        while let Some(token) = tokens.next() {
            let prefix = token.strip_suffix(':').ok_or_else(malformed)?;
            if prefix.is_empty() || prefix.contains(':') {
                return Err(malformed());
            }

            let stem = tokens.next().ok_or_else(malformed)?;
            let prefix_shaped = stem
                .strip_suffix(':')
                .is_some_and(|name| !name.is_empty() && !name.contains([':', '/']));
            if prefix_shaped && tokens.peek().is_some() {
                // 两个前缀相邻，缺少词干
                return Err(malformed());
            }

            self.register_prefix_iri_stem(prefix, stem);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_prefix_uses_reserved_stem() {
        let resolver = PropertyVocabularyResolver::new();
        let iri = resolver.make_property_iri("title", "").unwrap();
        assert_eq!(iri.as_str(), "http://idpf.org/epub/vocab/package/#title");
    }

    #[test]
    fn test_registered_prefix() {
        let mut resolver = PropertyVocabularyResolver::new();
        resolver.register_prefix_iri_stem("dc", "http://purl.org/dc/elements/1.1/");

        let iri = resolver.make_property_iri("title", "dc").unwrap();
        assert_eq!(iri.as_str(), "http://purl.org/dc/elements/1.1/title");
    }

    #[test]
    fn test_unknown_prefix() {
        let resolver = PropertyVocabularyResolver::new();
        let result = resolver.make_property_iri("title", "bogus");
        assert!(matches!(result, Err(EpubError::UnknownPrefix(prefix)) if prefix == "bogus"));
    }

    #[test]
    fn test_document_prefix_overrides_reserved() {
        let mut resolver = PropertyVocabularyResolver::new();
        assert_eq!(
            resolver.make_property_iri("modified", "dcterms").unwrap().as_str(),
            "http://purl.org/dc/terms/modified"
        );

        resolver.register_prefix_iri_stem("dcterms", "http://example.org/terms/");
        assert_eq!(
            resolver.make_property_iri("modified", "dcterms").unwrap().as_str(),
            "http://example.org/terms/modified"
        );

        // 重复注册，后写入者生效
        resolver.register_prefix_iri_stem("dcterms", "http://example.org/other/");
        assert_eq!(
            resolver.make_property_iri("modified", "dcterms").unwrap().as_str(),
            "http://example.org/other/modified"
        );
        // 保留映射本身不受影响
        assert_eq!(
            PropertyVocabularyResolver::reserved().get("dcterms").map(String::as_str),
            Some("http://purl.org/dc/terms/")
        );
    }

    #[test]
    fn test_attribute_value_forms() {
        let resolver = PropertyVocabularyResolver::new();

        assert_eq!(
            resolver.property_iri_from_attribute_value("nav").unwrap().as_str(),
            "http://idpf.org/epub/vocab/package/#nav"
        );
        assert_eq!(
            resolver.property_iri_from_attribute_value("rendition:layout").unwrap().as_str(),
            "http://www.idpf.org/vocab/rendition/#layout"
        );
        assert!(matches!(
            resolver.property_iri_from_attribute_value("calibre:series"),
            Err(EpubError::UnknownPrefix(_))
        ));
    }

    #[test]
    fn test_malformed_attribute_values() {
        let resolver = PropertyVocabularyResolver::new();
        for value in ["", "   ", "dcterms:", ":modified", "a:b:c", "dcterms: modified"] {
            assert!(
                matches!(
                    resolver.property_iri_from_attribute_value(value),
                    Err(EpubError::MalformedValue(_))
                ),
                "应当拒绝: {:?}",
                value
            );
        }
    }

    #[test]
    fn test_install_prefixes() {
        let mut resolver = PropertyVocabularyResolver::new();
        resolver
            .install_prefixes_from_attribute_value(
                "foaf: http://xmlns.com/foaf/spec/\n   dbp: http://dbpedia.org/ontology/",
            )
            .unwrap();

        assert_eq!(resolver.document_prefixes().len(), 2);
        assert_eq!(
            resolver.make_property_iri("name", "foaf").unwrap().as_str(),
            "http://xmlns.com/foaf/spec/name"
        );
        assert_eq!(
            resolver.make_property_iri("birthPlace", "dbp").unwrap().as_str(),
            "http://dbpedia.org/ontology/birthPlace"
        );
    }

    #[test]
    fn test_install_urn_stem() {
        let mut resolver = PropertyVocabularyResolver::new();
        resolver
            .install_prefixes_from_attribute_value("isbn: urn:isbn: foaf: http://xmlns.com/foaf/spec/")
            .unwrap();

        assert_eq!(
            resolver.make_property_iri("9780000000000", "isbn").unwrap().as_str(),
            "urn:isbn:9780000000000"
        );
        assert_eq!(
            resolver.make_property_iri("name", "foaf").unwrap().as_str(),
            "http://xmlns.com/foaf/spec/name"
        );
    }

    #[test]
    fn test_install_malformed_prefixes() {
        for value in [
            "foaf http://xmlns.com/foaf/spec/",
            "foaf:",
            "foaf: dbp: http://dbpedia.org/ontology/",
            ": http://example.org/",
        ] {
            let mut resolver = PropertyVocabularyResolver::new();
            assert!(
                matches!(
                    resolver.install_prefixes_from_attribute_value(value),
                    Err(EpubError::MalformedValue(_))
                ),
                "应当拒绝: {:?}",
                value
            );
        }
    }

    #[test]
    fn test_install_empty_declaration() {
        let mut resolver = PropertyVocabularyResolver::new();
        resolver.install_prefixes_from_attribute_value("  ").unwrap();
        assert!(resolver.document_prefixes().is_empty());
    }
}
