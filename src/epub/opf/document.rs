//! 包文档解析模块
//!
//! 把OPF包文档解析为`PackageDocument`：一个只保存原始属性和文本的中间句柄，
//! 不做前缀展开、也不做引用校验。这些工作在构建`Package`时完成。

use crate::epub::error::{EpubError, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use std::collections::HashMap;
use tracing::warn;

/// 包文档中的原始元数据节点
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataNode {
    /// Dublin Core元素，如`<dc:title id="t1">...</dc:title>`
    DublinCore {
        /// 去掉命名空间前缀的元素名
        element: String,
        /// 元素ID（用于关联refines元数据）
        id: Option<String>,
        /// 元素内容
        value: String,
        /// 元素的其余属性（按本地名）
        attributes: HashMap<String, String>,
    },
    /// meta元素
    Meta(MetaNode),
}

/// meta元素的三种形式
#[derive(Debug, Clone, PartialEq)]
pub enum MetaNode {
    /// 基于name属性的meta标签，如 <meta name="cover" content="cover-image"/>
    NameBased { name: String, content: String },
    /// 基于property属性的meta标签，如 <meta property="dcterms:modified">2025-06-05T11:24:01Z</meta>
    PropertyBased {
        property: String,
        id: Option<String>,
        content: String,
        scheme: Option<String>,
    },
    /// 基于refines属性的meta标签，如 <meta refines="#creator" property="role">aut</meta>
    RefinesBased {
        /// 被精化的元素ID（不包含#前缀）
        refines_id: String,
        property: String,
        id: Option<String>,
        content: String,
        scheme: Option<String>,
    },
}

/// manifest中的原始item
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ManifestEntry {
    pub id: String,
    pub href: String,
    pub media_type: String,
    /// 未展开的properties属性值
    pub properties: Option<String>,
    pub fallback: Option<String>,
    pub media_overlay: Option<String>,
}

/// spine中的原始itemref
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemRefEntry {
    pub idref: String,
    pub id: Option<String>,
    pub linear: bool,
    /// 未展开的properties属性值
    pub properties: Option<String>,
}

/// 解析后的包文档句柄
#[derive(Debug, Clone, Default)]
pub struct PackageDocument {
    /// EPUB版本
    pub version: String,
    /// package元素的unique-identifier属性
    pub unique_identifier: Option<String>,
    /// package元素的prefix属性（前缀声明）
    pub prefix: Option<String>,
    /// 元数据节点，按文档顺序
    pub metadata: Vec<MetadataNode>,
    /// 清单项，按声明顺序
    pub manifest: Vec<ManifestEntry>,
    /// 脊柱项，按阅读顺序
    pub spine: Vec<ItemRefEntry>,
    /// spine元素的toc属性（EPUB2 NCX的清单ID）
    pub spine_toc: Option<String>,
    /// spine元素在package子元素中的CFI步进值（第n个子元素为2n）
    pub spine_cfi_index: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    None,
    Metadata,
    Manifest,
    Spine,
}

/// 正在收集文本的元数据元素
struct PendingMetadata {
    local_name: String,
    attributes: HashMap<String, String>,
    text: String,
}

impl PendingMetadata {
    fn into_node(self) -> Option<MetadataNode> {
        let text = self.text.trim().to_string();
        let mut attributes = self.attributes;

        match self.local_name.as_str() {
            "meta" => {
                let content = attributes.remove("content");
                if let Some(property) = attributes.remove("property") {
                    // EPUB3的值在文本中，部分出版物仍放在content属性里
                    let value = if text.is_empty() { content.unwrap_or_default() } else { text };
                    let id = attributes.remove("id");
                    let scheme = attributes.remove("scheme");
                    let node = match attributes.remove("refines") {
                        Some(refines) => MetaNode::RefinesBased {
                            refines_id: refines.trim_start_matches('#').to_string(),
                            property,
                            id,
                            content: value,
                            scheme,
                        },
                        None => MetaNode::PropertyBased {
                            property,
                            id,
                            content: value,
                            scheme,
                        },
                    };
                    return Some(MetadataNode::Meta(node));
                }

                match (attributes.remove("name"), content) {
                    (Some(name), Some(content)) if !name.is_empty() => {
                        Some(MetadataNode::Meta(MetaNode::NameBased { name, content }))
                    }
                    _ => None,
                }
            }
            "link" => None,
            _ if text.is_empty() => None,
            _ => Some(MetadataNode::DublinCore {
                id: attributes.remove("id"),
                element: self.local_name,
                value: text,
                attributes,
            }),
        }
    }
}

impl PackageDocument {
    /// 解析包文档内容
    ///
    /// # 参数
    /// * `xml_content` - 包文档的XML内容
    ///
    /// # 返回值
    /// * `Result<PackageDocument>` - 根元素不是package时返回`OpfParseError`
    pub fn parse_xml(xml_content: &str) -> Result<PackageDocument> {
        let mut reader = Reader::from_str(xml_content);
        reader.config_mut().trim_text(true);
        reader.config_mut().expand_empty_elements = true;

        let mut document = PackageDocument::default();
        let mut depth = 0usize;
        let mut saw_package = false;
        let mut package_children = 0u32;
        let mut section = Section::None;
        let mut pending: Option<PendingMetadata> = None;

        loop {
            match reader.read_event()? {
                Event::Start(ref e) => {
                    depth += 1;
                    let local_name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();

                    match depth {
                        1 => {
                            if local_name != "package" {
                                return Err(EpubError::OpfParseError(format!(
                                    "根元素应为package, 找到 {}",
                                    local_name
                                )));
                            }
                            saw_package = true;
                            let mut attributes = Self::collect_attributes(e)?;
                            document.version = attributes.remove("version").unwrap_or_default();
                            document.unique_identifier = attributes.remove("unique-identifier");
                            document.prefix = attributes.remove("prefix");
                        }
                        2 => {
                            package_children += 1;
                            section = match local_name.as_str() {
                                "metadata" => Section::Metadata,
                                "manifest" => Section::Manifest,
                                "spine" => {
                                    document.spine_cfi_index = Some(package_children * 2);
                                    document.spine_toc = Self::collect_attributes(e)?.remove("toc");
                                    Section::Spine
                                }
                                _ => Section::None,
                            };
                        }
                        3 => match section {
                            Section::Metadata => {
                                pending = Some(PendingMetadata {
                                    local_name,
                                    attributes: Self::collect_attributes(e)?,
                                    text: String::new(),
                                });
                            }
                            Section::Manifest if local_name == "item" => {
                                if let Some(item) = Self::parse_manifest_item(e)? {
                                    document.manifest.push(item);
                                }
                            }
                            Section::Spine if local_name == "itemref" => {
                                if let Some(itemref) = Self::parse_itemref(e)? {
                                    document.spine.push(itemref);
                                }
                            }
                            _ => {}
                        },
                        _ => {}
                    }
                }
                Event::Text(e) => {
                    if let Some(pending) = pending.as_mut() {
                        pending.text.push_str(&e.unescape()?);
                    }
                }
                Event::CData(e) => {
                    if let Some(pending) = pending.as_mut() {
                        pending.text.push_str(&String::from_utf8_lossy(&e));
                    }
                }
                Event::End(_) => {
                    match depth {
                        3 => {
                            if let Some(node) = pending.take().and_then(PendingMetadata::into_node) {
                                document.metadata.push(node);
                            }
                        }
                        2 => section = Section::None,
                        _ => {}
                    }
                    depth = depth.saturating_sub(1);
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !saw_package {
            return Err(EpubError::OpfParseError("文档中没有package元素".to_string()));
        }

        Ok(document)
    }

    /// 按本地名收集元素的全部属性
    fn collect_attributes(e: &BytesStart) -> Result<HashMap<String, String>> {
        let mut attributes = HashMap::new();
        for attr_result in e.attributes() {
            let attr = attr_result.map_err(|err| EpubError::XmlError(quick_xml::Error::InvalidAttr(err)))?;
            let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
            let value = attr.unescape_value()?.into_owned();
            attributes.insert(key, value);
        }
        Ok(attributes)
    }

    /// 解析清单项，缺少id或href的条目被跳过
    fn parse_manifest_item(e: &BytesStart) -> Result<Option<ManifestEntry>> {
        let mut attributes = Self::collect_attributes(e)?;
        let item = ManifestEntry {
            id: attributes.remove("id").unwrap_or_default(),
            href: attributes.remove("href").unwrap_or_default(),
            media_type: attributes.remove("media-type").unwrap_or_default(),
            properties: attributes.remove("properties"),
            fallback: attributes.remove("fallback"),
            media_overlay: attributes.remove("media-overlay"),
        };

        if item.id.is_empty() || item.href.is_empty() {
            warn!(id = %item.id, href = %item.href, "跳过缺少id或href的清单项");
            return Ok(None);
        }
        Ok(Some(item))
    }

    /// 解析脊柱项
    fn parse_itemref(e: &BytesStart) -> Result<Option<ItemRefEntry>> {
        let mut attributes = Self::collect_attributes(e)?;
        let Some(idref) = attributes.remove("idref").filter(|idref| !idref.is_empty()) else {
            warn!("跳过缺少idref的脊柱项");
            return Ok(None);
        };

        Ok(Some(ItemRefEntry {
            idref,
            id: attributes.remove("id"),
            linear: attributes.remove("linear").as_deref() != Some("no"),
            properties: attributes.remove("properties"),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_OPF: &str = r##"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0" unique-identifier="BookId"
         prefix="foaf: http://xmlns.com/foaf/spec/">
    <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
        <dc:title id="t1">测试书籍</dc:title>
        <dc:creator id="creator1">J.K. Rowling</dc:creator>
        <meta refines="#creator1" property="role" scheme="marc:relators">aut</meta>
        <dc:identifier id="BookId">urn:uuid:1234</dc:identifier>
        <meta property="dcterms:modified">2025-06-05T11:24:01Z</meta>
        <meta name="cover" content="cover-image"/>
        <link rel="record" href="meta.xml"/>
    </metadata>
    <manifest>
        <item id="nav" href="nav.xhtml" media-type="application/xhtml+xml" properties="nav"/>
        <item id="c1" href="text/c1.xhtml" media-type="application/xhtml+xml" fallback="c1-alt"/>
        <item id="broken" media-type="application/xhtml+xml"/>
    </manifest>
    <spine toc="ncx">
        <itemref idref="c1" id="ref-c1"/>
        <itemref idref="nav" linear="no" properties="page-spread-left"/>
    </spine>
</package>"##;

    #[test]
    fn test_parse_package_attributes() {
        let document = PackageDocument::parse_xml(SAMPLE_OPF).unwrap();
        assert_eq!(document.version, "3.0");
        assert_eq!(document.unique_identifier.as_deref(), Some("BookId"));
        assert_eq!(document.prefix.as_deref(), Some("foaf: http://xmlns.com/foaf/spec/"));
        assert_eq!(document.spine_toc.as_deref(), Some("ncx"));
        assert_eq!(document.spine_cfi_index, Some(6));
    }

    #[test]
    fn test_parse_metadata_nodes() {
        let document = PackageDocument::parse_xml(SAMPLE_OPF).unwrap();
        assert_eq!(document.metadata.len(), 6);

        match &document.metadata[0] {
            MetadataNode::DublinCore { element, id, value, .. } => {
                assert_eq!(element, "title");
                assert_eq!(id.as_deref(), Some("t1"));
                assert_eq!(value, "测试书籍");
            }
            other => panic!("期望DublinCore节点, 得到 {:?}", other),
        }

        assert_eq!(
            document.metadata[2],
            MetadataNode::Meta(MetaNode::RefinesBased {
                refines_id: "creator1".to_string(),
                property: "role".to_string(),
                id: None,
                content: "aut".to_string(),
                scheme: Some("marc:relators".to_string()),
            })
        );
        assert_eq!(
            document.metadata[5],
            MetadataNode::Meta(MetaNode::NameBased {
                name: "cover".to_string(),
                content: "cover-image".to_string(),
            })
        );
    }

    #[test]
    fn test_parse_manifest_and_spine() {
        let document = PackageDocument::parse_xml(SAMPLE_OPF).unwrap();

        // 缺少href的条目被跳过
        assert_eq!(document.manifest.len(), 2);
        assert_eq!(document.manifest[0].properties.as_deref(), Some("nav"));
        assert_eq!(document.manifest[1].fallback.as_deref(), Some("c1-alt"));

        assert_eq!(document.spine.len(), 2);
        assert_eq!(document.spine[0].id.as_deref(), Some("ref-c1"));
        assert!(document.spine[0].linear);
        assert!(!document.spine[1].linear);
        assert_eq!(document.spine[1].properties.as_deref(), Some("page-spread-left"));
    }

    #[test]
    fn test_spine_cfi_index_follows_element_position() {
        let opf = r#"<package version="3.0"><manifest/><spine><itemref idref="a"/></spine></package>"#;
        let document = PackageDocument::parse_xml(opf).unwrap();
        assert_eq!(document.spine_cfi_index, Some(4));
    }

    #[test]
    fn test_reject_non_package_root() {
        let result = PackageDocument::parse_xml("<container><rootfiles/></container>");
        assert!(matches!(result, Err(EpubError::OpfParseError(_))));
    }
}
