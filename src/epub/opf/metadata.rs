//! 元数据模块
//!
//! 以属性IRI为键保存元数据条目；同一属性多次出现时后写入者生效。
//! refines元数据作为精化条目挂在被精化元素之下。

use crate::epub::iri::Iri;
use crate::epub::opf::document::{MetaNode, MetadataNode};
use crate::epub::vocabulary::PropertyVocabularyResolver;
use std::collections::HashMap;
use tracing::warn;

/// Dublin Core元素集的IRI词干
pub const DC_ELEMENTS_STEM: &str = "http://purl.org/dc/elements/1.1/";

/// 一条元数据
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataEntry {
    /// 属性IRI
    pub property: Iri,
    /// 值
    pub value: String,
    /// 元素ID
    pub id: Option<String>,
    /// scheme属性（未展开）
    pub scheme: Option<String>,
    /// 精化条目
    pub refinements: Vec<MetadataEntry>,
}

impl MetadataEntry {
    pub fn new(property: Iri, value: impl Into<String>) -> Self {
        Self {
            property,
            value: value.into(),
            id: None,
            scheme: None,
            refinements: Vec::new(),
        }
    }

    /// 查找指定属性的精化条目（最后一个生效）
    pub fn refinement(&self, property: &Iri) -> Option<&MetadataEntry> {
        self.refinements.iter().rev().find(|entry| &entry.property == property)
    }

    fn attach(&mut self, target_id: &str, refinement: MetadataEntry) -> Result<(), MetadataEntry> {
        if self.id.as_deref() == Some(target_id) {
            self.refinements.push(refinement);
            return Ok(());
        }
        attach_to_any(&mut self.refinements, target_id, refinement)
    }
}

fn attach_to_any(
    entries: &mut [MetadataEntry],
    target_id: &str,
    refinement: MetadataEntry,
) -> Result<(), MetadataEntry> {
    let mut refinement = refinement;
    for entry in entries.iter_mut() {
        match entry.attach(target_id, refinement) {
            Ok(()) => return Ok(()),
            Err(returned) => refinement = returned,
        }
    }
    Err(refinement)
}

/// 包文档的元数据映射
#[derive(Debug, Clone, Default)]
pub struct Metadata {
    entries: HashMap<Iri, MetadataEntry>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// 由原始元数据节点构建
    ///
    /// 属性记号经词汇解析器展开；无法展开的记号只记录警告并跳过该条目，
    /// 前缀声明本身的格式错误在更早的阶段就已经终止构建。
    pub fn from_nodes(nodes: &[MetadataNode], vocabulary: &PropertyVocabularyResolver) -> Self {
        let mut top_level: Vec<MetadataEntry> = Vec::new();
        let mut pending_refinements: Vec<(String, MetadataEntry)> = Vec::new();

        for node in nodes {
            match node {
                MetadataNode::DublinCore { element, id, value, attributes } => {
                    let mut entry = MetadataEntry::new(Iri::from_stem(DC_ELEMENTS_STEM, element), value.clone());
                    entry.id = id.clone();
                    entry.scheme = attributes.get("scheme").cloned();
                    top_level.push(entry);
                }
                MetadataNode::Meta(MetaNode::NameBased { name, content }) => {
                    match vocabulary.make_property_iri(name, "") {
                        Ok(property) => top_level.push(MetadataEntry::new(property, content.clone())),
                        Err(e) => warn!(name = %name, error = %e, "跳过无法展开的meta name"),
                    }
                }
                MetadataNode::Meta(MetaNode::PropertyBased { property, id, content, scheme }) => {
                    match vocabulary.property_iri_from_attribute_value(property) {
                        Ok(iri) => {
                            let mut entry = MetadataEntry::new(iri, content.clone());
                            entry.id = id.clone();
                            entry.scheme = scheme.clone();
                            top_level.push(entry);
                        }
                        Err(e) => warn!(property = %property, error = %e, "跳过无法展开的元数据属性"),
                    }
                }
                MetadataNode::Meta(MetaNode::RefinesBased { refines_id, property, id, content, scheme }) => {
                    match vocabulary.property_iri_from_attribute_value(property) {
                        Ok(iri) => {
                            let mut entry = MetadataEntry::new(iri, content.clone());
                            entry.id = id.clone();
                            entry.scheme = scheme.clone();
                            pending_refinements.push((refines_id.clone(), entry));
                        }
                        Err(e) => warn!(property = %property, error = %e, "跳过无法展开的精化属性"),
                    }
                }
            }
        }

        for (target_id, refinement) in pending_refinements {
            if let Err(orphan) = attach_to_any(&mut top_level, &target_id, refinement) {
                warn!(refines = %target_id, property = %orphan.property, "精化目标不存在");
            }
        }

        let mut metadata = Metadata::new();
        for entry in top_level {
            metadata.insert(entry);
        }
        metadata
    }

    /// 插入条目，同一属性后写入者生效
    pub fn insert(&mut self, entry: MetadataEntry) {
        self.entries.insert(entry.property.clone(), entry);
    }

    pub fn get(&self, property: &Iri) -> Option<&MetadataEntry> {
        self.entries.get(property)
    }

    /// 按顺序尝试一组属性IRI，返回第一个存在的条目
    pub fn first_of(&self, properties: &[String]) -> Option<&MetadataEntry> {
        properties
            .iter()
            .find_map(|property| self.entries.get(&Iri::new(property.as_str())))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Iri, &MetadataEntry)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
