//! 清单模块
//!
//! 提供EPUB包中资源清单的结构定义。清单按声明顺序保存，同时以ID建立索引。

use crate::epub::error::{EpubError, Result};
use crate::epub::iri::Iri;
use std::collections::{HashMap, HashSet};

/// 清单项信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestItem {
    /// 项目ID，在清单内唯一
    pub id: String,
    /// 文件路径(相对于包文档)
    pub href: String,
    /// 媒体类型
    pub media_type: String,
    /// 已展开的属性IRI(如nav、cover-image等)
    pub properties: Vec<Iri>,
    /// 回退项ID，只按ID查找，不持有对方
    pub fallback: Option<String>,
    /// 媒体叠加项ID
    pub media_overlay: Option<String>,
}

impl ManifestItem {
    /// 创建新的清单项
    pub fn new(id: impl Into<String>, href: impl Into<String>, media_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            href: href.into(),
            media_type: media_type.into(),
            properties: Vec::new(),
            fallback: None,
            media_overlay: None,
        }
    }

    /// 创建带属性的清单项
    pub fn with_properties(mut self, properties: Vec<Iri>) -> Self {
        self.properties = properties;
        self
    }

    /// 设置回退项
    pub fn with_fallback(mut self, fallback: impl Into<String>) -> Self {
        self.fallback = Some(fallback.into());
        self
    }

    /// 检查是否包含指定属性
    pub fn has_property(&self, property: &Iri) -> bool {
        self.properties.contains(property)
    }

    /// 检查是否声明了全部给定属性
    pub fn has_properties(&self, properties: &[Iri]) -> bool {
        properties.iter().all(|property| self.has_property(property))
    }

    /// 检查是否为NCX文件
    pub fn is_ncx(&self) -> bool {
        self.media_type == "application/x-dtbncx+xml"
    }
}

/// 以ID为键、保持声明顺序的清单表
#[derive(Debug, Clone, Default)]
pub struct ManifestTable {
    items: Vec<ManifestItem>,
    index: HashMap<String, usize>,
}

impl ManifestTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// 由清单项列表构建，ID重复时拒绝
    pub fn from_items(items: impl IntoIterator<Item = ManifestItem>) -> Result<Self> {
        let mut table = Self::new();
        for item in items {
            table.insert(item)?;
        }
        Ok(table)
    }

    /// 追加清单项
    ///
    /// # 返回值
    /// * `Result<()>` - ID已存在时返回`DuplicateManifestId`，表保持不变
    pub fn insert(&mut self, item: ManifestItem) -> Result<()> {
        if self.index.contains_key(&item.id) {
            return Err(EpubError::DuplicateManifestId(item.id));
        }
        self.index.insert(item.id.clone(), self.items.len());
        self.items.push(item);
        Ok(())
    }

    /// 根据ID获取清单项
    pub fn get(&self, id: &str) -> Option<&ManifestItem> {
        self.index.get(id).map(|&pos| &self.items[pos])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// 按声明顺序遍历
    pub fn iter(&self) -> std::slice::Iter<'_, ManifestItem> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// 按声明顺序返回声明了全部给定属性的清单项
    pub fn items_with_properties(&self, properties: &[Iri]) -> Vec<&ManifestItem> {
        self.items
            .iter()
            .filter(|item| item.has_properties(properties))
            .collect()
    }

    /// 沿回退引用展开的清单项链（不含起点）
    ///
    /// 引用按ID查找；遇到缺失的ID或重复出现的ID即停止，因此回退链成环也不会死循环。
    pub fn fallback_chain(&self, item: &ManifestItem) -> Vec<&ManifestItem> {
        let mut chain = Vec::new();
        let mut visited: HashSet<&str> = HashSet::from([item.id.as_str()]);
        let mut next = item.fallback.as_deref();

        while let Some(id) = next {
            if !visited.insert(id) {
                break;
            }
            let Some(fallback) = self.get(id) else {
                break;
            };
            chain.push(fallback);
            next = fallback.fallback.as_deref();
        }

        chain
    }
}

impl<'a> IntoIterator for &'a ManifestTable {
    type Item = &'a ManifestItem;
    type IntoIter = std::slice::Iter<'a, ManifestItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nav() -> Iri {
        Iri::new("http://idpf.org/epub/vocab/package/#nav")
    }

    fn scripted() -> Iri {
        Iri::new("http://idpf.org/epub/vocab/package/#scripted")
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut table = ManifestTable::new();
        table.insert(ManifestItem::new("c1", "c1.xhtml", "application/xhtml+xml")).unwrap();

        let result = table.insert(ManifestItem::new("c1", "other.xhtml", "application/xhtml+xml"));
        assert!(matches!(result, Err(EpubError::DuplicateManifestId(id)) if id == "c1"));

        // 原条目未被覆盖
        assert_eq!(table.len(), 1);
        assert_eq!(table.get("c1").unwrap().href, "c1.xhtml");
    }

    #[test]
    fn test_items_with_properties_in_declaration_order() {
        let table = ManifestTable::from_items([
            ManifestItem::new("z", "z.xhtml", "application/xhtml+xml").with_properties(vec![nav(), scripted()]),
            ManifestItem::new("a", "a.xhtml", "application/xhtml+xml"),
            ManifestItem::new("m", "m.xhtml", "application/xhtml+xml").with_properties(vec![scripted()]),
        ])
        .unwrap();

        let ids: Vec<&str> = table
            .items_with_properties(&[scripted()])
            .iter()
            .map(|item| item.id.as_str())
            .collect();
        assert_eq!(ids, vec!["z", "m"]);

        let both: Vec<&str> = table
            .items_with_properties(&[nav(), scripted()])
            .iter()
            .map(|item| item.id.as_str())
            .collect();
        assert_eq!(both, vec!["z"]);

        // 空属性列表匹配全部
        assert_eq!(table.items_with_properties(&[]).len(), 3);
    }

    #[test]
    fn test_fallback_chain_stops_on_cycle() {
        let table = ManifestTable::from_items([
            ManifestItem::new("a", "a.svg", "image/svg+xml").with_fallback("b"),
            ManifestItem::new("b", "b.png", "image/png").with_fallback("c"),
            ManifestItem::new("c", "c.xhtml", "application/xhtml+xml").with_fallback("a"),
        ])
        .unwrap();

        let start = table.get("a").unwrap();
        let chain: Vec<&str> = table.fallback_chain(start).iter().map(|item| item.id.as_str()).collect();
        assert_eq!(chain, vec!["b", "c"]);
    }

    #[test]
    fn test_fallback_chain_missing_reference() {
        let table = ManifestTable::from_items([
            ManifestItem::new("a", "a.svg", "image/svg+xml").with_fallback("missing"),
        ])
        .unwrap();
        assert!(table.fallback_chain(table.get("a").unwrap()).is_empty());
    }
}
