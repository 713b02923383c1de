//! 脊柱模块
//!
//! 提供EPUB包中阅读顺序（脊柱）的结构定义。

use crate::epub::iri::Iri;

/// 脊柱项信息(阅读顺序)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpineItem {
    /// 在脊柱中的位置（从0开始）
    pub index: usize,
    /// 引用的清单项ID
    pub idref: String,
    /// itemref元素自身的ID
    pub id: Option<String>,
    /// 是否线性阅读
    pub linear: bool,
    /// 已展开的属性IRI(如page-spread-left)
    pub properties: Vec<Iri>,
}

impl SpineItem {
    /// 检查是否为线性阅读
    pub fn is_linear(&self) -> bool {
        self.linear
    }

    /// 该项在CFI中的步进值：第n项（从0开始）为`2(n+1)`
    pub fn cfi_step(&self) -> u32 {
        ((self.index + 1) * 2) as u32
    }

    /// 检查CFI断言中的标识是否指向本项（itemref的idref或id）
    pub fn matches_assertion(&self, identifier: &str) -> bool {
        self.idref == identifier || self.id.as_deref() == Some(identifier)
    }
}

/// 有序的脊柱列表
#[derive(Debug, Clone, Default)]
pub struct SpineList {
    items: Vec<SpineItem>,
}

impl SpineList {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加脊柱项，位置由列表长度决定
    pub fn push(&mut self, idref: impl Into<String>, id: Option<String>, linear: bool, properties: Vec<Iri>) {
        let index = self.items.len();
        self.items.push(SpineItem {
            index,
            idref: idref.into(),
            id,
            linear,
            properties,
        });
    }

    pub fn first(&self) -> Option<&SpineItem> {
        self.items.first()
    }

    /// 按位置获取，越界时返回None
    pub fn get(&self, index: usize) -> Option<&SpineItem> {
        self.items.get(index)
    }

    /// 阅读顺序中的下一项
    pub fn next(&self, item: &SpineItem) -> Option<&SpineItem> {
        self.items.get(item.index + 1)
    }

    /// 阅读顺序中的上一项
    pub fn previous(&self, item: &SpineItem) -> Option<&SpineItem> {
        item.index.checked_sub(1).and_then(|index| self.items.get(index))
    }

    /// 第一个引用指定清单项的脊柱项位置
    pub fn position_of_idref(&self, idref: &str) -> Option<usize> {
        self.items.iter().position(|item| item.idref == idref)
    }

    /// 第一个匹配CFI断言标识的脊柱项
    pub fn find_by_assertion(&self, identifier: &str) -> Option<&SpineItem> {
        self.items
            .iter()
            .find(|item| item.idref == identifier)
            .or_else(|| self.items.iter().find(|item| item.matches_assertion(identifier)))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SpineItem> {
        self.items.iter()
    }

    /// 只包含线性阅读项
    pub fn linear_items(&self) -> impl Iterator<Item = &SpineItem> {
        self.items.iter().filter(|item| item.is_linear())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<'a> IntoIterator for &'a SpineList {
    type Item = &'a SpineItem;
    type IntoIter = std::slice::Iter<'a, SpineItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
