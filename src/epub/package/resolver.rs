//! CFI的包级定位
//!
//! CFI的前两个组件分别指向`<spine>`元素和其中的`<itemref>`。
//! itemref组件的步进值只是提示：定位时以断言为准，步进值过期时就地改写为当前值。
//! 间接标记之后的部分作为剩余CFI交给文档级解析。

use tracing::debug;

use crate::epub::cfi::{Assertion, Cfi, Component};
use crate::epub::error::{CfiError, Result};
use crate::epub::opf::{ManifestItem, SpineItem};
use crate::epub::package::Package;

/// CFI在包内的定位结果
#[derive(Debug, Clone, PartialEq)]
pub struct CfiTarget<'a> {
    /// 目标清单项
    pub manifest_item: &'a ManifestItem,
    /// 经过的脊柱项
    pub spine_item: &'a SpineItem,
    /// 间接标记之后、交给文档级解析的部分
    pub remainder: Option<Cfi>,
    /// 是否改写了itemref组件的步进值
    pub corrected: bool,
}

fn unresolvable(reason: &str, cfi: &Cfi) -> CfiError {
    CfiError::unresolvable(reason, cfi.to_string())
}

impl Package {
    /// 把CFI定位到清单项
    ///
    /// itemref组件的步进值与当前脊柱不一致时会被改写，因此参数为`&mut Cfi`；
    /// 改写后的CFI再次定位会得到同一目标且不再改写。
    ///
    /// # 返回值
    /// * `Result<CfiTarget>` - 路径不指向有效的脊柱项、或结构与语法不一致时返回`InvalidCfi`
    pub fn manifest_item_for_cfi(&self, cfi: &mut Cfi) -> Result<CfiTarget<'_>> {
        let (spine_item, corrected) = self.confirm_or_correct_spine_item_qualifier(cfi)?;

        let components = cfi.components();
        let itemref = &components[1];
        let has_local_path = components.len() > 2 || cfi.range().is_some();
        if has_local_path && !itemref.has_indirection() {
            return Err(unresolvable("脊柱项之后缺少间接标记 !", cfi).into());
        }

        let manifest_item = self
            .manifest_item_with_id(&spine_item.idref)
            .ok_or_else(|| unresolvable("脊柱项引用的清单项不存在", cfi))?;

        let remainder = has_local_path.then(|| {
            Cfi::from_parts(cfi.is_wrapped(), components[2..].to_vec(), cfi.range().cloned())
        });

        Ok(CfiTarget {
            manifest_item,
            spine_item,
            remainder,
            corrected,
        })
    }

    /// 确认或纠正CFI中itemref组件的步进值
    ///
    /// 先按步进值取候选脊柱项；带断言时以断言为准，候选不匹配就按断言查找并改写步进值。
    /// 只有没有任何脊柱项与断言匹配（或无断言且步进值越界）时才失败。
    ///
    /// # 返回值
    /// * `Result<(&SpineItem, bool)>` - 目标脊柱项，以及是否发生了改写
    pub fn confirm_or_correct_spine_item_qualifier(&self, cfi: &mut Cfi) -> Result<(&SpineItem, bool)> {
        let components = cfi.components();
        if components.len() < 2 {
            return Err(unresolvable("CFI至少需要spine与itemref两级组件", cfi).into());
        }

        let spine = &components[0];
        if spine.step() != self.spine_cfi_index() {
            return Err(unresolvable(
                &format!("第一级组件应为 /{}（spine元素）", self.spine_cfi_index()),
                cfi,
            )
            .into());
        }
        if spine.has_indirection() || spine.has_offset() {
            return Err(unresolvable("spine级组件不能带偏移或间接标记", cfi).into());
        }

        let itemref = &components[1];
        if itemref.has_offset() {
            return Err(unresolvable("itemref级组件不能带偏移", cfi).into());
        }

        let step = itemref.step();
        // 只有参数的断言（如`[;s=b]`）不携带ID
        let identifier = itemref
            .assertion()
            .map(Assertion::identifier)
            .filter(|identifier| !identifier.is_empty());
        let candidate = if step >= 2 && itemref.is_element_step() {
            self.spine_item_at((step / 2 - 1) as usize)
        } else {
            None
        };

        let item = match (identifier, candidate) {
            (Some(identifier), Some(candidate)) if candidate.matches_assertion(&identifier) => candidate,
            (Some(identifier), _) => self
                .spine()
                .find_by_assertion(&identifier)
                .ok_or_else(|| unresolvable("没有与断言匹配的脊柱项", cfi))?,
            (None, Some(candidate)) => candidate,
            (None, None) => return Err(unresolvable("步进值不指向任何脊柱项", cfi).into()),
        };

        let expected = item.cfi_step();
        let corrected = expected != step;
        if corrected {
            debug!(from = step, to = expected, idref = %item.idref, "纠正CFI中的脊柱步进值");
            if let Some(component) = cfi.component_mut(1) {
                component.set_step(expected);
            }
        }

        Ok((item, corrected))
    }

    /// 为脊柱项生成当前有效的CFI，形如`/6/4[idref]`
    pub fn cfi_for_spine_item(&self, item: &SpineItem) -> Cfi {
        Cfi::new(vec![
            Component::new(self.spine_cfi_index()),
            Component::new(item.cfi_step()).with_assertion(Assertion::new(&item.idref)),
        ])
    }

    /// 为清单项生成CFI，清单项不在脊柱中时返回None
    pub fn cfi_for_manifest_item(&self, item: &ManifestItem) -> Option<Cfi> {
        self.spine_item_with_idref(&item.id)
            .map(|spine_item| self.cfi_for_spine_item(spine_item))
    }

    /// 清单项相对于脊柱的CFI前缀，形如`/6/4[id]!`，之后可接文档内路径
    pub fn cfi_subpath_for_manifest_item_with_id(&self, id: &str) -> Option<String> {
        let spine_item = self.spine_item_with_idref(id)?;
        let component = Component::new(spine_item.cfi_step())
            .with_assertion(Assertion::new(id))
            .with_indirection();
        Some(format!("/{}{}", self.spine_cfi_index(), component))
    }

    /// 定位CFI并读取目标文档文本
    ///
    /// # 返回值
    /// * `Result<(String, Option<Cfi>)>` - 文档文本与交给文档级解析的剩余CFI
    pub fn content_for_cfi(&self, cfi: &mut Cfi) -> Result<(String, Option<Cfi>)> {
        let target = self.manifest_item_for_cfi(cfi)?;
        let content = self.content_for_manifest_item(target.manifest_item)?;
        Ok((content, target.remainder))
    }
}
