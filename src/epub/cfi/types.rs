//! CFI（Canonical Fragment Identifier）数据结构
//!
//! CFI是定位出版物中精确位置的标准地址串，例如
//! `epubcfi(/6/4[chap01ref]!/4[body01]/10[para05]/3:10)`。
//! 路径由若干组件组成，每个组件是一个步进值及其可选的断言、偏移和间接标记。

use std::fmt;

/// 断言中需要用`^`转义的字符
const SPECIAL_CHARS: &[char] = &['^', '[', ']', '(', ')', ',', ';', '='];

/// 方括号中的断言，保存转义后的原始文本
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Assertion {
    raw: String,
}

impl Assertion {
    /// 由标识创建断言，特殊字符会被转义
    pub fn new(identifier: &str) -> Self {
        let mut raw = String::with_capacity(identifier.len());
        for ch in identifier.chars() {
            if SPECIAL_CHARS.contains(&ch) {
                raw.push('^');
            }
            raw.push(ch);
        }
        Self { raw }
    }

    /// 由已转义的原始文本创建，调用者保证其合法
    pub(crate) fn from_raw(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    /// 方括号内的原始文本
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// 去掉转义后的完整文本
    pub fn value(&self) -> String {
        unescape(&self.raw)
    }

    /// 标识部分：第一个未转义`;`之前的文本（去掉转义）
    pub fn identifier(&self) -> String {
        let segments = split_unescaped(&self.raw, ';');
        unescape(segments.first().copied().unwrap_or_default())
    }

    /// `;key=value`形式的参数
    pub fn parameters(&self) -> Vec<(String, String)> {
        split_unescaped(&self.raw, ';')
            .into_iter()
            .skip(1)
            .filter_map(|parameter| {
                let parts = split_unescaped(parameter, '=');
                match parts.as_slice() {
                    [key, value] => Some((unescape(key), unescape(value))),
                    _ => None,
                }
            })
            .collect()
    }
}

impl fmt::Display for Assertion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.raw)
    }
}

/// 在未被`^`转义的分隔符处切分
fn split_unescaped(raw: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut escaped = false;
    for (index, ch) in raw.char_indices() {
        if escaped {
            escaped = false;
        } else if ch == '^' {
            escaped = true;
        } else if ch == separator {
            parts.push(&raw[start..index]);
            start = index + ch.len_utf8();
        }
    }
    parts.push(&raw[start..]);
    parts
}

fn unescape(raw: &str) -> String {
    let mut result = String::with_capacity(raw.len());
    let mut escaped = false;
    for ch in raw.chars() {
        if !escaped && ch == '^' {
            escaped = true;
            continue;
        }
        escaped = false;
        result.push(ch);
    }
    result
}

/// 时间或空间偏移的数值，保留原始写法以便精确重新序列化
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Measure {
    raw: String,
}

impl Measure {
    pub(crate) fn from_raw(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    /// 由数值创建
    pub fn new(value: f64) -> Self {
        Self { raw: value.to_string() }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// 数值
    pub fn value(&self) -> f64 {
        self.raw.parse().unwrap_or_default()
    }
}

impl fmt::Display for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// CFI路径中的一个组件
///
/// 解析后只有步进值可以被修改，且只由包级解析器在纠正脊柱位置时修改。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Component {
    step: u32,
    assertion: Option<Assertion>,
    character_offset: Option<u32>,
    temporal_offset: Option<Measure>,
    spatial_offset: Option<(Measure, Measure)>,
    offset_assertion: Option<Assertion>,
    indirection: bool,
}

impl Component {
    /// 创建只有步进值的组件
    pub fn new(step: u32) -> Self {
        Self {
            step,
            assertion: None,
            character_offset: None,
            temporal_offset: None,
            spatial_offset: None,
            offset_assertion: None,
            indirection: false,
        }
    }

    pub fn with_assertion(mut self, assertion: Assertion) -> Self {
        self.assertion = Some(assertion);
        self
    }

    pub fn with_character_offset(mut self, offset: u32) -> Self {
        self.character_offset = Some(offset);
        self
    }

    pub fn with_temporal_offset(mut self, offset: Measure) -> Self {
        self.temporal_offset = Some(offset);
        self
    }

    pub fn with_spatial_offset(mut self, x: Measure, y: Measure) -> Self {
        self.spatial_offset = Some((x, y));
        self
    }

    pub fn with_offset_assertion(mut self, assertion: Assertion) -> Self {
        self.offset_assertion = Some(assertion);
        self
    }

    /// 标记此组件之后进入被引用文档
    pub fn with_indirection(mut self) -> Self {
        self.indirection = true;
        self
    }

    pub fn step(&self) -> u32 {
        self.step
    }

    pub(crate) fn set_step(&mut self, step: u32) {
        self.step = step;
    }

    pub fn assertion(&self) -> Option<&Assertion> {
        self.assertion.as_ref()
    }

    pub fn character_offset(&self) -> Option<u32> {
        self.character_offset
    }

    pub fn temporal_offset(&self) -> Option<&Measure> {
        self.temporal_offset.as_ref()
    }

    pub fn spatial_offset(&self) -> Option<(&Measure, &Measure)> {
        self.spatial_offset.as_ref().map(|(x, y)| (x, y))
    }

    /// 偏移之后的断言（文本位置断言）
    pub fn offset_assertion(&self) -> Option<&Assertion> {
        self.offset_assertion.as_ref()
    }

    pub fn has_indirection(&self) -> bool {
        self.indirection
    }

    /// 是否带有任何字符、时间或空间偏移
    pub fn has_offset(&self) -> bool {
        self.character_offset.is_some() || self.temporal_offset.is_some() || self.spatial_offset.is_some()
    }

    /// 步进值为偶数时指向元素
    pub fn is_element_step(&self) -> bool {
        self.step % 2 == 0
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.step)?;
        if let Some(ref assertion) = self.assertion {
            write!(f, "{}", assertion)?;
        }
        if let Some(offset) = self.character_offset {
            write!(f, ":{}", offset)?;
        }
        if let Some(ref temporal) = self.temporal_offset {
            write!(f, "~{}", temporal)?;
        }
        if let Some((ref x, ref y)) = self.spatial_offset {
            write!(f, "@{}:{}", x, y)?;
        }
        if let Some(ref assertion) = self.offset_assertion {
            write!(f, "{}", assertion)?;
        }
        if self.indirection {
            f.write_str("!")?;
        }
        Ok(())
    }
}

/// 范围形式中的两个局部路径
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CfiRange {
    pub start: Vec<Component>,
    pub end: Vec<Component>,
}

/// 解析后的CFI
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Cfi {
    wrapped: bool,
    components: Vec<Component>,
    range: Option<CfiRange>,
}

impl Cfi {
    /// 创建不带`epubcfi(...)`包装的CFI
    pub fn new(components: Vec<Component>) -> Self {
        Self {
            wrapped: false,
            components,
            range: None,
        }
    }

    pub(crate) fn from_parts(wrapped: bool, components: Vec<Component>, range: Option<CfiRange>) -> Self {
        Self {
            wrapped,
            components,
            range,
        }
    }

    /// 设置是否以`epubcfi(...)`形式序列化
    pub fn wrapped(mut self, wrapped: bool) -> Self {
        self.wrapped = wrapped;
        self
    }

    pub fn with_range(mut self, start: Vec<Component>, end: Vec<Component>) -> Self {
        self.range = Some(CfiRange { start, end });
        self
    }

    pub fn is_wrapped(&self) -> bool {
        self.wrapped
    }

    /// 路径组件（范围形式下为公共父路径）
    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub(crate) fn component_mut(&mut self, index: usize) -> Option<&mut Component> {
        self.components.get_mut(index)
    }

    pub fn range(&self) -> Option<&CfiRange> {
        self.range.as_ref()
    }

    /// 第一个带间接标记的组件位置
    pub fn indirection_index(&self) -> Option<usize> {
        self.components.iter().position(Component::has_indirection)
    }
}

fn write_path(f: &mut fmt::Formatter<'_>, components: &[Component]) -> fmt::Result {
    for component in components {
        write!(f, "{}", component)?;
    }
    Ok(())
}

impl fmt::Display for Cfi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.wrapped {
            f.write_str("epubcfi(")?;
        }
        write_path(f, &self.components)?;
        if let Some(ref range) = self.range {
            f.write_str(",")?;
            write_path(f, &range.start)?;
            f.write_str(",")?;
            write_path(f, &range.end)?;
        }
        if self.wrapped {
            f.write_str(")")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assertion_escaping() {
        let assertion = Assertion::new("chap[1];x");
        assert_eq!(assertion.raw(), "chap^[1^]^;x");
        assert_eq!(assertion.identifier(), "chap[1];x");
        assert!(assertion.parameters().is_empty());
        assert_eq!(assertion.to_string(), "[chap^[1^]^;x]");
    }

    #[test]
    fn test_assertion_parameters() {
        let assertion = Assertion::from_raw("chap01;s=b;lang=zh");
        assert_eq!(assertion.identifier(), "chap01");
        assert_eq!(
            assertion.parameters(),
            vec![
                ("s".to_string(), "b".to_string()),
                ("lang".to_string(), "zh".to_string())
            ]
        );
        assert_eq!(assertion.value(), "chap01;s=b;lang=zh");
    }

    #[test]
    fn test_display_components() {
        let cfi = Cfi::new(vec![
            Component::new(6),
            Component::new(4).with_assertion(Assertion::new("c1")).with_indirection(),
            Component::new(4),
            Component::new(3)
                .with_character_offset(10)
                .with_offset_assertion(Assertion::from_raw("yon,dar")),
        ])
        .wrapped(true);
        assert_eq!(cfi.to_string(), "epubcfi(/6/4[c1]!/4/3:10[yon,dar])");
        assert_eq!(cfi.indirection_index(), Some(1));
    }

    #[test]
    fn test_display_range_and_media_offsets() {
        let cfi = Cfi::new(vec![Component::new(6), Component::new(2).with_indirection()])
            .with_range(
                vec![Component::new(2).with_temporal_offset(Measure::from_raw("1.50"))],
                vec![Component::new(4).with_spatial_offset(Measure::from_raw("10"), Measure::from_raw("20.5"))],
            );
        assert_eq!(cfi.to_string(), "/6/2!,/2~1.50,/4@10:20.5");
        assert_eq!(cfi.range().unwrap().start[0].temporal_offset().unwrap().value(), 1.5);
    }

    #[test]
    fn test_measure_from_value_and_element_step() {
        assert_eq!(Measure::new(23.5).raw(), "23.5");
        assert_eq!(Measure::new(3.0).raw(), "3");

        let component = Component::new(2).with_temporal_offset(Measure::new(23.5));
        assert_eq!(component.to_string(), "/2~23.5");
        assert!(component.is_element_step());
        assert!(!Component::new(3).is_element_step());
    }
}
