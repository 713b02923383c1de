//! CFI解析器
//!
//! 语法（简化）：
//! ```text
//! cfi       = "epubcfi(" body ")" | body
//! body      = path ["," path "," path]
//! path      = component+
//! component = "/" integer [assertion] [offset [assertion]] ["!"]
//! offset    = ":" integer | "~" number ["@" number ":" number] | "@" number ":" number
//! assertion = "[" text "]"      ; text中用 ^ 转义特殊字符
//! integer   = "0" | [1-9][0-9]*
//! ```
//! 带偏移的组件只能是路径的最后一个组件，且其后不能再有间接标记。

use crate::epub::cfi::types::{Assertion, Cfi, CfiRange, Component, Measure};
use crate::epub::error::CfiError;

const WRAPPER_OPEN: &str = "epubcfi(";

/// 错误片段的最大字符数
const FRAGMENT_CHARS: usize = 24;

/// 解析CFI字符串
///
/// 接受裸路径和`epubcfi(...)`包装两种写法，首尾空白被忽略。
///
/// # 返回值
/// * `Result<Cfi, CfiError>` - 失败时携带出错片段和光标位置
pub fn parse(input: &str) -> Result<Cfi, CfiError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(CfiError::syntax("空的CFI", "", 0));
    }

    let (wrapped, body, base) = match trimmed.strip_prefix(WRAPPER_OPEN) {
        Some(rest) => match rest.strip_suffix(')') {
            Some(body) => (true, body, WRAPPER_OPEN.len()),
            None => {
                return Err(CfiError::syntax("缺少结尾的 )", fragment_at(trimmed, trimmed.len()), trimmed.len()));
            }
        },
        None => (false, trimmed, 0),
    };

    let mut parser = Parser::new(trimmed, base, base + body.len());
    let components = parser.parse_path()?;

    let range = if parser.skip_if(',') {
        let start = parser.parse_path()?;
        parser.expect(',')?;
        let end = parser.parse_path()?;
        Some(CfiRange { start, end })
    } else {
        None
    };

    if !parser.at_end() {
        return Err(parser.error("意外的字符"));
    }

    Ok(Cfi::from_parts(wrapped, components, range))
}

impl std::str::FromStr for Cfi {
    type Err = CfiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s)
    }
}

fn fragment_at(input: &str, position: usize) -> String {
    input.get(position..).unwrap_or_default().chars().take(FRAGMENT_CHARS).collect()
}

/// 单光标解析状态，`end`之后的输入不可见
struct Parser<'a> {
    input: &'a str,
    pos: usize,
    end: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str, pos: usize, end: usize) -> Self {
        Self { input, pos, end }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..self.end].chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn skip_if(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), CfiError> {
        if self.skip_if(expected) {
            Ok(())
        } else {
            Err(self.error(&format!("应为 `{}`", expected)))
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.end
    }

    fn error(&self, reason: &str) -> CfiError {
        self.error_at(reason, self.pos)
    }

    fn error_at(&self, reason: &str, position: usize) -> CfiError {
        let visible = &self.input[..self.end];
        CfiError::syntax(reason, fragment_at(visible, position), position)
    }

    fn take_digits(&mut self) -> &'a str {
        let start = self.pos;
        while self.peek().is_some_and(|ch| ch.is_ascii_digit()) {
            self.pos += 1;
        }
        &self.input[start..self.pos]
    }

    /// 整数：没有前导零
    fn parse_integer(&mut self, what: &str) -> Result<u32, CfiError> {
        let start = self.pos;
        let digits = self.take_digits();
        if digits.is_empty() {
            return Err(self.error_at(&format!("{}应为数字", what), start));
        }
        if digits.len() > 1 && digits.starts_with('0') {
            return Err(self.error_at(&format!("{}不能有前导零", what), start));
        }
        digits
            .parse()
            .map_err(|_| self.error_at(&format!("{}超出范围", what), start))
    }

    /// 数值：整数部分加可选的小数部分，原样保留
    fn parse_measure(&mut self, what: &str) -> Result<Measure, CfiError> {
        let start = self.pos;
        if self.take_digits().is_empty() {
            return Err(self.error_at(&format!("{}应为数字", what), start));
        }
        if self.skip_if('.') && self.take_digits().is_empty() {
            return Err(self.error(&format!("{}的小数部分应为数字", what)));
        }
        Ok(Measure::from_raw(&self.input[start..self.pos]))
    }

    /// 方括号内的断言，`^`转义下一个字符
    fn parse_assertion(&mut self) -> Result<Option<Assertion>, CfiError> {
        let open = self.pos;
        if !self.skip_if('[') {
            return Ok(None);
        }

        let start = self.pos;
        let mut escaped = false;
        loop {
            let Some(ch) = self.advance() else {
                return Err(self.error_at("断言缺少结尾的 ]", open));
            };
            match ch {
                _ if escaped => escaped = false,
                '^' => escaped = true,
                '[' => return Err(self.error_at("断言中未转义的 [", self.pos - 1)),
                ']' => break,
                _ => {}
            }
        }

        let raw = &self.input[start..self.pos - 1];
        if raw.is_empty() {
            return Err(self.error_at("空的断言", open));
        }
        Ok(Some(Assertion::from_raw(raw)))
    }

    fn parse_component(&mut self) -> Result<Component, CfiError> {
        self.expect('/')?;
        let mut component = Component::new(self.parse_integer("步进值")?);

        if let Some(assertion) = self.parse_assertion()? {
            component = component.with_assertion(assertion);
        }

        let mut has_offset = true;
        if self.skip_if(':') {
            component = component.with_character_offset(self.parse_integer("字符偏移")?);
        } else if self.skip_if('~') {
            component = component.with_temporal_offset(self.parse_measure("时间偏移")?);
            if self.skip_if('@') {
                let (x, y) = self.parse_spatial()?;
                component = component.with_spatial_offset(x, y);
            }
        } else if self.skip_if('@') {
            let (x, y) = self.parse_spatial()?;
            component = component.with_spatial_offset(x, y);
        } else {
            has_offset = false;
        }

        if has_offset {
            if let Some(assertion) = self.parse_assertion()? {
                component = component.with_offset_assertion(assertion);
            }
            if matches!(self.peek(), Some('/') | Some('!')) {
                return Err(self.error("偏移只能出现在路径末尾"));
            }
        } else if self.skip_if('!') {
            component = component.with_indirection();
        }

        Ok(component)
    }

    fn parse_spatial(&mut self) -> Result<(Measure, Measure), CfiError> {
        let x = self.parse_measure("空间偏移")?;
        self.expect(':')?;
        let y = self.parse_measure("空间偏移")?;
        Ok((x, y))
    }

    fn parse_path(&mut self) -> Result<Vec<Component>, CfiError> {
        if self.peek() != Some('/') {
            return Err(self.error("路径应以 / 开头"));
        }
        let mut components = Vec::new();
        while self.peek() == Some('/') {
            components.push(self.parse_component()?);
        }
        Ok(components)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_bare_path() {
        let cfi = parse("/6/4[chap01ref]!/4[body01]/10[para05]/3:10").unwrap();
        assert!(!cfi.is_wrapped());
        assert_eq!(cfi.components().len(), 5);
        assert_eq!(cfi.components()[0].step(), 6);
        assert_eq!(cfi.components()[1].assertion().unwrap().identifier(), "chap01ref");
        assert!(cfi.components()[1].has_indirection());
        assert_eq!(cfi.components()[4].character_offset(), Some(10));
        assert_eq!(cfi.to_string(), "/6/4[chap01ref]!/4[body01]/10[para05]/3:10");
    }

    #[test]
    fn test_parse_wrapped_range() {
        let input = "epubcfi(/6/4[chap01ref]!/4[body01]/10[para05],/2/1:1,/3:4)";
        let cfi: Cfi = input.parse().unwrap();
        assert!(cfi.is_wrapped());
        let range = cfi.range().unwrap();
        assert_eq!(range.start.len(), 2);
        assert_eq!(range.end[0].character_offset(), Some(4));
        assert_eq!(cfi.to_string(), input);
    }

    #[test]
    fn test_parse_media_offsets_and_text_assertion() {
        let cfi = parse("epubcfi(/6/14[audio]!/4~23.5@10:20.25[yon,dar;s=b])").unwrap();
        let last = cfi.components().last().unwrap();
        assert_eq!(last.temporal_offset().unwrap().raw(), "23.5");
        let (x, y) = last.spatial_offset().unwrap();
        assert_eq!((x.value(), y.value()), (10.0, 20.25));
        let assertion = last.offset_assertion().unwrap();
        assert_eq!(assertion.parameters(), vec![("s".to_string(), "b".to_string())]);
    }

    #[test]
    fn test_escaped_assertion() {
        let cfi = parse("/6/4[a^]b^[c]").unwrap();
        assert_eq!(cfi.components()[1].assertion().unwrap().identifier(), "a]b[c");
        assert_eq!(cfi.to_string(), "/6/4[a^]b^[c]");
    }

    #[test]
    fn test_whitespace_is_trimmed() {
        assert_eq!(parse("  /6/2  ").unwrap().to_string(), "/6/2");
    }

    #[test]
    fn test_syntax_errors_carry_position() {
        let cases = [
            ("", 0),
            ("6/4", 0),
            ("/6/x", 3),
            ("/6/04", 3),
            ("/6/4[chap", 4),
            ("/6/4[]", 4),
            ("/6/4:5/2", 6),
            ("/6/4#", 4),
            ("/6/4,/2", 7),
            ("/6/4@1", 6),
            ("/99999999999", 1),
            ("epubcfi(/6/4", 12),
            ("epubcfi(/6/4x)", 12),
        ];
        for (input, position) in cases {
            let error = parse(input).unwrap_err();
            assert_eq!(error.position, Some(position), "输入: {:?}, 错误: {}", input, error);
        }
    }

    #[test]
    fn test_error_fragment() {
        let error = parse("/6/4[chap]/x2").unwrap_err();
        assert_eq!(error.fragment, "x2");
    }

    fn assertion_strategy() -> impl Strategy<Value = Assertion> {
        "[a-zA-Z0-9 _.\\-\\[\\];,=()^]{1,8}".prop_map(|text| Assertion::new(&text))
    }

    fn measure_strategy() -> impl Strategy<Value = Measure> {
        (0u32..1000, proptest::option::of(0u32..100)).prop_map(|(whole, fraction)| match fraction {
            Some(fraction) => Measure::from_raw(format!("{}.{}", whole, fraction)),
            None => Measure::from_raw(whole.to_string()),
        })
    }

    fn inner_component() -> impl Strategy<Value = Component> {
        (0u32..500, proptest::option::of(assertion_strategy()), any::<bool>()).prop_map(
            |(step, assertion, indirection)| {
                let mut component = Component::new(step);
                if let Some(assertion) = assertion {
                    component = component.with_assertion(assertion);
                }
                if indirection {
                    component = component.with_indirection();
                }
                component
            },
        )
    }

    fn terminal_component() -> impl Strategy<Value = Component> {
        (
            inner_component(),
            0u8..4,
            0u32..5000,
            measure_strategy(),
            measure_strategy(),
            proptest::option::of(assertion_strategy()),
        )
            .prop_map(|(base, kind, offset, first, second, assertion)| {
                let component = match kind {
                    0 => return base,
                    1 => strip_indirection(base).with_character_offset(offset),
                    2 => strip_indirection(base).with_temporal_offset(first),
                    _ => strip_indirection(base).with_spatial_offset(first, second),
                };
                match assertion {
                    Some(assertion) => component.with_offset_assertion(assertion),
                    None => component,
                }
            })
    }

    fn strip_indirection(component: Component) -> Component {
        let mut plain = Component::new(component.step());
        if let Some(assertion) = component.assertion() {
            plain = plain.with_assertion(assertion.clone());
        }
        plain
    }

    fn path_strategy() -> impl Strategy<Value = Vec<Component>> {
        (proptest::collection::vec(inner_component(), 0..5), terminal_component()).prop_map(|(mut path, last)| {
            path.push(last);
            path
        })
    }

    fn cfi_strategy() -> impl Strategy<Value = Cfi> {
        (
            path_strategy(),
            any::<bool>(),
            proptest::option::of((path_strategy(), path_strategy())),
        )
            .prop_map(|(components, wrapped, range)| {
                let cfi = Cfi::new(components).wrapped(wrapped);
                match range {
                    Some((start, end)) => cfi.with_range(start, end),
                    None => cfi,
                }
            })
    }

    proptest! {
        #[test]
        fn prop_serialize_then_parse_is_identity(cfi in cfi_strategy()) {
            let text = cfi.to_string();
            let parsed = parse(&text).unwrap();
            prop_assert_eq!(&parsed, &cfi);
            prop_assert_eq!(parsed.to_string(), text);
        }
    }
}
