//! CFI（Canonical Fragment Identifier）模块
//!
//! 提供CFI地址串的语法解析与内存表示，与包模型无关。
//! 包级别的定位与纠正见`package`模块。

mod parser;
mod types;

pub use parser::parse;
pub use types::{Assertion, Cfi, CfiRange, Component, Measure};
