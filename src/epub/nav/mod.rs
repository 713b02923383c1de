//! 导航模块
//!
//! 此模块解析EPUB3导航文档与EPUB2的NCX文件，统一为以类型名为键的导航表，
//! 并提供目录树的文本渲染。

mod ncx;
mod table;
mod toc_tree;
mod xhtml;

use std::collections::HashMap;

pub use ncx::NcxDocument;
pub use table::{NavigationPoint, NavigationTable};
pub use toc_tree::{TocStatistics, TocTree, TocTreeNode, TocTreeStyle};
pub use xhtml::parse_navigation_document;

/// 以类型名为键的导航表映射
pub type NavigationTableMap = HashMap<String, NavigationTable>;

/// 把相对于某个文档的引用改写为相对于包文档的路径
///
/// # 参数
/// * `document_href` - 引用所在文档相对于包文档的路径
/// * `target` - 文档中出现的引用，可以带`#片段`
///
/// # 返回值
/// * `String` - 相对于包文档的路径；带协议的绝对地址原样返回
pub fn resolve_relative_href(document_href: &str, target: &str) -> String {
    if target.contains("://") || target.starts_with('/') {
        return target.to_string();
    }

    let document_path = document_href.split_once('#').map_or(document_href, |(path, _)| path);
    let (path, fragment) = match target.split_once('#') {
        Some((path, fragment)) => (path, Some(fragment)),
        None => (target, None),
    };

    let mut resolved = if path.is_empty() {
        document_path.to_string()
    } else {
        let mut segments: Vec<&str> = match document_path.rsplit_once('/') {
            Some((dir, _)) => dir.split('/').filter(|s| !s.is_empty()).collect(),
            None => Vec::new(),
        };
        for segment in path.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    if segments.last().is_some_and(|last| *last != "..") {
                        segments.pop();
                    } else {
                        segments.push("..");
                    }
                }
                other => segments.push(other),
            }
        }
        segments.join("/")
    };

    if let Some(fragment) = fragment {
        resolved.push('#');
        resolved.push_str(fragment);
    }
    resolved
}
