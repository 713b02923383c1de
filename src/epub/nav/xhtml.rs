//! EPUB3导航文档解析
//!
//! 每个带`epub:type`的`<nav>`元素成为一张导航表，
//! 其`<ol>/<li>`结构转换为导航点树。

use crate::epub::error::{EpubError, Result};
use crate::epub::nav::resolve_relative_href;
use crate::epub::nav::table::{NavigationPoint, NavigationTable};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

static NAV_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("nav").expect("nav选择器"));

/// 解析导航文档
///
/// # 参数
/// * `content` - 导航文档的XHTML内容
/// * `document_href` - 导航文档相对于包文档的路径，用于改写链接
///
/// # 返回值
/// * `Result<Vec<NavigationTable>>` - 按文档顺序的导航表；文档中没有nav元素时返回`NavParseError`
pub fn parse_navigation_document(content: &str, document_href: &str) -> Result<Vec<NavigationTable>> {
    let document = Html::parse_document(content);
    let mut found_nav = false;
    let mut tables = Vec::new();

    for nav in document.select(&NAV_SELECTOR) {
        found_nav = true;
        let Some(nav_type) = epub_type(nav) else {
            debug!("跳过没有epub:type的nav元素");
            continue;
        };

        let mut table = NavigationTable::new(nav_type);
        for child in child_elements(nav) {
            match child.value().name() {
                "h1" | "h2" | "h3" | "h4" | "h5" | "h6" if table.heading.is_none() => {
                    table.heading = Some(collapse_text(child));
                }
                "ol" if table.points.is_empty() => {
                    table.points = list_points(child, document_href);
                }
                _ => {}
            }
        }
        tables.push(table);
    }

    if !found_nav {
        return Err(EpubError::NavParseError(format!("{} 中没有nav元素", document_href)));
    }
    Ok(tables)
}

/// epub:type的第一个记号
fn epub_type(element: ElementRef) -> Option<String> {
    element
        .value()
        .attrs()
        .find(|(name, _)| *name == "epub:type" || name.ends_with(":type"))
        .and_then(|(_, value)| value.split_whitespace().next())
        .map(str::to_string)
}

fn child_elements(element: ElementRef<'_>) -> impl Iterator<Item = ElementRef<'_>> {
    element.children().filter_map(ElementRef::wrap)
}

/// 合并空白后的文本内容
fn collapse_text(element: ElementRef) -> String {
    element.text().flat_map(str::split_whitespace).collect::<Vec<_>>().join(" ")
}

/// 把`<ol>`的`<li>`子元素转换为导航点
fn list_points(list: ElementRef, document_href: &str) -> Vec<NavigationPoint> {
    child_elements(list)
        .filter(|child| child.value().name() == "li")
        .map(|item| {
            let mut point = NavigationPoint::default();
            for child in child_elements(item) {
                match child.value().name() {
                    "a" | "span" if point.label.is_empty() => {
                        point.label = collapse_text(child);
                        point.target = child
                            .value()
                            .attr("href")
                            .map(|href| resolve_relative_href(document_href, href));
                    }
                    "ol" => point.children.extend(list_points(child, document_href)),
                    _ => {}
                }
            }
            point
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_NAV: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops">
<head><title>目录</title></head>
<body>
  <nav epub:type="toc" id="toc">
    <h1>目  录</h1>
    <ol>
      <li><a href="c1.xhtml">第一章</a>
        <ol><li><a href="c1.xhtml#s1">第一节</a></li></ol>
      </li>
      <li><span>第二部</span>
        <ol><li><a href="../extra/c2.xhtml">第二章</a></li></ol>
      </li>
    </ol>
  </nav>
  <nav epub:type="landmarks" hidden="">
    <ol><li><a epub:type="bodymatter" href="c1.xhtml">正文</a></li></ol>
  </nav>
  <nav><ol><li><a href="x.xhtml">无类型</a></li></ol></nav>
</body>
</html>"#;

    #[test]
    fn test_parse_toc_and_landmarks() {
        let tables = parse_navigation_document(SAMPLE_NAV, "text/nav.xhtml").unwrap();
        assert_eq!(tables.len(), 2);

        let toc = &tables[0];
        assert_eq!(toc.title, "toc");
        assert_eq!(toc.heading.as_deref(), Some("目 录"));
        assert_eq!(toc.points.len(), 2);
        assert_eq!(toc.points[0].target.as_deref(), Some("text/c1.xhtml"));
        assert_eq!(toc.points[0].children[0].target.as_deref(), Some("text/c1.xhtml#s1"));

        // span标题项没有目标
        assert_eq!(toc.points[1].label, "第二部");
        assert!(toc.points[1].target.is_none());
        assert_eq!(toc.points[1].children[0].target.as_deref(), Some("extra/c2.xhtml"));

        assert_eq!(tables[1].title, "landmarks");
        assert_eq!(tables[1].points[0].label, "正文");
    }

    #[test]
    fn test_document_without_nav() {
        let result = parse_navigation_document("<html><body><p>空</p></body></html>", "nav.xhtml");
        assert!(matches!(result, Err(EpubError::NavParseError(_))));
    }
}
