//! NCX解析器模块
//!
//! 把EPUB2的NCX（Navigation Control file for XML）文件解析为导航表：
//! navMap对应`toc`，pageList对应`page-list`。

use crate::epub::error::{EpubError, Result};
use crate::epub::nav::resolve_relative_href;
use crate::epub::nav::table::{NavigationPoint, NavigationTable};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

/// 当前所处的NCX区段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    None,
    DocTitle,
    NavMap,
    PageList,
}

/// NCX文件解析结果
#[derive(Debug, Clone, Default)]
pub struct NcxDocument {
    /// 文档标题（docTitle）
    pub title: Option<String>,
    /// 由navMap与pageList得到的导航表
    pub tables: Vec<NavigationTable>,
}

impl NcxDocument {
    /// 解析NCX文件内容
    ///
    /// # 参数
    /// * `xml_content` - NCX文件的XML内容
    /// * `document_href` - NCX文件相对于包文档的路径，用于改写content的src
    ///
    /// # 返回值
    /// * `Result<NcxDocument>` - 根元素不是ncx时返回`NcxParseError`
    pub fn parse_xml(xml_content: &str, document_href: &str) -> Result<NcxDocument> {
        let mut reader = Reader::from_str(xml_content);
        reader.config_mut().trim_text(true);
        reader.config_mut().expand_empty_elements = true;

        let mut document = NcxDocument::default();
        let mut saw_root = false;
        let mut section = Section::None;
        let mut table: Option<NavigationTable> = None;
        // 尚未闭合的navPoint/pageTarget
        let mut stack: Vec<NavigationPoint> = Vec::new();
        let mut in_label = false;
        let mut text_content = String::new();

        loop {
            match reader.read_event()? {
                Event::Start(ref e) => {
                    let local_name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();

                    if !saw_root {
                        if local_name != "ncx" {
                            return Err(EpubError::NcxParseError(format!(
                                "根元素应为ncx, 找到 {}",
                                local_name
                            )));
                        }
                        saw_root = true;
                        continue;
                    }

                    match local_name.as_str() {
                        "docTitle" if section == Section::None => section = Section::DocTitle,
                        "navMap" => {
                            section = Section::NavMap;
                            table = Some(NavigationTable::new("toc"));
                        }
                        "pageList" => {
                            section = Section::PageList;
                            table = Some(NavigationTable::new("page-list"));
                        }
                        "navPoint" if section == Section::NavMap => stack.push(NavigationPoint::default()),
                        "pageTarget" if section == Section::PageList => stack.push(NavigationPoint::default()),
                        "navLabel" => in_label = true,
                        "content" => {
                            if let Some(point) = stack.last_mut() {
                                point.target = Self::content_src(e)?
                                    .map(|src| resolve_relative_href(document_href, &src));
                            }
                        }
                        _ => {}
                    }
                    text_content.clear();
                }
                Event::Text(e) => {
                    text_content.push_str(&e.unescape()?);
                }
                Event::End(ref e) => {
                    let local_name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();

                    match local_name.as_str() {
                        "text" => {
                            let text = text_content.trim().to_string();
                            match section {
                                Section::DocTitle => document.title = Some(text),
                                Section::NavMap | Section::PageList if in_label => {
                                    if let Some(point) = stack.last_mut() {
                                        if point.label.is_empty() {
                                            point.label = text;
                                        }
                                    } else if let Some(table) = table.as_mut() {
                                        table.heading.get_or_insert(text);
                                    }
                                }
                                _ => {}
                            }
                        }
                        "navLabel" => in_label = false,
                        "docTitle" => section = Section::None,
                        "navPoint" | "pageTarget" => {
                            if let Some(point) = stack.pop() {
                                match stack.last_mut() {
                                    Some(parent) => parent.add_child(point),
                                    None => {
                                        if let Some(table) = table.as_mut() {
                                            table.add_point(point);
                                        }
                                    }
                                }
                            }
                        }
                        "navMap" | "pageList" => {
                            if let Some(table) = table.take() {
                                document.tables.push(table);
                            }
                            stack.clear();
                            section = Section::None;
                        }
                        _ => {}
                    }
                    text_content.clear();
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !saw_root {
            return Err(EpubError::NcxParseError("文档中没有ncx元素".to_string()));
        }

        Ok(document)
    }

    /// 解析content元素的src属性
    fn content_src(e: &BytesStart) -> Result<Option<String>> {
        for attr_result in e.attributes() {
            let attr = attr_result.map_err(|err| EpubError::XmlError(quick_xml::Error::InvalidAttr(err)))?;
            if attr.key.local_name().as_ref() == b"src" {
                return Ok(Some(attr.unescape_value()?.into_owned()));
            }
        }
        Ok(None)
    }

    /// 按类型名查找导航表
    pub fn table(&self, title: &str) -> Option<&NavigationTable> {
        self.tables.iter().find(|table| table.title == title)
    }
}
