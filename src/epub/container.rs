use crate::epub::archive::ResourceReader;
use crate::epub::error::{EpubError, Result};
use quick_xml::events::Event;
use quick_xml::reader::Reader;

/// container.xml在压缩包中的固定位置
pub const CONTAINER_PATH: &str = "META-INF/container.xml";

/// 包文档的媒体类型
pub const PACKAGE_MEDIA_TYPE: &str = "application/oebps-package+xml";

/// container.xml中的rootfile条目
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootFile {
    pub full_path: String,
    pub media_type: String,
}

impl RootFile {
    /// 包文档所在目录，带结尾的`/`；位于根目录时为空字符串
    pub fn base_path(&self) -> String {
        match self.full_path.rfind('/') {
            Some(pos) => self.full_path[..=pos].to_string(),
            None => String::new(),
        }
    }
}

/// container.xml的解析结果
#[derive(Debug, Clone)]
pub struct Container {
    pub rootfiles: Vec<RootFile>,
}

impl Container {
    /// 通过资源读取器加载并解析container.xml
    pub fn load(reader: &dyn ResourceReader) -> Result<Container> {
        let content = reader.read_to_string(CONTAINER_PATH)?;
        Self::parse_xml(&content)
    }

    /// 解析container.xml内容
    ///
    /// # 参数
    /// * `xml_content` - container.xml的文件内容
    ///
    /// # 返回值
    /// * `Result<Container>` - 至少包含一个rootfile，否则返回`ContainerParseError`
    pub fn parse_xml(xml_content: &str) -> Result<Container> {
        let mut reader = Reader::from_str(xml_content);
        reader.config_mut().trim_text(true);

        let mut rootfiles = Vec::new();
        let mut in_rootfiles = false;

        loop {
            match reader.read_event()? {
                Event::Start(ref e) | Event::Empty(ref e) => match e.local_name().as_ref() {
                    b"rootfiles" => in_rootfiles = true,
                    b"rootfile" if in_rootfiles => {
                        let mut full_path = String::new();
                        let mut media_type = String::new();

                        for attr_result in e.attributes() {
                            let attr = attr_result
                                .map_err(|err| EpubError::XmlError(quick_xml::Error::InvalidAttr(err)))?;
                            match attr.key.local_name().as_ref() {
                                b"full-path" => full_path = attr.unescape_value()?.into_owned(),
                                b"media-type" => media_type = attr.unescape_value()?.into_owned(),
                                _ => {}
                            }
                        }

                        if !full_path.is_empty() {
                            rootfiles.push(RootFile {
                                full_path,
                                media_type,
                            });
                        }
                    }
                    _ => {}
                },
                Event::End(ref e) if e.local_name().as_ref() == b"rootfiles" => {
                    in_rootfiles = false;
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if rootfiles.is_empty() {
            return Err(EpubError::ContainerParseError(
                "没有找到任何rootfile条目".to_string(),
            ));
        }

        Ok(Container { rootfiles })
    }

    /// 选择包文档：第一个包文档类型的rootfile，找不到时退回第一个rootfile
    pub fn package_root(&self) -> Option<&RootFile> {
        self.rootfiles
            .iter()
            .find(|rootfile| rootfile.media_type == PACKAGE_MEDIA_TYPE)
            .or_else(|| self.rootfiles.first())
    }
}
