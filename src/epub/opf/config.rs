//! 元数据标签配置模块
//!
//! 定义便捷元数据字段（标题、语言等）依次查询的属性IRI，支持从YAML文件加载。

use crate::epub::error::{EpubError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

const DC: &str = "http://purl.org/dc/elements/1.1/";

/// 单个元数据字段的标签配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataTagConfig {
    /// 属性IRI列表，按顺序查询
    pub tags: Vec<String>,
    /// 可选的描述
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl MetadataTagConfig {
    /// 创建新的标签配置
    pub fn new(tags: Vec<String>) -> Self {
        Self {
            tags,
            description: None,
        }
    }

    /// 创建带描述的标签配置
    pub fn with_description(tags: Vec<String>, description: &str) -> Self {
        Self {
            tags,
            description: Some(description.to_string()),
        }
    }
}

/// 元数据标签配置，定义每个便捷字段对应的属性IRI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataTagConfigs {
    /// 标题标签配置
    pub title: MetadataTagConfig,
    /// 创建者标签配置
    pub creator: MetadataTagConfig,
    /// 语言标签配置
    pub language: MetadataTagConfig,
    /// 标识符标签配置
    pub identifier: MetadataTagConfig,
    /// 出版社标签配置
    pub publisher: MetadataTagConfig,
    /// 出版日期标签配置
    pub date: MetadataTagConfig,
    /// 描述标签配置
    pub description: MetadataTagConfig,
    /// 主题标签配置
    pub subject: MetadataTagConfig,
    /// 版权标签配置
    pub rights: MetadataTagConfig,
    /// 封面标签配置
    pub cover: MetadataTagConfig,
    /// 修改时间标签配置
    pub modified: MetadataTagConfig,
}

impl MetadataTagConfigs {
    /// 从YAML配置文件加载
    ///
    /// # 参数
    /// * `path` - 配置文件路径
    ///
    /// # 返回值
    /// * `Result<Self>` - 读取或反序列化失败时返回`ConfigError`
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| EpubError::ConfigError(format!("无法读取配置文件: {}", e)))?;
        Self::from_yaml(&content)
    }

    /// 从YAML文本解析
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yml::from_str(content)
            .map_err(|e| EpubError::ConfigError(format!("配置文件格式错误: {}", e)))
    }

    /// 序列化为带注释头的YAML文本
    pub fn to_yaml(&self) -> Result<String> {
        let yaml_content = serde_yml::to_string(self)
            .map_err(|e| EpubError::ConfigError(format!("序列化配置失败: {}", e)))?;

        Ok(format!(
            "# 元数据标签配置文件\n# 每个字段按顺序查询所列的属性IRI，取第一个存在的值\n\n{}",
            yaml_content
        ))
    }

    /// 生成默认配置文件
    ///
    /// # 示例
    ///
    /// ```no_run
    /// use spinecfi::MetadataTagConfigs;
    /// MetadataTagConfigs::generate_default_config("metadata.yaml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn generate_default_config<P: AsRef<Path>>(path: P) -> Result<()> {
        let content = Self::default_config().to_yaml()?;
        fs::write(path.as_ref(), content)
            .map_err(|e| EpubError::ConfigError(format!("写入配置文件失败: {}", e)))
    }

    /// 给定路径时从文件加载，否则使用默认配置；不会写入任何文件
    pub fn load_or_default<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default_config()),
        }
    }

    /// 获取默认配置
    pub fn default_config() -> Self {
        let dc = |element: &str| vec![format!("{}{}", DC, element)];

        Self {
            title: MetadataTagConfig::with_description(dc("title"), "书籍标题"),
            creator: MetadataTagConfig::with_description(dc("creator"), "作者/创建者信息"),
            language: MetadataTagConfig::with_description(dc("language"), "书籍语言"),
            identifier: MetadataTagConfig::with_description(dc("identifier"), "书籍标识符（ISBN、UUID等）"),
            publisher: MetadataTagConfig::with_description(dc("publisher"), "出版社信息"),
            date: MetadataTagConfig::with_description(dc("date"), "出版日期"),
            description: MetadataTagConfig::with_description(dc("description"), "书籍描述/简介"),
            subject: MetadataTagConfig::with_description(dc("subject"), "书籍主题/分类"),
            rights: MetadataTagConfig::with_description(dc("rights"), "版权信息"),
            cover: MetadataTagConfig::with_description(
                vec!["http://idpf.org/epub/vocab/package/#cover".to_string()],
                "EPUB2封面meta（值为清单项ID）",
            ),
            modified: MetadataTagConfig::with_description(
                vec![
                    "http://purl.org/dc/terms/modified".to_string(),
                    format!("{}date", DC),
                ],
                "最后修改时间",
            ),
        }
    }
}

impl Default for MetadataTagConfigs {
    fn default() -> Self {
        Self::default_config()
    }
}
