//! 包模型模块
//!
//! `Package`汇总元数据、清单、脊柱和导航表，构建完成后只提供只读查询。
//! CFI的包级定位与纠正在`resolver`子模块中实现。

mod resolver;

use std::fmt;
use std::io::Read;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::epub::archive::ResourceReader;
use crate::epub::container::{Container, PACKAGE_MEDIA_TYPE};
use crate::epub::error::{EpubError, Result};
use crate::epub::iri::Iri;
use crate::epub::nav::{NavigationTable, NavigationTableMap, NcxDocument, parse_navigation_document};
use crate::epub::opf::{
    ManifestItem, ManifestTable, Metadata, MetadataEntry, MetadataNode, MetadataTagConfig, MetadataTagConfigs,
    PackageDocument, SpineItem, SpineList,
};
use crate::epub::vocabulary::{DEFAULT_VOCABULARY_STEM, PropertyVocabularyResolver};

pub use resolver::CfiTarget;

/// 只读的包模型
pub struct Package {
    reader: Arc<dyn ResourceReader>,
    package_path: String,
    base_path: String,
    media_type: String,
    version: String,
    unique_id: Option<String>,
    metadata: Metadata,
    manifest: ManifestTable,
    spine: SpineList,
    navigation: NavigationTableMap,
    vocabulary: PropertyVocabularyResolver,
    spine_cfi_index: u32,
    configs: MetadataTagConfigs,
}

impl Package {
    /// 通过container.xml定位包文档并构建包模型
    ///
    /// # 参数
    /// * `reader` - 出版物的资源读取器
    ///
    /// # 返回值
    /// * `Result<Package>` - 构建后的包模型
    pub fn open(reader: Arc<dyn ResourceReader>) -> Result<Package> {
        Self::open_with_config(reader, MetadataTagConfigs::default_config())
    }

    /// 使用自定义元数据标签配置构建包模型
    pub fn open_with_config(reader: Arc<dyn ResourceReader>, configs: MetadataTagConfigs) -> Result<Package> {
        let container = Container::load(reader.as_ref())?;
        let root = container
            .package_root()
            .cloned()
            .ok_or_else(|| EpubError::ContainerParseError("container.xml中没有rootfile".to_string()))?;

        debug!(path = %root.full_path, "加载包文档");
        let content = reader.read_to_string(&root.full_path)?;
        let document = PackageDocument::parse_xml(&content)?;

        let mut package = Self::new(document, reader, &root.full_path, configs)?;
        if !root.media_type.is_empty() {
            package.media_type = root.media_type;
        }
        Ok(package)
    }

    /// 由已解析的包文档构建包模型
    ///
    /// 前缀声明格式错误、清单ID重复或缺少spine元素时构建失败；
    /// 无法展开的属性记号和无法读取的导航文档只记录警告。
    ///
    /// # 参数
    /// * `document` - 已解析的包文档
    /// * `reader` - 出版物的资源读取器
    /// * `package_path` - 包文档在出版物中的路径
    /// * `configs` - 元数据标签配置
    pub fn new(
        document: PackageDocument,
        reader: Arc<dyn ResourceReader>,
        package_path: &str,
        configs: MetadataTagConfigs,
    ) -> Result<Package> {
        let mut vocabulary = PropertyVocabularyResolver::new();
        if let Some(prefix) = document.prefix.as_deref() {
            vocabulary.install_prefixes_from_attribute_value(prefix)?;
        }

        let metadata = Metadata::from_nodes(&document.metadata, &vocabulary);
        let unique_id = Self::find_unique_id(&document);

        let mut manifest = ManifestTable::new();
        for entry in &document.manifest {
            let mut item = ManifestItem::new(&entry.id, &entry.href, &entry.media_type)
                .with_properties(expand_properties(&vocabulary, entry.properties.as_deref(), &entry.id));
            item.fallback = entry.fallback.clone();
            item.media_overlay = entry.media_overlay.clone();
            manifest.insert(item)?;
        }

        let mut spine = SpineList::new();
        for itemref in &document.spine {
            if !manifest.contains(&itemref.idref) {
                warn!(idref = %itemref.idref, "脊柱项引用的清单项不存在");
            }
            let properties = expand_properties(&vocabulary, itemref.properties.as_deref(), &itemref.idref);
            spine.push(&itemref.idref, itemref.id.clone(), itemref.linear, properties);
        }

        let spine_cfi_index = document
            .spine_cfi_index
            .ok_or_else(|| EpubError::OpfParseError("包文档中没有spine元素".to_string()))?;

        let base_path = match package_path.rfind('/') {
            Some(pos) => package_path[..=pos].to_string(),
            None => String::new(),
        };

        let mut package = Package {
            reader,
            package_path: package_path.to_string(),
            base_path,
            media_type: PACKAGE_MEDIA_TYPE.to_string(),
            version: document.version,
            unique_id,
            metadata,
            manifest,
            spine,
            navigation: NavigationTableMap::new(),
            vocabulary,
            spine_cfi_index,
            configs,
        };
        package.navigation = package.load_navigation(document.spine_toc.as_deref());
        Ok(package)
    }

    /// unique-identifier属性指向的dc:identifier
    fn find_unique_id(document: &PackageDocument) -> Option<String> {
        let target = document.unique_identifier.as_deref()?;
        document.metadata.iter().find_map(|node| match node {
            MetadataNode::DublinCore { element, id, value, .. }
                if element == "identifier" && id.as_deref() == Some(target) =>
            {
                Some(value.clone())
            }
            _ => None,
        })
    }

    /// 读取NCX与EPUB3导航文档；同名导航表以导航文档为准
    fn load_navigation(&self, spine_toc: Option<&str>) -> NavigationTableMap {
        let mut tables = NavigationTableMap::new();

        let ncx_item = spine_toc
            .and_then(|id| self.manifest.get(id))
            .or_else(|| self.manifest.iter().find(|item| item.is_ncx()));
        if let Some(item) = ncx_item {
            match self
                .content_for_manifest_item(item)
                .and_then(|content| NcxDocument::parse_xml(&content, &item.href))
            {
                Ok(ncx) => {
                    for table in ncx.tables {
                        tables.insert(table.title.clone(), table);
                    }
                }
                Err(e) => warn!(href = %item.href, error = %e, "无法读取NCX文件"),
            }
        }

        let nav_property = Iri::from_stem(DEFAULT_VOCABULARY_STEM, "nav");
        if let Some(item) = self.manifest.items_with_properties(&[nav_property]).first() {
            match self
                .content_for_manifest_item(item)
                .and_then(|content| parse_navigation_document(&content, &item.href))
            {
                Ok(nav_tables) => {
                    for table in nav_tables {
                        tables.insert(table.title.clone(), table);
                    }
                }
                Err(e) => warn!(href = %item.href, error = %e, "无法读取导航文档"),
            }
        }

        tables
    }

    /// 包文档的unique-identifier指向的标识符值
    pub fn unique_id(&self) -> Option<&str> {
        self.unique_id.as_deref()
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// 包文档的媒体类型
    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    /// 包文档所在目录（带结尾的`/`），清单路径都相对于此
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    pub fn package_path(&self) -> &str {
        &self.package_path
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn manifest(&self) -> &ManifestTable {
        &self.manifest
    }

    pub fn spine(&self) -> &SpineList {
        &self.spine
    }

    pub fn navigation_tables(&self) -> &NavigationTableMap {
        &self.navigation
    }

    pub fn first_spine_item(&self) -> Option<&SpineItem> {
        self.spine.first()
    }

    /// spine元素在package子元素中的CFI步进值
    pub fn spine_cfi_index(&self) -> u32 {
        self.spine_cfi_index
    }

    pub fn vocabulary(&self) -> &PropertyVocabularyResolver {
        &self.vocabulary
    }

    pub fn metadata_tag_configs(&self) -> &MetadataTagConfigs {
        &self.configs
    }

    /// 按位置获取脊柱项，越界时返回None
    pub fn spine_item_at(&self, index: usize) -> Option<&SpineItem> {
        self.spine.get(index)
    }

    /// 第一个引用指定清单项的脊柱项
    pub fn spine_item_with_idref(&self, idref: &str) -> Option<&SpineItem> {
        self.spine.iter().find(|item| item.idref == idref)
    }

    /// 第一个引用指定清单项的脊柱项位置
    pub fn index_of_spine_item_with_idref(&self, idref: &str) -> Option<usize> {
        self.spine.position_of_idref(idref)
    }

    pub fn manifest_item_with_id(&self, id: &str) -> Option<&ManifestItem> {
        self.manifest.get(id)
    }

    /// 按清单声明顺序返回声明了全部给定属性的清单项
    pub fn manifest_items_with_properties(&self, properties: &[Iri]) -> Vec<&ManifestItem> {
        self.manifest.items_with_properties(properties)
    }

    /// 按类型名（toc、landmarks、page-list等）获取导航表
    pub fn navigation_table(&self, title: &str) -> Option<&NavigationTable> {
        self.navigation.get(title)
    }

    /// 展开属性记号，见[`PropertyVocabularyResolver::make_property_iri`]
    pub fn make_property_iri(&self, reference: &str, prefix: &str) -> Result<Iri> {
        self.vocabulary.make_property_iri(reference, prefix)
    }

    /// 展开属性值，见[`PropertyVocabularyResolver::property_iri_from_attribute_value`]
    pub fn property_iri_from_attribute_value(&self, attr_value: &str) -> Result<Iri> {
        self.vocabulary.property_iri_from_attribute_value(attr_value)
    }

    /// 按配置的属性IRI顺序取第一个存在的元数据值
    pub fn configured_value(&self, config: &MetadataTagConfig) -> Option<&str> {
        self.configured_entry(config).map(|entry| entry.value.as_str())
    }

    fn configured_entry(&self, config: &MetadataTagConfig) -> Option<&MetadataEntry> {
        self.metadata.first_of(&config.tags)
    }

    pub fn title(&self) -> Option<&str> {
        self.configured_value(&self.configs.title)
    }

    pub fn language(&self) -> Option<&str> {
        self.configured_value(&self.configs.language)
    }

    pub fn modified(&self) -> Option<&str> {
        self.configured_value(&self.configs.modified)
    }

    /// 创建者条目，精化信息（角色、排序名等）在`refinements`中
    pub fn creator(&self) -> Option<&MetadataEntry> {
        self.configured_entry(&self.configs.creator)
    }

    /// 封面图片：优先取带cover-image属性的清单项，其次取EPUB2的`<meta name="cover">`
    pub fn cover_image(&self) -> Option<&ManifestItem> {
        let cover_property = Iri::from_stem(DEFAULT_VOCABULARY_STEM, "cover-image");
        self.manifest
            .items_with_properties(&[cover_property])
            .into_iter()
            .next()
            .or_else(|| {
                self.configured_value(&self.configs.cover)
                    .and_then(|id| self.manifest.get(id))
            })
    }

    /// 打开相对于包文档目录的资源
    pub fn reader_for_relative_path(&self, path: &str) -> Result<Box<dyn Read + Send>> {
        let full_path = format!("{}{}", self.base_path, path);
        debug!(path = %full_path, "打开包内资源");
        self.reader.open(&full_path)
    }

    /// 读取清单项引用的文档文本
    pub fn content_for_manifest_item(&self, item: &ManifestItem) -> Result<String> {
        let mut content = String::new();
        self.reader_for_relative_path(&item.href)?
            .read_to_string(&mut content)?;
        Ok(content.strip_prefix('\u{feff}').map(str::to_string).unwrap_or(content))
    }
}

impl fmt::Debug for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Package")
            .field("package_path", &self.package_path)
            .field("version", &self.version)
            .field("unique_id", &self.unique_id)
            .field("manifest_items", &self.manifest.len())
            .field("spine_items", &self.spine.len())
            .field("spine_cfi_index", &self.spine_cfi_index)
            .finish_non_exhaustive()
    }
}

/// 展开空白分隔的属性记号，无法展开的记号记录警告后跳过
fn expand_properties(vocabulary: &PropertyVocabularyResolver, value: Option<&str>, owner: &str) -> Vec<Iri> {
    let Some(value) = value else {
        return Vec::new();
    };
    value
        .split_whitespace()
        .filter_map(|token| match vocabulary.property_iri_from_attribute_value(token) {
            Ok(iri) => Some(iri),
            Err(e) => {
                warn!(owner, token, error = %e, "跳过无法展开的属性");
                None
            }
        })
        .collect()
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::epub::archive::MemoryReader;

    fn package_iri(reference: &str) -> Iri {
        Iri::from_stem(DEFAULT_VOCABULARY_STEM, reference)
    }

    fn opf_with(manifest: &str, extra_package_attributes: &str) -> String {
        format!(
            r#"<package version="3.0" {}><metadata/><manifest>{}</manifest><spine><itemref idref="a"/></spine></package>"#,
            extra_package_attributes, manifest
        )
    }

    fn build(opf: &str) -> Result<Package> {
        let document = PackageDocument::parse_xml(opf)?;
        Package::new(
            document,
            Arc::new(MemoryReader::new()),
            "content.opf",
            MetadataTagConfigs::default_config(),
        )
    }

    #[test]
    fn test_open_sample_package() {
        let package = sample_package();
        assert_eq!(package.version(), "3.0");
        assert_eq!(package.package_path(), "OEBPS/content.opf");
        assert_eq!(package.base_path(), "OEBPS/");
        assert_eq!(package.media_type(), PACKAGE_MEDIA_TYPE);
        assert_eq!(package.unique_id(), Some("urn:uuid:5d6d1c8e-1111-2222-3333-444455556666"));
        assert_eq!(package.spine_cfi_index(), 6);
        assert_eq!(package.manifest().len(), 6);
        assert_eq!(package.spine().len(), 3);
    }

    #[test]
    fn test_convenience_metadata() {
        let package = sample_package();
        assert_eq!(package.title(), Some("测试书籍"));
        assert_eq!(package.language(), Some("zh-CN"));
        assert_eq!(package.modified(), Some("2025-06-05T11:24:01Z"));

        let creator = package.creator().unwrap();
        assert_eq!(creator.value, "张三");
        assert_eq!(creator.refinement(&package_iri("role")).unwrap().value, "aut");

        let ibooks = package.make_property_iri("version", "ibooks").unwrap();
        assert_eq!(package.metadata().get(&ibooks).unwrap().value, "1.0");
        assert_eq!(package.cover_image().unwrap().id, "cover");
    }

    #[test]
    fn test_spine_indexing() {
        let package = sample_package();
        assert_eq!(package.spine_item_at(0), package.first_spine_item());
        assert!(package.spine_item_at(3).is_none());

        let item = package.spine_item_with_idref("c2").unwrap();
        assert_eq!(package.index_of_spine_item_with_idref("c2"), Some(item.index));
        assert!(package.spine_item_with_idref("missing").is_none());
        assert_eq!(package.index_of_spine_item_with_idref("missing"), None);

        let first = package.first_spine_item().unwrap();
        assert_eq!(package.spine().next(first).unwrap().idref, "c2");
        assert_eq!(item.properties, vec![package_iri("page-spread-left")]);
    }

    #[test]
    fn test_manifest_property_filter() {
        let package = sample_package();
        let ids = |properties: &[Iri]| -> Vec<String> {
            package
                .manifest_items_with_properties(properties)
                .iter()
                .map(|item| item.id.clone())
                .collect()
        };
        assert_eq!(ids(&[package_iri("scripted")]), vec!["c2", "c3"]);
        assert_eq!(ids(&[package_iri("scripted"), package_iri("svg")]), vec!["c3"]);

        // 未声明前缀的记号被跳过，其余属性保留
        let c3 = package.manifest_item_with_id("c3").unwrap();
        assert_eq!(c3.properties.len(), 2);
        assert!(package.manifest_item_with_id("nothing").is_none());
    }

    #[test]
    fn test_navigation_tables() {
        let package = sample_package();
        let toc = package.navigation_table("toc").unwrap();
        // 导航文档覆盖NCX的同名表
        assert_eq!(toc.heading.as_deref(), Some("目录"));
        assert_eq!(toc.points[1].target.as_deref(), Some("text/c2.xhtml#start"));

        assert!(package.navigation_table("landmarks").is_some());
        let pages = package.navigation_table("page-list").unwrap();
        assert_eq!(pages.points[0].target.as_deref(), Some("text/c1.xhtml#p1"));
        assert!(package.navigation_table("loi").is_none());
    }

    #[test]
    fn test_read_manifest_content() {
        let package = sample_package();
        let c1 = package.manifest_item_with_id("c1").unwrap();
        assert_eq!(package.content_for_manifest_item(c1).unwrap(), CHAPTER);

        let c3 = package.manifest_item_with_id("c3").unwrap();
        assert!(matches!(
            package.content_for_manifest_item(c3),
            Err(EpubError::ResourceNotFound(path)) if path == "OEBPS/text/c3.xhtml"
        ));
    }

    #[test]
    fn test_duplicate_manifest_id_rejected() {
        let opf = opf_with(
            r#"<item id="a" href="a.xhtml" media-type="application/xhtml+xml"/>
               <item id="a" href="b.xhtml" media-type="application/xhtml+xml"/>"#,
            "",
        );
        assert!(matches!(build(&opf), Err(EpubError::DuplicateManifestId(id)) if id == "a"));
    }

    #[test]
    fn test_malformed_prefix_declaration_aborts() {
        let opf = opf_with(
            r#"<item id="a" href="a.xhtml" media-type="application/xhtml+xml"/>"#,
            r#"prefix="foaf http://xmlns.com/foaf/spec/""#,
        );
        assert!(matches!(build(&opf), Err(EpubError::MalformedValue(_))));
    }

    #[test]
    fn test_missing_spine_rejected() {
        let opf = r#"<package version="3.0"><metadata/><manifest/></package>"#;
        assert!(matches!(build(opf), Err(EpubError::OpfParseError(_))));
    }

    #[test]
    fn test_missing_navigation_is_not_fatal() {
        let opf = opf_with(
            r#"<item id="a" href="a.xhtml" media-type="application/xhtml+xml" properties="nav"/>"#,
            "",
        );
        let package = build(&opf).unwrap();
        assert!(package.navigation_tables().is_empty());
        assert_eq!(package.base_path(), "");
    }
}
