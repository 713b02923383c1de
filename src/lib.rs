pub mod epub;

// === 核心API重新导出 ===

/// 包模型（主要接口）
pub use epub::Package;

/// 错误处理
pub use epub::{CfiError, EpubError, Result};

// === 资源读取 ===

/// 资源读取协作者及其实现
pub use epub::{DirectoryReader, MemoryReader, ResourceReader, ZipArchiveReader, open_reader};

/// 容器组件
pub use epub::{Container, RootFile};

// === 包文档组件 ===

/// OPF组件
pub use epub::{
    Iri,
    ManifestItem,
    ManifestTable,
    Metadata,
    MetadataEntry,
    MetadataTagConfig,
    MetadataTagConfigs,
    PackageDocument,
    PropertyVocabularyResolver,
    SpineItem,
    SpineList,
};

/// 导航组件
pub use epub::{
    NavigationPoint,
    NavigationTable,
    TocStatistics,
    TocTree,
    TocTreeNode,
    TocTreeStyle,
};

/// CFI组件
pub use epub::{Assertion, Cfi, CfiTarget, Component};

// === 库信息 ===

/// 库的版本信息
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// 库的描述
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

// === 便捷函数 ===

/// 快速打开出版物并构建包模型
///
/// 路径为目录时按解压后的出版物读取，否则按zip压缩包读取。
///
/// # 参数
/// * `path` - 出版物路径
///
/// # 返回值
/// * `Result<Package>` - 包模型
///
/// # 示例
///
/// ```no_run
/// let package = spinecfi::open("book.epub")?;
/// if let Some(title) = package.title() {
///     println!("书名: {}", title);
/// }
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn open<P: AsRef<std::path::Path>>(path: P) -> Result<Package> {
    Package::open(open_reader(path)?)
}

/// 解析CFI字符串，见[`epub::cfi::parse`]
pub fn parse_cfi(input: &str) -> std::result::Result<Cfi, CfiError> {
    epub::cfi::parse(input)
}
