pub mod archive;
pub mod cfi;
pub mod container;
pub mod error;
pub mod iri;
pub mod nav;
pub mod opf;
pub mod package;
pub mod vocabulary;

// 重新导出错误处理
pub use error::{CfiError, EpubError, Result};

// 重新导出资源读取与容器
pub use archive::{DirectoryReader, MemoryReader, ResourceReader, ZipArchiveReader, open_reader};
pub use container::{Container, RootFile};

// 重新导出包模型
pub use iri::Iri;
pub use package::{CfiTarget, Package};
pub use vocabulary::{PropertyVocabularyMap, PropertyVocabularyResolver};

// 重新导出OPF相关
pub use opf::{
    ManifestItem,
    ManifestTable,
    Metadata,
    MetadataEntry,
    MetadataTagConfig,
    MetadataTagConfigs,
    PackageDocument,
    SpineItem,
    SpineList,
};

// 重新导出导航相关
pub use nav::{
    NavigationPoint,
    NavigationTable,
    NavigationTableMap,
    TocStatistics,
    TocTree,
    TocTreeNode,
    TocTreeStyle,
};

// 重新导出CFI相关
pub use cfi::{Assertion, Cfi, Component};
