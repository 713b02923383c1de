//! OPF（Open Packaging Format）包文档模块
//!
//! 此模块提供包文档的解析，以及由其构建的元数据、清单、脊柱模型。

mod config;
mod document;
mod manifest;
mod metadata;
mod spine;

pub use config::{MetadataTagConfig, MetadataTagConfigs};
pub use document::{ItemRefEntry, ManifestEntry, MetaNode, MetadataNode, PackageDocument};
pub use manifest::{ManifestItem, ManifestTable};
pub use metadata::{DC_ELEMENTS_STEM, Metadata, MetadataEntry};
pub use spine::{SpineItem, SpineList};
