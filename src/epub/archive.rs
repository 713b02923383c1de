//! 资源读取模块
//!
//! 包模型只通过`ResourceReader`读取字节流，调用形式固定为`open(基路径 + 相对路径)`。
//! 这里提供三种实现：zip压缩包、解压后的目录、内存中的文件表。

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{Cursor, Read};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use tracing::debug;
use zip::ZipArchive;
use zip::result::ZipError;

use crate::epub::error::{EpubError, Result};

/// EPUB规定的mimetype内容
pub const EPUB_MIMETYPE: &str = "application/epub+zip";

/// 资源读取协作者
pub trait ResourceReader: Send + Sync {
    /// 打开指定路径的资源，路径不存在时返回`ResourceNotFound`
    fn open(&self, path: &str) -> Result<Box<dyn Read + Send>>;

    /// 检查资源是否存在
    fn exists(&self, path: &str) -> bool {
        self.open(path).is_ok()
    }

    /// 读取资源的全部字节
    fn read_to_end(&self, path: &str) -> Result<Vec<u8>> {
        let mut reader = self.open(path)?;
        let mut buffer = Vec::new();
        reader.read_to_end(&mut buffer)?;
        Ok(buffer)
    }

    /// 以UTF-8文本读取资源，去掉开头的BOM
    fn read_to_string(&self, path: &str) -> Result<String> {
        let bytes = self.read_to_end(path)?;
        let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(&bytes);
        String::from_utf8(bytes.to_vec())
            .map_err(|e| EpubError::InvalidEpub(format!("{} 不是有效的UTF-8文本: {}", path, e)))
    }
}

/// 根据路径打开出版物：目录使用`DirectoryReader`，其余按zip压缩包处理
pub fn open_reader<P: AsRef<Path>>(path: P) -> Result<Arc<dyn ResourceReader>> {
    let path = path.as_ref();
    if path.is_dir() {
        Ok(Arc::new(DirectoryReader::new(path)?))
    } else {
        Ok(Arc::new(ZipArchiveReader::from_path(path)?))
    }
}

/// 基于zip压缩包的资源读取器
///
/// 压缩包内容以共享缓冲区保存，每次打开资源时克隆归档句柄，因此读取只需要`&self`。
#[derive(Clone)]
pub struct ZipArchiveReader {
    archive: ZipArchive<Cursor<Arc<[u8]>>>,
}

impl ZipArchiveReader {
    /// 从文件路径创建读取器
    ///
    /// # 参数
    /// * `path` - epub文件的路径
    ///
    /// # 返回值
    /// * `Result<ZipArchiveReader>` - 成功返回读取器，mimetype缺失或错误时返回`InvalidEpub`
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)?;
        Self::from_bytes(bytes)
    }

    /// 从内存中的压缩包字节创建读取器
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        let shared: Arc<[u8]> = Arc::from(bytes);
        let archive = ZipArchive::new(Cursor::new(shared))?;
        let reader = Self { archive };
        reader.validate()?;
        Ok(reader)
    }

    /// 检查mimetype条目是否存在且内容为`application/epub+zip`
    fn validate(&self) -> Result<()> {
        let content = match self.read_to_string("mimetype") {
            Ok(content) => content,
            Err(EpubError::ResourceNotFound(_)) => {
                return Err(EpubError::InvalidEpub("缺少mimetype文件".to_string()));
            }
            Err(e) => return Err(e),
        };

        let found = content.trim();
        if found != EPUB_MIMETYPE {
            return Err(EpubError::InvalidEpub(format!(
                "无效的mimetype: 期望 {}, 找到 {}",
                EPUB_MIMETYPE, found
            )));
        }

        debug!("EPUB mimetype校验通过");
        Ok(())
    }

    /// 列出压缩包中的所有条目
    pub fn list_files(&self) -> Vec<String> {
        self.archive.file_names().map(str::to_string).collect()
    }
}

impl ResourceReader for ZipArchiveReader {
    fn open(&self, path: &str) -> Result<Box<dyn Read + Send>> {
        let mut archive = self.archive.clone();
        let mut entry = match archive.by_name(path) {
            Ok(entry) => entry,
            Err(ZipError::FileNotFound) => return Err(EpubError::ResourceNotFound(path.to_string())),
            Err(e) => return Err(e.into()),
        };

        let mut buffer = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut buffer)?;
        debug!(path, bytes = buffer.len(), "打开压缩包资源");
        Ok(Box::new(Cursor::new(buffer)))
    }

    fn exists(&self, path: &str) -> bool {
        self.archive.index_for_name(path).is_some()
    }
}

/// 基于已解压目录的资源读取器
#[derive(Debug, Clone)]
pub struct DirectoryReader {
    root: PathBuf,
}

impl DirectoryReader {
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(EpubError::ResourceNotFound(root.display().to_string()));
        }
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    /// 把出版物内的路径映射到磁盘文件
    ///
    /// `..`按层级抵消，越过出版物根目录的路径视为不存在。
    fn resolve(&self, path: &str) -> Option<PathBuf> {
        let mut relative = PathBuf::new();
        for component in Path::new(path).components() {
            match component {
                Component::Normal(segment) => relative.push(segment),
                Component::ParentDir => {
                    if !relative.pop() {
                        return None;
                    }
                }
                Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
            }
        }

        let full_path = self.root.join(relative);
        full_path.is_file().then_some(full_path)
    }
}

impl ResourceReader for DirectoryReader {
    fn open(&self, path: &str) -> Result<Box<dyn Read + Send>> {
        let full_path = self
            .resolve(path)
            .ok_or_else(|| EpubError::ResourceNotFound(path.to_string()))?;
        debug!(path, "打开目录资源");
        Ok(Box::new(File::open(full_path)?))
    }

    fn exists(&self, path: &str) -> bool {
        self.resolve(path).is_some()
    }

    fn read_to_end(&self, path: &str) -> Result<Vec<u8>> {
        let full_path = self
            .resolve(path)
            .ok_or_else(|| EpubError::ResourceNotFound(path.to_string()))?;
        Ok(fs::read(full_path)?)
    }
}

/// 内存中的资源表
#[derive(Debug, Clone, Default)]
pub struct MemoryReader {
    files: HashMap<String, Arc<[u8]>>,
}

impl MemoryReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加文件（构建器形式）
    pub fn with_file(mut self, path: &str, content: impl AsRef<[u8]>) -> Self {
        self.insert(path, content);
        self
    }

    /// 添加或替换文件
    pub fn insert(&mut self, path: &str, content: impl AsRef<[u8]>) {
        self.files.insert(path.to_string(), Arc::from(content.as_ref()));
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl ResourceReader for MemoryReader {
    fn open(&self, path: &str) -> Result<Box<dyn Read + Send>> {
        let content = self
            .files
            .get(path)
            .ok_or_else(|| EpubError::ResourceNotFound(path.to_string()))?;
        Ok(Box::new(Cursor::new(Arc::clone(content))))
    }

    fn exists(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }
}
