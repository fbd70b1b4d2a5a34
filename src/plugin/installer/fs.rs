//! 文件系统能力
//!
//! 安装器对存储的所有访问都经过 [`Fs`]，便于替换为内存实现或 mock。
//! "不存在" 统一以 `io::ErrorKind::NotFound` 表示。

use std::fs;
use std::io::{self, Read, Seek, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// 可读、可定位的文件句柄
pub trait FileHandle: Read + Seek + Send {}

impl<T: Read + Seek + Send> FileHandle for T {}

/// 文件信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    /// 文件名（路径最后一段）
    pub name: String,
    /// 是否为目录
    pub is_dir: bool,
    /// 是否为符号链接（仅 `lstat` 和 `read_dir` 会置位）
    pub is_symlink: bool,
    /// 文件大小
    pub len: u64,
    /// 权限位
    pub mode: u32,
    /// 修改时间
    pub modified: Option<SystemTime>,
}

impl FileInfo {
    /// 普通文件
    pub fn file(name: impl Into<String>, len: u64, mode: u32) -> Self {
        Self {
            name: name.into(),
            is_dir: false,
            is_symlink: false,
            len,
            mode,
            modified: None,
        }
    }

    /// 目录
    pub fn dir(name: impl Into<String>, mode: u32) -> Self {
        Self {
            name: name.into(),
            is_dir: true,
            is_symlink: false,
            len: 0,
            mode,
            modified: None,
        }
    }

    /// 符号链接
    pub fn symlink(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_dir: false,
            is_symlink: true,
            len: 0,
            mode: 0o777,
            modified: None,
        }
    }

    fn from_metadata(path: &Path, metadata: &fs::Metadata) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());

        Self {
            name,
            is_dir: metadata.is_dir(),
            is_symlink: metadata.file_type().is_symlink(),
            len: metadata.len(),
            mode: mode_of(metadata),
            modified: metadata.modified().ok(),
        }
    }
}

#[cfg(unix)]
fn mode_of(metadata: &fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn mode_of(metadata: &fs::Metadata) -> u32 {
    match (metadata.is_dir(), metadata.permissions().readonly()) {
        (true, _) => 0o755,
        (false, true) => 0o444,
        (false, false) => 0o644,
    }
}

/// 文件系统能力
///
/// 实现需要能被多个互不相关的安装调用并发使用，安装器本身不做同步。
#[cfg_attr(test, mockall::automock)]
pub trait Fs: Send + Sync {
    /// 获取文件信息（跟随符号链接）
    fn stat(&self, path: &Path) -> io::Result<FileInfo>;

    /// 获取文件信息（不跟随符号链接）
    fn lstat(&self, path: &Path) -> io::Result<FileInfo>;

    /// 以只读方式打开文件
    fn open(&self, path: &Path) -> io::Result<Box<dyn FileHandle>>;

    /// 创建或截断文件，权限位精确设为 `mode`
    fn open_file(&self, path: &Path, mode: u32) -> io::Result<Box<dyn Write + Send>>;

    /// 递归创建目录
    fn mkdir_all(&self, path: &Path, mode: u32) -> io::Result<()>;

    /// 递归删除，路径不存在时不报错
    fn remove_all(&self, path: &Path) -> io::Result<()>;

    /// 列出目录下的条目，按名称排序，不跟随符号链接
    fn read_dir(&self, path: &Path) -> io::Result<Vec<FileInfo>>;

    /// 读取符号链接指向的路径
    fn read_link(&self, path: &Path) -> io::Result<PathBuf>;

    /// 在 `link` 处创建指向 `target` 的符号链接
    fn symlink(&self, target: &Path, link: &Path) -> io::Result<()>;

    /// 设置权限位
    fn set_mode(&self, path: &Path, mode: u32) -> io::Result<()>;

    /// 设置修改时间
    fn set_modified(&self, path: &Path, modified: SystemTime) -> io::Result<()>;
}

/// 基于本地磁盘的文件系统
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFs;

impl OsFs {
    pub fn new() -> Self {
        Self
    }
}

impl Fs for OsFs {
    fn stat(&self, path: &Path) -> io::Result<FileInfo> {
        let metadata = fs::metadata(path)?;
        Ok(FileInfo::from_metadata(path, &metadata))
    }

    fn lstat(&self, path: &Path) -> io::Result<FileInfo> {
        let metadata = fs::symlink_metadata(path)?;
        Ok(FileInfo::from_metadata(path, &metadata))
    }

    fn open(&self, path: &Path) -> io::Result<Box<dyn FileHandle>> {
        Ok(Box::new(fs::File::open(path)?))
    }

    fn open_file(&self, path: &Path, mode: u32) -> io::Result<Box<dyn Write + Send>> {
        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);

        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(mode);
        }

        let file = options.open(path)?;

        // umask 会影响新建文件的权限，这里显式设置一次
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(fs::Permissions::from_mode(mode))?;
        }
        #[cfg(not(unix))]
        let _ = mode;

        Ok(Box::new(file))
    }

    fn mkdir_all(&self, path: &Path, mode: u32) -> io::Result<()> {
        let mut builder = fs::DirBuilder::new();
        builder.recursive(true);

        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(mode);
        }
        #[cfg(not(unix))]
        let _ = mode;

        builder.create(path)
    }

    fn remove_all(&self, path: &Path) -> io::Result<()> {
        match fs::symlink_metadata(path) {
            Ok(metadata) if metadata.is_dir() => fs::remove_dir_all(path),
            Ok(_) => fs::remove_file(path),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<FileInfo>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(path)? {
            let entry = entry?;
            let entry_path = entry.path();
            let metadata = fs::symlink_metadata(&entry_path)?;
            entries.push(FileInfo::from_metadata(&entry_path, &metadata));
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn read_link(&self, path: &Path) -> io::Result<PathBuf> {
        fs::read_link(path)
    }

    #[cfg(unix)]
    fn symlink(&self, target: &Path, link: &Path) -> io::Result<()> {
        std::os::unix::fs::symlink(target, link)
    }

    #[cfg(not(unix))]
    fn symlink(&self, _target: &Path, _link: &Path) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "symlinks are not supported on this platform",
        ))
    }

    #[cfg(unix)]
    fn set_mode(&self, path: &Path, mode: u32) -> io::Result<()> {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(mode))
    }

    #[cfg(not(unix))]
    fn set_mode(&self, path: &Path, mode: u32) -> io::Result<()> {
        let mut permissions = fs::metadata(path)?.permissions();
        permissions.set_readonly(mode & 0o200 == 0);
        fs::set_permissions(path, permissions)
    }

    fn set_modified(&self, path: &Path, modified: SystemTime) -> io::Result<()> {
        filetime::set_file_mtime(path, filetime::FileTime::from_system_time(modified))
    }
}
