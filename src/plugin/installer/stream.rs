//! 落盘原语
//!
//! 所有解压/复制路径都经过这里写文件，权限处理集中在 [`install_stream`]。

use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use super::fs::{FileHandle, FileInfo, Fs};
use super::types::{InstallerConfig, SourceError, SourceFormat};
use super::validator::{clean_locator, parent_dir};
use crate::plugin::{PluginError, METADATA_FILE};

/// 创建（或覆盖）目标文件并写入全部字节
pub fn install_stream<R: Read + ?Sized>(
    fs: &dyn Fs,
    dest: &Path,
    src: &mut R,
    mode: u32,
) -> io::Result<()> {
    let mut out = fs.open_file(dest, mode)?;
    io::copy(src, &mut out)?;
    out.flush()
}

/// 目录不存在时递归创建
pub fn ensure_dir(fs: &dyn Fs, path: &Path, mode: u32) -> io::Result<()> {
    if fs.stat(path).is_err() {
        fs.mkdir_all(path, mode)?;
    }
    Ok(())
}

/// 删除并重建目录
pub fn recreate_dir(fs: &dyn Fs, path: &Path, mode: u32) -> io::Result<()> {
    fs.remove_all(path)?;
    fs.mkdir_all(path, mode)
}

/// 获取插件文件信息，要求不是目录
pub fn stat_plugin(fs: &dyn Fs, path: &Path) -> Result<FileInfo, SourceError> {
    let info = fs.stat(path)?;
    if info.is_dir {
        return Err(SourceError::IsDirectory);
    }
    Ok(info)
}

/// 解析压缩包来源，返回压缩包路径和元数据所在目录
///
/// 要求是文件、后缀与 `format` 一致，且同目录下存在元数据文件
pub fn parse_archive(
    fs: &dyn Fs,
    locator: &str,
    format: SourceFormat,
) -> Result<(PathBuf, PathBuf), SourceError> {
    let path = clean_locator(locator);
    let info = stat_plugin(fs, &path)?;

    if SourceFormat::from_extension(Path::new(&info.name)) != Some(format) {
        return Err(SourceError::UnrecognizedFormat(format));
    }

    let metadata_dir = parent_dir(&path);
    let metadata_file = metadata_dir.join(METADATA_FILE);

    if let Err(e) = fs.stat(&metadata_file) {
        return Err(PluginError::MetadataMissing {
            path: metadata_file,
            source: e,
        }
        .into());
    }

    Ok((path, metadata_dir))
}

/// 打开插件文件，同时返回文件信息
pub fn open_plugin_file(fs: &dyn Fs, path: &Path) -> io::Result<(FileInfo, Box<dyn FileHandle>)> {
    let info = fs.stat(path)?;
    let file = fs.open(path)?;
    Ok((info, file))
}

/// 递归复制文件或目录
///
/// 符号链接按原样重建，不跟随。目录先以 `dir_mode` 创建，子项写完后再设为源权限。
pub fn copy_tree(
    fs: &dyn Fs,
    src: &Path,
    dest: &Path,
    config: &InstallerConfig,
) -> io::Result<()> {
    let info = fs.lstat(src)?;
    copy_entry(fs, src, dest, &info, config)
}

fn copy_entry(
    fs: &dyn Fs,
    src: &Path,
    dest: &Path,
    info: &FileInfo,
    config: &InstallerConfig,
) -> io::Result<()> {
    if info.is_symlink {
        let target = fs.read_link(src)?;
        debug!("[PLUGIN_INSTALL] 链接 {} -> {}", dest.display(), target.display());
        return fs.symlink(&target, dest);
    }

    if info.is_dir {
        fs.mkdir_all(dest, config.dir_mode)?;
        for child in fs.read_dir(src)? {
            let name = &child.name;
            copy_entry(fs, &src.join(name), &dest.join(name), &child, config)?;
        }
        fs.set_mode(dest, info.mode)?;
    } else {
        let mut file = fs.open(src)?;
        install_stream(fs, dest, &mut file, info.mode)?;
    }

    if config.preserve_times {
        if let Some(modified) = info.modified {
            fs.set_modified(dest, modified)?;
        }
    }

    Ok(())
}
