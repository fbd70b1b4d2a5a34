//! zip 来源

use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::fs::Fs;
use super::stream::{ensure_dir, install_stream, open_plugin_file, parse_archive, recreate_dir};
use super::types::{InstallerConfig, SourceError, SourceFormat};
use super::validator::entry_destination;
use crate::plugin::Plugin;

/// 解析 zip 来源，返回压缩包路径和元数据所在目录
pub fn parse(fs: &dyn Fs, locator: &str) -> Result<(PathBuf, PathBuf), SourceError> {
    parse_archive(fs, locator, SourceFormat::Zip)
}

/// 解压到 `<dest>/<name>`
pub fn install(
    fs: &dyn Fs,
    config: &InstallerConfig,
    dest: &Path,
    plugin: &Plugin,
    archive: &Path,
) -> Result<(), SourceError> {
    let (info, file) = open_plugin_file(fs, archive)?;

    if i64::try_from(info.len).is_err() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("invalid zip size: {}", info.len),
        )
        .into());
    }

    let mut zip = ::zip::ZipArchive::new(file)?;

    let dest = dest.join(&plugin.name);
    recreate_dir(fs, &dest, config.dir_mode)?;

    for i in 0..zip.len() {
        let mut entry = zip.by_index(i)?;
        let path = entry_destination(&dest, &plugin.name, entry.name())?;

        if entry.is_dir() {
            ensure_dir(fs, &path, config.dir_mode)?;
            continue;
        }

        let mode = entry
            .unix_mode()
            .map(|mode| mode & 0o7777)
            .unwrap_or(config.default_file_mode);
        if let Some(parent) = path.parent() {
            ensure_dir(fs, parent, config.dir_mode)?;
        }

        debug!("[PLUGIN_INSTALL] 解压 {} ({:o})", path.display(), mode);
        install_stream(fs, &path, &mut entry, mode)?;
    }

    Ok(())
}
