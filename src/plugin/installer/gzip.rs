//! gzip / tar.gz 来源
//!
//! `.tar.gz` 按 tar 展开；其他 `.gz` 解压后的内容就是插件本体，写到 `<dest>/<name>/<name>`。

use std::io::{self, Read};
use std::path::{Path, PathBuf};

use flate2::read::MultiGzDecoder;
use tracing::debug;

use super::fs::Fs;
use super::stream::{ensure_dir, install_stream, open_plugin_file, parse_archive, recreate_dir};
use super::types::{InstallerConfig, SourceError, SourceFormat};
use super::validator::entry_destination;
use crate::plugin::Plugin;

/// tar.gz 后缀
pub const TAR_GZ_SUFFIX: &str = ".tar.gz";

/// 解析 gzip 来源，返回压缩包路径和元数据所在目录
pub fn parse(fs: &dyn Fs, locator: &str) -> Result<(PathBuf, PathBuf), SourceError> {
    parse_archive(fs, locator, SourceFormat::Gzip)
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

    // 多个 gzip 成员首尾相接时按一个流读完
    let mut decoder = MultiGzDecoder::new(file);
    if decoder.header().is_none() {
        return Err(io::Error::new(io::ErrorKind::InvalidData, "invalid gzip header").into());
    }

    let dest = dest.join(&plugin.name);
    recreate_dir(fs, &dest, config.dir_mode)?;

    if archive.to_string_lossy().ends_with(TAR_GZ_SUFFIX) {
        return extract_tar(fs, config, &dest, &plugin.name, decoder);
    }

    install_stream(fs, &dest.join(&plugin.name), &mut decoder, info.mode)?;
    Ok(())
}

/// 展开 tar 流，每个条目都先做越界检查
fn extract_tar<R: Read>(
    fs: &dyn Fs,
    config: &InstallerConfig,
    dest: &Path,
    plugin_name: &str,
    reader: R,
) -> Result<(), SourceError> {
    let mut archive = tar::Archive::new(reader);

    for entry in archive.entries()? {
        let mut entry = entry?;
        let entry_type = entry.header().entry_type();
        let mut name = String::from_utf8(entry.path_bytes().into_owned()).map_err(|e| {
            SourceError::InvalidEntryName(String::from_utf8_lossy(e.as_bytes()).into_owned())
        })?;
        // 目录条目统一带结尾 `/`，外层 `<name>` 目录才能被剥掉
        if entry_type == tar::EntryType::Directory && !name.ends_with('/') {
            name.push('/');
        }
        let path = entry_destination(dest, plugin_name, &name)?;

        match entry_type {
            tar::EntryType::Directory => {
                ensure_dir(fs, &path, config.dir_mode)?;
            }
            tar::EntryType::Regular => {
                let mode = entry.header().mode()? & 0o7777;
                if let Some(parent) = path.parent() {
                    ensure_dir(fs, parent, config.dir_mode)?;
                }
                debug!("[PLUGIN_INSTALL] 解压 {} ({:o})", path.display(), mode);
                install_stream(fs, &path, &mut entry, mode)?;
            }
            other => {
                debug!("[PLUGIN_INSTALL] 跳过 tar 条目 {} ({:?})", name, other);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::installer::fs::{FileHandle, FileInfo, MockFs};
    use crate::plugin::METADATA_FILE;
    use std::io::Cursor;

    fn stat_returns(mock: &mut MockFs, path: &'static str, info: FileInfo) {
        mock.expect_stat()
            .withf(move |p: &Path| p == Path::new(path))
            .returning(move |_| Ok(info.clone()));
    }

    #[test]
    fn test_parse_path_does_not_exist() {
        let mut mock = MockFs::new();
        mock.expect_stat()
            .returning(|_| Err(io::Error::from(io::ErrorKind::NotFound)));

        let err = parse(&mock, "/tmp").unwrap_err();

        assert!(err.is_not_found());
    }

    #[test]
    fn test_parse_path_is_directory() {
        let mut mock = MockFs::new();
        stat_returns(&mut mock, "/tmp", FileInfo::dir("tmp", 0o755));

        let err = parse(&mock, "/tmp").unwrap_err();

        assert_eq!(err.to_string(), "plugin is a directory");
    }

    #[test]
    fn test_parse_file_is_not_gzip() {
        let mut mock = MockFs::new();
        stat_returns(&mut mock, "/tmp/random.zip", FileInfo::file("random.zip", 10, 0o644));

        let err = parse(&mock, "/tmp/random.zip").unwrap_err();

        assert!(matches!(err, SourceError::UnrecognizedFormat(SourceFormat::Gzip)));
        assert_eq!(err.to_string(), "plugin is not a gzip");
    }

    #[test]
    fn test_parse_metadata_does_not_exist() {
        let mut mock = MockFs::new();
        stat_returns(&mut mock, "/tmp/random.tar.gz", FileInfo::file("random.tar.gz", 10, 0o644));
        mock.expect_stat()
            .withf(|p: &Path| p == Path::new("/tmp/.plugin.registry.yaml"))
            .returning(|_| Err(io::Error::new(io::ErrorKind::NotFound, "file does not exist")));

        let err = parse(&mock, "/tmp/random.tar.gz").unwrap_err();

        assert!(err.is_metadata_missing());
        assert_eq!(err.to_string(), "plugin has no metadata: file does not exist");
    }

    #[test]
    fn test_parse_success() {
        let mut mock = MockFs::new();
        stat_returns(&mut mock, "/tmp/random.gz", FileInfo::file("random.gz", 10, 0o644));
        let metadata = FileInfo::file(METADATA_FILE, 10, 0o644);
        stat_returns(&mut mock, "/tmp/.plugin.registry.yaml", metadata);

        let (path, metadata_dir) = parse(&mock, "file:///tmp/random.gz").unwrap();

        assert_eq!(path, PathBuf::from("/tmp/random.gz"));
        assert_eq!(metadata_dir, PathBuf::from("/tmp"));
    }

    #[test]
    fn test_install_invalid_gzip_keeps_destination() {
        let mut mock = MockFs::new();
        stat_returns(&mut mock, "/tmp/random.gz", FileInfo::file("random.gz", 12, 0o644));
        mock.expect_open().returning(|_| {
            Ok(Box::new(Cursor::new(b"not a gzip!!".to_vec())) as Box<dyn FileHandle>)
        });
        mock.expect_remove_all().never();
        mock.expect_mkdir_all().never();

        let err = install(
            &mock,
            &InstallerConfig::default(),
            Path::new("/dest"),
            &Plugin::new("my-plugin"),
            Path::new("/tmp/random.gz"),
        )
        .unwrap_err();

        assert!(matches!(err, SourceError::Io(ref e) if e.kind() == io::ErrorKind::InvalidData));
    }
}
