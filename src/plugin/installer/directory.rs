//! 目录来源
//!
//! 来源是已经展开的目录：目录内直接放元数据文件，以及一个与插件同名的条目。

use std::path::{Path, PathBuf};

use tracing::debug;

use super::fs::Fs;
use super::stream::{copy_tree, recreate_dir};
use super::types::{InstallerConfig, SourceError};
use super::validator::clean_locator;
use crate::plugin::{MetadataLoader, Plugin};

/// 解析目录来源，返回规范化后的目录和插件描述
pub fn parse(
    fs: &dyn Fs,
    loader: &dyn MetadataLoader,
    locator: &str,
) -> Result<(PathBuf, Plugin), SourceError> {
    let path = clean_locator(locator);

    if !fs.stat(&path)?.is_dir {
        return Err(SourceError::NotDirectory);
    }

    let plugin = loader.load(fs, &path)?;
    let payload = path.join(&plugin.name);

    if let Err(e) = fs.stat(&payload) {
        return Err(SourceError::PayloadMissing {
            path: payload,
            source: e,
        });
    }

    Ok((path, plugin))
}

/// 将 `<src>/<name>` 复制到 `<dest>/<name>`
///
/// 同名条目是单个文件或符号链接时落到 `<dest>/<name>/<name>`，与压缩包来源的布局一致。
pub fn install(
    fs: &dyn Fs,
    config: &InstallerConfig,
    dest: &Path,
    src: &Path,
    plugin: &Plugin,
) -> Result<(), SourceError> {
    let src = src.join(&plugin.name);
    let mut dest = dest.join(&plugin.name);

    recreate_dir(fs, &dest, config.dir_mode)?;

    if !fs.lstat(&src)?.is_dir {
        dest = dest.join(&plugin.name);
    }

    debug!("[PLUGIN_INSTALL] 复制 {} -> {}", src.display(), dest.display());
    copy_tree(fs, &src, &dest, config)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::installer::fs::{FileInfo, MockFs, OsFs};
    use crate::plugin::{YamlMetadataLoader, METADATA_FILE};
    use std::fs;
    use std::io::{self, Cursor};
    use tempfile::TempDir;

    const METADATA: &str = "name: my-plugin\nenabled: true\n";

    fn stat_dir(mock: &mut MockFs, path: &'static str) {
        mock.expect_stat()
            .withf(move |p: &Path| p == Path::new(path))
            .returning(|_| Ok(FileInfo::dir("random", 0o755)));
    }

    fn open_metadata(mock: &mut MockFs, path: &'static str) {
        mock.expect_open()
            .withf(move |p: &Path| p == Path::new(path))
            .returning(|_| {
                Ok(Box::new(Cursor::new(METADATA.as_bytes().to_vec()))
                    as Box<dyn crate::plugin::installer::fs::FileHandle>)
            });
    }

    #[test]
    fn test_parse_path_does_not_exist() {
        let mut mock = MockFs::new();
        mock.expect_stat()
            .returning(|_| Err(io::Error::from(io::ErrorKind::NotFound)));

        let err = parse(&mock, &YamlMetadataLoader, "/tmp").unwrap_err();

        assert!(err.is_not_found());
    }

    #[test]
    fn test_parse_path_is_not_directory() {
        let mut mock = MockFs::new();
        mock.expect_stat()
            .returning(|_| Ok(FileInfo::file("random", 10, 0o644)));

        let err = parse(&mock, &YamlMetadataLoader, "/tmp/random").unwrap_err();

        assert!(matches!(err, SourceError::NotDirectory));
        assert_eq!(err.to_string(), "plugin is not a directory");
    }

    #[test]
    fn test_parse_metadata_does_not_exist() {
        let mut mock = MockFs::new();
        stat_dir(&mut mock, "/tmp");
        mock.expect_open()
            .returning(|_| Err(io::Error::from(io::ErrorKind::NotFound)));

        let err = parse(&mock, &YamlMetadataLoader, "/tmp").unwrap_err();

        assert!(err.is_metadata_missing());
    }

    #[test]
    fn test_parse_plugin_not_found() {
        let mut mock = MockFs::new();
        stat_dir(&mut mock, "/tmp");
        open_metadata(&mut mock, "/tmp/.plugin.registry.yaml");
        mock.expect_stat()
            .withf(|p: &Path| p == Path::new("/tmp/my-plugin"))
            .returning(|_| Err(io::Error::new(io::ErrorKind::NotFound, "file does not exist")));

        let err = parse(&mock, &YamlMetadataLoader, "file:///tmp/").unwrap_err();

        assert!(matches!(err, SourceError::PayloadMissing { .. }));
        assert_eq!(err.to_string(), "/tmp/my-plugin: file does not exist");
    }

    #[test]
    fn test_parse_success() {
        let mut mock = MockFs::new();
        stat_dir(&mut mock, "/tmp");
        open_metadata(&mut mock, "/tmp/.plugin.registry.yaml");
        mock.expect_stat()
            .withf(|p: &Path| p == Path::new("/tmp/my-plugin"))
            .returning(|_| Ok(FileInfo::file("my-plugin", 12, 0o755)));

        let (path, plugin) = parse(&mock, &YamlMetadataLoader, "/tmp").unwrap();

        assert_eq!(path, PathBuf::from("/tmp"));
        assert_eq!(plugin, Plugin::new("my-plugin").with_enabled(true));
    }

    #[test]
    fn test_install_recreate_fail() {
        let mut mock = MockFs::new();
        mock.expect_remove_all()
            .withf(|p: &Path| p == Path::new("/dest/my-plugin"))
            .times(1)
            .returning(|_| Err(io::Error::new(io::ErrorKind::Other, "remove error")));

        let err = install(
            &mock,
            &InstallerConfig::default(),
            Path::new("/dest"),
            Path::new("/src"),
            &Plugin::new("my-plugin"),
        )
        .unwrap_err();

        assert_eq!(err.to_string(), "remove error");
    }

    #[test]
    fn test_install_nested_directory() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("src");
        fs::create_dir_all(src.join("my-plugin/lib")).unwrap();
        fs::write(src.join(METADATA_FILE), METADATA).unwrap();
        fs::write(src.join("my-plugin/my-plugin"), "#!/bin/bash\n").unwrap();
        fs::write(src.join("my-plugin/lib/helper.sh"), "echo hi\n").unwrap();
        let dest = temp_dir.path().join("dest");

        install(
            &OsFs,
            &InstallerConfig::default(),
            &dest,
            &src,
            &Plugin::new("my-plugin"),
        )
        .unwrap();

        assert_eq!(
            fs::read_to_string(dest.join("my-plugin/my-plugin")).unwrap(),
            "#!/bin/bash\n"
        );
        assert_eq!(
            fs::read_to_string(dest.join("my-plugin/lib/helper.sh")).unwrap(),
            "echo hi\n"
        );
        assert!(!dest.join("my-plugin").join(METADATA_FILE).exists());
    }
}
