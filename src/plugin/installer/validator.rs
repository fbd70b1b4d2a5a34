//! 路径校验
//!
//! 来源定位符规范化、压缩包条目路径的拼接与越界检查（zip-slip 防护）。
//! 所有比较都按路径段进行，`/dest-evil` 不会被视为在 `/dest` 之内。

use std::path::{Component, Path, PathBuf};

use tracing::warn;

use super::types::SourceError;

/// 本地文件定位符前缀
const FILE_SCHEME: &str = "file://";

/// 去掉 `file://` 前缀并规范化
pub fn clean_locator(locator: &str) -> PathBuf {
    clean_path(Path::new(locator.strip_prefix(FILE_SCHEME).unwrap_or(locator)))
}

/// 词法规范化路径
///
/// 去掉 `.`，折叠 `..`；根目录之上的 `..` 直接丢弃，相对路径开头的 `..` 保留。
/// 不访问文件系统。
pub fn clean_path(path: &Path) -> PathBuf {
    let mut out: Vec<Component<'_>> = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            _ => out.push(component),
        }
    }

    if out.is_empty() {
        return PathBuf::from(".");
    }
    out.iter().collect()
}

/// 所在目录，裸文件名返回 `.`
pub fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// 将条目名按词法拼接到 `base` 下
///
/// 条目中的根目录和盘符会被忽略（绝对路径被重新挂到 `base` 下），`..` 逐段回退。
/// 结果可能越出 `base`，调用方需要再做 [`is_within`] 检查。
pub fn join_entry(base: &Path, name: &str) -> PathBuf {
    let mut joined = clean_path(base);

    for component in Path::new(name).components() {
        match component {
            Component::Normal(part) => joined.push(part),
            Component::ParentDir => {
                joined.pop();
            }
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
        }
    }

    joined
}

/// `path` 是否等于 `base` 或位于其下（按路径段比较）
pub fn is_within(base: &Path, path: &Path) -> bool {
    clean_path(path).starts_with(clean_path(base))
}

/// 计算压缩包条目的落盘路径
///
/// 条目名若以 `<plugin_name>/` 开头则先去掉这一层，兼容带或不带外层目录的压缩包。
pub fn entry_destination(
    dest: &Path,
    plugin_name: &str,
    entry_name: &str,
) -> Result<PathBuf, SourceError> {
    let prefix = format!("{}/", plugin_name);
    let relative = entry_name.strip_prefix(&prefix).unwrap_or(entry_name);
    let path = join_entry(dest, relative);

    if !is_within(dest, &path) {
        warn!(
            "[PATH_GUARD] 拒绝越界条目: {} -> {}",
            entry_name,
            path.display()
        );
        return Err(SourceError::IllegalPath(path));
    }

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_locator() {
        assert_eq!(
            clean_locator("file:///tmp/plugins/./my-plugin.zip"),
            PathBuf::from("/tmp/plugins/my-plugin.zip")
        );
        assert_eq!(clean_locator("/tmp/a/../b/"), PathBuf::from("/tmp/b"));
        assert_eq!(clean_locator("plugins"), PathBuf::from("plugins"));
        assert_eq!(clean_locator("./"), PathBuf::from("."));
    }

    #[test]
    fn test_clean_path() {
        assert_eq!(clean_path(Path::new("/../etc")), PathBuf::from("/etc"));
        assert_eq!(clean_path(Path::new("../a/./b/..")), PathBuf::from("../a"));
        assert_eq!(clean_path(Path::new("a/..")), PathBuf::from("."));
    }

    #[test]
    fn test_parent_dir() {
        assert_eq!(parent_dir(Path::new("/tmp/a.zip")), PathBuf::from("/tmp"));
        assert_eq!(parent_dir(Path::new("a.zip")), PathBuf::from("."));
    }

    #[test]
    fn test_join_entry() {
        let base = Path::new("/dest/my-plugin");

        assert_eq!(join_entry(base, "bin/run"), PathBuf::from("/dest/my-plugin/bin/run"));
        assert_eq!(join_entry(base, "/etc/passwd"), PathBuf::from("/dest/my-plugin/etc/passwd"));
        assert_eq!(join_entry(base, "../evil"), PathBuf::from("/dest/evil"));
        assert_eq!(join_entry(base, "a/../../../x"), PathBuf::from("/x"));
        assert_eq!(join_entry(base, ""), PathBuf::from("/dest/my-plugin"));
    }

    #[test]
    fn test_is_within_segment_boundary() {
        let base = Path::new("/dest/my-plugin");

        assert!(is_within(base, Path::new("/dest/my-plugin")));
        assert!(is_within(base, Path::new("/dest/my-plugin/a/b")));
        assert!(!is_within(base, Path::new("/dest/my-plugin-evil")));
        assert!(!is_within(base, Path::new("/dest/my-plugin-evil/x")));
        assert!(!is_within(base, Path::new("/dest")));
    }

    #[test]
    fn test_entry_destination_strips_plugin_dir() {
        let dest = Path::new("/dest/my-plugin");

        assert_eq!(
            entry_destination(dest, "my-plugin", "my-plugin/my-plugin").unwrap(),
            PathBuf::from("/dest/my-plugin/my-plugin")
        );
        assert_eq!(
            entry_destination(dest, "my-plugin", "my-plugin").unwrap(),
            PathBuf::from("/dest/my-plugin/my-plugin")
        );
        assert_eq!(
            entry_destination(dest, "my-plugin", "my-plugin/").unwrap(),
            PathBuf::from("/dest/my-plugin")
        );
    }

    #[test]
    fn test_entry_destination_rejects_traversal() {
        let dest = Path::new("/dest/my-plugin");

        let err = entry_destination(dest, "my-plugin", "../my-plugin-evil/x").unwrap_err();
        assert!(matches!(
            err,
            SourceError::IllegalPath(ref p) if p == Path::new("/dest/my-plugin-evil/x")
        ));
        assert_eq!(err.to_string(), "/dest/my-plugin-evil/x: illegal file path");

        assert!(entry_destination(dest, "my-plugin", "my-plugin/../../etc/passwd").is_err());
    }
}
