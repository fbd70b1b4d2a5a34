//! 插件元数据加载器

use std::io::{self, Read};
use std::path::Path;

use super::installer::Fs;
use super::types::{Plugin, PluginError, METADATA_FILE};

/// 元数据加载能力
///
/// 从 `dir` 目录下的固定元数据文件生成插件描述
pub trait MetadataLoader: Send + Sync {
    fn load(&self, fs: &dyn Fs, dir: &Path) -> Result<Plugin, PluginError>;
}

/// 读取 `.plugin.registry.yaml` 的默认加载器
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlMetadataLoader;

impl MetadataLoader for YamlMetadataLoader {
    fn load(&self, fs: &dyn Fs, dir: &Path) -> Result<Plugin, PluginError> {
        let path = dir.join(METADATA_FILE);

        let mut file = fs.open(&path).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                PluginError::MetadataMissing {
                    path: path.clone(),
                    source: e,
                }
            } else {
                PluginError::ReadError {
                    path: path.clone(),
                    source: e,
                }
            }
        })?;

        let mut content = String::new();
        file.read_to_string(&mut content).map_err(|e| PluginError::ReadError {
            path: path.clone(),
            source: e,
        })?;

        let plugin: Plugin = serde_yaml::from_str(&content)?;
        plugin.validate()?;

        tracing::debug!("[PLUGIN_LOADER] 加载元数据: {} -> {}", path.display(), plugin.name);
        Ok(plugin)
    }
}
