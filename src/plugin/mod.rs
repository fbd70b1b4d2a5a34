//! 插件模块
//!
//! - 插件描述与元数据文件格式
//! - 元数据加载
//! - 插件安装

pub mod installer;
mod loader;
mod types;

pub use loader::{MetadataLoader, YamlMetadataLoader};
pub use types::{Artifact, ArtifactIdentifier, Artifacts, Plugin, PluginError, METADATA_FILE};
