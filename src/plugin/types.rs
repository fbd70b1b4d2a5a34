//! 插件描述类型定义
//!
//! 定义 Plugin 描述、制品映射和元数据错误类型

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// 元数据文件名，位于插件源目录（或压缩包所在目录）内
pub const METADATA_FILE: &str = ".plugin.registry.yaml";

/// 元数据错误类型
#[derive(Error, Debug)]
pub enum PluginError {
    /// 元数据文件不存在
    #[error("plugin has no metadata: {source}")]
    MetadataMissing {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// 元数据文件读取失败
    #[error("could not read plugin metadata {}: {source}", path.display())]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML 解析失败
    #[error("invalid plugin metadata: {0}")]
    ParseError(#[from] serde_yaml::Error),

    /// 插件名称无效
    #[error("invalid plugin name: {0:?}")]
    InvalidName(String),
}

impl PluginError {
    /// 是否由于元数据文件缺失导致
    pub fn is_not_found(&self) -> bool {
        matches!(self, PluginError::MetadataMissing { .. })
    }
}

/// 制品标识，形如 `linux/x86_64`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactIdentifier(pub String);

impl ArtifactIdentifier {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// 当前运行平台的制品标识
    pub fn runtime() -> Self {
        Self(format!(
            "{}/{}",
            std::env::consts::OS,
            std::env::consts::ARCH
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArtifactIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 单个平台的制品描述
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    /// 文件名模板，支持 `${name}` `${version}` `${os}` `${arch}`
    pub file: String,
}

impl Artifact {
    pub fn new(file: impl Into<String>) -> Self {
        Self { file: file.into() }
    }

    /// 展开文件名模板
    pub fn resolve(&self, name: &str, version: &str) -> String {
        self.file
            .replace("${name}", name)
            .replace("${version}", version)
            .replace("${os}", std::env::consts::OS)
            .replace("${arch}", std::env::consts::ARCH)
    }
}

/// 平台到制品的映射
pub type Artifacts = HashMap<ArtifactIdentifier, Artifact>;

/// 插件描述
///
/// 从元数据文件加载，`name` 同时是安装后的顶层目录名
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plugin {
    /// 插件名称
    pub name: String,
    /// 是否启用
    #[serde(default)]
    pub enabled: bool,
    /// 是否隐藏
    #[serde(default)]
    pub hidden: bool,
    /// 各平台制品
    #[serde(default)]
    pub artifacts: Artifacts,
}

impl Plugin {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: false,
            hidden: false,
            artifacts: Artifacts::new(),
        }
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    pub fn with_artifact(mut self, id: ArtifactIdentifier, artifact: Artifact) -> Self {
        self.artifacts.insert(id, artifact);
        self
    }

    /// 当前平台对应的制品
    pub fn runtime_artifact(&self) -> Option<&Artifact> {
        self.artifacts.get(&ArtifactIdentifier::runtime())
    }

    /// 验证描述有效性
    ///
    /// 名称会被用作目标目录下的路径段，不允许包含分隔符或 `..`
    pub fn validate(&self) -> Result<(), PluginError> {
        if !Self::is_valid_name(&self.name) {
            return Err(PluginError::InvalidName(self.name.clone()));
        }
        Ok(())
    }

    /// 验证名称格式（字母、数字、连字符、下划线和点）
    pub fn is_valid_name(name: &str) -> bool {
        !name.is_empty()
            && name != "."
            && name != ".."
            && name
                .chars()
                .all(|c| c.is_alphanumeric() || c == '-' || c == '_' || c == '.')
    }
}
