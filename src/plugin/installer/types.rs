//! 插件安装器类型定义
//!
//! 定义安装相关的错误类型、阶段、来源格式、调用上下文和配置

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::plugin::PluginError;

/// 来源错误类型
///
/// 解析来源或落盘过程中出现的具体原因
#[derive(Error, Debug)]
pub enum SourceError {
    /// 期望目录，实际不是
    #[error("plugin is not a directory")]
    NotDirectory,

    /// 期望文件，实际是目录
    #[error("plugin is a directory")]
    IsDirectory,

    /// 后缀与当前安装器不匹配
    #[error("plugin is not a {0}")]
    UnrecognizedFormat(SourceFormat),

    /// 元数据缺失或无效
    #[error(transparent)]
    Metadata(#[from] PluginError),

    /// 目录来源中缺少与插件同名的条目
    #[error("{}: {source}", path.display())]
    PayloadMissing {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// 压缩包条目解析后越出目标目录
    #[error("{}: illegal file path", .0.display())]
    IllegalPath(PathBuf),

    /// 压缩包条目名不是合法 UTF-8
    #[error("{0}: invalid file name")]
    InvalidEntryName(String),

    /// 没有任何安装器能处理该来源
    #[error("unrecognized plugin source: {0}")]
    UnrecognizedSource(String),

    /// IO 错误
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// ZIP 读取错误
    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),
}

impl SourceError {
    /// 是否为 "不存在" 类错误
    pub fn is_not_found(&self) -> bool {
        match self {
            SourceError::Io(e) => e.kind() == std::io::ErrorKind::NotFound,
            SourceError::PayloadMissing { .. } => true,
            SourceError::Metadata(e) => e.is_not_found(),
            _ => false,
        }
    }

    /// 是否为元数据缺失
    pub fn is_metadata_missing(&self) -> bool {
        matches!(self, SourceError::Metadata(e) if e.is_not_found())
    }
}

/// 安装阶段
///
/// 区分解析来源失败与落盘失败
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallStage {
    /// 解析来源
    ParsePath,
    /// 写入目标目录
    Install,
}

impl fmt::Display for InstallStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstallStage::ParsePath => write!(f, "could not parse plugin path"),
            InstallStage::Install => write!(f, "could not install plugin"),
        }
    }
}

/// 安装错误
///
/// 渲染为 `"<阶段>: <原因>"`，附带来源路径和调用方上下文字段
#[derive(Error, Debug)]
#[error("{stage}: {source}")]
pub struct InstallError {
    stage: InstallStage,
    path: String,
    fields: Vec<(String, String)>,
    #[source]
    source: SourceError,
}

impl InstallError {
    pub fn new(stage: InstallStage, path: impl Into<String>, source: SourceError) -> Self {
        Self {
            stage,
            path: path.into(),
            fields: Vec::new(),
            source,
        }
    }

    pub fn stage(&self) -> InstallStage {
        self.stage
    }

    /// 底层原因
    pub fn kind(&self) -> &SourceError {
        &self.source
    }

    pub fn into_kind(self) -> SourceError {
        self.source
    }

    /// 出错时处理的来源路径
    pub fn path(&self) -> &str {
        &self.path
    }

    /// 调用方上下文字段
    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    pub fn is_not_found(&self) -> bool {
        self.source.is_not_found()
    }
}

/// 来源格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    /// 已展开的目录
    Directory,
    /// gzip 单文件或 tar.gz
    Gzip,
    /// zip
    Zip,
}

impl SourceFormat {
    /// 注册时使用的标识
    pub fn id(&self) -> &'static str {
        match self {
            SourceFormat::Directory => "fs",
            SourceFormat::Gzip => "gzip",
            SourceFormat::Zip => "zip",
        }
    }

    /// 从文件扩展名检测压缩格式
    pub fn from_extension(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "gz" => Some(SourceFormat::Gzip),
            "zip" => Some(SourceFormat::Zip),
            _ => None,
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceFormat::Directory => write!(f, "directory"),
            SourceFormat::Gzip => write!(f, "gzip"),
            SourceFormat::Zip => write!(f, "zip"),
        }
    }
}

/// 调用上下文
///
/// 只用于给错误附加字段，不会中断正在进行的 IO
#[derive(Debug, Clone, Default)]
pub struct InstallContext {
    fields: Vec<(String, String)>,
}

impl InstallContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加字段
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((key.into(), value.into()));
        self
    }

    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    /// 给来源错误打上阶段标签
    pub(crate) fn wrap(
        &self,
        stage: InstallStage,
        path: impl Into<String>,
        source: SourceError,
    ) -> InstallError {
        let mut err = InstallError::new(stage, path, source);
        err.fields = self.fields.clone();
        tracing::warn!("[PLUGIN_INSTALL] {} (path={})", err, err.path);
        err
    }
}

/// 安装器配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallerConfig {
    /// 重建目标目录及创建条目目录时使用的权限
    pub dir_mode: u32,
    /// zip 条目没有 unix 权限时使用的文件权限
    pub default_file_mode: u32,
    /// 目录来源是否保留修改时间
    pub preserve_times: bool,
}

impl Default for InstallerConfig {
    fn default() -> Self {
        Self {
            dir_mode: 0o755,
            default_file_mode: 0o644,
            preserve_times: true,
        }
    }
}
