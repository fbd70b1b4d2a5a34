//! 插件安装器核心实现
//!
//! 三种来源格式共用同一个 `install` 入口：
//! - 目录：解析时即加载元数据
//! - gzip / zip：解析出压缩包和元数据目录，再加载元数据
//!
//! 元数据加载成功之前不会触碰目标目录。

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use super::fs::{Fs, OsFs};
use super::types::{
    InstallContext, InstallError, InstallStage, InstallerConfig, SourceError, SourceFormat,
};
use super::{directory, gzip, zip_file};
use crate::plugin::{MetadataLoader, Plugin, YamlMetadataLoader};

/// 插件安装器
///
/// 绑定一种来源格式、一个文件系统和一个元数据加载器
#[derive(Clone)]
pub struct Installer {
    format: SourceFormat,
    fs: Arc<dyn Fs>,
    loader: Arc<dyn MetadataLoader>,
    config: InstallerConfig,
}

impl Installer {
    /// 创建新的安装器实例
    pub fn new(format: SourceFormat, fs: Arc<dyn Fs>, loader: Arc<dyn MetadataLoader>) -> Self {
        Self {
            format,
            fs,
            loader,
            config: InstallerConfig::default(),
        }
    }

    /// 使用本地磁盘和 YAML 元数据
    pub fn with_defaults(format: SourceFormat) -> Self {
        Self::new(format, Arc::new(OsFs), Arc::new(YamlMetadataLoader))
    }

    pub fn with_config(mut self, config: InstallerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn format(&self) -> SourceFormat {
        self.format
    }

    pub fn config(&self) -> &InstallerConfig {
        &self.config
    }

    /// 当前格式能否处理该来源
    ///
    /// 与真实安装做同样的解析，丢弃结果和错误
    pub fn probe(&self, locator: &str) -> bool {
        self.format.probe(self.fs.as_ref(), self.loader.as_ref(), locator)
    }

    /// 安装插件
    ///
    /// 成功后插件文件位于 `dest/<name>/…`，返回加载到的描述
    pub fn install(
        &self,
        ctx: &InstallContext,
        dest: impl AsRef<Path>,
        locator: &str,
    ) -> Result<Plugin, InstallError> {
        let dest = dest.as_ref();
        info!(
            "[PLUGIN_INSTALL] 开始安装 ({}): {} -> {}",
            self.format,
            locator,
            dest.display()
        );

        let plugin = match self.format {
            SourceFormat::Directory => self.install_directory(ctx, dest, locator)?,
            SourceFormat::Gzip | SourceFormat::Zip => self.install_archive(ctx, dest, locator)?,
        };

        info!(
            "[PLUGIN_INSTALL] 插件 {} 安装成功: {}",
            plugin.name,
            dest.join(&plugin.name).display()
        );
        Ok(plugin)
    }

    fn install_directory(
        &self,
        ctx: &InstallContext,
        dest: &Path,
        locator: &str,
    ) -> Result<Plugin, InstallError> {
        let fs = self.fs.as_ref();

        let (path, plugin) = directory::parse(fs, self.loader.as_ref(), locator)
            .map_err(|e| ctx.wrap(InstallStage::ParsePath, locator, e))?;

        directory::install(fs, &self.config, dest, &path, &plugin)
            .map_err(|e| ctx.wrap(InstallStage::Install, path.to_string_lossy(), e))?;

        Ok(plugin)
    }

    fn install_archive(
        &self,
        ctx: &InstallContext,
        dest: &Path,
        locator: &str,
    ) -> Result<Plugin, InstallError> {
        let fs = self.fs.as_ref();

        let (path, metadata_dir) = match self.format {
            SourceFormat::Zip => zip_file::parse(fs, locator),
            _ => gzip::parse(fs, locator),
        }
        .map_err(|e| ctx.wrap(InstallStage::ParsePath, locator, e))?;

        let plugin = self
            .loader
            .load(fs, &metadata_dir)
            .map_err(|e| ctx.wrap(InstallStage::ParsePath, locator, e.into()))?;

        let installed = match self.format {
            SourceFormat::Zip => zip_file::install(fs, &self.config, dest, &plugin, &path),
            _ => gzip::install(fs, &self.config, dest, &plugin, &path),
        };
        installed.map_err(|e| ctx.wrap(InstallStage::Install, path.to_string_lossy(), e))?;

        Ok(plugin)
    }
}

impl std::fmt::Debug for Installer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Installer")
            .field("format", &self.format)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SourceFormat {
    /// 探测来源是否属于该格式，不修改目标目录，不报错
    pub fn probe(&self, fs: &dyn Fs, loader: &dyn MetadataLoader, locator: &str) -> bool {
        if locator.is_empty() {
            return false;
        }

        let result: Result<(), SourceError> = match self {
            SourceFormat::Directory => directory::parse(fs, loader, locator).map(|_| ()),
            SourceFormat::Gzip => gzip::parse(fs, locator).map(|_| ()),
            SourceFormat::Zip => zip_file::parse(fs, locator).map(|_| ()),
        };

        if let Err(e) = &result {
            tracing::debug!("[PLUGIN_REGISTRY] {} 不匹配 {}: {}", self.id(), locator, e);
        }
        result.is_ok()
    }
}
