//! 来源格式注册表与分发器
//!
//! 按固定顺序探测已注册的格式，选中第一个匹配的安装器。
//! 新增格式只需追加一条 [`Registration`]，调用方不变。

use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use super::fs::{Fs, OsFs};
use super::installer::Installer;
use super::types::{
    InstallContext, InstallError, InstallStage, InstallerConfig, SourceError, SourceFormat,
};
use crate::plugin::{MetadataLoader, Plugin, YamlMetadataLoader};

/// 探测函数：该格式能否处理此来源
pub type ProbeFn = fn(&dyn Fs, &dyn MetadataLoader, &str) -> bool;

/// 工厂函数：构造绑定到给定能力的安装器
pub type FactoryFn = fn(Arc<dyn Fs>, Arc<dyn MetadataLoader>) -> Installer;

/// 一条格式注册
#[derive(Clone, Copy)]
pub struct Registration {
    pub id: &'static str,
    pub probe: ProbeFn,
    pub factory: FactoryFn,
}

impl Registration {
    pub const fn new(id: &'static str, probe: ProbeFn, factory: FactoryFn) -> Self {
        Self { id, probe, factory }
    }

    /// 内置格式，顺序为 fs、gzip、zip
    pub fn builtin() -> Vec<Registration> {
        vec![
            Self::new(
                SourceFormat::Directory.id(),
                |fs, loader, locator| SourceFormat::Directory.probe(fs, loader, locator),
                |fs, loader| Installer::new(SourceFormat::Directory, fs, loader),
            ),
            Self::new(
                SourceFormat::Gzip.id(),
                |fs, loader, locator| SourceFormat::Gzip.probe(fs, loader, locator),
                |fs, loader| Installer::new(SourceFormat::Gzip, fs, loader),
            ),
            Self::new(
                SourceFormat::Zip.id(),
                |fs, loader, locator| SourceFormat::Zip.probe(fs, loader, locator),
                |fs, loader| Installer::new(SourceFormat::Zip, fs, loader),
            ),
        ]
    }
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration").field("id", &self.id).finish()
    }
}

/// 分发器
///
/// 对外暴露与单个安装器相同的 `install` 签名
#[derive(Clone)]
pub struct Dispatcher {
    fs: Arc<dyn Fs>,
    loader: Arc<dyn MetadataLoader>,
    registrations: Vec<Registration>,
    config: InstallerConfig,
}

impl Dispatcher {
    pub fn new(
        fs: Arc<dyn Fs>,
        loader: Arc<dyn MetadataLoader>,
        registrations: Vec<Registration>,
    ) -> Self {
        Self {
            fs,
            loader,
            registrations,
            config: InstallerConfig::default(),
        }
    }

    /// 本地磁盘 + YAML 元数据 + 内置格式
    pub fn with_defaults() -> Self {
        Self::new(
            Arc::new(OsFs),
            Arc::new(YamlMetadataLoader),
            Registration::builtin(),
        )
    }

    pub fn with_config(mut self, config: InstallerConfig) -> Self {
        self.config = config;
        self
    }

    /// 已注册格式，按探测顺序
    pub fn formats(&self) -> Vec<&'static str> {
        self.registrations.iter().map(|r| r.id).collect()
    }

    /// 查找能处理该来源的安装器
    pub fn find(&self, locator: &str) -> Result<Installer, InstallError> {
        self.find_with(&InstallContext::default(), locator)
    }

    /// 查找安装器并安装
    pub fn install(
        &self,
        ctx: &InstallContext,
        dest: impl AsRef<Path>,
        locator: &str,
    ) -> Result<Plugin, InstallError> {
        self.find_with(ctx, locator)?.install(ctx, dest, locator)
    }

    fn find_with(&self, ctx: &InstallContext, locator: &str) -> Result<Installer, InstallError> {
        if !locator.is_empty() {
            for registration in &self.registrations {
                if (registration.probe)(self.fs.as_ref(), self.loader.as_ref(), locator) {
                    debug!("[PLUGIN_REGISTRY] {} 由 {} 处理", locator, registration.id);
                    let installer = (registration.factory)(self.fs.clone(), self.loader.clone());
                    return Ok(installer.with_config(self.config.clone()));
                }
            }
        }

        Err(ctx.wrap(
            InstallStage::ParsePath,
            locator,
            SourceError::UnrecognizedSource(locator.to_string()),
        ))
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("registrations", &self.registrations)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
