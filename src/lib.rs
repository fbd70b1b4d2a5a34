//! 插件安装器
//!
//! 从目录、gzip/tar.gz 或 zip 来源安装插件到 `<dest>/<name>`。
//!
//! ```no_run
//! use plugin_installer::{Dispatcher, InstallContext};
//!
//! let dispatcher = Dispatcher::with_defaults();
//! let ctx = InstallContext::new();
//! let plugin = dispatcher.install(&ctx, "/opt/plugins", "/tmp/my-plugin.tar.gz")?;
//! println!("installed {}", plugin.name);
//! # Ok::<(), plugin_installer::InstallError>(())
//! ```

pub mod plugin;

pub use plugin::installer::{
    Dispatcher, Fs, InstallContext, InstallError, InstallStage, Installer, InstallerConfig, OsFs,
    Registration, SourceError, SourceFormat,
};
pub use plugin::{MetadataLoader, Plugin, PluginError, YamlMetadataLoader};
