//! 插件安装器模块
//!
//! 将插件从来源落到目标目录 `<dest>/<name>`：
//! - 已展开的目录
//! - gzip 单文件或 tar.gz
//! - zip
//!
//! [`Dispatcher`] 按注册顺序探测来源格式，选中第一个匹配的 [`Installer`]。
//! 压缩包条目在写入前都会经过越界检查。

mod directory;
mod fs;
mod gzip;
mod installer;
mod registry;
mod stream;
mod types;
mod validator;
mod zip_file;

pub use fs::{FileHandle, FileInfo, Fs, OsFs};
pub use installer::Installer;
pub use registry::{Dispatcher, FactoryFn, ProbeFn, Registration};
pub use types::{
    InstallContext, InstallError, InstallStage, InstallerConfig, SourceError, SourceFormat,
};
pub use validator::{clean_path, is_within};
