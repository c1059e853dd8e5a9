//! Common building blocks: settings, text encoding, the version rule and secure buffers.
// 中文: 通用模块，包含配置、编码、版本规则和工具函数。

pub mod config;
pub mod encoding;
pub mod utils;
pub mod version;

pub use self::config::{BackendKind, KeystoreSettings};
pub use self::encoding::Encoding;
pub use self::utils::{DataKey, constant_time_eq};
pub use self::version::{Version, next_version};
