//! # Seal-Keystore: a versioned envelope-encryption keystore
//!
//! `seal-keystore` manages the lifecycle of application data encryption keys (DEKs). It
//! wraps each DEK with an asymmetric key-encryption key (KEK) and stores the wrapped
//! ciphertext in a pluggable backend: process environment variables, files, or a fixed
//! in-memory constant for development and test.
//!
//! 中文: `seal-keystore` 管理应用数据加密密钥 (DEK) 的生命周期：用非对称的密钥加密密钥 (KEK)
//! 包装 DEK，再把包装后的密文存入可插拔的后端（进程环境变量、文件，或开发/测试环境下的内存常量）。
//!
//! ## Core Concepts
//!
//! - **`KeyEncryptionKey`**: an RSA-OAEP key pair used only to wrap and unwrap DEKs.
//! - **`Keystore`**: the storage contract, covering locator naming, reads and writes.
//! - **`ConfigBuilder`**: provisions the per-environment bootstrap config, rotates and reads keys.
//! - **`Version`**: a single-byte version that wraps from 255 to 1; 0 is reserved.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use seal_keystore::{ConfigBuilder, EnvWriteMode, EnvironmentKeystore};
//!
//! fn main() -> seal_keystore::Result<()> {
//!     let builder = ConfigBuilder::new(EnvironmentKeystore::new(EnvWriteMode::Export));
//!     let config = builder.new_config(
//!         "myapp",
//!         ["development", "test", "production"],
//!         "aes-256-cbc",
//!     )?;
//!
//!     // The production KEK is distributed out of band; wrapped DEKs ship as a shell snippet.
//!     println!("{}", config.to_json_pretty()?);
//!     println!("{}", builder.keystore().export_script());
//!
//!     let key = builder.read(&config["production"])?;
//!     assert_eq!(key.len(), 32);
//!     Ok(())
//! }
//! ```

pub mod builder;
pub mod cipher;
pub mod common;
pub mod error;
pub mod kek;
pub mod keystore;
pub mod model;

pub use builder::ConfigBuilder;
pub use common::{DataKey, Encoding, KeystoreSettings, Version, next_version};
pub use error::{Error, Result};
pub use kek::KeyEncryptionKey;
#[cfg(feature = "file-backend")]
pub use keystore::FileKeystore;
pub use keystore::{
    AnyKeystore, EnvWriteMode, EnvironmentKeystore, KeySlot, Keystore, Locator, MemoryKeystore,
};
pub use model::{AppConfig, CipherEntry, EnvironmentConfig};

/// The version of the `seal-keystore` crate.
/// 中文: `seal-keystore` crate 的版本号。
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
