//! Traits for abstracting key storage backends.
//!
//! Each backend stores one encoded, wrapped DEK per locator and reads it back.
//! The three implementations share a contract but have very different trust models:
//!
//! - [`EnvironmentKeystore`]: process environment variables, or a sourceable shell snippet
//! - [`FileKeystore`]: owner-only files
//! - [`MemoryKeystore`]: a fixed plaintext key for development and test, with no secrecy
//!
// 中文: 用于抽象密钥存储后端的 Trait。每个后端负责把一份编码后的、已包装的 DEK
// 存入自己的介质，并能按定位符取回。

pub mod environment;
#[cfg(feature = "file-backend")]
pub mod file;
pub mod memory;

pub use self::environment::{EnvWriteMode, EnvironmentKeystore};
#[cfg(feature = "file-backend")]
pub use self::file::FileKeystore;
pub use self::memory::MemoryKeystore;

use crate::common::config::{BackendKind, KeystoreSettings};
use crate::common::encoding::Encoding;
use crate::common::utils::DataKey;
use crate::common::version::Version;
use crate::error::{Error, Result};
use crate::kek::KeyEncryptionKey;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Where a key lives inside a backend.
///
/// Serializes as one of the fields `key_env_var`, `key_filename` or `key`.
///
/// 中文: 密钥在后端中的位置。序列化时按后端展开为不同字段名。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Locator {
    #[serde(rename = "key_env_var")]
    EnvVar(String),
    #[serde(rename = "key_filename")]
    File(PathBuf),
    /// The public key carried directly by the in-memory development config.
    /// 中文: 内存默认配置直接携带的公开密钥。
    #[serde(rename = "key")]
    Inline(String),
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::EnvVar(name) => write!(f, "{}", name),
            Locator::File(path) => write!(f, "{}", path.display()),
            Locator::Inline(_) => write!(f, "<memory>"),
        }
    }
}

/// Defines the universal interface for key storage backends.
///
/// 中文: 定义了密钥存储后端的通用接口。
pub trait Keystore {
    /// Derives the deterministic locator for `(app, environment, version)`.
    /// 中文: 为 (应用, 环境, 版本) 推导确定性的定位符。
    fn locator_for(&self, app_name: &str, environment: &str, version: Version) -> Locator;

    /// Writes encoded ciphertext to a locator.
    ///
    /// Returns [`Error::Conflict`] if the locator already holds a different value.
    /// Writing the same value again is a no-op.
    ///
    /// 中文: 将编码后的密文写入定位符。若定位符已持有不同的值则报错；写入相同的值是幂等的。
    fn write(&self, locator: &Locator, encoded: &str) -> Result<()>;

    /// Reads the encoded text at a locator, or [`Error::MissingKey`] if absent.
    /// 中文: 读取定位符下的编码文本；不存在时返回 [`Error::MissingKey`]。
    fn read(&self, locator: &Locator) -> Result<String>;

    /// Whether this backend can resolve the locator.
    /// 中文: 该后端能否解析此类定位符。
    fn handles(&self, locator: &Locator) -> bool;

    /// Checks that the names can form a usable locator for this backend.
    ///
    /// Called before any key is generated. The default accepts every name.
    ///
    /// 中文: 在生成任何密钥之前，检查应用名和环境名能否构成本后端可用的定位符。
    fn check_names(&self, _app_name: &str, _environment: &str) -> Result<()> {
        Ok(())
    }

    /// Returns `true` if the backend stores KEK-wrapped ciphertext.
    /// 中文: 后端保存的是否为 KEK 包装后的密文。
    fn is_wrapped(&self) -> bool {
        true
    }
}

/// The backend chosen at construction time. This is the single dispatch point.
///
/// 中文: 在构造时选定的后端，这是唯一的分派点。
#[derive(Debug)]
pub enum AnyKeystore {
    Environment(EnvironmentKeystore),
    #[cfg(feature = "file-backend")]
    File(FileKeystore),
    Memory(MemoryKeystore),
}

impl AnyKeystore {
    /// Selects the write backend from provisioning settings.
    /// 中文: 按供应参数选择写入后端。
    pub fn from_settings(settings: &KeystoreSettings) -> Result<Self> {
        match settings.backend {
            BackendKind::Environment => Ok(AnyKeystore::Environment(EnvironmentKeystore::new(
                settings.env_write_mode,
            ))),
            #[cfg(feature = "file-backend")]
            BackendKind::File => Ok(AnyKeystore::File(FileKeystore::new(&settings.key_dir)?)),
            #[cfg(not(feature = "file-backend"))]
            BackendKind::File => Err(Error::Configuration(
                "file backend support is not compiled in".to_string(),
            )),
        }
    }

    /// Selects a backend able to read the given locator.
    /// 中文: 按定位符类型选择能读取它的后端。
    pub fn for_locator(locator: &Locator) -> Result<Self> {
        match locator {
            Locator::EnvVar(_) => Ok(AnyKeystore::Environment(EnvironmentKeystore::new(
                EnvWriteMode::Process,
            ))),
            #[cfg(feature = "file-backend")]
            Locator::File(path) => {
                let dir = path
                    .parent()
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("."));
                Ok(AnyKeystore::File(FileKeystore::open(dir)))
            }
            #[cfg(not(feature = "file-backend"))]
            Locator::File(_) => Err(Error::Configuration(
                "file backend support is not compiled in".to_string(),
            )),
            Locator::Inline(_) => Ok(AnyKeystore::Memory(MemoryKeystore)),
        }
    }
}

impl Keystore for AnyKeystore {
    fn locator_for(&self, app_name: &str, environment: &str, version: Version) -> Locator {
        match self {
            AnyKeystore::Environment(k) => k.locator_for(app_name, environment, version),
            #[cfg(feature = "file-backend")]
            AnyKeystore::File(k) => k.locator_for(app_name, environment, version),
            AnyKeystore::Memory(k) => k.locator_for(app_name, environment, version),
        }
    }

    fn write(&self, locator: &Locator, encoded: &str) -> Result<()> {
        match self {
            AnyKeystore::Environment(k) => k.write(locator, encoded),
            #[cfg(feature = "file-backend")]
            AnyKeystore::File(k) => k.write(locator, encoded),
            AnyKeystore::Memory(k) => k.write(locator, encoded),
        }
    }

    fn read(&self, locator: &Locator) -> Result<String> {
        match self {
            AnyKeystore::Environment(k) => k.read(locator),
            #[cfg(feature = "file-backend")]
            AnyKeystore::File(k) => k.read(locator),
            AnyKeystore::Memory(k) => k.read(locator),
        }
    }

    fn handles(&self, locator: &Locator) -> bool {
        match self {
            AnyKeystore::Environment(k) => k.handles(locator),
            #[cfg(feature = "file-backend")]
            AnyKeystore::File(k) => k.handles(locator),
            AnyKeystore::Memory(k) => k.handles(locator),
        }
    }

    fn check_names(&self, app_name: &str, environment: &str) -> Result<()> {
        match self {
            AnyKeystore::Environment(k) => k.check_names(app_name, environment),
            #[cfg(feature = "file-backend")]
            AnyKeystore::File(k) => k.check_names(app_name, environment),
            AnyKeystore::Memory(k) => k.check_names(app_name, environment),
        }
    }

    fn is_wrapped(&self) -> bool {
        match self {
            AnyKeystore::Environment(k) => k.is_wrapped(),
            #[cfg(feature = "file-backend")]
            AnyKeystore::File(k) => k.is_wrapped(),
            AnyKeystore::Memory(k) => k.is_wrapped(),
        }
    }
}

/// One wrapped DEK in a backend: keystore, locator, KEK and encoding bound together.
///
/// 中文: 一份存储在后端中的已包装 DEK：后端 + 定位符 + KEK + 编码。
pub struct KeySlot<'a, K: Keystore + ?Sized> {
    keystore: &'a K,
    locator: Locator,
    kek: Option<&'a KeyEncryptionKey>,
    encoding: Encoding,
}

impl<'a, K: Keystore + ?Sized> KeySlot<'a, K> {
    /// Binds a slot. `kek` may be `None` only for backends that store plaintext.
    /// 中文: 绑定一个密钥槽；只有明文后端可以不提供 KEK。
    pub fn new(
        keystore: &'a K,
        locator: Locator,
        kek: Option<&'a KeyEncryptionKey>,
        encoding: Encoding,
    ) -> Self {
        Self {
            keystore,
            locator,
            kek,
            encoding,
        }
    }

    /// The slot's locator.
    /// 中文: 密钥槽的定位符。
    pub fn locator(&self) -> &Locator {
        &self.locator
    }

    /// Wraps, encodes and persists the DEK.
    /// 中文: 包装、编码并持久化 DEK。
    pub fn write(&self, key: &DataKey) -> Result<()> {
        if !self.keystore.is_wrapped() {
            return self.keystore.write(&self.locator, "");
        }
        let kek = self.require_kek()?;
        let wrapped = kek.wrap(key.as_bytes())?;
        let encoded = self.encoding.encode(&wrapped);
        self.keystore.write(&self.locator, &encoded)
    }

    /// Reads, decodes and unwraps, returning the plaintext DEK.
    /// 中文: 读取、解码并解包，返回明文 DEK。
    pub fn read(&self) -> Result<DataKey> {
        let stored = self.keystore.read(&self.locator)?;
        if !self.keystore.is_wrapped() {
            return Ok(DataKey::new(stored.into_bytes()));
        }
        let kek = self.require_kek()?;
        let wrapped = self.encoding.decode(&stored)?;
        kek.unwrap(&wrapped)
    }

    fn require_kek(&self) -> Result<&'a KeyEncryptionKey> {
        self.kek.ok_or_else(|| {
            Error::Configuration(format!(
                "a key encryption key is required to access {}",
                self.locator
            ))
        })
    }
}
