//!
//! # Keystore settings
//!
//! `KeystoreSettings` holds the provisioning parameters: KEK strength, text encoding,
//! storage backend and the deployment environments treated as low trust.
//! Settings load from a JSON file or from `SEAL_KEYSTORE_*` environment variables.
//!
// 中文: 密钥库配置。`KeystoreSettings` 描述了供应（provisioning）过程使用的参数：
// KEK 强度、文本编码、存储后端以及哪些部署环境属于低信任环境。
use crate::common::encoding::Encoding;
use crate::error::{Error, Result};
use crate::keystore::environment::EnvWriteMode;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// The smallest RSA modulus accepted for a KEK.
/// 中文: RSA KEK 允许的最小位数。
pub const MIN_RSA_KEY_BITS: usize = 2048;

const ENV_PREFIX: &str = "SEAL_KEYSTORE_";

/// The backend new keys are written to.
/// 中文: 新密钥写入的存储后端。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Environment,
    File,
}

impl std::str::FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "environment" | "env" => Ok(BackendKind::Environment),
            "file" => Ok(BackendKind::File),
            other => Err(format!("unknown backend '{}'", other)),
        }
    }
}

/// Provisioning parameters.
///
/// 中文: 供应参数，缺省字段在反序列化时取默认值。
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct KeystoreSettings {
    /// RSA modulus size for newly generated KEKs.
    /// 中文: KEK 的 RSA 位数。
    #[serde(default = "default_rsa_key_bits")]
    pub rsa_key_bits: usize,
    /// Text encoding of wrapped keys.
    /// 中文: 包装后密钥的文本编码。
    #[serde(default)]
    pub encoding: Encoding,
    /// Backend used for writes.
    /// 中文: 写入使用的后端。
    #[serde(default)]
    pub backend: BackendKind,
    /// Write mode of the environment backend.
    /// 中文: 环境变量后端的写入方式。
    #[serde(default)]
    pub env_write_mode: EnvWriteMode,
    /// Key directory of the file backend.
    /// 中文: 文件后端的密钥目录。
    #[serde(default = "default_key_dir")]
    pub key_dir: PathBuf,
    /// Environments that receive the shared development config and no KEK.
    /// 中文: 使用内存默认配置、不生成 KEK 的环境。
    #[serde(default = "default_low_trust_environments")]
    pub low_trust_environments: Vec<String>,
}

fn default_rsa_key_bits() -> usize {
    MIN_RSA_KEY_BITS
}

fn default_key_dir() -> PathBuf {
    PathBuf::from("./keys")
}

fn default_low_trust_environments() -> Vec<String> {
    vec!["development".to_string(), "test".to_string()]
}

impl Default for KeystoreSettings {
    fn default() -> Self {
        Self {
            rsa_key_bits: default_rsa_key_bits(),
            encoding: Encoding::default(),
            backend: BackendKind::default(),
            env_write_mode: EnvWriteMode::default(),
            key_dir: default_key_dir(),
            low_trust_environments: default_low_trust_environments(),
        }
    }
}

impl KeystoreSettings {
    /// Loads and validates settings from a JSON file.
    /// 中文: 从 JSON 文件加载并校验。
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let settings: KeystoreSettings = serde_json::from_str(&contents)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Saves settings as pretty-printed JSON.
    /// 中文: 保存为 JSON 文件。
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Starts from the defaults and applies `SEAL_KEYSTORE_*` overrides.
    ///
    /// Values that fail to parse are ignored with a warning.
    ///
    /// 中文: 以默认值为基础，用 `SEAL_KEYSTORE_*` 环境变量覆盖；无法解析的值会被忽略并记录警告。
    pub fn from_env() -> Self {
        let mut settings = Self::default();

        if let Some(value) = env_override("RSA_BITS") {
            match value.parse::<usize>() {
                Ok(bits) => settings.rsa_key_bits = bits,
                Err(_) => warn!(variable = "SEAL_KEYSTORE_RSA_BITS", "ignoring unparseable override"),
            }
        }

        if let Some(value) = env_override("ENCODING") {
            match value.parse::<Encoding>() {
                Ok(encoding) => settings.encoding = encoding,
                Err(e) => warn!(variable = "SEAL_KEYSTORE_ENCODING", error = %e, "ignoring override"),
            }
        }

        if let Some(value) = env_override("BACKEND") {
            match value.parse::<BackendKind>() {
                Ok(backend) => settings.backend = backend,
                Err(e) => warn!(variable = "SEAL_KEYSTORE_BACKEND", error = %e, "ignoring override"),
            }
        }

        if let Some(value) = env_override("ENV_WRITE_MODE") {
            match value.parse::<EnvWriteMode>() {
                Ok(mode) => settings.env_write_mode = mode,
                Err(e) => warn!(variable = "SEAL_KEYSTORE_ENV_WRITE_MODE", error = %e, "ignoring override"),
            }
        }

        if let Some(value) = env_override("KEY_DIR") {
            settings.key_dir = PathBuf::from(value);
        }

        if let Some(value) = env_override("LOW_TRUST_ENVIRONMENTS") {
            settings.low_trust_environments = value
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .collect();
        }

        settings
    }

    /// Rejects KEKs under 2048 bits and a file backend without a key directory.
    /// 中文: 校验 RSA 位数与文件后端目录。
    pub fn validate(&self) -> Result<()> {
        if self.rsa_key_bits < MIN_RSA_KEY_BITS {
            return Err(Error::Configuration(format!(
                "rsa_key_bits must be at least {}, got {}",
                MIN_RSA_KEY_BITS, self.rsa_key_bits
            )));
        }
        if self.backend == BackendKind::File && self.key_dir.as_os_str().is_empty() {
            return Err(Error::Configuration(
                "key_dir must be set for the file backend".to_string(),
            ));
        }
        Ok(())
    }

    /// Whether `environment` uses the shared in-memory config.
    /// 中文: 该环境是否使用共享的内存默认配置。
    pub fn is_low_trust(&self, environment: &str) -> bool {
        self.low_trust_environments
            .iter()
            .any(|name| name == environment)
    }
}

fn env_override(name: &str) -> Option<String> {
    std::env::var(format!("{}{}", ENV_PREFIX, name))
        .ok()
        .filter(|value| !value.trim().is_empty())
}
