//! In-memory keystore for development and test environments only.
//!
//! Every user shares one well-known fixed key. It provides no secrecy.
//!
// 中文: 内存密钥库，仅用于开发和测试环境。所有使用者共享同一把众所周知的固定密钥，不提供任何保密性。

use super::{Keystore, Locator};
use crate::common::version::Version;
use crate::error::{Error, Result};
use crate::model::{CipherEntry, EnvironmentConfig};
use std::sync::LazyLock;
use tracing::debug;

/// The public key shared by development and test.
/// 中文: 开发/测试环境共用的公开密钥。
pub const DEV_KEY: &str = "1234567890ABCDEF";

/// The cipher used by development and test.
/// 中文: 开发/测试环境使用的算法。
pub const DEV_CIPHER_NAME: &str = "aes-128-cbc";

static DEV_CONFIG: LazyLock<EnvironmentConfig> = LazyLock::new(|| EnvironmentConfig {
    private_rsa_key: None,
    ciphers: vec![CipherEntry::new(
        DEV_CIPHER_NAME,
        Version::FIRST,
        Locator::Inline(DEV_KEY.to_string()),
    )],
});

/// The fixed configuration for low-trust environments.
///
/// 中文: 低信任环境的固定配置。
pub fn dev_config() -> &'static EnvironmentConfig {
    &DEV_CONFIG
}

/// Serves the inline development key and ignores writes.
/// 中文: 返回内联的开发密钥，忽略写入。
#[derive(Debug, Default, Clone, Copy)]
pub struct MemoryKeystore;

impl Keystore for MemoryKeystore {
    fn locator_for(&self, _app_name: &str, _environment: &str, _version: Version) -> Locator {
        Locator::Inline(DEV_KEY.to_string())
    }

    /// The configuration is constant, so writes do nothing.
    /// 中文: 配置是常量，写入不做任何事。
    fn write(&self, locator: &Locator, _encoded: &str) -> Result<()> {
        debug!(%locator, "memory keystore ignores writes");
        Ok(())
    }

    fn read(&self, locator: &Locator) -> Result<String> {
        match locator {
            Locator::Inline(key) => Ok(key.clone()),
            other => Err(Error::Configuration(format!(
                "memory keystore cannot handle locator {}",
                other
            ))),
        }
    }

    fn handles(&self, locator: &Locator) -> bool {
        matches!(locator, Locator::Inline(_))
    }

    fn is_wrapped(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dev_config_shape() {
        let config = dev_config();
        assert!(config.private_rsa_key.is_none());
        assert_eq!(config.ciphers.len(), 1);

        let entry = &config.ciphers[0];
        assert_eq!(entry.cipher_name, DEV_CIPHER_NAME);
        assert_eq!(entry.version, Version::FIRST);
        assert_eq!(entry.locator, Locator::Inline(DEV_KEY.to_string()));
    }

    #[test]
    fn test_dev_key_matches_cipher_length() {
        assert_eq!(
            DEV_KEY.len(),
            crate::cipher::key_len(DEV_CIPHER_NAME).unwrap()
        );
    }

    #[test]
    fn test_write_is_noop_and_read_is_constant() {
        let keystore = MemoryKeystore;
        let locator = keystore.locator_for("tester", "development", Version::FIRST);
        keystore.write(&locator, "ignored").unwrap();
        assert_eq!(keystore.read(&locator).unwrap(), DEV_KEY);
        assert!(!keystore.is_wrapped());
    }

    #[test]
    fn test_rejects_env_locator() {
        let keystore = MemoryKeystore;
        assert!(keystore.read(&Locator::EnvVar("X_Y_V1".into())).is_err());
    }
}
