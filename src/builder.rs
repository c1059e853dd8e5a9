//! `ConfigBuilder` provisions per-environment bootstrap configs, rotates keys and reads them back.
//!
//! For a trusted environment, provisioning runs:
//!
//! 1. generate a KEK
//! 2. generate a random DEK
//! 3. wrap the DEK with the KEK
//! 4. encode the wrapped bytes
//! 5. write them to a deterministic locator through the backend
//! 6. record a `CipherEntry`
//!
//! Low-trust environments (by default `development` and `test`) reuse the shared in-memory config.
//!
// 中文: `ConfigBuilder` 为每个部署环境生成引导配置，并负责轮换和读取密钥。
// 对受信任的环境，供应流程为：
//!
// 生成 KEK → 生成随机 DEK → 用 KEK 包装 DEK → 编码 → 写入确定性的定位符 → 记录 `CipherEntry`。
// 低信任环境（默认 `development`、`test`）直接复用共享的内存默认配置。

use crate::cipher;
use crate::common::config::KeystoreSettings;
use crate::common::utils::DataKey;
use crate::common::version::{Version, next_version};
use crate::error::{Error, Result};
use crate::kek::KeyEncryptionKey;
use crate::keystore::memory::dev_config;
use crate::keystore::{AnyKeystore, KeySlot, Keystore, Locator};
use crate::model::{AppConfig, CipherEntry, EnvironmentConfig};
use std::collections::HashSet;
use tracing::info;

/// Provisions, rotates and reads keys through one keystore.
///
/// 中文: 通过一个密钥库完成密钥的供应、轮换和读取。
pub struct ConfigBuilder<K: Keystore = AnyKeystore> {
    keystore: K,
    settings: KeystoreSettings,
}

impl ConfigBuilder<AnyKeystore> {
    /// Builds with the backend chosen by `settings`.
    /// 中文: 按供应参数选择后端。
    pub fn from_settings(settings: KeystoreSettings) -> Result<Self> {
        settings.validate()?;
        let keystore = AnyKeystore::from_settings(&settings)?;
        Ok(Self { keystore, settings })
    }
}

impl<K: Keystore> ConfigBuilder<K> {
    /// Builds with default settings.
    /// 中文: 使用默认参数。
    pub fn new(keystore: K) -> Self {
        Self {
            keystore,
            settings: KeystoreSettings::default(),
        }
    }

    /// Builds with explicit, validated settings.
    /// 中文: 使用显式参数，并先校验。
    pub fn with_settings(keystore: K, settings: KeystoreSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self { keystore, settings })
    }

    /// The underlying keystore.
    /// 中文: 底层密钥库。
    pub fn keystore(&self) -> &K {
        &self.keystore
    }

    /// The provisioning settings.
    /// 中文: 供应参数。
    pub fn settings(&self) -> &KeystoreSettings {
        &self.settings
    }

    /// Generates, wraps and persists a new DEK, returning the `CipherEntry` that describes it.
    ///
    /// `version` is the current version (`0` when none exists); the new entry uses
    /// `next_version(version)`. Names the backend cannot use are rejected before any key is
    /// generated, and a failed write produces no entry.
    ///
    /// 中文: 生成、包装并持久化一把新的 DEK。`version` 是当前版本（0 表示尚无版本），
    /// 新记录使用 `next_version(version)`。持久化失败时不会产生任何记录。
    pub fn new_cipher(
        &self,
        cipher_name: &str,
        key_encryption_key: &KeyEncryptionKey,
        app_name: &str,
        environment: &str,
        version: u8,
    ) -> Result<CipherEntry> {
        require_name("app_name", app_name)?;
        require_name("environment", environment)?;
        self.keystore.check_names(app_name, environment)?;

        let data_key = cipher::generate_data_key(cipher_name)?;
        let version = next_version(version);
        let locator = self.keystore.locator_for(app_name, environment, version);

        KeySlot::new(
            &self.keystore,
            locator.clone(),
            Some(key_encryption_key),
            self.settings.encoding,
        )
        .write(&data_key)?;

        info!(
            app = app_name,
            environment,
            cipher = cipher_name,
            %version,
            %locator,
            "provisioned data encryption key"
        );
        Ok(CipherEntry::new(cipher_name, version, locator))
    }

    /// Builds a config for every environment, in request order.
    ///
    /// All names are validated before any key is generated: empty, duplicate or
    /// backend-unusable names fail the whole call.
    ///
    /// 中文: 为每个环境生成配置，保持请求顺序。名称在生成任何密钥之前校验。
    pub fn new_config<I, S>(&self, app_name: &str, environments: I, cipher_name: &str) -> Result<AppConfig>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        require_name("app_name", app_name)?;
        cipher::key_len(cipher_name)?;

        let environments: Vec<S> = environments.into_iter().collect();
        let mut seen = HashSet::new();
        for name in &environments {
            let name = name.as_ref();
            require_name("environment", name)?;
            if !self.settings.is_low_trust(name) {
                self.keystore.check_names(app_name, name)?;
            }
            if !seen.insert(name) {
                return Err(Error::Configuration(format!(
                    "environment '{}' is listed more than once",
                    name
                )));
            }
        }

        let mut config = AppConfig::new();
        for name in &environments {
            let name = name.as_ref();
            let env_config = if self.settings.is_low_trust(name) {
                info!(app = app_name, environment = name, "using shared development config");
                dev_config().clone()
            } else {
                info!(app = app_name, environment = name, "provisioning trusted environment");
                self.provision_environment(app_name, name, cipher_name)?
            };
            config.insert(name, env_config)?;
        }
        Ok(config)
    }

    fn provision_environment(
        &self,
        app_name: &str,
        environment: &str,
        cipher_name: &str,
    ) -> Result<EnvironmentConfig> {
        let kek = KeyEncryptionKey::generate(self.settings.rsa_key_bits)?;
        let entry = self.new_cipher(cipher_name, &kek, app_name, environment, 0)?;
        Ok(EnvironmentConfig {
            private_rsa_key: Some(kek.to_pem()?),
            ciphers: vec![entry],
        })
    }

    /// Rotates: appends a record with the next version and leaves older records untouched.
    ///
    /// Reuses the environment's KEK; `cipher_name` defaults to the newest record's cipher.
    /// A wraparound onto an occupied locator returns [`Error::Conflict`].
    ///
    /// 中文: 轮换：追加一条新版本的记录，旧记录保持不变。复用环境已有的 KEK。
    pub fn rotate(
        &self,
        app_name: &str,
        environment: &str,
        config: &mut EnvironmentConfig,
        cipher_name: Option<&str>,
    ) -> Result<CipherEntry> {
        let kek = config.key_encryption_key()?.ok_or_else(|| {
            Error::Configuration(format!(
                "environment '{}' has no key encryption key and cannot be rotated",
                environment
            ))
        })?;
        let current = config.current_cipher().ok_or_else(|| {
            Error::Configuration(format!("environment '{}' has no ciphers", environment))
        })?;

        let cipher_name = cipher_name.unwrap_or(&current.cipher_name).to_string();
        let current_version = current.version.get();

        let entry = self.new_cipher(&cipher_name, &kek, app_name, environment, current_version)?;
        config.ciphers.push(entry.clone());
        Ok(entry)
    }

    /// Reads the environment's current (newest) DEK.
    /// 中文: 读取环境当前（最新）的 DEK。
    pub fn read(&self, config: &EnvironmentConfig) -> Result<DataKey> {
        let entry = config
            .current_cipher()
            .ok_or_else(|| Error::Configuration("environment config has no ciphers".to_string()))?;
        self.read_entry(config, entry)
    }

    /// Reads a specific DEK version, for data written before a rotation.
    /// 中文: 读取指定版本的 DEK，用于解密轮换前写入的数据。
    pub fn read_version(&self, config: &EnvironmentConfig, version: Version) -> Result<DataKey> {
        let entry = config.cipher(version).ok_or_else(|| {
            Error::Configuration(format!("environment config has no cipher version {}", version))
        })?;
        self.read_entry(config, entry)
    }

    fn read_entry(&self, config: &EnvironmentConfig, entry: &CipherEntry) -> Result<DataKey> {
        let kek = config.key_encryption_key()?;
        // 持有 KEK 的环境只能读取包装后的密钥，不允许退回到明文
        if kek.is_some() && matches!(entry.locator, Locator::Inline(_)) {
            return Err(Error::Configuration(format!(
                "cipher version {} is stored in plain text but the environment has a key encryption key",
                entry.version
            )));
        }
        let encoding = self.settings.encoding;

        if self.keystore.handles(&entry.locator) {
            KeySlot::new(&self.keystore, entry.locator.clone(), kek.as_ref(), encoding).read()
        } else {
            let keystore = AnyKeystore::for_locator(&entry.locator)?;
            KeySlot::new(&keystore, entry.locator.clone(), kek.as_ref(), encoding).read()
        }
    }
}

fn require_name(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::Configuration(format!("{} must not be empty", field)));
    }
    Ok(())
}
