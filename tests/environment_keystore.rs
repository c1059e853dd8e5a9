//!
//! 环境变量密钥库的端到端测试
//!
//! 覆盖 `new_cipher`、`new_config` 与 `read` 的完整流程。
//! 修改进程环境变量的测试各自使用唯一的变量名，并通过 `common::env_lock` 串行执行。
//!

mod common;

use seal_keystore::keystore::memory::dev_config;
use seal_keystore::{
    AppConfig, ConfigBuilder, Encoding, EnvWriteMode, EnvironmentConfig, EnvironmentKeystore,
    Error, KeyEncryptionKey, KeySlot, Keystore, Locator,
};
use std::sync::OnceLock;

const ENVIRONMENTS: [&str; 5] = ["development", "test", "acceptance", "preprod", "production"];

fn export_builder() -> ConfigBuilder<EnvironmentKeystore> {
    ConfigBuilder::new(EnvironmentKeystore::new(EnvWriteMode::Export))
}

fn new_cipher_with_version(version: u8) -> seal_keystore::CipherEntry {
    export_builder()
        .new_cipher(
            "aes-256-cbc",
            common::key_encryption_key(),
            "tester",
            "test",
            version,
        )
        .unwrap()
}

// 生成三把 RSA 密钥代价较高，new_config 的结果在测试间共享
fn provisioned() -> &'static (ConfigBuilder<EnvironmentKeystore>, AppConfig) {
    static PROVISIONED: OnceLock<(ConfigBuilder<EnvironmentKeystore>, AppConfig)> = OnceLock::new();
    PROVISIONED.get_or_init(|| {
        let builder = export_builder();
        let config = builder
            .new_config("tester", ENVIRONMENTS, "aes-128-cbc")
            .unwrap();
        (builder, config)
    })
}

// === new_cipher ===

#[test]
fn new_cipher_increments_the_version() {
    assert_eq!(new_cipher_with_version(10).version.get(), 11);
}

#[test]
fn new_cipher_handles_version_wrap() {
    assert_eq!(new_cipher_with_version(255).version.get(), 1);
}

#[test]
fn new_cipher_starts_at_one_from_zero() {
    assert_eq!(new_cipher_with_version(0).version.get(), 1);
}

#[test]
fn new_cipher_derives_the_env_var_name() {
    assert_eq!(
        new_cipher_with_version(10).locator,
        Locator::EnvVar("TESTER_TEST_V11".to_string())
    );
}

#[test]
fn new_cipher_retains_cipher_name() {
    assert_eq!(new_cipher_with_version(10).cipher_name, "aes-256-cbc");
}

// === new_config ===

#[test]
fn new_config_creates_keys_for_each_environment() {
    let (_, config) = provisioned();
    assert_eq!(config.names(), ENVIRONMENTS.to_vec());
}

#[test]
fn new_config_uses_dev_config_for_development_and_test() {
    let (_, config) = provisioned();
    assert_eq!(&config["test"], dev_config());
    assert_eq!(&config["development"], dev_config());
}

#[test]
fn new_config_gives_each_trusted_environment_a_kek() {
    let (_, config) = provisioned();
    for env in ["acceptance", "preprod", "production"] {
        let pem = config[env].private_rsa_key.as_deref().unwrap_or_default();
        assert!(
            pem.contains("BEGIN RSA PRIVATE KEY"),
            "Environment {} is missing the key encryption key",
            env
        );
    }
}

#[test]
fn new_config_gives_every_environment_one_cipher() {
    let (_, config) = provisioned();
    for env in ENVIRONMENTS {
        assert_eq!(config[env].ciphers.len(), 1, "Environment {}", env);
    }
}

#[test]
fn new_config_stores_an_encrypted_key_for_trusted_environments() {
    let (builder, config) = provisioned();
    for env in ["acceptance", "preprod", "production"] {
        let entry = &config[env].ciphers[0];
        let Locator::EnvVar(name) = &entry.locator else {
            panic!("Environment {} is missing key_env_var: {:?}", env, entry);
        };
        assert_eq!(name, &format!("TESTER_{}_V1", env.to_uppercase()));
        assert_eq!(entry.version.get(), 1);
        assert_eq!(entry.cipher_name, "aes-128-cbc");
        assert!(builder.keystore().read(&entry.locator).is_ok());
    }
    assert_eq!(builder.keystore().exports().len(), 3);
}

#[test]
fn new_config_keys_are_readable_and_independent() {
    let (builder, config) = provisioned();
    let acceptance = builder.read(&config["acceptance"]).unwrap();
    let production = builder.read(&config["production"]).unwrap();
    assert_eq!(acceptance.len(), 16);
    assert_eq!(production.len(), 16);
    assert_ne!(acceptance, production);

    // 每个环境的 KEK 各不相同
    assert_ne!(
        config["acceptance"].private_rsa_key,
        config["production"].private_rsa_key
    );
}

#[test]
fn new_config_serializes_to_the_documented_shape() {
    let (_, config) = provisioned();
    let value: serde_json::Value = serde_json::from_str(&config.to_json_pretty().unwrap()).unwrap();

    let production = &value["production"];
    assert!(production["private_rsa_key"].is_string());
    assert_eq!(production["ciphers"][0]["cipher_name"], "aes-128-cbc");
    assert_eq!(production["ciphers"][0]["version"], 1);
    assert_eq!(production["ciphers"][0]["key_env_var"], "TESTER_PRODUCTION_V1");
    assert!(value["development"].get("private_rsa_key").is_none());

    let back = AppConfig::from_json(&config.to_json_pretty().unwrap()).unwrap();
    assert_eq!(&back, config);
}

// === read ===

#[test]
fn read_returns_the_unwrapped_key() {
    let kek = common::key_encryption_key();
    let encoded = Encoding::Base64.encode(&kek.wrap(b"TEST").unwrap());
    let _env = common::env_lock();
    unsafe { std::env::set_var("TESTER_ENV_VAR", &encoded) };

    let keystore = EnvironmentKeystore::new(EnvWriteMode::Process);
    let slot = KeySlot::new(
        &keystore,
        Locator::EnvVar("TESTER_ENV_VAR".to_string()),
        Some(kek),
        Encoding::Base64,
    );
    assert_eq!(slot.read().unwrap().as_bytes(), b"TEST");
}

#[test]
fn read_missing_variable_is_a_missing_key_error() {
    let _env = common::env_lock();
    let keystore = EnvironmentKeystore::new(EnvWriteMode::Process);
    let slot = KeySlot::new(
        &keystore,
        Locator::EnvVar("TESTER_NEVER_SET_V1".to_string()),
        Some(common::key_encryption_key()),
        Encoding::Base64,
    );
    let err = slot.read().unwrap_err();
    assert!(matches!(err, Error::MissingKey { ref locator } if locator == "TESTER_NEVER_SET_V1"));
}

#[test]
fn read_corrupted_variable_is_a_decode_error() {
    let _env = common::env_lock();
    unsafe { std::env::set_var("TESTER_CORRUPT_V1", "%%% not base64 %%%") };
    let keystore = EnvironmentKeystore::new(EnvWriteMode::Process);
    let slot = KeySlot::new(
        &keystore,
        Locator::EnvVar("TESTER_CORRUPT_V1".to_string()),
        Some(common::key_encryption_key()),
        Encoding::Base64,
    );
    assert!(matches!(slot.read(), Err(Error::Decode(_))));
}

#[test]
fn provisioned_process_keys_are_readable_by_a_separate_builder() {
    let _env = common::env_lock();
    let provisioner = ConfigBuilder::new(EnvironmentKeystore::new(EnvWriteMode::Process));
    let kek = common::key_encryption_key();
    let entry = provisioner
        .new_cipher("aes-256-cbc", kek, "crossproc", "production", 0)
        .unwrap();
    assert!(
        std::env::var("CROSSPROC_PRODUCTION_V1").is_ok(),
        "process mode must set the variable"
    );

    let config = EnvironmentConfig {
        private_rsa_key: Some(kek.to_pem().unwrap()),
        ciphers: vec![entry],
    };

    // 使用方只持有配置；后端由定位符决定
    let consumer = ConfigBuilder::new(seal_keystore::MemoryKeystore);
    let key = consumer.read(&config).unwrap();
    assert_eq!(key.len(), 32);
    assert_eq!(key, provisioner.read(&config).unwrap());
}

#[test]
fn read_with_a_different_kek_fails_with_decrypt_error() {
    let provisioner = export_builder();
    let entry = provisioner
        .new_cipher("aes-256-cbc", common::key_encryption_key(), "wrongkek", "production", 0)
        .unwrap();

    let other = KeyEncryptionKey::generate(2048).unwrap();
    let config = EnvironmentConfig {
        private_rsa_key: Some(other.to_pem().unwrap()),
        ciphers: vec![entry],
    };
    assert!(matches!(provisioner.read(&config), Err(Error::Decrypt)));
}

#[test]
fn export_script_can_be_sourced_by_another_process() {
    let builder = export_builder();
    let entry = builder
        .new_cipher("aes-256-cbc", common::key_encryption_key(), "shell", "production", 6)
        .unwrap();
    let script = builder.keystore().export_script();
    let encoded = builder.keystore().read(&entry.locator).unwrap();

    assert_eq!(script, format!("export SHELL_PRODUCTION_V7=\"{}\"\n", encoded));
    assert!(std::env::var("SHELL_PRODUCTION_V7").is_err());
}

#[test]
fn new_cipher_refuses_names_that_break_the_export_script() {
    let builder = export_builder();
    let result = builder.new_cipher(
        "aes-256-cbc",
        common::key_encryption_key(),
        "my-app",
        "pre prod",
        0,
    );
    assert!(matches!(result, Err(Error::Configuration(_))));
    assert!(builder.keystore().export_script().is_empty());
}

#[cfg(unix)]
#[test]
fn export_script_is_accepted_by_a_posix_shell() {
    let builder = export_builder();
    let entry = builder
        .new_cipher("aes-256-cbc", common::key_encryption_key(), "posix_app", "pre_prod", 0)
        .unwrap();
    let encoded = builder.keystore().read(&entry.locator).unwrap();

    let output = std::process::Command::new("sh")
        .arg("-c")
        .arg(format!(
            "{}printf '%s' \"$POSIX_APP_PRE_PROD_V1\"",
            builder.keystore().export_script()
        ))
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(String::from_utf8(output.stdout).unwrap(), encoded);
}
