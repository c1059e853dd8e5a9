//! Defines the custom error type for the `seal-keystore` crate.
// 中文: 定义 `seal-keystore` crate 的自定义错误类型。
// 错误信息中只允许出现定位符（环境变量名、文件路径），绝不包含密钥字节、编码后的密文或 PEM 文本。

use std::io;
use thiserror::Error;

/// A `Result` alias using the crate's [`Error`].
/// 中文: crate 内统一使用的 `Result` 别名。
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for the `seal-keystore` crate.
///
/// Messages name locators (variable names, file paths) and never carry key material.
///
/// 中文: `seal-keystore` 的主错误类型。错误信息只包含定位符，从不包含密钥材料。
#[derive(Debug, Error)]
pub enum Error {
    /// Generating an RSA key pair or a random data key failed.
    /// 中文: RSA 密钥对或随机数据密钥生成失败。
    #[error("key generation failed: {0}")]
    KeyGeneration(String),

    /// Wrapping a data key with the KEK public key failed.
    /// 中文: 使用 KEK 公钥包装数据密钥失败。
    #[error("key wrapping failed: {0}")]
    Encrypt(String),

    /// Unwrapping failed. Padding errors, key mismatch and truncation all map here without detail.
    /// 中文: 解包失败。所有原因（填充错误、密钥不匹配、截断）都归为同一个无细节的变体。
    #[error("key unwrapping failed")]
    Decrypt,

    /// Stored text is not validly encoded.
    /// 中文: 存储介质中的文本不是合法编码。
    #[error("stored key material is not validly encoded: {0}")]
    Decode(#[from] base64::DecodeError),

    /// A storage medium holds bytes that are not text at all.
    /// 中文: 存储介质中的内容不是合法文本，视为损坏。
    #[error("stored key material at {locator} is not valid text")]
    Corrupted { locator: String },

    /// Nothing is stored at the locator.
    /// 中文: 定位符下没有密钥。
    #[error("no key stored at {locator}")]
    MissingKey { locator: String },

    /// The key file exists but cannot be read.
    /// 中文: 密钥文件存在但无权读取。
    #[error("permission denied reading key at {locator}")]
    Permission { locator: String },

    /// Writing to the backend failed; no cipher entry is produced.
    /// 中文: 写入后端失败，不会产生任何记录。
    #[error("failed to persist key at {locator}")]
    Persistence {
        locator: String,
        #[source]
        source: io::Error,
    },

    /// The locator already holds different key material and is never overwritten.
    /// 中文: 定位符下已存在不同的密钥材料，拒绝覆盖。
    #[error("{locator} already holds different key material")]
    Conflict { locator: String },

    /// A KEK PEM could not be parsed or is too weak.
    /// 中文: KEK 的 PEM 无法解析或强度不足。
    #[error("invalid key encryption key: {0}")]
    KeyFormat(String),

    /// The cipher name is not in the registry.
    /// 中文: 算法名不在注册表中。
    #[error("unsupported cipher: {0}")]
    UnsupportedCipher(String),

    /// Invalid settings, names or configuration shape.
    /// 中文: 参数、名称或配置结构不合法。
    #[error("configuration error: {0}")]
    Configuration(String),

    /// An I/O error outside the key-specific cases.
    /// 中文: 其他 I/O 错误。
    #[error("I/O error")]
    Io(#[from] io::Error),

    /// JSON (de)serialization failed.
    /// 中文: JSON 序列化或反序列化失败。
    #[error("serialization error (JSON)")]
    Json(#[from] serde_json::Error),
}

impl From<rand_core::OsError> for Error {
    fn from(err: rand_core::OsError) -> Self {
        Error::KeyGeneration(format!("OS random source unavailable: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decrypt_error_has_no_detail() {
        assert_eq!(Error::Decrypt.to_string(), "key unwrapping failed");
    }

    #[test]
    fn test_missing_key_names_locator() {
        let err = Error::MissingKey {
            locator: "TESTER_PRODUCTION_V3".to_string(),
        };
        assert_eq!(err.to_string(), "no key stored at TESTER_PRODUCTION_V3");
    }

    #[test]
    fn test_corrupted_names_locator_only() {
        let err = Error::Corrupted {
            locator: "/keys/tester_production_v1.encrypted_key".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "stored key material at /keys/tester_production_v1.encrypted_key is not valid text"
        );
    }
}
