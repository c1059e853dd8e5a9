//! Symmetric cipher registry: maps a cipher name to its DEK length and generates DEKs.
// 中文: 对称算法注册表。应用数据的加解密本身不在本 crate 内，这里只需要知道每种算法需要多长的密钥。

use crate::common::utils::DataKey;
use crate::error::{Error, Result};
use rand_core::{OsRng, TryRngCore};

// 已知的对称算法及其密钥长度（字节）
const CIPHERS: &[(&str, usize)] = &[
    ("aes-128-cbc", 16),
    ("aes-192-cbc", 24),
    ("aes-256-cbc", 32),
    ("aes-128-gcm", 16),
    ("aes-256-gcm", 32),
    ("chacha20-poly1305", 32),
];

/// Returns the key length for a cipher name, case-insensitively.
/// 中文: 返回算法所需的密钥长度，名称大小写不敏感。
pub fn key_len(cipher_name: &str) -> Result<usize> {
    CIPHERS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(cipher_name))
        .map(|&(_, len)| len)
        .ok_or_else(|| Error::UnsupportedCipher(cipher_name.to_string()))
}

/// Generates a fresh DEK for the cipher from the OS random source.
/// 中文: 使用操作系统随机源为指定算法生成新的 DEK。
pub fn generate_data_key(cipher_name: &str) -> Result<DataKey> {
    let len = key_len(cipher_name)?;
    let mut key_bytes = vec![0u8; len];
    OsRng.try_fill_bytes(&mut key_bytes)?;
    Ok(DataKey::new(key_bytes))
}

/// All supported cipher names.
/// 中文: 所有受支持的算法名。
pub fn supported_ciphers() -> impl Iterator<Item = &'static str> {
    CIPHERS.iter().map(|&(name, _)| name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_lengths() {
        assert_eq!(key_len("aes-128-cbc").unwrap(), 16);
        assert_eq!(key_len("aes-192-cbc").unwrap(), 24);
        assert_eq!(key_len("aes-256-cbc").unwrap(), 32);
        assert_eq!(key_len("AES-256-GCM").unwrap(), 32);
    }

    #[test]
    fn test_unknown_cipher_rejected() {
        assert!(matches!(
            key_len("rot13"),
            Err(Error::UnsupportedCipher(name)) if name == "rot13"
        ));
        assert!(generate_data_key("des-ede3").is_err());
    }

    #[test]
    fn test_generated_keys_are_sized_and_distinct() {
        for name in supported_ciphers() {
            let a = generate_data_key(name).unwrap();
            let b = generate_data_key(name).unwrap();
            assert_eq!(a.len(), key_len(name).unwrap());
            assert_ne!(a, b, "two {} keys collided", name);
        }
    }
}
