//! RSA-OAEP (SHA-256) key wrapping with `KeyEncryptionKey`.
//!
//! A KEK only wraps and unwraps data keys (DEKs); it never encrypts application data.
//! The private key serializes as PKCS#1 PEM (`BEGIN RSA PRIVATE KEY`), the one artifact
//! that must be distributed out of band to production.
//!
// 中文: `KeyEncryptionKey` 提供基于 RSA-OAEP (SHA-256) 的密钥包装功能。
// 私钥以 PKCS#1 PEM 格式序列化，这是唯一需要带外分发到生产环境的产物。

use crate::common::config::MIN_RSA_KEY_BITS;
use crate::common::utils::DataKey;
use crate::error::{Error, Result};
use rsa::pkcs1::{DecodeRsaPrivateKey, EncodeRsaPrivateKey};
use rsa::pkcs8::{DecodePrivateKey, EncodePublicKey, LineEnding};
use rsa::rand_core::OsRng as RsaOsRng;
use rsa::traits::PublicKeyParts;
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;
use std::fmt;
use tracing::info;

// OAEP-SHA256 的填充开销：2 * hLen + 2
const OAEP_OVERHEAD: usize = 2 * 32 + 2;

/// An RSA key-encryption key.
///
/// 中文: RSA 密钥加密密钥。
#[derive(Clone)]
pub struct KeyEncryptionKey {
    private_key: RsaPrivateKey,
    public_key: RsaPublicKey,
}

impl KeyEncryptionKey {
    /// Generates a new KEK of `bits` bits; fewer than 2048 is refused.
    /// 中文: 生成指定位数的新 KEK，位数不得低于 2048。
    pub fn generate(bits: usize) -> Result<Self> {
        if bits < MIN_RSA_KEY_BITS {
            return Err(Error::KeyGeneration(format!(
                "RSA key must be at least {} bits, requested {}",
                MIN_RSA_KEY_BITS, bits
            )));
        }

        let mut rng = RsaOsRng;
        let private_key = RsaPrivateKey::new(&mut rng, bits)
            .map_err(|e| Error::KeyGeneration(format!("RSA key generation failed: {}", e)))?;
        info!(bits, "generated key encryption key");

        Ok(Self::from_private_key(private_key))
    }

    fn from_private_key(private_key: RsaPrivateKey) -> Self {
        let public_key = RsaPublicKey::from(&private_key);
        Self {
            private_key,
            public_key,
        }
    }

    /// Modulus size in bits.
    /// 中文: 模数位数。
    pub fn bits(&self) -> usize {
        self.public_key.size() * 8
    }

    /// The largest plaintext a single wrap accepts.
    /// 中文: 单次包装允许的最大明文长度。
    pub fn max_wrap_len(&self) -> usize {
        self.public_key.size().saturating_sub(OAEP_OVERHEAD)
    }

    /// Wraps plaintext (normally a DEK) with the public key.
    /// 中文: 用公钥包装明文（通常是 DEK）。
    pub fn wrap(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let max = self.max_wrap_len();
        if plaintext.len() > max {
            return Err(Error::Encrypt(format!(
                "payload of {} bytes exceeds the {} byte limit for a {}-bit key",
                plaintext.len(),
                max,
                self.bits()
            )));
        }

        let mut rng = RsaOsRng;
        self.public_key
            .encrypt(&mut rng, Oaep::new::<Sha256>(), plaintext)
            .map_err(|e| Error::Encrypt(format!("RSA-OAEP encryption failed: {}", e)))
    }

    /// Unwraps with the private key.
    ///
    /// Decryption is blinded. Every failure becomes [`Error::Decrypt`] without detail.
    ///
    /// 中文: 用私钥解包。解密使用盲化，任何失败都返回不带细节的 [`Error::Decrypt`]。
    pub fn unwrap(&self, ciphertext: &[u8]) -> Result<DataKey> {
        let mut rng = RsaOsRng;
        self.private_key
            .decrypt_blinded(&mut rng, Oaep::new::<Sha256>(), ciphertext)
            .map(DataKey::new)
            .map_err(|_| Error::Decrypt)
    }

    /// Serializes the private key as PKCS#1 PEM.
    /// 中文: 将私钥导出为 PKCS#1 PEM 文本。
    pub fn to_pem(&self) -> Result<String> {
        let pem = self
            .private_key
            .to_pkcs1_pem(LineEnding::LF)
            .map_err(|e| Error::KeyFormat(format!("failed to encode private key: {}", e)))?;
        Ok(pem.to_string())
    }

    /// Parses a PKCS#1 or PKCS#8 PEM private key.
    /// 中文: 从 PEM 文本导入私钥，接受 PKCS#1 和 PKCS#8 两种格式。
    pub fn from_pem(pem: &str) -> Result<Self> {
        let pem = pem.trim();
        let private_key = RsaPrivateKey::from_pkcs1_pem(pem)
            .or_else(|_| RsaPrivateKey::from_pkcs8_pem(pem))
            .map_err(|_| Error::KeyFormat("not a PEM encoded RSA private key".to_string()))?;

        let kek = Self::from_private_key(private_key);
        if kek.bits() < MIN_RSA_KEY_BITS {
            return Err(Error::KeyFormat(format!(
                "RSA key of {} bits is below the {} bit minimum",
                kek.bits(),
                MIN_RSA_KEY_BITS
            )));
        }
        Ok(kek)
    }

    /// Exports the public key as SPKI PEM for parties that only wrap.
    /// 中文: 导出公钥（SPKI PEM），可单独分发给只需包装密钥的一方。
    pub fn public_key_pem(&self) -> Result<String> {
        self.public_key
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| Error::KeyFormat(format!("failed to encode public key: {}", e)))
    }
}

impl fmt::Debug for KeyEncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyEncryptionKey")
            .field("bits", &self.bits())
            .finish_non_exhaustive()
    }
}
