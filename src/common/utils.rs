//! Secure byte containers and comparison helpers.
// 中文: 安全字节容器与比较工具。

use std::fmt;
use std::ops::Deref;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Compares two byte slices in constant time.
///
/// 中文: 安全地比较两个字节序列，防止时序攻击。
/// 长度相同时总是比较所有字节，只有所有字节都匹配才返回 true。
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0;
    for (byte_a, byte_b) in a.iter().zip(b.iter()) {
        result |= byte_a ^ byte_b;
    }

    result == 0
}

/// A plaintext data encryption key (DEK).
///
/// The bytes are wiped on drop, `Debug` prints only the length,
/// and equality is checked in constant time.
///
/// 中文: 明文数据密钥 (DEK) 容器。离开作用域时自动擦除内存，`Debug` 输出不包含密钥内容。
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct DataKey {
    bytes: Vec<u8>,
}

impl DataKey {
    /// Wraps raw key bytes.
    /// 中文: 包装原始密钥字节。
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self { bytes: data.into() }
    }

    /// Borrows the key bytes.
    /// 中文: 借用密钥字节。
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl Deref for DataKey {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.bytes
    }
}

impl AsRef<[u8]> for DataKey {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl PartialEq for DataKey {
    fn eq(&self, other: &Self) -> bool {
        constant_time_eq(&self.bytes, &other.bytes)
    }
}

impl Eq for DataKey {}

impl fmt::Debug for DataKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataKey")
            .field("len", &self.bytes.len())
            .finish_non_exhaustive()
    }
}

/// Serializes tests that write process environment variables.
///
/// 中文: 串行化会修改进程环境变量的测试，避免多个线程同时写环境。
#[cfg(test)]
pub(crate) fn env_lock() -> std::sync::MutexGuard<'static, ()> {
    static ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
    ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
