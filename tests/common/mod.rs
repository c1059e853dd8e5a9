//!
//! 集成测试的通用辅助函数
//!

use seal_keystore::KeyEncryptionKey;
use std::sync::OnceLock;

/// 所有测试共享一把 KEK，避免重复生成 2048 位 RSA 密钥。
pub fn key_encryption_key() -> &'static KeyEncryptionKey {
    static KEK: OnceLock<KeyEncryptionKey> = OnceLock::new();
    KEK.get_or_init(|| KeyEncryptionKey::generate(2048).unwrap())
}

/// 修改进程环境变量的测试通过此锁串行执行。
#[allow(dead_code)]
pub fn env_lock() -> std::sync::MutexGuard<'static, ()> {
    static ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
    ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
