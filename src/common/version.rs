//! Key version numbers and the rotation rule.
// 中文: 密钥版本号与轮换规则。
// 版本号固定占用一个字节并拼接在定位符末尾，取值 1..=255，0 保留为“未初始化”。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroU8;

/// A single-byte key version in `1..=255`. Zero is reserved and cannot be represented.
///
/// 中文: 单字节密钥版本号，永不为 0。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(NonZeroU8);

impl Version {
    /// The first usable version.
    /// 中文: 第一个可用版本。
    pub const FIRST: Version = Version(NonZeroU8::MIN);

    /// Builds a version from a raw byte; `0` yields `None`.
    /// 中文: 从原始字节构造；0 返回 `None`。
    pub fn new(value: u8) -> Option<Self> {
        NonZeroU8::new(value).map(Version)
    }

    /// Returns the raw byte.
    /// 中文: 返回原始字节。
    pub fn get(self) -> u8 {
        self.0.get()
    }

    /// The version that follows this one; 255 wraps to 1.
    /// 中文: 本版本之后的下一个版本（255 之后回到 1）。
    pub fn next(self) -> Version {
        next_version(self.get())
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Version> for u8 {
    fn from(version: Version) -> Self {
        version.get()
    }
}

/// Computes the version that follows `current`.
///
/// `current` is a raw byte and may be `0`, meaning no version exists yet.
/// The result is `(current + 1) mod 256`, with `0` skipped to `1`.
///
/// 中文: 计算轮换后的版本号。`current` 接受原始字节（包括表示“尚无版本”的 0），
/// 结果按 256 取模后若为 0 则跳到 1。
pub fn next_version(current: u8) -> Version {
    match NonZeroU8::new(current.wrapping_add(1)) {
        Some(v) => Version(v),
        None => Version::FIRST,
    }
}
