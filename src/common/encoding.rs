//! Reversible text encoding for wrapped key bytes.
// 中文: 二进制密文与文本介质之间的可逆编码。
// 环境变量和 JSON 配置都只能承载文本，因此包装后的密钥字节在落盘前必须经过编码。

use crate::error::Result;
use base64::{
    Engine,
    engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD},
};
use serde::{Deserialize, Serialize};

/// The text encoding applied to wrapped keys before they are stored.
/// 中文: 文本编码方式。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    /// Standard Base64 alphabet with padding.
    /// 中文: 标准 Base64 字母表，带填充。
    #[default]
    Base64,
    /// URL-safe alphabet without padding.
    /// 中文: URL 安全字母表，无填充。
    Base64Url,
}

impl Encoding {
    /// Encodes raw bytes as text.
    /// 中文: 将字节编码为文本。
    pub fn encode(&self, bytes: &[u8]) -> String {
        match self {
            Encoding::Base64 => STANDARD.encode(bytes),
            Encoding::Base64Url => URL_SAFE_NO_PAD.encode(bytes),
        }
    }

    /// Decodes text back into bytes, ignoring surrounding whitespace.
    ///
    /// Returns [`Error::Decode`](crate::Error::Decode) when the text is not validly encoded.
    ///
    /// 中文: 解码文本。首尾空白会被忽略，以兼容从文件或 shell 读入时附带的换行。
    pub fn decode(&self, text: &str) -> Result<Vec<u8>> {
        let text = text.trim();
        let bytes = match self {
            Encoding::Base64 => STANDARD.decode(text)?,
            Encoding::Base64Url => URL_SAFE_NO_PAD.decode(text)?,
        };
        Ok(bytes)
    }
}

impl std::str::FromStr for Encoding {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "base64" => Ok(Encoding::Base64),
            "base64url" => Ok(Encoding::Base64Url),
            other => Err(format!("unknown encoding '{}'", other)),
        }
    }
}
