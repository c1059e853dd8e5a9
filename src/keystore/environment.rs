//! Environment-variable keystore.
//!
//! Locators are variable names of the form `{APP}_{ENV}_V{version}`; values are encoded
//! wrapped DEKs. Export mode, the default, collects writes into a sourceable shell snippet.
//!
// 中文: 环境变量密钥库。供应进程与使用密钥的进程通常不是同一次调用，因此默认以导出模式工作：
// 写入被收集起来，最终生成一段可 `source` 的 shell 片段。

use super::{Keystore, Locator};
use crate::common::version::Version;
use crate::error::{Error, Result};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::{Deserialize, Serialize};
use std::env::{self, VarError};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use tracing::{debug, warn};

/// How the environment backend writes keys.
/// 中文: 环境变量后端的写入方式。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvWriteMode {
    /// Set the variable in the current process.
    /// 中文: 直接设置当前进程的环境变量。
    Process,
    /// Collect `export NAME="value"` lines.
    /// 中文: 收集为 `export NAME="value"` 行。
    #[default]
    Export,
}

impl std::str::FromStr for EnvWriteMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "process" => Ok(EnvWriteMode::Process),
            "export" => Ok(EnvWriteMode::Export),
            other => Err(format!("unknown env write mode '{}'", other)),
        }
    }
}

/// Stores wrapped keys in environment variables.
///
/// 中文: 把已包装的密钥存入环境变量。
#[derive(Debug, Default)]
pub struct EnvironmentKeystore {
    mode: EnvWriteMode,
    exports: DashMap<String, String>,
}

impl EnvironmentKeystore {
    /// Creates a keystore with the given write mode.
    /// 中文: 以指定写入方式创建。
    pub fn new(mode: EnvWriteMode) -> Self {
        Self {
            mode,
            exports: DashMap::new(),
        }
    }

    /// The configured write mode.
    /// 中文: 当前写入方式。
    pub fn mode(&self) -> EnvWriteMode {
        self.mode
    }

    /// Collected exports, sorted by variable name.
    /// 中文: 已收集的导出项，按变量名排序。
    pub fn exports(&self) -> Vec<(String, String)> {
        let mut pairs: Vec<(String, String)> = self
            .exports
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        pairs.sort();
        pairs
    }

    /// Renders a script that any POSIX shell can `source`.
    /// 中文: 生成可被 shell `source` 的导出脚本。
    pub fn export_script(&self) -> String {
        self.exports()
            .into_iter()
            .map(|(name, value)| format!("export {}=\"{}\"\n", name, value))
            .collect()
    }

    /// Writes the export script to `path` with owner-only permissions.
    /// 中文: 将导出脚本写入文件，文件仅对所有者可读写。
    pub fn write_export_script<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let persistence = |source| Error::Persistence {
            locator: path.display().to_string(),
            source,
        };

        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options.open(path).map_err(persistence)?;
        file.write_all(self.export_script().as_bytes())
            .map_err(persistence)?;
        file.sync_all().map_err(persistence)?;
        debug!(path = %path.display(), count = self.exports.len(), "wrote export script");
        Ok(())
    }

    fn var_name<'l>(&self, locator: &'l Locator) -> Result<&'l str> {
        match locator {
            Locator::EnvVar(name) if is_shell_identifier(name) => Ok(name),
            Locator::EnvVar(name) => Err(Error::Configuration(format!(
                "'{}' is not a usable environment variable name",
                name
            ))),
            other => Err(Error::Configuration(format!(
                "environment keystore cannot handle locator {}",
                other
            ))),
        }
    }

    fn write_process(&self, name: &str, encoded: &str) -> Result<()> {
        match env::var(name) {
            Ok(existing) if existing == encoded => {
                warn!(locator = name, "environment variable already holds this key");
                Ok(())
            }
            Ok(_) | Err(VarError::NotUnicode(_)) => Err(Error::Conflict {
                locator: name.to_string(),
            }),
            Err(VarError::NotPresent) => {
                // SAFETY: 供应流程是单线程的；名称已校验为只含 ASCII 字母、数字和 '_'。
                unsafe { env::set_var(name, encoded) };
                Ok(())
            }
        }
    }

    fn write_export(&self, name: &str, encoded: &str) -> Result<()> {
        match self.exports.entry(name.to_string()) {
            Entry::Occupied(existing) if existing.get() == encoded => {
                warn!(locator = name, "export already holds this key");
                Ok(())
            }
            Entry::Occupied(_) => Err(Error::Conflict {
                locator: name.to_string(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(encoded.to_string());
                Ok(())
            }
        }
    }
}

impl Keystore for EnvironmentKeystore {
    fn locator_for(&self, app_name: &str, environment: &str, version: Version) -> Locator {
        Locator::EnvVar(format!(
            "{}_{}_V{}",
            app_name.to_uppercase(),
            environment.to_uppercase(),
            version
        ))
    }

    fn write(&self, locator: &Locator, encoded: &str) -> Result<()> {
        let name = self.var_name(locator)?;
        match self.mode {
            EnvWriteMode::Process => self.write_process(name, encoded)?,
            EnvWriteMode::Export => self.write_export(name, encoded)?,
        }
        debug!(locator = name, mode = ?self.mode, "stored wrapped key");
        Ok(())
    }

    fn read(&self, locator: &Locator) -> Result<String> {
        let name = self.var_name(locator)?;
        if let Some(value) = self.exports.get(name) {
            return Ok(value.value().clone());
        }
        match env::var(name) {
            Ok(value) => {
                debug!(locator = name, "read wrapped key from environment");
                Ok(value)
            }
            Err(VarError::NotPresent) => Err(Error::MissingKey {
                locator: name.to_string(),
            }),
            Err(VarError::NotUnicode(_)) => Err(Error::Corrupted {
                locator: name.to_string(),
            }),
        }
    }

    fn handles(&self, locator: &Locator) -> bool {
        matches!(locator, Locator::EnvVar(_))
    }

    fn check_names(&self, app_name: &str, environment: &str) -> Result<()> {
        for (field, value) in [("app_name", app_name), ("environment", environment)] {
            if value.is_empty() || !value.chars().all(is_identifier_char) {
                return Err(Error::Configuration(format!(
                    "{} '{}' may only contain ASCII letters, digits and '_' to be used in an environment variable name",
                    field, value
                )));
            }
        }
        if app_name.starts_with(|c: char| c.is_ascii_digit()) {
            return Err(Error::Configuration(format!(
                "app_name '{}' must not start with a digit to be used in an environment variable name",
                app_name
            )));
        }
        Ok(())
    }
}

fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

// `[A-Za-z_][A-Za-z0-9_]*`，即 shell 可以 export 的变量名
fn is_shell_identifier(name: &str) -> bool {
    match name.chars().next() {
        Some(first) if !first.is_ascii_digit() => name.chars().all(is_identifier_char),
        _ => false,
    }
}
