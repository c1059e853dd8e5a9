//! File-backed keystore.
//!
//! Each wrapped DEK is stored as `{key_dir}/{app}_{env}_v{version}.encrypted_key`,
//! holding the same encoded text the environment backend uses.
//!
// 中文: 文件密钥库。文件先写入同目录的临时文件（仅所有者可读写），
// 再以不覆盖的方式原子地落到目标路径。

use super::{Keystore, Locator};
use crate::common::version::Version;
use crate::error::{Error, Result};
use std::fs;
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

const KEY_FILE_EXTENSION: &str = "encrypted_key";

/// Stores wrapped keys as owner-only files under a key directory.
///
/// 中文: 把已包装的密钥存为密钥目录下仅所有者可读写的文件。
#[derive(Debug, Clone)]
pub struct FileKeystore {
    key_dir: PathBuf,
}

impl FileKeystore {
    /// Creates the keystore, making sure the directory exists.
    /// 中文: 创建文件密钥库，确保目录存在。
    pub fn new<P: AsRef<Path>>(key_dir: P) -> Result<Self> {
        let key_dir = key_dir.as_ref().to_path_buf();
        fs::create_dir_all(&key_dir).map_err(|source| Error::Persistence {
            locator: key_dir.display().to_string(),
            source,
        })?;
        Ok(Self { key_dir })
    }

    /// Opens a directory without touching the filesystem.
    /// 中文: 打开已有目录，不做任何文件系统操作（用于只读场景）。
    pub fn open<P: Into<PathBuf>>(key_dir: P) -> Self {
        Self {
            key_dir: key_dir.into(),
        }
    }

    /// The key directory.
    /// 中文: 密钥目录。
    pub fn key_dir(&self) -> &Path {
        &self.key_dir
    }

    fn path<'l>(&self, locator: &'l Locator) -> Result<&'l Path> {
        match locator {
            Locator::File(path) => Ok(path),
            other => Err(Error::Configuration(format!(
                "file keystore cannot handle locator {}",
                other
            ))),
        }
    }

    fn persist(&self, path: &Path, encoded: &str) -> io::Result<()> {
        let parent = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent)?;

        let mut temp = NamedTempFile::new_in(parent)?;
        temp.write_all(encoded.as_bytes())?;
        temp.as_file().sync_all()?;
        temp.persist_noclobber(path).map_err(|e| e.error)?;
        Ok(())
    }
}

impl Keystore for FileKeystore {
    fn locator_for(&self, app_name: &str, environment: &str, version: Version) -> Locator {
        Locator::File(self.key_dir.join(format!(
            "{}_{}_v{}.{}",
            app_name.to_lowercase(),
            environment.to_lowercase(),
            version,
            KEY_FILE_EXTENSION
        )))
    }

    fn write(&self, locator: &Locator, encoded: &str) -> Result<()> {
        let path = self.path(locator)?;
        match self.persist(path, encoded) {
            Ok(()) => {
                debug!(locator = %path.display(), "stored wrapped key file");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                if self.read(locator)? == encoded {
                    warn!(locator = %path.display(), "key file already holds this key");
                    Ok(())
                } else {
                    Err(Error::Conflict {
                        locator: path.display().to_string(),
                    })
                }
            }
            Err(source) => Err(Error::Persistence {
                locator: path.display().to_string(),
                source,
            }),
        }
    }

    fn read(&self, locator: &Locator) -> Result<String> {
        let path = self.path(locator)?;
        match fs::read_to_string(path) {
            Ok(contents) => {
                debug!(locator = %path.display(), "read wrapped key file");
                Ok(contents)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Err(Error::MissingKey {
                locator: path.display().to_string(),
            }),
            Err(e) if e.kind() == ErrorKind::PermissionDenied => Err(Error::Permission {
                locator: path.display().to_string(),
            }),
            Err(e) if e.kind() == ErrorKind::InvalidData => Err(Error::Corrupted {
                locator: path.display().to_string(),
            }),
            Err(e) => Err(Error::Io(e)),
        }
    }

    fn handles(&self, locator: &Locator) -> bool {
        matches!(locator, Locator::File(_))
    }
}
