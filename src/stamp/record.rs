//! Stamp records: the on-disk copy of the last fingerprint.
use super::Fingerprint;
use anyhow::{Context, Result};
use std::borrow::Cow;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Suffix every stamp record must carry so cleanup tooling can find them.
pub const STAMP_SUFFIX: &str = ".sha256.stamp";

/// Location of a persisted fingerprint.
#[derive(Debug, Clone)]
pub struct Record {
    path: PathBuf,
}

/// Returns true when `path` carries [`STAMP_SUFFIX`].
pub fn has_stamp_suffix(path: &Path) -> bool {
    path.to_string_lossy().ends_with(STAMP_SUFFIX)
}

impl Record {
    /// Panics when `path` does not end with [`STAMP_SUFFIX`].
    pub fn new(path: &Path) -> Self {
        assert!(
            has_stamp_suffix(path),
            "stamp record {} must end with {STAMP_SUFFIX}",
            path.display()
        );
        Self {
            path: path.to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the recorded fingerprint; `None` when no record exists yet.
    ///
    /// Undecodable bytes are kept lossily so they never match a fresh digest.
    pub fn read(&self) -> Result<Option<Fingerprint>> {
        match fs::read(&self.path) {
            Ok(bytes) => {
                let text = String::from_utf8_lossy(&bytes);
                if let Cow::Owned(_) = text {
                    tracing::warn!(record = %self.path.display(), "corrupt stamp record, treating as stale");
                }
                Ok(Some(Fingerprint::from_hex(&text)))
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err).with_context(|| format!("read {}", self.path.display())),
        }
    }

    pub fn write(&self, fingerprint: &Fingerprint) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
        }
        fs::write(&self.path, fingerprint.as_str().as_bytes())
            .with_context(|| format!("write {}", self.path.display()))?;
        Ok(())
    }
}
