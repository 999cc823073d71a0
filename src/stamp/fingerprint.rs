//! Content fingerprints over input paths and strings.
use anyhow::{Context, Result};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Lowercase hex SHA-256 digest of a set of inputs.
#[derive(Serialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Wrap a digest read back from a record. Surrounding whitespace is dropped.
    pub fn from_hex(hex: &str) -> Self {
        Self(hex.trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Incremental hasher shared across every input of one fingerprint.
///
/// Each input is framed with a tag and its byte length so that adjacent
/// inputs cannot run together (`["ab", "c"]` and `["a", "bc"]` differ).
pub struct Fingerprinter {
    hasher: Sha256,
}

impl Default for Fingerprinter {
    fn default() -> Self {
        Self::new()
    }
}

impl Fingerprinter {
    pub fn new() -> Self {
        Self {
            hasher: Sha256::new(),
        }
    }

    fn update_framed(&mut self, tag: &[u8], bytes: &[u8]) {
        self.hasher.update(tag);
        self.hasher.update(b":");
        self.hasher.update(bytes.len().to_string().as_bytes());
        self.hasher.update(b":");
        self.hasher.update(bytes);
    }

    /// Feed a string as UTF-8.
    pub fn update_str(&mut self, value: &str) {
        self.update_framed(b"string", value.as_bytes());
    }

    /// Feed a file, or every file beneath a directory in file-name order.
    ///
    /// The path is framed without `.` components, and files under a directory
    /// are framed relative to it. Symlinks are followed. A missing or
    /// unreadable path is an error.
    pub fn update_path(&mut self, path: &Path) -> Result<()> {
        let name = normalize_path(path);
        let meta = fs::metadata(path).with_context(|| format!("inspect {}", path.display()))?;
        if !meta.is_dir() {
            return self.update_file(path, &name);
        }
        self.update_framed(b"dir", name.to_string_lossy().as_bytes());
        self.update_dir(path, Path::new(""))
    }

    fn update_dir(&mut self, root: &Path, rel: &Path) -> Result<()> {
        let dir = root.join(rel);
        let mut entries = fs::read_dir(&dir)
            .with_context(|| format!("read {}", dir.display()))?
            .collect::<std::io::Result<Vec<_>>>()
            .with_context(|| format!("read {}", dir.display()))?;
        entries.sort_by_key(|entry| entry.file_name());
        for entry in entries {
            let path = entry.path();
            let rel = rel.join(entry.file_name());
            let meta =
                fs::metadata(&path).with_context(|| format!("inspect {}", path.display()))?;
            if meta.is_dir() {
                self.update_framed(b"dir", rel.to_string_lossy().as_bytes());
                self.update_dir(root, &rel)?;
            } else {
                self.update_file(&path, &rel)?;
            }
        }
        Ok(())
    }

    fn update_file(&mut self, path: &Path, name: &Path) -> Result<()> {
        let bytes = fs::read(path).with_context(|| format!("read {}", path.display()))?;
        self.update_framed(b"path", name.to_string_lossy().as_bytes());
        self.update_framed(b"content", &bytes);
        Ok(())
    }

    pub fn finalize(self) -> Fingerprint {
        Fingerprint(format!("{:x}", self.hasher.finalize()))
    }
}

/// `a.txt`, `./a.txt` and `a.txt/` all name the same input.
fn normalize_path(path: &Path) -> PathBuf {
    let normalized: PathBuf = path
        .components()
        .filter(|component| !matches!(component, Component::CurDir))
        .collect();
    if normalized.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        normalized
    }
}

/// Fingerprint `input_paths` (sorted first) followed by `input_strings` (as given).
pub fn compute_fingerprint(input_paths: &[PathBuf], input_strings: &[String]) -> Result<Fingerprint> {
    let mut fingerprinter = Fingerprinter::new();
    let mut sorted: Vec<(PathBuf, &PathBuf)> = input_paths
        .iter()
        .map(|path| (normalize_path(path), path))
        .collect();
    sorted.sort();
    for (_, path) in sorted {
        fingerprinter.update_path(path)?;
    }
    for value in input_strings {
        fingerprinter.update_str(value);
    }
    Ok(fingerprinter.finalize())
}
