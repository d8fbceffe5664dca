use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

use serde::Serialize;
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    File,
    Directory,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactMetadata {
    pub size_bytes: u64,
    pub entries: Vec<String>,
    pub sha256: Option<String>,
}

/// Metadata reflects the filesystem at the last [`ArtifactDescriptor::inspect`],
/// whether or not the current run produced the path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactDescriptor {
    pub path: PathBuf,
    pub kind: ArtifactKind,
    pub metadata: Option<ArtifactMetadata>,
}

impl ArtifactDescriptor {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind: ArtifactKind::File,
            metadata: None,
        }
    }

    pub fn directory(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind: ArtifactKind::Directory,
            metadata: None,
        }
    }

    pub fn inspect(&mut self) -> io::Result<bool> {
        self.metadata = None;
        let stat = match fs::metadata(&self.path) {
            Ok(stat) => stat,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(false),
            Err(err) => return Err(err),
        };

        self.metadata = match self.kind {
            ArtifactKind::File if stat.is_file() => Some(ArtifactMetadata {
                size_bytes: stat.len(),
                entries: Vec::new(),
                sha256: Some(compute_sha256(&self.path)?),
            }),
            ArtifactKind::Directory if stat.is_dir() => Some(list_directory(&self.path)?),
            _ => None,
        };
        Ok(self.metadata.is_some())
    }

    pub fn exists(&self) -> bool {
        self.metadata.is_some()
    }

    pub fn size_bytes(&self) -> Option<u64> {
        self.metadata.as_ref().map(|m| m.size_bytes)
    }

    pub fn entries(&self) -> &[String] {
        self.metadata
            .as_ref()
            .map(|m| m.entries.as_slice())
            .unwrap_or_default()
    }
}

/// Kilobytes rounded to nearest, halves rounding up (1536 bytes -> 2).
pub fn size_kb(bytes: u64) -> u64 {
    bytes.saturating_add(512) / 1024
}

fn list_directory(path: &Path) -> io::Result<ArtifactMetadata> {
    let mut entries = Vec::new();
    let mut size_bytes = 0u64;
    for entry in fs::read_dir(path)? {
        let entry = entry?;
        let stat = entry.metadata()?;
        if stat.is_file() {
            size_bytes += stat.len();
        }
        entries.push(entry.file_name().to_string_lossy().to_string());
    }
    entries.sort();
    Ok(ArtifactMetadata {
        size_bytes,
        entries,
        sha256: None,
    })
}

pub fn compute_sha256(path: &Path) -> io::Result<String> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];

    loop {
        let read = reader.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn kilobyte_rounding_is_round_to_nearest() {
        assert_eq!(size_kb(0), 0);
        assert_eq!(size_kb(511), 0);
        assert_eq!(size_kb(512), 1);
        assert_eq!(size_kb(1536), 2);
        assert_eq!(size_kb(1535), 1);
        assert_eq!(size_kb(10_240), 10);
    }

    #[test]
    fn inspect_reports_file_size_and_digest() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("digest.bin");
        fs::write(&path, b"bunker").unwrap();

        let mut artifact = ArtifactDescriptor::file(&path);
        assert!(artifact.inspect().unwrap());
        assert_eq!(artifact.size_bytes(), Some(6));
        assert_eq!(
            artifact.metadata.unwrap().sha256.as_deref(),
            Some("9078e43e365a0d2849587c33e1623ccdbd92ad1ea81c5762414e9fbee6f20c03")
        );
    }

    #[test]
    fn inspect_lists_directory_entries_sorted() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("basic_bg.wasm"), [0u8; 4]).unwrap();
        fs::write(temp.path().join("basic.js"), "export {};").unwrap();

        let mut dir = ArtifactDescriptor::directory(temp.path());
        assert!(dir.inspect().unwrap());
        assert_eq!(dir.entries(), ["basic.js", "basic_bg.wasm"]);
        assert_eq!(dir.size_bytes(), Some(14));
    }

    #[test]
    fn inspect_rejects_missing_paths_and_wrong_kind() {
        let temp = tempdir().unwrap();
        let mut missing = ArtifactDescriptor::file(temp.path().join("absent.wasm"));
        assert!(!missing.inspect().unwrap());
        assert!(!missing.exists());

        let mut dir_as_file = ArtifactDescriptor::file(temp.path());
        assert!(!dir_as_file.inspect().unwrap());
        assert!(dir_as_file.entries().is_empty());
    }

    #[test]
    fn inspect_forgets_artifacts_that_disappear() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("basic.wasm");
        fs::write(&path, [1u8; 32]).unwrap();

        let mut artifact = ArtifactDescriptor::file(&path);
        assert!(artifact.inspect().unwrap());
        fs::remove_file(&path).unwrap();
        assert!(!artifact.inspect().unwrap());
        assert_eq!(artifact.size_bytes(), None);
    }
}
