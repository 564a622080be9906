//! File-backed durable store
//!
//! One file per key inside a directory. Writes go to a temporary file that is
//! renamed into place, so a crash never leaves a half-written blob behind.
//! Keys whose encoded name would be too long for the filesystem are stored
//! under a SHA-256 digest name instead.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::fs;
use tracing::debug;

use super::DurableStore;
use crate::error::Result;

/// Longest file name written as-is; leaves room for the `.tmp` suffix under
/// the usual 255-byte filesystem limit.
const MAX_FILE_NAME_LEN: usize = 200;

/// Encoded characters kept in front of the digest of a hashed name.
const HASHED_PREFIX_LEN: usize = 64;

// == File Store ==
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Opens (and creates if needed) a store rooted at `root`.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).await?;
        debug!(root = %root.display(), "file store opened");
        Ok(Self { root })
    }

    /// Directory holding the blob files.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(encode_file_name(key))
    }
}

#[async_trait]
impl DurableStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match fs::read(self.path_for(key)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<()> {
        let path = self.path_for(key);
        let mut tmp = path.clone().into_os_string();
        tmp.push(".tmp");

        fs::write(&tmp, value).await?;
        fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        match fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/// Maps an arbitrary key onto a portable file name.
///
/// ASCII alphanumerics, `-` and `_` pass through; every other byte becomes
/// `%XX`. If that name is longer than [`MAX_FILE_NAME_LEN`], the result is
/// the first [`HASHED_PREFIX_LEN`] encoded characters, a `~`, and the hex
/// SHA-256 of the key. `~` never appears in a plain encoded name, so the two
/// forms cannot collide, and no name can end in `.tmp`.
fn encode_file_name(key: &str) -> String {
    let mut name = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            name.push(byte as char);
        } else {
            name.push_str(&format!("%{:02X}", byte));
        }
    }

    if name.len() <= MAX_FILE_NAME_LEN {
        return name;
    }

    // the encoded name is pure ASCII, so any byte index is a char boundary
    let digest = hex::encode(Sha256::digest(key.as_bytes()));
    format!("{}~{}", &name[..HASHED_PREFIX_LEN], digest)
}
