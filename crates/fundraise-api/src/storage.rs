use anyhow::{Result, bail};
use bytes::Bytes;
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Longest extension kept from an uploaded file name.
const MAX_EXTENSION_LEN: usize = 8;

/// Top-level directory an upload lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    Avatars,
    Campaigns,
}

impl Bucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            Bucket::Avatars => "avatars",
            Bucket::Campaigns => "campaigns",
        }
    }
}

/// A file received from a multipart form, not yet written anywhere.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub bytes: Bytes,
}

#[derive(Debug, Clone)]
pub struct StoredFile {
    /// Path relative to the storage root, e.g. `avatars/<sha256>.png`.
    pub path: String,
    pub size: usize,
    /// False when identical content was already on disk.
    pub created: bool,
}

/// Manages on-disk storage for uploaded images.
///
/// Files are content-addressed: `{dir}/{bucket}/{sha256}.{ext}`. The client's
/// file name never reaches the filesystem; only a sanitized extension is kept.
pub struct Storage {
    dir: PathBuf,
}

impl Storage {
    pub async fn new(dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&dir).await?;
        info!("Upload storage directory: {}", dir.display());
        Ok(Self { dir })
    }

    pub fn full_path(&self, relative: &str) -> PathBuf {
        self.dir.join(relative)
    }

    /// Write `bytes` under `bucket`. Identical content maps to the same key,
    /// so a second upload of the same file is a no-op on disk.
    pub async fn store(&self, bucket: Bucket, original_name: &str, bytes: &[u8]) -> Result<StoredFile> {
        if bytes.is_empty() {
            bail!("Refusing to store empty upload");
        }

        let relative = format!("{}/{}", bucket.as_str(), storage_key(original_name, bytes));
        let path = self.full_path(&relative);

        if fs::try_exists(&path).await? {
            debug!("Upload {} already stored at {}", sanitize_file_name(original_name), relative);
            return Ok(StoredFile {
                path: relative,
                size: bytes.len(),
                created: false,
            });
        }

        fs::create_dir_all(self.dir.join(bucket.as_str())).await?;

        // Write to a temp name first so readers never see a partial file
        let tmp = self.dir.join(bucket.as_str()).join(format!(".tmp-{}", Uuid::new_v4()));
        let mut file = fs::File::create(&tmp).await?;
        if let Err(e) = write_all(&mut file, bytes).await {
            fs::remove_file(&tmp).await.ok();
            return Err(e);
        }
        fs::rename(&tmp, &path).await?;

        info!(
            "Stored upload {} ({} bytes) at {}",
            sanitize_file_name(original_name),
            bytes.len(),
            relative
        );
        Ok(StoredFile {
            path: relative,
            size: bytes.len(),
            created: true,
        })
    }

    /// Delete a stored file by its relative path.
    pub async fn delete(&self, relative: &str) -> Result<()> {
        match fs::remove_file(self.full_path(relative)).await {
            Ok(()) => {
                info!("Deleted stored file {}", relative);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Stored file {} already gone", relative);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

async fn write_all(file: &mut fs::File, bytes: &[u8]) -> Result<()> {
    file.write_all(bytes).await?;
    file.flush().await?;
    Ok(())
}

/// `<sha256 hex>[.<ext>]`
fn storage_key(original_name: &str, bytes: &[u8]) -> String {
    let digest = hex::encode(Sha256::digest(bytes));
    match extension(original_name) {
        Some(ext) => format!("{}.{}", digest, ext),
        None => digest,
    }
}

/// Lowercased ASCII-alphanumeric extension of `name`, if it has a usable one.
fn extension(name: &str) -> Option<String> {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let (stem, ext) = base.rsplit_once('.')?;
    if stem.is_empty()
        || ext.is_empty()
        || ext.len() > MAX_EXTENSION_LEN
        || !ext.chars().all(|c| c.is_ascii_alphanumeric())
    {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Reduce a client-supplied file name to something safe to print in logs.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .take(64)
        .collect();
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}
