//! Avatar files on disk, served back under `/static/profile_pics/`.

use rand::Rng;
use std::path::{Path, PathBuf};

pub const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Largest account form body accepted, picture included.
pub const MAX_UPLOAD_BYTES: usize = 2 * 1024 * 1024;

/// Lowercased extension of `filename` when it is an accepted image type.
pub fn allowed_extension(filename: &str) -> Option<String> {
    let ext = Path::new(filename)
        .extension()?
        .to_str()?
        .to_ascii_lowercase();
    ALLOWED_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

#[derive(Debug, Clone)]
pub struct UploadStore {
    root: PathBuf,
}

impl UploadStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_of(&self, filename: &str) -> PathBuf {
        self.root.join(filename)
    }

    /// Write an uploaded image under a fresh random name. Returns that name.
    pub async fn save_avatar(&self, original_name: &str, bytes: &[u8]) -> std::io::Result<String> {
        let ext = allowed_extension(original_name).ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("unsupported image type: {}", original_name),
            )
        })?;

        let stem: [u8; 8] = rand::thread_rng().gen();
        let filename = format!("{}.{}", hex::encode(stem), ext);

        tokio::fs::create_dir_all(&self.root).await?;
        tokio::fs::write(self.path_of(&filename), bytes).await?;
        tracing::debug!("Stored avatar {}", filename);
        Ok(filename)
    }

    /// Delete a stored file. Names that are not a bare file name are ignored.
    pub async fn remove(&self, filename: &str) -> std::io::Result<()> {
        if Path::new(filename).file_name().and_then(|n| n.to_str()) != Some(filename) {
            tracing::warn!("Refusing to remove suspicious upload name {:?}", filename);
            return Ok(());
        }
        match tokio::fs::remove_file(self.path_of(filename)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}
