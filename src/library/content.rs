//! Content tree for episode files and cover images.
//!
//! One directory per channel, named after the channel alias, with episode
//! files at the top level and cover images in a nested `cover` directory.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::fs::{self, File};
use tracing::debug;

/// Subdirectory of the storage root that holds all channel directories
pub const PODCASTS_DIR: &str = "podcasts";

/// Per-channel subdirectory for cover images
pub const COVER_DIR: &str = "cover";

/// Errors that can occur in the content tree
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("Invalid path component: {0:?}")]
    InvalidName(String),

    #[error("Already exists: {}", .0.display())]
    AlreadyExists(PathBuf),

    #[error("Does not exist: {}", .0.display())]
    Missing(PathBuf),

    #[error("IO error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ContentError {
    fn io(path: &Path, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            Self::Missing(path.to_path_buf())
        } else {
            Self::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }
}

/// Filesystem capabilities the publisher needs, keyed by alias and filename
#[async_trait]
pub trait ContentTree: Send + Sync {
    async fn dir_exists(&self, alias: &str) -> bool;

    async fn file_exists(&self, alias: &str, filename: &str) -> bool;

    /// Create the directory for a new channel (named after its id) and its cover directory
    async fn create_channel_dir(&self, id: i64) -> Result<(), ContentError>;

    async fn remove_channel_dir(&self, alias: &str) -> Result<(), ContentError>;

    async fn remove_file(&self, alias: &str, filename: &str) -> Result<(), ContentError>;

    async fn remove_cover_file(&self, alias: &str, filename: &str) -> Result<(), ContentError>;

    /// Fails if `old` is missing or `new` already exists
    async fn rename_channel_dir(&self, old: &str, new: &str) -> Result<(), ContentError>;

    /// Create a new episode file; an existing `filename` is never truncated
    /// and fails with [`ContentError::AlreadyExists`]
    async fn open_for_write(&self, alias: &str, filename: &str) -> Result<File, ContentError>;

    async fn open_cover_for_write(&self, alias: &str, filename: &str)
        -> Result<File, ContentError>;
}

/// Reject anything that could escape the directory it is joined onto
pub fn validate_component(name: &str) -> Result<&str, ContentError> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\', '\0']) {
        return Err(ContentError::InvalidName(name.to_string()));
    }
    Ok(name)
}

/// Split a filename at its final `.` into (stem, extension)
pub fn split_extension(filename: &str) -> (&str, &str) {
    match filename.rfind('.') {
        Some(pos) => (&filename[..pos], &filename[pos + 1..]),
        None => (filename, ""),
    }
}

/// Make a colliding filename distinct by splicing a time-derived suffix
/// in front of its final extension. Later attempts within the same second
/// append a counter to the suffix.
pub fn disambiguate(filename: &str, now: DateTime<Utc>, attempt: u32) -> String {
    let suffix = match attempt {
        0 => format!("-{:x}", now.timestamp()),
        n => format!("-{:x}-{}", now.timestamp(), n),
    };
    match filename.rfind('.') {
        Some(pos) => format!("{}{}{}", &filename[..pos], suffix, &filename[pos..]),
        None => format!("{}{}", filename, suffix),
    }
}

/// Content tree on the local filesystem
#[derive(Debug, Clone)]
pub struct FsContentTree {
    root: PathBuf,
}

impl FsContentTree {
    /// Content tree rooted directly at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Content tree in the `podcasts` directory of a storage root
    pub fn under(storage_root: &Path) -> Self {
        Self::new(storage_root.join(PODCASTS_DIR))
    }

    /// Directory that holds every channel directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn channel_dir(&self, alias: &str) -> Result<PathBuf, ContentError> {
        Ok(self.root.join(validate_component(alias)?))
    }

    fn episode_path(&self, alias: &str, filename: &str) -> Result<PathBuf, ContentError> {
        Ok(self.channel_dir(alias)?.join(validate_component(filename)?))
    }

    fn cover_path(&self, alias: &str, filename: &str) -> Result<PathBuf, ContentError> {
        Ok(self
            .channel_dir(alias)?
            .join(COVER_DIR)
            .join(validate_component(filename)?))
    }

    async fn create(path: &Path) -> Result<File, ContentError> {
        File::create(path)
            .await
            .map_err(|e| ContentError::io(path, e))
    }

    async fn create_new(path: &Path) -> Result<File, ContentError> {
        match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .await
        {
            Ok(file) => Ok(file),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                Err(ContentError::AlreadyExists(path.to_path_buf()))
            }
            Err(e) => Err(ContentError::io(path, e)),
        }
    }

    async fn remove(path: &Path) -> Result<(), ContentError> {
        fs::remove_file(path)
            .await
            .map_err(|e| ContentError::io(path, e))?;
        debug!(path = %path.display(), "Removed file");
        Ok(())
    }
}

async fn is_dir(path: &Path) -> bool {
    fs::metadata(path).await.map(|m| m.is_dir()).unwrap_or(false)
}

async fn is_file(path: &Path) -> bool {
    fs::metadata(path).await.map(|m| m.is_file()).unwrap_or(false)
}

#[async_trait]
impl ContentTree for FsContentTree {
    async fn dir_exists(&self, alias: &str) -> bool {
        match self.channel_dir(alias) {
            Ok(path) => is_dir(&path).await,
            Err(_) => false,
        }
    }

    async fn file_exists(&self, alias: &str, filename: &str) -> bool {
        match self.episode_path(alias, filename) {
            Ok(path) => is_file(&path).await,
            Err(_) => false,
        }
    }

    async fn create_channel_dir(&self, id: i64) -> Result<(), ContentError> {
        let path = self.channel_dir(&id.to_string())?.join(COVER_DIR);
        fs::create_dir_all(&path)
            .await
            .map_err(|e| ContentError::io(&path, e))?;
        debug!(path = %path.display(), "Created channel directory");
        Ok(())
    }

    async fn remove_channel_dir(&self, alias: &str) -> Result<(), ContentError> {
        let path = self.channel_dir(alias)?;
        match fs::remove_dir_all(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ContentError::io(&path, e)),
        }
    }

    async fn remove_file(&self, alias: &str, filename: &str) -> Result<(), ContentError> {
        Self::remove(&self.episode_path(alias, filename)?).await
    }

    async fn remove_cover_file(&self, alias: &str, filename: &str) -> Result<(), ContentError> {
        Self::remove(&self.cover_path(alias, filename)?).await
    }

    async fn rename_channel_dir(&self, old: &str, new: &str) -> Result<(), ContentError> {
        let from = self.channel_dir(old)?;
        let to = self.channel_dir(new)?;

        if !is_dir(&from).await {
            return Err(ContentError::Missing(from));
        }
        if fs::try_exists(&to).await.unwrap_or(true) {
            return Err(ContentError::AlreadyExists(to));
        }

        fs::rename(&from, &to)
            .await
            .map_err(|e| ContentError::io(&from, e))?;
        debug!(from = %from.display(), to = %to.display(), "Renamed channel directory");
        Ok(())
    }

    async fn open_for_write(&self, alias: &str, filename: &str) -> Result<File, ContentError> {
        Self::create_new(&self.episode_path(alias, filename)?).await
    }

    async fn open_cover_for_write(
        &self,
        alias: &str,
        filename: &str,
    ) -> Result<File, ContentError> {
        Self::create(&self.cover_path(alias, filename)?).await
    }
}
