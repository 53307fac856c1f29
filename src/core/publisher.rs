//! Publishing operations over the catalog and the content tree.
//!
//! Each operation runs to completion on its own. There is no locking beyond
//! what the two stores provide, and no transaction spans both of them.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use super::addressing::{cover_url, Addressing, AliasOutcome};
use super::feed::{self, FeedError};
use super::reconcile::{live_channels, live_podcasts};
use crate::domain::{Channel, ChannelUpdate, ListForm, Podcast, PodcastUpdate};
use crate::library::{
    disambiguate, split_extension, CatalogError, CatalogStore, ContentError, ContentTree,
};

/// Format of generated `pub_date` values
pub const PUB_DATE_FORMAT: &str = "%a, %-d %b %Y %H:%M:%S UTC";

/// Suffixed names tried before an upload gives up on a taken filename
const MAX_RENAME_ATTEMPTS: u32 = 100;

/// Coarse error classes, used by the transport to pick a status code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidInput,
    StoreFailure,
    ContentFailure,
}

#[derive(Debug, Error)]
pub enum PublishError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Content(#[from] ContentError),

    #[error(transparent)]
    Feed(#[from] FeedError),
}

impl PublishError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Catalog(CatalogError::NotFound { .. }) => ErrorKind::NotFound,
            Self::Catalog(CatalogError::InvalidLength(_) | CatalogError::AliasTaken(_)) => {
                ErrorKind::InvalidInput
            }
            Self::Catalog(_) => ErrorKind::StoreFailure,
            Self::Content(ContentError::InvalidName(_)) => ErrorKind::InvalidInput,
            Self::Content(_) | Self::Feed(_) => ErrorKind::ContentFailure,
        }
    }
}

/// Channel as shown to API clients: cover as a full URL, plus the public host
#[derive(Debug, Clone, Serialize)]
pub struct ChannelView {
    #[serde(flatten)]
    pub channel: Channel,
    pub host: String,
}

/// Channel details with its live episodes
#[derive(Debug, Clone, Serialize)]
pub struct Overview {
    pub info: ChannelView,
    pub podcasts: Vec<Podcast>,
}

/// Reply to a channel update
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateReply {
    /// Cover URL after the update, empty when there is none
    pub cover: String,
    /// Set when the requested alias could not be applied
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub error: bool,
}

/// A file being written into the content tree
pub struct PendingUpload {
    channel: i64,
    alias: String,
    filename: String,
    file: File,
    /// Written into the cover directory rather than next to the episodes
    cover: bool,
}

impl std::fmt::Debug for PendingUpload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingUpload")
            .field("channel", &self.channel)
            .field("alias", &self.alias)
            .field("filename", &self.filename)
            .field("cover", &self.cover)
            .finish_non_exhaustive()
    }
}

impl PendingUpload {
    pub async fn write(&mut self, chunk: &[u8]) -> Result<(), PublishError> {
        self.file
            .write_all(chunk)
            .await
            .map_err(|e| self.io_error(e))
    }

    async fn close(mut self) -> Result<(String, String), PublishError> {
        self.file.flush().await.map_err(|e| self.io_error(e))?;
        Ok((self.alias, self.filename))
    }

    fn io_error(&self, source: std::io::Error) -> PublishError {
        PublishError::Content(ContentError::Io {
            path: [self.alias.as_str(), self.filename.as_str()].iter().collect(),
            source,
        })
    }
}

/// Entry point for every publishing operation
#[derive(Clone)]
pub struct Publisher {
    catalog: Arc<dyn CatalogStore>,
    content: Arc<dyn ContentTree>,
    host: String,
}

impl std::fmt::Debug for Publisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Publisher")
            .field("host", &self.host)
            .finish_non_exhaustive()
    }
}

impl Publisher {
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        content: Arc<dyn ContentTree>,
        host: impl Into<String>,
    ) -> Self {
        Self {
            catalog,
            content,
            host: host.into(),
        }
    }

    fn addressing(&self) -> Addressing<'_> {
        Addressing::new(self.catalog.as_ref())
    }

    fn view(&self, mut channel: Channel) -> ChannelView {
        channel.cover = cover_url(&self.host, &channel.alias, &channel.cover);
        ChannelView {
            channel,
            host: self.host.clone(),
        }
    }

    // ------------------------------------------------------------------
    // Channels
    // ------------------------------------------------------------------

    /// Create a channel named after its id, with an empty directory
    pub async fn create_channel(&self) -> Result<ChannelView, PublishError> {
        let id = self.catalog.add_channel()?;
        self.content.create_channel_dir(id).await?;

        let mut channel = self.catalog.channel_info(id)?;
        channel.alias = id.to_string();
        channel.title = format!("New channel {}", id);
        self.catalog.update_channel(&channel)?;

        info!(channel = id, "Created channel");
        Ok(self.view(channel))
    }

    /// All channels that still have a directory
    pub async fn list_channels(&self) -> Result<Vec<Channel>, PublishError> {
        let channels = self.catalog.list_channels()?;
        Ok(live_channels(self.catalog.as_ref(), self.content.as_ref(), channels).await)
    }

    pub async fn overview(&self, channel_id: i64) -> Result<Overview, PublishError> {
        let channel = self.catalog.channel_info(channel_id)?;
        let podcasts = self.catalog.list_podcasts(channel_id, ListForm::Summary)?;
        let podcasts = live_podcasts(
            self.catalog.as_ref(),
            self.content.as_ref(),
            &channel.alias,
            podcasts,
        )
        .await;

        Ok(Overview {
            info: self.view(channel),
            podcasts,
        })
    }

    /// Apply an update. A rejected alias keeps the old one and sets the
    /// `error` flag; the other fields are saved regardless.
    pub async fn update_channel(
        &self,
        channel_id: i64,
        update: ChannelUpdate,
    ) -> Result<UpdateReply, PublishError> {
        let mut channel = self.catalog.channel_info(channel_id)?;
        let previous = channel.alias.clone();
        update.apply_to(&mut channel);

        let outcome = self
            .addressing()
            .rename_alias(self.content.as_ref(), &mut channel, &update.alias)
            .await;
        let mut conflict = outcome.is_conflict();

        match self.catalog.update_channel(&channel) {
            Ok(()) => {}
            Err(CatalogError::AliasTaken(alias)) if outcome == AliasOutcome::Renamed => {
                // Another row claims the alias: move the directory back
                warn!(channel = channel_id, alias = %alias, "Alias held by another channel");
                self.content.rename_channel_dir(&alias, &previous).await?;
                channel.alias = previous;
                conflict = true;
                self.catalog.update_channel(&channel)?;
            }
            Err(e) => return Err(e.into()),
        }

        Ok(UpdateReply {
            cover: cover_url(&self.host, &channel.alias, &channel.cover),
            error: conflict,
        })
    }

    /// Delete the channel rows (with all episodes) and then its directory
    pub async fn delete_channel(&self, channel_id: i64) -> Result<(), PublishError> {
        let alias = self.addressing().alias_of(channel_id)?;
        self.catalog.delete_channel(channel_id)?;
        self.content.remove_channel_dir(&alias).await?;
        info!(channel = channel_id, alias = %alias, "Deleted channel");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Episodes
    // ------------------------------------------------------------------

    /// Open the episode file for an upload. A name already taken in the
    /// channel directory gets a time-derived suffix before its extension,
    /// plus a counter until the name is free.
    pub async fn start_upload(
        &self,
        channel_id: i64,
        filename: &str,
    ) -> Result<PendingUpload, PublishError> {
        self.start_upload_at(channel_id, filename, Utc::now()).await
    }

    async fn start_upload_at(
        &self,
        channel_id: i64,
        filename: &str,
        now: DateTime<Utc>,
    ) -> Result<PendingUpload, PublishError> {
        let alias = self.addressing().alias_of(channel_id)?;

        let mut stored = filename.to_string();
        let mut attempt = 0;
        let file = loop {
            match self.content.open_for_write(&alias, &stored).await {
                Ok(file) => break file,
                Err(ContentError::AlreadyExists(_)) if attempt < MAX_RENAME_ATTEMPTS => {
                    stored = disambiguate(filename, now, attempt);
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        };
        if stored != filename {
            info!(requested = %filename, stored = %stored, "Upload name taken, renaming");
        }

        Ok(PendingUpload {
            channel: channel_id,
            alias,
            filename: stored,
            file,
            cover: false,
        })
    }

    /// Close the written file and record the episode. If the catalog refuses
    /// the row, the file is removed again.
    pub async fn finish_upload(
        &self,
        upload: PendingUpload,
        length: &str,
    ) -> Result<Podcast, PublishError> {
        let channel = upload.channel;
        let (alias, filename) = upload.close().await?;
        let (title, _) = split_extension(&filename);

        match self.catalog.add_podcast(channel, &filename, title, length) {
            Ok(podcast) => {
                info!(channel, podcast = podcast.id, filename = %filename, "Stored episode");
                Ok(podcast)
            }
            Err(e) => {
                if let Err(cleanup) = self.content.remove_file(&alias, &filename).await {
                    warn!(filename = %filename, error = %cleanup, "Failed to remove rejected upload");
                }
                Err(e.into())
            }
        }
    }

    /// Drop an upload that will not be finished and remove what was written
    pub async fn discard_upload(&self, upload: PendingUpload) {
        let PendingUpload {
            alias,
            filename,
            file,
            cover,
            ..
        } = upload;
        drop(file);

        let removed = if cover {
            self.content.remove_cover_file(&alias, &filename).await
        } else {
            self.content.remove_file(&alias, &filename).await
        };
        match removed {
            Ok(()) => info!(alias = %alias, filename = %filename, "Discarded partial upload"),
            Err(e) => warn!(filename = %filename, error = %e, "Failed to remove partial upload"),
        }
    }

    /// Upload an episode held entirely in memory
    pub async fn upload_podcast(
        &self,
        channel_id: i64,
        filename: &str,
        length: &str,
        data: &[u8],
    ) -> Result<Podcast, PublishError> {
        let mut upload = self.start_upload(channel_id, filename).await?;
        upload.write(data).await?;
        self.finish_upload(upload, length).await
    }

    /// Episode metadata, if the episode belongs to `channel_id`
    pub fn podcast_info(
        &self,
        channel_id: i64,
        podcast_id: i64,
    ) -> Result<Podcast, PublishError> {
        let podcast = self.catalog.podcast_info(podcast_id)?;
        if podcast.channel != channel_id {
            return Err(CatalogError::NotFound {
                entity: "podcast",
                key: format!("{} in channel {}", podcast_id, channel_id),
            }
            .into());
        }
        Ok(podcast)
    }

    /// Save episode metadata. An empty `guid` means "publish now": a guid and
    /// publication date are generated from the current time.
    pub fn update_podcast(
        &self,
        channel_id: i64,
        podcast_id: i64,
        update: PodcastUpdate,
    ) -> Result<Podcast, PublishError> {
        self.update_podcast_at(channel_id, podcast_id, update, Utc::now())
    }

    fn update_podcast_at(
        &self,
        channel_id: i64,
        podcast_id: i64,
        update: PodcastUpdate,
        now: DateTime<Utc>,
    ) -> Result<Podcast, PublishError> {
        let mut podcast = self.podcast_info(channel_id, podcast_id)?;
        update.apply_to(&mut podcast);

        if podcast.guid.is_empty() {
            podcast.guid = format!("{:x}", now.timestamp());
            podcast.pub_date = now.format(PUB_DATE_FORMAT).to_string();
        }

        self.catalog.update_podcast(&podcast)?;
        Ok(podcast)
    }

    /// Delete the episode row and then its file. Episodes of other channels
    /// are reported as not found and left alone.
    pub async fn delete_podcast(
        &self,
        channel_id: i64,
        podcast_id: i64,
    ) -> Result<(), PublishError> {
        let addressing = self.addressing();
        let alias = addressing.alias_of(channel_id)?;
        self.podcast_info(channel_id, podcast_id)?;
        let filename = addressing.filename_of(podcast_id)?;

        self.catalog.delete_podcast(podcast_id)?;
        match self.content.remove_file(&alias, &filename).await {
            Ok(()) => {}
            Err(ContentError::Missing(path)) => {
                warn!(path = %path.display(), "Episode file was already gone");
            }
            Err(e) => return Err(e.into()),
        }

        info!(channel = channel_id, podcast = podcast_id, "Deleted episode");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Covers
    // ------------------------------------------------------------------

    pub async fn start_cover_upload(
        &self,
        channel_id: i64,
        filename: &str,
    ) -> Result<PendingUpload, PublishError> {
        let alias = self.addressing().alias_of(channel_id)?;
        let file = self.content.open_cover_for_write(&alias, filename).await?;
        Ok(PendingUpload {
            channel: channel_id,
            alias,
            filename: filename.to_string(),
            file,
            cover: true,
        })
    }

    /// Close the cover file, make it the channel cover and return its URL
    pub async fn finish_cover_upload(&self, upload: PendingUpload) -> Result<String, PublishError> {
        let channel_id = upload.channel;
        let (_, filename) = upload.close().await?;

        let mut channel = self.catalog.channel_info(channel_id)?;
        channel.cover = filename;
        self.catalog.update_channel(&channel)?;

        Ok(cover_url(&self.host, &channel.alias, &channel.cover))
    }

    pub async fn upload_cover(
        &self,
        channel_id: i64,
        filename: &str,
        data: &[u8],
    ) -> Result<String, PublishError> {
        let mut upload = self.start_cover_upload(channel_id, filename).await?;
        upload.write(data).await?;
        self.finish_cover_upload(upload).await
    }

    /// Clear the channel cover and remove the named cover file
    pub async fn delete_cover(&self, channel_id: i64, cover: &str) -> Result<(), PublishError> {
        let mut channel = self.catalog.channel_info(channel_id)?;
        channel.cover.clear();
        self.catalog.update_channel(&channel)?;

        match self.content.remove_cover_file(&channel.alias, cover).await {
            Ok(()) => Ok(()),
            Err(ContentError::Missing(path)) => {
                warn!(path = %path.display(), "Cover file was already gone");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    // ------------------------------------------------------------------
    // Feed
    // ------------------------------------------------------------------

    /// Render the public feed of the channel with this alias
    pub async fn feed(&self, alias: &str) -> Result<String, PublishError> {
        let id = self.addressing().id_of(alias)?;
        let channel = self.catalog.channel_info(id)?;
        let podcasts = self.catalog.list_podcasts(id, ListForm::Full)?;
        let podcasts = live_podcasts(
            self.catalog.as_ref(),
            self.content.as_ref(),
            &channel.alias,
            podcasts,
        )
        .await;

        Ok(feed::project(&channel, &podcasts, &self.host).to_xml()?)
    }
}
