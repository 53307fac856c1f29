//! Mapping between internal ids and public names.
//!
//! Channels are keyed by a stable integer id inside the catalog and by a
//! mutable alias everywhere public: URLs, feed paths and content directory
//! names. Anything that touches the content tree resolves the alias here.

use tracing::{info, warn};

use crate::domain::Channel;
use crate::library::{CatalogError, CatalogStore, ContentTree, COVER_DIR};

/// Result of applying a requested alias to a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AliasOutcome {
    /// Requested alias equals the current one
    Unchanged,
    /// Directory renamed; the channel now carries the new alias
    Renamed,
    /// Directory could not be renamed; the channel keeps its old alias
    Conflict,
}

impl AliasOutcome {
    pub fn is_conflict(self) -> bool {
        self == Self::Conflict
    }
}

/// Identity lookups over the catalog
pub struct Addressing<'a> {
    catalog: &'a dyn CatalogStore,
}

impl<'a> Addressing<'a> {
    pub fn new(catalog: &'a dyn CatalogStore) -> Self {
        Self { catalog }
    }

    /// Alias of a channel id
    pub fn alias_of(&self, channel: i64) -> Result<String, CatalogError> {
        self.catalog.swap_id_for_alias(channel)
    }

    /// Channel id behind a public alias
    pub fn id_of(&self, alias: &str) -> Result<i64, CatalogError> {
        self.catalog.swap_alias_for_id(alias)
    }

    /// Stored filename of a podcast id
    pub fn filename_of(&self, podcast: i64) -> Result<String, CatalogError> {
        self.catalog.swap_id_for_filename(podcast)
    }

    /// Move the channel directory to `requested` and, if that worked, put the
    /// new alias on `channel`. The caller persists the channel afterwards.
    ///
    /// A failed rename leaves both the directory and `channel.alias` as they
    /// were. A crash between a successful rename and the catalog write leaves
    /// the directory under the new name while the catalog still holds the old
    /// alias; nothing repairs that automatically.
    pub async fn rename_alias(
        &self,
        tree: &dyn ContentTree,
        channel: &mut Channel,
        requested: &str,
    ) -> AliasOutcome {
        if requested == channel.alias {
            return AliasOutcome::Unchanged;
        }

        match tree.rename_channel_dir(&channel.alias, requested).await {
            Ok(()) => {
                info!(
                    channel = channel.id,
                    from = %channel.alias,
                    to = %requested,
                    "Renamed channel alias"
                );
                channel.alias = requested.to_string();
                AliasOutcome::Renamed
            }
            Err(e) => {
                warn!(
                    channel = channel.id,
                    alias = %channel.alias,
                    requested = %requested,
                    error = %e,
                    "Alias rename rejected, keeping old alias"
                );
                AliasOutcome::Conflict
            }
        }
    }
}

/// Public URL of an episode file
pub fn enclosure_url(host: &str, alias: &str, filename: &str) -> String {
    [host, "files", alias, filename].join("/")
}

/// Public URL of a cover image, or an empty string when there is no cover
pub fn cover_url(host: &str, alias: &str, cover: &str) -> String {
    if cover.is_empty() {
        return String::new();
    }
    [host, "files", alias, COVER_DIR, cover].join("/")
}
