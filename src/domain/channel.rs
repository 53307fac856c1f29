//! Channels (podcast shows).

use serde::{Deserialize, Serialize};

/// Id that the catalog never assigns. Path segments that fail to parse
/// resolve to this value, so every lookup with it reports "not found".
pub const INVALID_ID: i64 = 0;

/// A podcast show: one catalog row plus one directory in the content tree
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    /// Stable identity, assigned once by the catalog
    pub id: i64,

    /// Public name, used in URLs and as the content directory name
    #[serde(default)]
    pub alias: String,

    #[serde(default)]
    pub title: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    /// Cover image filename inside the channel's `cover` directory
    #[serde(default)]
    pub cover: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub author: String,
}

/// Editable channel fields as sent by API clients
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChannelUpdate {
    #[serde(default)]
    pub alias: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub cover: String,
    #[serde(default)]
    pub author: String,
}

/// Body of `PUT /api/channel/:channel`
///
/// The web UI wraps the fields as `{"channel": {...}, "old_alias": "..."}`;
/// bare fields are accepted too. `old_alias` is ignored, the current alias
/// always comes from the catalog.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ChannelUpdateBody {
    Wrapped { channel: ChannelUpdate },
    Bare(ChannelUpdate),
}

impl ChannelUpdateBody {
    pub fn into_update(self) -> ChannelUpdate {
        match self {
            Self::Wrapped { channel } | Self::Bare(channel) => channel,
        }
    }
}

impl ChannelUpdate {
    /// Apply everything except the alias, which goes through the rename protocol
    pub fn apply_to(&self, channel: &mut Channel) {
        channel.title = self.title.clone();
        channel.description = self.description.clone();
        channel.cover = self.cover.clone();
        channel.author = self.author.clone();
    }
}
