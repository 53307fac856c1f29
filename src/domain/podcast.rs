//! Podcast episodes.

use serde::{Deserialize, Serialize};

fn is_zero(value: &i64) -> bool {
    *value == 0
}

/// An episode: one catalog row plus one file in its channel's directory
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Podcast {
    pub id: i64,

    /// Owning channel id. Internal only, never sent to API consumers.
    #[serde(skip)]
    pub channel: i64,

    /// Backing audio file inside the channel directory
    pub filename: String,

    /// 1 when the episode is published, 0 otherwise
    #[serde(default)]
    pub published: i64,

    #[serde(default)]
    pub title: String,

    /// Size of the audio file in bytes
    #[serde(default)]
    pub length: i64,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub guid: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub pub_date: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    /// Duration in seconds
    #[serde(default, skip_serializing_if = "is_zero")]
    pub duration: i64,

    #[serde(default)]
    pub artwork: String,

    /// 1 marks explicit content; any other value does not
    #[serde(default)]
    pub explicit: i64,

    #[serde(default, skip_serializing_if = "is_zero")]
    pub season: i64,

    #[serde(default, skip_serializing_if = "is_zero")]
    pub episode: i64,
}

impl Podcast {
    pub fn is_explicit(&self) -> bool {
        self.explicit == 1
    }
}

/// Which columns a podcast listing fills in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListForm {
    /// `id`, `filename` and `title` only
    Summary,
    /// Every column
    Full,
}

/// Editable episode metadata as sent by API clients
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PodcastUpdate {
    #[serde(default)]
    pub published: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub length: i64,
    #[serde(default)]
    pub guid: String,
    #[serde(default)]
    pub pub_date: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub duration: i64,
    #[serde(default)]
    pub artwork: String,
    #[serde(default)]
    pub explicit: i64,
    #[serde(default)]
    pub season: i64,
    #[serde(default)]
    pub episode: i64,
}

impl PodcastUpdate {
    /// Overwrite the metadata columns. Identity, owner and filename are kept.
    pub fn apply_to(&self, podcast: &mut Podcast) {
        podcast.published = self.published;
        podcast.title = self.title.clone();
        podcast.length = self.length;
        podcast.guid = self.guid.clone();
        podcast.pub_date = self.pub_date.clone();
        podcast.description = self.description.clone();
        podcast.duration = self.duration;
        podcast.artwork = self.artwork.clone();
        podcast.explicit = self.explicit;
        podcast.season = self.season;
        podcast.episode = self.episode;
    }
}
