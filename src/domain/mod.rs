//! Domain types for podhost.
//!
//! - Channel: a podcast show (catalog row + content directory)
//! - Podcast: an episode (catalog row + audio file)

pub mod channel;
pub mod podcast;

pub use channel::{Channel, ChannelUpdate, ChannelUpdateBody, INVALID_ID};
pub use podcast::{ListForm, Podcast, PodcastUpdate};
