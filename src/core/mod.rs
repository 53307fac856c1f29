//! Publishing logic.
//!
//! This module contains:
//! - Addressing: id / alias / filename lookups and public URLs
//! - Reconcile: lazy repair of catalog rows whose content is gone
//! - Feed: RSS projection of a channel
//! - Publisher: the operations exposed over HTTP

pub mod addressing;
pub mod feed;
pub mod publisher;
pub mod reconcile;

pub use addressing::{cover_url, enclosure_url, Addressing, AliasOutcome};
pub use feed::{mime_type, project, FeedError, Rss};
pub use publisher::{
    ChannelView, ErrorKind, Overview, PendingUpload, PublishError, Publisher, UpdateReply,
};
pub use reconcile::{live_channels, live_podcasts};
