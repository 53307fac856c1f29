//! podhost - Self-hosted podcast publishing backend
//!
//! Stores podcast shows and episodes, serves the audio files and publishes
//! one RSS/iTunes feed per show.
//!
//! # Architecture
//!
//! State lives in two stores that are kept consistent lazily:
//! - a SQLite catalog of channel and episode metadata
//! - a content tree with one directory per channel, named after its alias
//!
//! Every listing checks catalog rows against the content tree and drops rows
//! whose files are gone.
//!
//! # Modules
//!
//! - `domain`: Data structures (Channel, Podcast)
//! - `library`: The two stores (catalog, content tree)
//! - `core`: Addressing, reconciliation, feed projection, publishing operations
//! - `server`: HTTP transport
//! - `config`, `cli`: Configuration and command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Serve on port 8080, storing everything under /srv/podhost
//! podhost serve --host pods.example.com --root /srv/podhost --port 8080
//!
//! # Check what configuration would be used
//! podhost config --config podhost.yaml
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod library;
pub mod server;

// Re-export main types at crate root for convenience
pub use crate::config::Config;
pub use crate::core::{PublishError, Publisher};
pub use domain::{Channel, Podcast};
pub use library::{FsContentTree, SqliteCatalog};
