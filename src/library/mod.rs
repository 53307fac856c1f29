//! Storage for podcast metadata and content.
//!
//! Two independently mutable stores back every channel:
//!
//! ```text
//! <root>/
//! ├── podhost.db                # Catalog: channels + podcasts
//! └── podcasts/
//!     └── <alias>/              # One directory per channel
//!         ├── episode-1.mp3     # Episode files
//!         └── cover/
//!             └── art.png       # Cover images
//! ```

pub mod catalog;
pub mod content;

pub use catalog::{CatalogError, CatalogStore, SqliteCatalog, CATALOG_FILE};
pub use content::{
    disambiguate, split_extension, ContentError, ContentTree, FsContentTree, COVER_DIR,
    PODCASTS_DIR,
};
