//! Catalog of channels and podcasts.
//!
//! Relational metadata lives in a single SQLite file next to the content
//! tree. The catalog knows nothing about files: whether a row is backed by
//! real content is decided by the reconciler.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use thiserror::Error;
use tracing::{debug, info};

use crate::domain::{Channel, ListForm, Podcast};

/// Catalog database filename, created under the storage root
pub const CATALOG_FILE: &str = "podhost.db";

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS channels (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        alias TEXT UNIQUE,
        title TEXT NOT NULL DEFAULT '',
        description TEXT NOT NULL DEFAULT '',
        cover TEXT NOT NULL DEFAULT '',
        author TEXT NOT NULL DEFAULT ''
    );
    CREATE TABLE IF NOT EXISTS podcasts (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        channel INTEGER NOT NULL,
        filename TEXT NOT NULL,
        published INTEGER NOT NULL DEFAULT 0,
        title TEXT NOT NULL DEFAULT '',
        length INTEGER NOT NULL DEFAULT 0,
        guid TEXT NOT NULL DEFAULT '',
        pub_date TEXT NOT NULL DEFAULT '',
        description TEXT NOT NULL DEFAULT '',
        duration INTEGER NOT NULL DEFAULT 0,
        artwork TEXT NOT NULL DEFAULT '',
        explicit INTEGER NOT NULL DEFAULT 0,
        season INTEGER NOT NULL DEFAULT 0,
        episode INTEGER NOT NULL DEFAULT 0
    );
    CREATE INDEX IF NOT EXISTS podcasts_channel ON podcasts (channel);
";

const CHANNEL_COLUMNS: &str = "id, COALESCE(alias, ''), title, description, cover, author";

const PODCAST_FULL_COLUMNS: &str = "id, channel, filename, published, title, length, guid, \
     pub_date, description, duration, artwork, explicit, season, episode";

const PODCAST_SUMMARY_COLUMNS: &str = "id, channel, filename, title";

/// Errors reported by the catalog
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    #[error("Invalid length: {0:?} is not a byte count")]
    InvalidLength(String),

    #[error("Alias already taken: {0}")]
    AliasTaken(String),

    #[error("Database error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("Catalog connection poisoned")]
    Poisoned,
}

impl CatalogError {
    fn channel(key: impl ToString) -> Self {
        Self::NotFound {
            entity: "channel",
            key: key.to_string(),
        }
    }

    fn podcast(key: impl ToString) -> Self {
        Self::NotFound {
            entity: "podcast",
            key: key.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Persistence operations over channels and podcasts
pub trait CatalogStore: Send + Sync {
    /// Insert an empty channel and return its fresh id
    fn add_channel(&self) -> Result<i64, CatalogError>;

    fn channel_info(&self, id: i64) -> Result<Channel, CatalogError>;

    /// Persist every field of `channel` under `channel.id`
    fn update_channel(&self, channel: &Channel) -> Result<(), CatalogError>;

    /// Delete a channel together with all of its podcasts
    fn delete_channel(&self, id: i64) -> Result<(), CatalogError>;

    /// All channels in insertion order
    fn list_channels(&self) -> Result<Vec<Channel>, CatalogError>;

    fn swap_alias_for_id(&self, alias: &str) -> Result<i64, CatalogError>;

    fn swap_id_for_alias(&self, id: i64) -> Result<String, CatalogError>;

    /// Insert a podcast row. `length` is the decimal byte count sent by the uploader.
    fn add_podcast(
        &self,
        channel: i64,
        filename: &str,
        title: &str,
        length: &str,
    ) -> Result<Podcast, CatalogError>;

    fn podcast_info(&self, id: i64) -> Result<Podcast, CatalogError>;

    /// Podcasts of a channel, newest (highest id) first
    fn list_podcasts(&self, channel: i64, form: ListForm) -> Result<Vec<Podcast>, CatalogError>;

    /// Persist metadata columns. Owner and filename never change.
    fn update_podcast(&self, podcast: &Podcast) -> Result<(), CatalogError>;

    /// Delete a podcast row. Deleting a missing row is not an error.
    fn delete_podcast(&self, id: i64) -> Result<(), CatalogError>;

    fn swap_id_for_filename(&self, podcast: i64) -> Result<String, CatalogError>;
}

/// SQLite-backed catalog
#[derive(Clone)]
pub struct SqliteCatalog {
    conn: Arc<Mutex<Connection>>,
}

impl std::fmt::Debug for SqliteCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteCatalog").finish_non_exhaustive()
    }
}

impl SqliteCatalog {
    /// Open (or create) the catalog file under `root`
    pub fn open(root: &Path) -> Result<Self, CatalogError> {
        let path = root.join(CATALOG_FILE);
        let conn = Connection::open(&path)?;
        info!(path = %path.display(), "Opened catalog");
        Self::with_connection(conn)
    }

    /// Catalog that lives only as long as the process (used by tests)
    pub fn open_in_memory() -> Result<Self, CatalogError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, CatalogError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, CatalogError> {
        self.conn.lock().map_err(|_| CatalogError::Poisoned)
    }
}

fn channel_from_row(row: &Row<'_>) -> rusqlite::Result<Channel> {
    Ok(Channel {
        id: row.get(0)?,
        alias: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        cover: row.get(4)?,
        author: row.get(5)?,
    })
}

fn podcast_from_row(row: &Row<'_>) -> rusqlite::Result<Podcast> {
    Ok(Podcast {
        id: row.get(0)?,
        channel: row.get(1)?,
        filename: row.get(2)?,
        published: row.get(3)?,
        title: row.get(4)?,
        length: row.get(5)?,
        guid: row.get(6)?,
        pub_date: row.get(7)?,
        description: row.get(8)?,
        duration: row.get(9)?,
        artwork: row.get(10)?,
        explicit: row.get(11)?,
        season: row.get(12)?,
        episode: row.get(13)?,
    })
}

fn podcast_summary_from_row(row: &Row<'_>) -> rusqlite::Result<Podcast> {
    Ok(Podcast {
        id: row.get(0)?,
        channel: row.get(1)?,
        filename: row.get(2)?,
        title: row.get(3)?,
        ..Default::default()
    })
}

fn parse_length(length: &str) -> Result<i64, CatalogError> {
    length
        .parse::<u64>()
        .ok()
        .and_then(|n| i64::try_from(n).ok())
        .ok_or_else(|| CatalogError::InvalidLength(length.to_string()))
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation
    )
}

impl CatalogStore for SqliteCatalog {
    fn add_channel(&self) -> Result<i64, CatalogError> {
        let conn = self.lock()?;
        conn.execute("INSERT INTO channels (title) VALUES ('')", [])?;
        let id = conn.last_insert_rowid();
        debug!(channel = id, "Inserted channel row");
        Ok(id)
    }

    fn channel_info(&self, id: i64) -> Result<Channel, CatalogError> {
        let conn = self.lock()?;
        conn.query_row(
            &format!("SELECT {CHANNEL_COLUMNS} FROM channels WHERE id = ?1"),
            params![id],
            channel_from_row,
        )
        .optional()?
        .ok_or_else(|| CatalogError::channel(id))
    }

    fn update_channel(&self, channel: &Channel) -> Result<(), CatalogError> {
        let conn = self.lock()?;
        let changed = conn
            .execute(
                "UPDATE channels SET alias = NULLIF(?1, ''), title = ?2, description = ?3, \
                 cover = ?4, author = ?5 WHERE id = ?6",
                params![
                    channel.alias,
                    channel.title,
                    channel.description,
                    channel.cover,
                    channel.author,
                    channel.id
                ],
            )
            .map_err(|e| {
                if is_unique_violation(&e) {
                    CatalogError::AliasTaken(channel.alias.clone())
                } else {
                    CatalogError::Store(e)
                }
            })?;

        if changed == 0 {
            return Err(CatalogError::channel(channel.id));
        }
        Ok(())
    }

    fn delete_channel(&self, id: i64) -> Result<(), CatalogError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let podcasts = tx.execute("DELETE FROM podcasts WHERE channel = ?1", params![id])?;
        tx.execute("DELETE FROM channels WHERE id = ?1", params![id])?;
        tx.commit()?;
        debug!(channel = id, podcasts, "Deleted channel rows");
        Ok(())
    }

    fn list_channels(&self) -> Result<Vec<Channel>, CatalogError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!("SELECT {CHANNEL_COLUMNS} FROM channels ORDER BY id"))?;
        let channels = stmt
            .query_map([], channel_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(channels)
    }

    fn swap_alias_for_id(&self, alias: &str) -> Result<i64, CatalogError> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT id FROM channels WHERE alias = ?1",
            params![alias],
            |r| r.get(0),
        )
        .optional()?
        .ok_or_else(|| CatalogError::channel(alias))
    }

    fn swap_id_for_alias(&self, id: i64) -> Result<String, CatalogError> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT COALESCE(alias, '') FROM channels WHERE id = ?1",
            params![id],
            |r| r.get(0),
        )
        .optional()?
        .ok_or_else(|| CatalogError::channel(id))
    }

    fn add_podcast(
        &self,
        channel: i64,
        filename: &str,
        title: &str,
        length: &str,
    ) -> Result<Podcast, CatalogError> {
        let length = parse_length(length)?;

        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO podcasts (channel, filename, title, length) VALUES (?1, ?2, ?3, ?4)",
            params![channel, filename, title, length],
        )?;

        Ok(Podcast {
            id: conn.last_insert_rowid(),
            channel,
            filename: filename.to_string(),
            title: title.to_string(),
            length,
            ..Default::default()
        })
    }

    fn podcast_info(&self, id: i64) -> Result<Podcast, CatalogError> {
        let conn = self.lock()?;
        conn.query_row(
            &format!("SELECT {PODCAST_FULL_COLUMNS} FROM podcasts WHERE id = ?1"),
            params![id],
            podcast_from_row,
        )
        .optional()?
        .ok_or_else(|| CatalogError::podcast(id))
    }

    fn list_podcasts(&self, channel: i64, form: ListForm) -> Result<Vec<Podcast>, CatalogError> {
        let (columns, map): (_, fn(&Row<'_>) -> rusqlite::Result<Podcast>) = match form {
            ListForm::Summary => (PODCAST_SUMMARY_COLUMNS, podcast_summary_from_row),
            ListForm::Full => (PODCAST_FULL_COLUMNS, podcast_from_row),
        };

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {columns} FROM podcasts WHERE channel = ?1 ORDER BY id DESC"
        ))?;
        let podcasts = stmt
            .query_map(params![channel], map)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(podcasts)
    }

    fn update_podcast(&self, p: &Podcast) -> Result<(), CatalogError> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE podcasts SET published = ?1, title = ?2, length = ?3, guid = ?4, \
             pub_date = ?5, description = ?6, duration = ?7, artwork = ?8, explicit = ?9, \
             season = ?10, episode = ?11 WHERE id = ?12",
            params![
                p.published,
                p.title,
                p.length,
                p.guid,
                p.pub_date,
                p.description,
                p.duration,
                p.artwork,
                p.explicit,
                p.season,
                p.episode,
                p.id
            ],
        )?;

        if changed == 0 {
            return Err(CatalogError::podcast(p.id));
        }
        Ok(())
    }

    fn delete_podcast(&self, id: i64) -> Result<(), CatalogError> {
        let conn = self.lock()?;
        let removed = conn.execute("DELETE FROM podcasts WHERE id = ?1", params![id])?;
        if removed == 0 {
            debug!(podcast = id, "Podcast row already gone");
        }
        Ok(())
    }

    fn swap_id_for_filename(&self, podcast: i64) -> Result<String, CatalogError> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT filename FROM podcasts WHERE id = ?1",
            params![podcast],
            |r| r.get(0),
        )
        .optional()?
        .ok_or_else(|| CatalogError::podcast(podcast))
    }
}
