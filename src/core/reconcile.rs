//! Lazy reconciliation of catalog listings against the content tree.
//!
//! Every read of a channel or episode list passes through here. Entries whose
//! backing content is gone are dropped from the result and their catalog rows
//! deleted on the spot. A failed delete is logged and retried on the next read.

use tracing::warn;

use crate::domain::{Channel, Podcast};
use crate::library::{CatalogStore, ContentTree};

/// Keep channels whose directory exists; delete the rest from the catalog
pub async fn live_channels(
    catalog: &dyn CatalogStore,
    tree: &dyn ContentTree,
    channels: Vec<Channel>,
) -> Vec<Channel> {
    let mut live = Vec::with_capacity(channels.len());

    for channel in channels {
        if tree.dir_exists(&channel.alias).await {
            live.push(channel);
            continue;
        }

        warn!(
            channel = channel.id,
            alias = %channel.alias,
            "Channel directory missing, dropping stale row"
        );
        if let Err(e) = catalog.delete_channel(channel.id) {
            warn!(channel = channel.id, error = %e, "Failed to delete stale channel");
        }
    }

    live
}

/// Keep podcasts whose file exists under `alias`; delete the rest from the catalog
pub async fn live_podcasts(
    catalog: &dyn CatalogStore,
    tree: &dyn ContentTree,
    alias: &str,
    podcasts: Vec<Podcast>,
) -> Vec<Podcast> {
    let mut live = Vec::with_capacity(podcasts.len());

    for podcast in podcasts {
        if tree.file_exists(alias, &podcast.filename).await {
            live.push(podcast);
            continue;
        }

        warn!(
            podcast = podcast.id,
            alias = %alias,
            filename = %podcast.filename,
            "Episode file missing, dropping stale row"
        );
        if let Err(e) = catalog.delete_podcast(podcast.id) {
            warn!(podcast = podcast.id, error = %e, "Failed to delete stale podcast");
        }
    }

    live
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use async_trait::async_trait;
    use tokio::fs::File;

    use super::*;
    use crate::domain::ListForm;
    use crate::library::{CatalogError, ContentError, SqliteCatalog};

    /// Tree that only knows which paths exist
    #[derive(Default)]
    struct PresenceTree {
        dirs: HashSet<String>,
        files: HashSet<(String, String)>,
    }

    impl PresenceTree {
        fn with_dirs(dirs: &[&str]) -> Self {
            Self {
                dirs: dirs.iter().map(|d| d.to_string()).collect(),
                ..Default::default()
            }
        }

        fn with_files(alias: &str, files: &[&str]) -> Self {
            Self {
                files: files
                    .iter()
                    .map(|f| (alias.to_string(), f.to_string()))
                    .collect(),
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl ContentTree for PresenceTree {
        async fn dir_exists(&self, alias: &str) -> bool {
            self.dirs.contains(alias)
        }

        async fn file_exists(&self, alias: &str, filename: &str) -> bool {
            self.files
                .contains(&(alias.to_string(), filename.to_string()))
        }

        async fn create_channel_dir(&self, _id: i64) -> Result<(), ContentError> {
            Ok(())
        }

        async fn remove_channel_dir(&self, _alias: &str) -> Result<(), ContentError> {
            Ok(())
        }

        async fn remove_file(&self, _alias: &str, _filename: &str) -> Result<(), ContentError> {
            Ok(())
        }

        async fn remove_cover_file(&self, _alias: &str, _f: &str) -> Result<(), ContentError> {
            Ok(())
        }

        async fn rename_channel_dir(&self, _old: &str, new: &str) -> Result<(), ContentError> {
            Err(ContentError::InvalidName(new.to_string()))
        }

        async fn open_for_write(&self, _alias: &str, f: &str) -> Result<File, ContentError> {
            Err(ContentError::InvalidName(f.to_string()))
        }

        async fn open_cover_for_write(&self, _alias: &str, f: &str) -> Result<File, ContentError> {
            Err(ContentError::InvalidName(f.to_string()))
        }
    }

    fn catalog_with_channels(aliases: &[&str]) -> SqliteCatalog {
        let catalog = SqliteCatalog::open_in_memory().unwrap();
        for alias in aliases {
            let id = catalog.add_channel().unwrap();
            let mut channel = catalog.channel_info(id).unwrap();
            channel.alias = alias.to_string();
            catalog.update_channel(&channel).unwrap();
        }
        catalog
    }

    #[tokio::test]
    async fn test_all_channels_live() {
        let catalog = catalog_with_channels(&["a", "b", "c"]);
        let tree = PresenceTree::with_dirs(&["a", "b", "c"]);

        let listed = catalog.list_channels().unwrap();
        let live = live_channels(&catalog, &tree, listed.clone()).await;

        assert_eq!(live, listed);
    }

    #[tokio::test]
    async fn test_missing_channel_dir_is_dropped_and_deleted() {
        let catalog = catalog_with_channels(&["a", "b", "c"]);
        let tree = PresenceTree::with_dirs(&["a", "c"]);

        let live = live_channels(&catalog, &tree, catalog.list_channels().unwrap()).await;

        let aliases: Vec<&str> = live.iter().map(|c| c.alias.as_str()).collect();
        assert_eq!(aliases, vec!["a", "c"]);
        assert_eq!(catalog.list_channels().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_missing_episode_file_is_dropped_in_order() {
        let catalog = catalog_with_channels(&["show"]);
        for name in ["1.mp3", "2.mp3", "3.mp3"] {
            catalog.add_podcast(1, name, name, "1").unwrap();
        }
        let tree = PresenceTree::with_files("show", &["1.mp3", "3.mp3"]);

        let listed = catalog.list_podcasts(1, ListForm::Summary).unwrap();
        let live = live_podcasts(&catalog, &tree, "show", listed).await;

        let names: Vec<&str> = live.iter().map(|p| p.filename.as_str()).collect();
        assert_eq!(names, vec!["3.mp3", "1.mp3"]);
        assert_eq!(catalog.list_podcasts(1, ListForm::Full).unwrap().len(), 2);
    }

    /// Catalog whose deletes always fail
    struct BrokenDeletes(SqliteCatalog);

    impl CatalogStore for BrokenDeletes {
        fn add_channel(&self) -> Result<i64, CatalogError> {
            self.0.add_channel()
        }
        fn channel_info(&self, id: i64) -> Result<Channel, CatalogError> {
            self.0.channel_info(id)
        }
        fn update_channel(&self, channel: &Channel) -> Result<(), CatalogError> {
            self.0.update_channel(channel)
        }
        fn delete_channel(&self, _id: i64) -> Result<(), CatalogError> {
            Err(CatalogError::Poisoned)
        }
        fn list_channels(&self) -> Result<Vec<Channel>, CatalogError> {
            self.0.list_channels()
        }
        fn swap_alias_for_id(&self, alias: &str) -> Result<i64, CatalogError> {
            self.0.swap_alias_for_id(alias)
        }
        fn swap_id_for_alias(&self, id: i64) -> Result<String, CatalogError> {
            self.0.swap_id_for_alias(id)
        }
        fn add_podcast(
            &self,
            channel: i64,
            filename: &str,
            title: &str,
            length: &str,
        ) -> Result<Podcast, CatalogError> {
            self.0.add_podcast(channel, filename, title, length)
        }
        fn podcast_info(&self, id: i64) -> Result<Podcast, CatalogError> {
            self.0.podcast_info(id)
        }
        fn list_podcasts(&self, channel: i64, form: ListForm) -> Result<Vec<Podcast>, CatalogError> {
            self.0.list_podcasts(channel, form)
        }
        fn update_podcast(&self, podcast: &Podcast) -> Result<(), CatalogError> {
            self.0.update_podcast(podcast)
        }
        fn delete_podcast(&self, _id: i64) -> Result<(), CatalogError> {
            Err(CatalogError::Poisoned)
        }
        fn swap_id_for_filename(&self, podcast: i64) -> Result<String, CatalogError> {
            self.0.swap_id_for_filename(podcast)
        }
    }

    #[tokio::test]
    async fn test_failed_delete_does_not_abort_read() {
        let catalog = BrokenDeletes(catalog_with_channels(&["a", "b"]));
        let tree = PresenceTree::with_dirs(&["b"]);

        let live = live_channels(&catalog, &tree, catalog.list_channels().unwrap()).await;

        assert_eq!(live.len(), 1);
        assert_eq!(live[0].alias, "b");
        // Row survives for the next read to retry
        assert_eq!(catalog.list_channels().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_same_stale_snapshot_reconciled_twice() {
        let catalog = catalog_with_channels(&["show"]);
        catalog.add_podcast(1, "gone.mp3", "gone", "1").unwrap();
        let tree = PresenceTree::default();

        // Two readers observed the same stale row before either repaired it
        let snapshot = catalog.list_podcasts(1, ListForm::Full).unwrap();
        let first = live_podcasts(&catalog, &tree, "show", snapshot.clone()).await;
        let second = live_podcasts(&catalog, &tree, "show", snapshot).await;

        assert!(first.is_empty());
        assert!(second.is_empty());
        assert!(catalog.podcast_info(1).unwrap_err().is_not_found());
    }
}
