//! Reconciliation Integration Tests
//!
//! Out-of-band deletions in the content tree against an on-disk catalog.

use std::sync::Arc;

use podhost::domain::ListForm;
use podhost::library::{CatalogStore, ContentTree, FsContentTree, SqliteCatalog};
use podhost::Publisher;
use tempfile::TempDir;

const HOST: &str = "https://pods.example";

struct Fixture {
    publisher: Publisher,
    catalog: Arc<SqliteCatalog>,
    tree: FsContentTree,
    _temp: TempDir,
}

fn fixture() -> Fixture {
    let temp = TempDir::new().unwrap();
    let catalog = Arc::new(SqliteCatalog::open(temp.path()).unwrap());
    let tree = FsContentTree::under(temp.path());
    let publisher = Publisher::new(catalog.clone(), Arc::new(tree.clone()), HOST);

    Fixture {
        publisher,
        catalog,
        tree,
        _temp: temp,
    }
}

#[tokio::test]
async fn test_deleted_channel_dir_drops_channel() {
    let fx = fixture();
    for _ in 0..4 {
        fx.publisher.create_channel().await.unwrap();
    }

    std::fs::remove_dir_all(fx.tree.root().join("3")).unwrap();

    let listed = fx.publisher.list_channels().await.unwrap();
    let ids: Vec<i64> = listed.iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![1, 2, 4]);

    // The stale row is gone from the catalog too
    assert_eq!(fx.catalog.list_channels().unwrap().len(), 3);
    assert!(fx.catalog.channel_info(3).unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_deleted_episode_file_drops_episode() {
    let fx = fixture();
    fx.publisher.create_channel().await.unwrap();
    for name in ["one.mp3", "two.mp3", "three.mp3"] {
        fx.publisher
            .upload_podcast(1, name, "5", b"audio")
            .await
            .unwrap();
    }

    fx.tree.remove_file("1", "two.mp3").await.unwrap();

    let overview = fx.publisher.overview(1).await.unwrap();
    let names: Vec<&str> = overview
        .podcasts
        .iter()
        .map(|p| p.filename.as_str())
        .collect();
    assert_eq!(names, vec!["three.mp3", "one.mp3"]);
    assert_eq!(fx.catalog.list_podcasts(1, ListForm::Full).unwrap().len(), 2);
}

#[tokio::test]
async fn test_delete_channel_removes_episode_rows_without_files() {
    let fx = fixture();
    fx.publisher.create_channel().await.unwrap();
    fx.publisher
        .upload_podcast(1, "a.mp3", "1", b"a")
        .await
        .unwrap();
    fx.publisher
        .upload_podcast(1, "b.mp3", "1", b"b")
        .await
        .unwrap();
    fx.tree.remove_file("1", "a.mp3").await.unwrap();

    fx.publisher.delete_channel(1).await.unwrap();

    assert!(fx.catalog.list_podcasts(1, ListForm::Full).unwrap().is_empty());
    assert!(!fx.tree.dir_exists("1").await);
    assert!(fx.publisher.list_channels().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_catalog_survives_reopen() {
    let temp = TempDir::new().unwrap();
    {
        let catalog = SqliteCatalog::open(temp.path()).unwrap();
        let id = catalog.add_channel().unwrap();
        catalog.add_podcast(id, "ep.mp3", "ep", "42").unwrap();
    }

    let catalog = SqliteCatalog::open(temp.path()).unwrap();
    let podcasts = catalog.list_podcasts(1, ListForm::Full).unwrap();
    assert_eq!(podcasts.len(), 1);
    assert_eq!(podcasts[0].length, 42);
}
