//! Feed Integration Tests
//!
//! Channel setup through the publisher, then the rendered RSS document.

use std::sync::Arc;

use podhost::domain::{ChannelUpdate, PodcastUpdate};
use podhost::library::{FsContentTree, SqliteCatalog};
use podhost::Publisher;
use tempfile::TempDir;

const HOST: &str = "https://pods.example/shows";

fn create_publisher() -> (Publisher, TempDir) {
    let temp = TempDir::new().unwrap();
    let catalog = Arc::new(SqliteCatalog::open(temp.path()).unwrap());
    let tree = Arc::new(FsContentTree::under(temp.path()));
    (Publisher::new(catalog, tree, HOST), temp)
}

async fn news_channel(publisher: &Publisher) -> i64 {
    let id = publisher.create_channel().await.unwrap().channel.id;
    let reply = publisher
        .update_channel(
            id,
            ChannelUpdate {
                alias: "news".to_string(),
                title: "Daily News".to_string(),
                author: "Newsroom".to_string(),
                description: "Headlines & more".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(!reply.error);
    id
}

#[tokio::test]
async fn test_feed_end_to_end() {
    let (publisher, _temp) = create_publisher();
    let channel = news_channel(&publisher).await;

    publisher
        .upload_cover(channel, "art.png", b"png")
        .await
        .unwrap();
    let first = publisher
        .upload_podcast(channel, "monday.mp3", "1000", b"mp3")
        .await
        .unwrap();
    let second = publisher
        .upload_podcast(channel, "tuesday.m4a", "2000", b"m4a")
        .await
        .unwrap();
    publisher
        .update_podcast(
            channel,
            second.id,
            PodcastUpdate {
                title: "Tuesday".to_string(),
                length: 2000,
                duration: 600,
                explicit: 1,
                episode: 2,
                ..Default::default()
            },
        )
        .unwrap();

    let xml = publisher.feed("news").await.unwrap();

    assert!(xml.starts_with("<?xml"));
    assert!(xml.contains("<title>Daily News</title>"));
    assert!(xml.contains("<itunes:author>Newsroom</itunes:author>"));
    assert!(xml.contains("<description>Headlines &amp; more</description>"));
    assert!(xml.contains(
        r#"<itunes:image href="https://pods.example/shows/files/news/cover/art.png"/>"#
    ));
    assert!(xml.contains(
        r#"<enclosure url="https://pods.example/shows/files/news/tuesday.m4a" length="2000" type="audio/x-m4a"/>"#
    ));
    assert!(xml.contains(
        r#"<enclosure url="https://pods.example/shows/files/news/monday.mp3" length="1000" type="audio/mpeg"/>"#
    ));
    assert!(xml.contains("<itunes:explicit>true</itunes:explicit>"));
    assert!(xml.contains("<itunes:episode>2</itunes:episode>"));

    // Newest first, and the generated guid is present
    let tuesday = xml.find("tuesday.m4a").unwrap();
    let monday = xml.find("monday.mp3").unwrap();
    assert!(tuesday < monday);
    let stored = publisher.podcast_info(channel, second.id).unwrap();
    assert!(xml.contains(&format!("<guid>{}</guid>", stored.guid)));
    assert_eq!(first.title, "monday");
}

#[tokio::test]
async fn test_feed_is_stable_between_requests() {
    let (publisher, _temp) = create_publisher();
    let channel = news_channel(&publisher).await;
    publisher
        .upload_podcast(channel, "ep.mp3", "10", b"x")
        .await
        .unwrap();

    let first = publisher.feed("news").await.unwrap();
    let second = publisher.feed("news").await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_feed_follows_alias_rename() {
    let (publisher, _temp) = create_publisher();
    let channel = news_channel(&publisher).await;
    publisher
        .upload_podcast(channel, "ep.mp3", "10", b"x")
        .await
        .unwrap();

    publisher
        .update_channel(
            channel,
            ChannelUpdate {
                alias: "headlines".to_string(),
                title: "Daily News".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert!(publisher.feed("news").await.is_err());
    let xml = publisher.feed("headlines").await.unwrap();
    assert!(xml.contains("https://pods.example/shows/files/headlines/ep.mp3"));
}
