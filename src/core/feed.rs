//! RSS 2.0 / iTunes feed projection.
//!
//! [`project`] turns a channel and its live episodes into an [`Rss`] document
//! without touching any store; [`Rss::to_xml`] renders it. Same input, same
//! bytes.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use thiserror::Error;

use super::addressing::{cover_url, enclosure_url};
use crate::domain::{Channel, Podcast};
use crate::library::split_extension;

pub const RSS_VERSION: &str = "2.0";
pub const ITUNES_NS: &str = "http://www.itunes.com/dtds/podcast-1.0.dtd";
pub const CONTENT_NS: &str = "http://purl.org/rss/1.0/modules/content/";

pub const MIME_MPEG: &str = "audio/mpeg";
pub const MIME_M4A: &str = "audio/x-m4a";

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Failed to write feed XML: {0}")]
    Xml(String),
}

/// Feed document root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rss {
    pub channel: FeedChannel,
}

/// Show-level feed fields. Empty strings are omitted on output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedChannel {
    pub title: String,
    pub link: String,
    pub copyright: String,
    pub author: String,
    pub description: String,
    /// `itunes:type` (episodic / serial)
    pub show_type: String,
    /// Absolute cover URL for `itunes:image`
    pub image: String,
    pub items: Vec<Item>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Item {
    pub title: String,
    pub enclosure: Enclosure,
    pub guid: String,
    pub pub_date: String,
    pub description: String,
    pub duration: i64,
    pub link: String,
    pub explicit: bool,
    pub season: i64,
    pub episode: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Enclosure {
    pub url: String,
    pub length: i64,
    pub mime: &'static str,
}

/// MIME type from the filename extension: `m4a` is AAC, everything else MP3
pub fn mime_type(filename: &str) -> &'static str {
    match split_extension(filename) {
        (_, "m4a") => MIME_M4A,
        _ => MIME_MPEG,
    }
}

/// Build the feed for `channel` from episodes already in feed order
pub fn project(channel: &Channel, podcasts: &[Podcast], host: &str) -> Rss {
    let items = podcasts
        .iter()
        .map(|p| Item {
            title: p.title.clone(),
            enclosure: Enclosure {
                url: enclosure_url(host, &channel.alias, &p.filename),
                length: p.length,
                mime: mime_type(&p.filename),
            },
            guid: p.guid.clone(),
            pub_date: p.pub_date.clone(),
            description: p.description.clone(),
            duration: p.duration,
            link: String::new(),
            explicit: p.is_explicit(),
            season: p.season,
            episode: p.episode,
        })
        .collect();

    Rss {
        channel: FeedChannel {
            title: channel.title.clone(),
            author: channel.author.clone(),
            description: channel.description.clone(),
            image: cover_url(host, &channel.alias, &channel.cover),
            items,
            ..Default::default()
        },
    }
}

struct XmlOut {
    writer: Writer<Vec<u8>>,
}

impl XmlOut {
    fn new() -> Self {
        Self {
            writer: Writer::new(Vec::new()),
        }
    }

    fn event(&mut self, event: Event<'_>) -> Result<(), FeedError> {
        self.writer
            .write_event(event)
            .map_err(|e| FeedError::Xml(e.to_string()))
    }

    fn end(&mut self, name: &str) -> Result<(), FeedError> {
        self.event(Event::End(BytesEnd::new(name)))
    }

    fn element(&mut self, name: &str, text: &str) -> Result<(), FeedError> {
        self.event(Event::Start(BytesStart::new(name)))?;
        self.event(Event::Text(BytesText::new(text)))?;
        self.end(name)
    }

    fn optional(&mut self, name: &str, text: &str) -> Result<(), FeedError> {
        if text.is_empty() {
            return Ok(());
        }
        self.element(name, text)
    }

    fn optional_number(&mut self, name: &str, value: i64) -> Result<(), FeedError> {
        if value == 0 {
            return Ok(());
        }
        self.element(name, &value.to_string())
    }

    fn finish(self) -> Result<String, FeedError> {
        String::from_utf8(self.writer.into_inner()).map_err(|e| FeedError::Xml(e.to_string()))
    }
}

impl Rss {
    /// Render the document with a leading XML declaration
    pub fn to_xml(&self) -> Result<String, FeedError> {
        let mut out = XmlOut::new();
        out.event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        out.writer.get_mut().push(b'\n');

        let mut rss = BytesStart::new("rss");
        rss.push_attribute(("version", RSS_VERSION));
        rss.push_attribute(("xmlns:itunes", ITUNES_NS));
        rss.push_attribute(("xmlns:content", CONTENT_NS));
        out.event(Event::Start(rss))?;

        self.channel.write(&mut out)?;

        out.end("rss")?;
        out.finish()
    }
}

impl FeedChannel {
    fn write(&self, out: &mut XmlOut) -> Result<(), FeedError> {
        out.event(Event::Start(BytesStart::new("channel")))?;
        out.element("title", &self.title)?;
        out.optional("link", &self.link)?;
        out.optional("copyright", &self.copyright)?;
        out.optional("itunes:author", &self.author)?;
        out.optional("description", &self.description)?;
        out.optional("itunes:type", &self.show_type)?;

        let mut image = BytesStart::new("itunes:image");
        if !self.image.is_empty() {
            image.push_attribute(("href", self.image.as_str()));
        }
        out.event(Event::Empty(image))?;

        for item in &self.items {
            item.write(out)?;
        }

        out.end("channel")
    }
}

impl Item {
    fn write(&self, out: &mut XmlOut) -> Result<(), FeedError> {
        out.event(Event::Start(BytesStart::new("item")))?;
        out.element("title", &self.title)?;

        let length = self.enclosure.length.to_string();
        let mut enclosure = BytesStart::new("enclosure");
        enclosure.push_attribute(("url", self.enclosure.url.as_str()));
        if self.enclosure.length != 0 {
            enclosure.push_attribute(("length", length.as_str()));
        }
        enclosure.push_attribute(("type", self.enclosure.mime));
        out.event(Event::Empty(enclosure))?;

        out.optional("guid", &self.guid)?;
        out.element("pubDate", &self.pub_date)?;
        out.optional("description", &self.description)?;
        out.element("itunes:duration", &self.duration.to_string())?;
        out.optional("link", &self.link)?;
        if self.explicit {
            out.element("itunes:explicit", "true")?;
        }
        out.optional_number("itunes:season", self.season)?;
        out.optional_number("itunes:episode", self.episode)?;

        out.end("item")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOST: &str = "https://pods.example";

    fn channel() -> Channel {
        Channel {
            id: 1,
            alias: "news".to_string(),
            title: "Daily News".to_string(),
            cover: "art.png".to_string(),
            ..Default::default()
        }
    }

    fn podcast(id: i64, filename: &str) -> Podcast {
        Podcast {
            id,
            channel: 1,
            filename: filename.to_string(),
            title: format!("Episode {}", id),
            length: 1000,
            ..Default::default()
        }
    }

    #[test]
    fn test_mime_type() {
        assert_eq!(mime_type("episode.m4a"), MIME_M4A);
        assert_eq!(mime_type("episode.mp3"), MIME_MPEG);
        assert_eq!(mime_type("episode"), MIME_MPEG);
        assert_eq!(mime_type("episode.m4a.mp3"), MIME_MPEG);
        assert_eq!(mime_type("episode.M4A"), MIME_MPEG);
    }

    #[test]
    fn test_project_items() {
        let mut explicit = podcast(2, "b.m4a");
        explicit.explicit = 1;
        let mut odd_flag = podcast(1, "a.mp3");
        odd_flag.explicit = 2;

        let rss = project(&channel(), &[explicit, odd_flag], HOST);

        assert_eq!(rss.channel.image, "https://pods.example/files/news/cover/art.png");
        assert_eq!(rss.channel.items.len(), 2);

        let first = &rss.channel.items[0];
        assert_eq!(first.title, "Episode 2");
        assert_eq!(first.enclosure.url, "https://pods.example/files/news/b.m4a");
        assert_eq!(first.enclosure.mime, MIME_M4A);
        assert!(first.explicit);

        let second = &rss.channel.items[1];
        assert_eq!(second.enclosure.mime, MIME_MPEG);
        assert!(!second.explicit);
    }

    #[test]
    fn test_xml_omits_empty_fields() {
        let mut ep = podcast(1, "a.mp3");
        ep.length = 0;
        let xml = project(&channel(), &[ep], HOST).to_xml().unwrap();

        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<rss"));
        assert!(xml.contains(r#"version="2.0""#));
        assert!(xml.contains(&format!(r#"xmlns:itunes="{}""#, ITUNES_NS)));
        assert!(xml.contains(r#"<enclosure url="https://pods.example/files/news/a.mp3" type="audio/mpeg"/>"#));
        assert!(xml.contains("<pubDate></pubDate>"));
        assert!(xml.contains("<itunes:duration>0</itunes:duration>"));
        for absent in [
            "<link>",
            "<copyright>",
            "<itunes:author>",
            "<description>",
            "<guid>",
            "<itunes:explicit>",
            "<itunes:season>",
            "<itunes:episode>",
        ] {
            assert!(!xml.contains(absent), "unexpected {}", absent);
        }
    }

    #[test]
    fn test_xml_full_item() {
        let mut ep = podcast(5, "a.m4a");
        ep.guid = "5e0be100".to_string();
        ep.pub_date = "Wed, 1 Jan 2020 00:00:00 UTC".to_string();
        ep.description = "Fish & chips <live>".to_string();
        ep.duration = 1800;
        ep.explicit = 1;
        ep.season = 2;
        ep.episode = 7;

        let mut ch = channel();
        ch.author = "Ann".to_string();
        ch.description = "Everything".to_string();

        let xml = project(&ch, &[ep], HOST).to_xml().unwrap();

        assert!(xml.contains("<itunes:author>Ann</itunes:author>"));
        assert!(xml.contains(r#"<itunes:image href="https://pods.example/files/news/cover/art.png"/>"#));
        assert!(xml.contains(r#"length="1000" type="audio/x-m4a""#));
        assert!(xml.contains("<guid>5e0be100</guid>"));
        assert!(xml.contains("<description>Fish &amp; chips &lt;live&gt;</description>"));
        assert!(xml.contains("<itunes:duration>1800</itunes:duration>"));
        assert!(xml.contains("<itunes:explicit>true</itunes:explicit>"));
        assert!(xml.contains("<itunes:season>2</itunes:season>"));
        assert!(xml.contains("<itunes:episode>7</itunes:episode>"));
    }

    #[test]
    fn test_no_cover_keeps_bare_image_tag() {
        let mut ch = channel();
        ch.cover.clear();

        let xml = project(&ch, &[], HOST).to_xml().unwrap();
        assert!(xml.contains("<itunes:image/>"));
        assert!(!xml.contains("href="));
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let episodes = [podcast(3, "c.mp3"), podcast(2, "b.m4a"), podcast(1, "a")];

        let first = project(&channel(), &episodes, HOST).to_xml().unwrap();
        let second = project(&channel(), &episodes, HOST).to_xml().unwrap();
        assert_eq!(first, second);

        let c = first.find("c.mp3").unwrap();
        let b = first.find("b.m4a").unwrap();
        assert!(c < b, "items keep input order");
    }
}
