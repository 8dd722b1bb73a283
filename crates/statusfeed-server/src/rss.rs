//! RSS 2.0 rendering for the feed endpoint.

use std::fmt::Write;

use statusfeed_core::models::FeedEntry;
use statusfeed_core::util::escape_markup;

/// Channel-level metadata of the feed.
#[derive(Debug, Clone)]
pub struct Channel {
    pub title: String,
    /// The status page the feed reports on; also used as every item's link.
    pub link: String,
    pub description: String,
    pub language: String,
    pub generator: String,
}

impl Channel {
    pub fn for_site(site_name: &str, status_page_url: &str) -> Self {
        Self {
            title: format!("{site_name} Services Status"),
            link: status_page_url.to_string(),
            description: format!(
                "Providing the current status of {site_name} services through RSS!"
            ),
            language: "en".to_string(),
            generator: concat!("statusfeed ", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Render `entries` (already newest first) as an RSS 2.0 document.
///
/// Item descriptions hold HTML, so they are escaped once more to survive
/// as XML character data.
pub fn render(channel: &Channel, entries: &[FeedEntry]) -> String {
    let mut xml = String::new();

    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    xml.push('\n');
    xml.push_str(r#"<rss version="2.0"><channel>"#);
    element(&mut xml, "title", &channel.title);
    element(&mut xml, "link", &channel.link);
    element(&mut xml, "description", &channel.description);
    element(&mut xml, "language", &channel.language);
    element(&mut xml, "generator", &channel.generator);

    for entry in entries {
        xml.push_str("<item>");
        element(&mut xml, "title", &entry.title);
        element(&mut xml, "link", &channel.link);
        element(&mut xml, "description", &entry.description);
        let _ = write!(
            xml,
            r#"<guid isPermaLink="false">statusfeed-{}</guid>"#,
            entry.id
        );
        element(&mut xml, "pubDate", &entry.published_at.to_rfc2822());
        xml.push_str("</item>");
    }

    xml.push_str("</channel></rss>");
    xml
}

fn element(xml: &mut String, name: &str, text: &str) {
    let _ = write!(xml, "<{name}>{}</{name}>", escape_markup(text));
}
