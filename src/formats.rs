use serde::{Deserialize, Serialize};

/// Media type of entries that belong in the reading spine.
pub const XHTML_MEDIA_TYPE: &str = "application/xhtml+xml";

/// Deepest navigation level; deeper entries are attached at this level.
pub const MAX_NAV_DEPTH: u32 = 32;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TocDescriptor {
    pub book_id: String,
    pub title: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<Publisher>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pub_date: Option<String>,
    pub items: Vec<TocEntry>,
}

impl TocDescriptor {
    pub fn authors_display(&self) -> String {
        self.authors.join(", ")
    }

    pub fn max_depth(&self) -> u32 {
        self.items.iter().map(TocEntry::nav_depth).max().unwrap_or(0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Publisher {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TocEntry {
    /// 1-based nesting depth.
    pub depth: u32,
    pub order: i64,
    pub id: String,
    /// Target path inside the package root; may carry a `#fragment`.
    pub href: String,
    pub media_type: String,
    pub label: String,
    /// Backend path of this entry's page descriptor.
    pub url: String,
}

impl TocEntry {
    /// `depth` limited to `1..=MAX_NAV_DEPTH`.
    pub fn nav_depth(&self) -> u32 {
        self.depth.clamp(1, MAX_NAV_DEPTH)
    }

    pub fn href_without_fragment(&self) -> &str {
        strip_fragment(&self.href)
    }

    pub fn is_content_document(&self) -> bool {
        self.media_type == XHTML_MEDIA_TYPE
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageDescriptor {
    /// URL of the content body.
    pub content: String,
    pub full_path: String,
    pub title: String,
    #[serde(default)]
    pub images: Vec<String>,
}

pub fn strip_fragment(path: &str) -> &str {
    match path.split_once('#') {
        Some((path, _)) => path,
        None => path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toc_descriptor_parses_optional_metadata() {
        let raw = r#"{
            "book_id": "9781449331818",
            "title": "Learning Things",
            "items": [
                {"depth": 1, "order": 0, "id": "ch01", "href": "ch01.html#top",
                 "media_type": "application/xhtml+xml", "label": "One",
                 "url": "/api/v1/book/9781449331818/chapter/ch01.html"}
            ]
        }"#;
        let toc: TocDescriptor = serde_json::from_str(raw).unwrap();
        assert!(toc.authors.is_empty());
        assert!(toc.publisher.is_none());
        assert_eq!(toc.items[0].href_without_fragment(), "ch01.html");
        assert!(toc.items[0].is_content_document());
        assert_eq!(toc.max_depth(), 1);
    }

    #[test]
    fn page_descriptor_defaults_images() {
        let raw = r#"{"content": "https://x/ch01.html", "full_path": "ch01.html", "title": "One"}"#;
        let page: PageDescriptor = serde_json::from_str(raw).unwrap();
        assert!(page.images.is_empty());
    }

    #[test]
    fn strip_fragment_keeps_plain_paths() {
        assert_eq!(strip_fragment("a/b.html"), "a/b.html");
        assert_eq!(strip_fragment("a/b.html#sec"), "a/b.html");
    }
}
