use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::error::{Error, Result};

static LIBRARY_VIEW_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^/library/view/(.+?)/(\d+)/").expect("library view pattern is valid")
});

/// A book addressed by its library-view page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookRef {
    /// Title slug from the page URL; also the archive's base file name.
    pub slug: String,
    pub id: String,
}

impl BookRef {
    /// Extracts the book from a library-view URL on `origin`.
    ///
    /// Returns `None` for any other host, scheme, or path.
    pub fn from_page_url(page_url: &str, origin: &Url) -> Option<Self> {
        let url = Url::parse(page_url).ok()?;
        if !is_same_origin(&url, origin) {
            return None;
        }
        let captures = LIBRARY_VIEW_PATH.captures(url.path())?;
        Some(Self {
            slug: captures[1].to_owned(),
            id: captures[2].to_owned(),
        })
    }
}

fn is_same_origin(url: &Url, origin: &Url) -> bool {
    url.scheme() == origin.scheme()
        && url.host_str() == origin.host_str()
        && url.port_or_known_default() == origin.port_or_known_default()
}

/// Backend URLs for one origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    origin: Url,
    cover_size: String,
}

impl Endpoints {
    pub fn new(origin: Url, cover_size: impl Into<String>) -> Self {
        Self {
            origin,
            cover_size: cover_size.into(),
        }
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    pub fn toc(&self, book: &BookRef) -> Result<Url> {
        let mut url = self.resolve("/nest/epub/toc/")?;
        url.query_pairs_mut().append_pair("book_id", &book.id);
        Ok(url)
    }

    pub fn cover(&self, book: &BookRef) -> Result<Url> {
        self.resolve(&format!("/library/cover/{}/{}/", book.id, self.cover_size))
    }

    /// Resolves an image reference from a page descriptor against the book's
    /// library-view directory. `..\` segments are dropped; `../` is resolved
    /// like any relative URL.
    pub fn image(&self, book: &BookRef, reference: &str) -> Result<Url> {
        let cleaned = reference.replace("..\\", "");
        let base = self.resolve(&format!("/library/view/{}/{}/", book.slug, book.id))?;
        base.join(&cleaned).map_err(|source| Error::InvalidUrl {
            input: cleaned,
            source,
        })
    }

    /// Resolves an absolute URL or an origin-relative path.
    pub fn resolve(&self, input: &str) -> Result<Url> {
        self.origin.join(input).map_err(|source| Error::InvalidUrl {
            input: input.to_owned(),
            source,
        })
    }
}

/// Last path segment of `url`, used as the stored file name of an image.
pub fn file_name(url: &Url) -> Option<&str> {
    url.path_segments()?
        .next_back()
        .filter(|segment| !segment.is_empty())
}
