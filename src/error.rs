use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures that terminate a book job.
///
/// Components return these unmodified; only the application edges wrap them
/// with `anyhow` context.
#[derive(Debug, Error)]
pub enum Error {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("request to {url} returned status {code}")]
    HttpStatus { url: String, code: u16 },

    #[error("malformed descriptor from {url}: {source}")]
    MalformedDescriptor {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("archive generation failed: {0}")]
    Archive(String),

    #[error("cannot resolve url {input:?}: {source}")]
    InvalidUrl {
        input: String,
        #[source]
        source: url::ParseError,
    },

    #[error("image url has no file name: {0}")]
    InvalidImagePath(String),
}

impl Error {
    pub fn transport(
        url: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Transport {
            url: url.into(),
            source: source.into(),
        }
    }

    /// HTTP status code for [`Error::HttpStatus`], `None` otherwise.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::HttpStatus { code, .. } => Some(*code),
            _ => None,
        }
    }
}
