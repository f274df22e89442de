use base64::Engine as _;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "encoding", content = "data", rename_all = "snake_case")]
pub enum Payload {
    Text(String),
    Base64(String),
}

impl Payload {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self::Base64(base64::engine::general_purpose::STANDARD.encode(bytes))
    }

    pub fn is_binary(&self) -> bool {
        matches!(self, Self::Base64(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageArtifact {
    pub path: String,
    pub label: String,
    pub order: i64,
    pub depth: u32,
    pub payload: Payload,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageArtifact {
    pub path: String,
    pub payload: Payload,
    /// The cover lives at the package root instead of `assets/`.
    pub cover: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Artifact {
    Page(PageArtifact),
    Image(ImageArtifact),
}

impl Artifact {
    pub fn path(&self) -> &str {
        match self {
            Self::Page(page) => &page.path,
            Self::Image(image) => &image.path,
        }
    }

    pub fn payload(&self) -> &Payload {
        match self {
            Self::Page(page) => &page.payload,
            Self::Image(image) => &image.payload,
        }
    }

    pub fn is_cover(&self) -> bool {
        matches!(self, Self::Image(image) if image.cover)
    }
}
