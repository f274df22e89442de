use std::collections::HashMap;
use std::io::{Cursor, Write as _};

use async_trait::async_trait;
use base64::Engine as _;
use zip::write::SimpleFileOptions;

use crate::artifact::{Artifact, Payload};
use crate::error::{Error, Result};
use crate::toc::{NCX_FILE_NAME, NavigationDocuments, OPF_FILE_NAME};

pub const MIMETYPE: &str = "application/epub+zip";
pub const PACKAGE_ROOT: &str = "OEBPS";
pub const ASSETS_DIR: &str = "assets";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveEntry {
    Folder(String),
    File {
        path: String,
        body: Payload,
        /// Store without compression.
        stored: bool,
    },
}

impl ArchiveEntry {
    fn file(path: impl Into<String>, body: Payload) -> Self {
        Self::File {
            path: path.into(),
            body,
            stored: false,
        }
    }

    pub fn path(&self) -> &str {
        match self {
            Self::Folder(path) => path,
            Self::File { path, .. } => path,
        }
    }
}

/// Turns a list of named entries into one archive blob.
#[async_trait]
pub trait ArchiveBuilder: Send + Sync {
    async fn build(&self, entries: Vec<ArchiveEntry>) -> Result<Vec<u8>>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ZipArchiveBuilder;

#[async_trait]
impl ArchiveBuilder for ZipArchiveBuilder {
    async fn build(&self, entries: Vec<ArchiveEntry>) -> Result<Vec<u8>> {
        tokio::task::spawn_blocking(move || build_zip_blocking(&entries))
            .await
            .map_err(|err| Error::Archive(format!("join zip task: {err}")))?
    }
}

fn build_zip_blocking(entries: &[ArchiveEntry]) -> Result<Vec<u8>> {
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));

    let stored_options = SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Stored)
        .unix_permissions(0o644);
    let deflated_options = SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated)
        .unix_permissions(0o644);

    for entry in entries {
        match entry {
            ArchiveEntry::Folder(path) => {
                zip.add_directory(path.as_str(), deflated_options)
                    .map_err(|err| Error::Archive(format!("add directory {path}: {err}")))?;
            }
            ArchiveEntry::File { path, body, stored } => {
                let bytes = decode_payload(path, body)?;
                let options = if *stored {
                    stored_options
                } else {
                    deflated_options
                };
                zip.start_file(path.as_str(), options)
                    .map_err(|err| Error::Archive(format!("start file {path}: {err}")))?;
                zip.write_all(&bytes)
                    .map_err(|err| Error::Archive(format!("write file {path}: {err}")))?;
            }
        }
    }

    let cursor = zip
        .finish()
        .map_err(|err| Error::Archive(format!("finish zip: {err}")))?;
    Ok(cursor.into_inner())
}

fn decode_payload(path: &str, body: &Payload) -> Result<Vec<u8>> {
    match body {
        Payload::Text(text) => Ok(text.as_bytes().to_vec()),
        Payload::Base64(data) => base64::engine::general_purpose::STANDARD
            .decode(data)
            .map_err(|err| Error::Archive(format!("decode base64 for {path}: {err}"))),
    }
}

/// Maps navigation documents and artifacts onto the EPUB layout.
///
/// Entries sharing a destination keep the position of the first and the body
/// of the last. Artifact paths must stay inside the package root.
pub fn archive_layout(
    nav: &NavigationDocuments,
    artifacts: &[Artifact],
) -> Result<Vec<ArchiveEntry>> {
    let mut entries = vec![
        ArchiveEntry::File {
            path: "mimetype".to_owned(),
            body: Payload::Text(MIMETYPE.to_owned()),
            stored: true,
        },
        ArchiveEntry::Folder("META-INF/".to_owned()),
        ArchiveEntry::file("META-INF/container.xml", Payload::Text(render_container_xml())),
        ArchiveEntry::Folder(format!("{PACKAGE_ROOT}/")),
        ArchiveEntry::Folder(format!("{PACKAGE_ROOT}/{ASSETS_DIR}/")),
        ArchiveEntry::file(
            format!("{PACKAGE_ROOT}/{NCX_FILE_NAME}"),
            Payload::Text(nav.ncx.clone()),
        ),
        ArchiveEntry::file(
            format!("{PACKAGE_ROOT}/{OPF_FILE_NAME}"),
            Payload::Text(nav.opf.clone()),
        ),
    ];
    let mut positions = entries
        .iter()
        .enumerate()
        .map(|(idx, entry)| (entry.path().to_owned(), idx))
        .collect::<HashMap<_, _>>();

    for artifact in artifacts {
        check_package_path(artifact.path())?;
        let path = match artifact {
            Artifact::Image(image) if !image.cover => {
                format!("{PACKAGE_ROOT}/{ASSETS_DIR}/{}", image.path)
            }
            _ => format!("{PACKAGE_ROOT}/{}", artifact.path()),
        };
        let entry = ArchiveEntry::file(path.clone(), artifact.payload().clone());
        match positions.get(&path) {
            Some(&idx) => {
                tracing::debug!(%path, "archive entry replaced by later artifact");
                entries[idx] = entry;
            }
            None => {
                positions.insert(path, entries.len());
                entries.push(entry);
            }
        }
    }

    Ok(entries)
}

/// Rejects absolute paths and `.`, `..` or empty segments.
fn check_package_path(path: &str) -> Result<()> {
    let escapes = path
        .split(['/', '\\'])
        .any(|segment| segment.is_empty() || segment == "." || segment == "..");
    if escapes {
        return Err(Error::Archive(format!(
            "artifact path leaves the package root: {path:?}"
        )));
    }
    Ok(())
}

pub async fn archive(
    builder: &dyn ArchiveBuilder,
    nav: &NavigationDocuments,
    artifacts: &[Artifact],
) -> Result<Vec<u8>> {
    let entries = archive_layout(nav, artifacts)?;
    tracing::info!(entries = entries.len(), "building archive");
    builder.build(entries).await
}

pub fn archive_file_name(title: &str) -> String {
    format!("{title}.epub")
}

fn render_container_xml() -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="{PACKAGE_ROOT}/{OPF_FILE_NAME}" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>
"#
    )
}
