use std::sync::Arc;

use serde::de::DeserializeOwned;
use url::Url;

use crate::app::model::{CompletedBook, JobPhase, JobState};
use crate::app::progress::{Progress, ProgressSink};
use crate::artifact::{Artifact, ImageArtifact, PageArtifact, Payload};
use crate::config::JobConfig;
use crate::epub::{self, ArchiveBuilder};
use crate::error::{Error, Result};
use crate::fetch::ResourceFetcher;
use crate::formats::{PageDescriptor, TocDescriptor, TocEntry};
use crate::markup::{normalize_legacy_markup, wrap_page_document};
use crate::source::{self, BookRef, Endpoints};
use crate::throttle::Throttle;
use crate::toc::{COVER_FILE_NAME, render_navigation};

/// One run from table of contents to archive bytes.
pub struct BookJob {
    book: BookRef,
    endpoints: Endpoints,
    throttle: Throttle,
    fetcher: Arc<dyn ResourceFetcher>,
    archiver: Arc<dyn ArchiveBuilder>,
    progress: Arc<dyn ProgressSink>,
}

impl BookJob {
    pub fn new(
        book: BookRef,
        config: &JobConfig,
        fetcher: Arc<dyn ResourceFetcher>,
        archiver: Arc<dyn ArchiveBuilder>,
        progress: Arc<dyn ProgressSink>,
    ) -> Self {
        Self {
            book,
            endpoints: config.endpoints(),
            throttle: config.throttle(),
            fetcher,
            archiver,
            progress,
        }
    }

    pub async fn run(&self) -> Result<CompletedBook> {
        let mut state = JobState::new(&self.book.id, &self.book.slug);
        match self.run_phases(&mut state).await {
            Ok(archive) => {
                state.phase = JobPhase::Done;
                let file_name = epub::archive_file_name(&state.title);
                tracing::info!(
                    book_id = %state.book_id,
                    file_name,
                    bytes = archive.len(),
                    artifacts = state.artifacts.len(),
                    "book job done"
                );
                Ok(CompletedBook {
                    file_name,
                    archive,
                    state,
                })
            }
            Err(err) => {
                state.phase = JobPhase::Failed;
                tracing::error!(book_id = %state.book_id, ?err, "book job failed");
                Err(err)
            }
        }
    }

    async fn run_phases(&self, state: &mut JobState) -> Result<Vec<u8>> {
        state.phase = JobPhase::FetchingToc;
        self.progress.report(Progress::Percent(0));
        let toc_url = self.endpoints.toc(&self.book)?;
        let toc: TocDescriptor = self.fetch_descriptor(&toc_url).await?;
        state.total_entries = toc.items.len();
        tracing::info!(
            book_id = %state.book_id,
            title = %toc.title,
            entries = state.total_entries,
            "fetched table of contents"
        );
        let nav = render_navigation(&toc);

        state.phase = JobPhase::ProcessingEntries;
        let per_entry = self
            .throttle
            .run_observed(
                toc.items.iter(),
                |entry| self.process_entry(entry),
                |index, _| {
                    let percent = state.record_entry();
                    tracing::debug!(index, percent, "entry done");
                    self.progress.report(Progress::Percent(percent));
                },
            )
            .await?;
        state.artifacts.extend(per_entry.into_iter().flatten());

        state.phase = JobPhase::FetchingCover;
        let cover_url = self.endpoints.cover(&self.book)?;
        let cover = self.fetcher.fetch_binary(&cover_url).await?;
        state.artifacts.push(Artifact::Image(ImageArtifact {
            path: COVER_FILE_NAME.to_owned(),
            payload: Payload::from_bytes(&cover),
            cover: true,
        }));

        state.phase = JobPhase::Archiving;
        self.progress.report(Progress::Indeterminate);
        epub::archive(self.archiver.as_ref(), &nav, &state.artifacts).await
    }

    /// Page document plus its images, page first.
    async fn process_entry(&self, entry: &TocEntry) -> Result<Vec<Artifact>> {
        let descriptor_url = self.endpoints.resolve(&entry.url)?;
        let page: PageDescriptor = self.fetch_descriptor(&descriptor_url).await?;

        let content_url = self.endpoints.resolve(&page.content)?;
        let body = self.fetcher.fetch_text(&content_url).await?;
        let document = wrap_page_document(&page.title, &normalize_legacy_markup(&body));

        let mut artifacts = vec![Artifact::Page(PageArtifact {
            path: page.full_path.clone(),
            label: entry.label.clone(),
            order: entry.order,
            depth: entry.depth,
            payload: Payload::Text(document),
        })];

        let images = self
            .throttle
            .run(page.images.iter(), |reference| self.fetch_image(reference))
            .await?;
        tracing::debug!(
            path = %page.full_path,
            images = images.len(),
            "page processed"
        );
        artifacts.extend(images.into_iter().map(Artifact::Image));
        Ok(artifacts)
    }

    async fn fetch_image(&self, reference: &str) -> Result<ImageArtifact> {
        let url = self.endpoints.image(&self.book, reference)?;
        let name = source::file_name(&url)
            .ok_or_else(|| Error::InvalidImagePath(url.to_string()))?
            .to_owned();
        let bytes = self.fetcher.fetch_binary(&url).await?;
        Ok(ImageArtifact {
            path: name,
            payload: Payload::from_bytes(&bytes),
            cover: false,
        })
    }

    async fn fetch_descriptor<T: DeserializeOwned>(&self, url: &Url) -> Result<T> {
        let text = self.fetcher.fetch_text(url).await?;
        serde_json::from_str(&text).map_err(|source| Error::MalformedDescriptor {
            url: url.to_string(),
            source,
        })
    }
}
