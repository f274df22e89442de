pub mod artifact_store;
pub mod gate;
pub mod model;
pub mod progress;
pub mod runner;

use std::path::PathBuf;
use std::sync::Arc;

use crate::app::artifact_store::ArchiveSink;
use crate::app::gate::JobGate;
use crate::app::progress::{Progress, ProgressSink};
use crate::app::runner::BookJob;
use crate::config::JobConfig;
use crate::epub::ArchiveBuilder;
use crate::fetch::ResourceFetcher;
use crate::source::BookRef;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    /// Another job holds the gate; the request was dropped.
    Busy,
    NotABookPage,
    Saved(PathBuf),
}

/// Entry point for turning a book page into a saved archive.
pub struct BookService {
    gate: JobGate,
    config: JobConfig,
    fetcher: Arc<dyn ResourceFetcher>,
    archiver: Arc<dyn ArchiveBuilder>,
    progress: Arc<dyn ProgressSink>,
    sink: Arc<dyn ArchiveSink>,
}

impl BookService {
    pub fn new(
        config: JobConfig,
        fetcher: Arc<dyn ResourceFetcher>,
        archiver: Arc<dyn ArchiveBuilder>,
        progress: Arc<dyn ProgressSink>,
        sink: Arc<dyn ArchiveSink>,
    ) -> Self {
        Self {
            gate: JobGate::new(),
            config,
            fetcher,
            archiver,
            progress,
            sink,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.gate.is_busy()
    }

    pub async fn start(&self, page_url: &str) -> anyhow::Result<StartOutcome> {
        let Some(_permit) = self.gate.try_start() else {
            tracing::warn!(page_url, "a book job is already running");
            return Ok(StartOutcome::Busy);
        };

        let Some(book) = BookRef::from_page_url(page_url, &self.config.origin) else {
            tracing::info!(page_url, origin = %self.config.origin, "not a book page");
            return Ok(StartOutcome::NotABookPage);
        };
        tracing::info!(slug = %book.slug, book_id = %book.id, "starting book job");

        let result = self.run(book).await;
        self.progress.report(Progress::Idle);
        result.map(StartOutcome::Saved)
    }

    async fn run(&self, book: BookRef) -> anyhow::Result<PathBuf> {
        let job = BookJob::new(
            book,
            &self.config,
            Arc::clone(&self.fetcher),
            Arc::clone(&self.archiver),
            Arc::clone(&self.progress),
        );
        let completed = job.run().await?;
        self.sink
            .save(&completed.file_name, &completed.archive)
            .await
    }
}
