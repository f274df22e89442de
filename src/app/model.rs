use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::artifact::Artifact;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobPhase {
    Idle,
    FetchingToc,
    ProcessingEntries,
    FetchingCover,
    Archiving,
    Done,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobState {
    pub book_id: String,
    pub title: String,
    pub phase: JobPhase,
    pub artifacts: Vec<Artifact>,
    pub completed_entries: usize,
    pub total_entries: usize,
    pub started_at: DateTime<Utc>,
}

impl JobState {
    pub fn new(book_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            book_id: book_id.into(),
            title: title.into(),
            phase: JobPhase::Idle,
            artifacts: Vec::new(),
            completed_entries: 0,
            total_entries: 0,
            started_at: Utc::now(),
        }
    }

    /// Whole percent of finished entries, rounded down. An empty book counts
    /// as finished.
    pub fn progress_percent(&self) -> u8 {
        if self.total_entries == 0 {
            return 100;
        }
        let completed = self.completed_entries.min(self.total_entries);
        (completed * 100 / self.total_entries) as u8
    }

    pub fn record_entry(&mut self) -> u8 {
        self.completed_entries += 1;
        self.progress_percent()
    }
}

/// A finished archive together with the state that produced it.
#[derive(Debug, Clone)]
pub struct CompletedBook {
    pub file_name: String,
    pub archive: Vec<u8>,
    pub state: JobState,
}
