use std::fmt;

use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Progress {
    Percent(u8),
    Indeterminate,
    #[default]
    Idle,
}

/// Badge text: the percentage, `...` while archiving, empty when idle.
impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Percent(percent) => write!(f, "{percent}"),
            Self::Indeterminate => f.write_str("..."),
            Self::Idle => Ok(()),
        }
    }
}

pub trait ProgressSink: Send + Sync {
    fn report(&self, progress: Progress);
}

/// Publishes the latest progress on a watch channel.
#[derive(Debug, Clone)]
pub struct WatchProgress {
    tx: watch::Sender<Progress>,
}

impl WatchProgress {
    pub fn channel() -> (Self, watch::Receiver<Progress>) {
        let (tx, rx) = watch::channel(Progress::Idle);
        (Self { tx }, rx)
    }

    pub fn subscribe(&self) -> watch::Receiver<Progress> {
        self.tx.subscribe()
    }
}

impl ProgressSink for WatchProgress {
    fn report(&self, progress: Progress) {
        self.tx.send_replace(progress);
    }
}
