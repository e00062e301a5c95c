use serde::Serialize;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    Idle,
    Downloading,
    Processing,
    Finished,
    Error,
}

/// One progress event. Percent is best-effort and not guaranteed monotonic
/// across the download/post-processing boundary.
#[derive(Debug, Clone, Serialize)]
pub struct DownloadProgress {
    pub percent: f64,
    pub speed: String,
    pub eta: String,
    pub status: ProgressStatus,
    pub message: String,
}

impl Default for DownloadProgress {
    fn default() -> Self {
        Self {
            percent: 0.0,
            speed: String::new(),
            eta: String::new(),
            status: ProgressStatus::Idle,
            message: String::new(),
        }
    }
}

impl DownloadProgress {
    pub fn status(status: ProgressStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            ..Self::default()
        }
    }

    pub fn at(percent: f64, status: ProgressStatus, message: impl Into<String>) -> Self {
        Self {
            percent,
            status,
            message: message.into(),
            ..Self::default()
        }
    }
}

/// Handle the core uses to emit progress. Wraps an unbounded channel so a
/// send never blocks the download task; a host that does not care simply
/// uses [`ProgressSender::disabled`].
#[derive(Clone, Default)]
pub struct ProgressSender(Option<mpsc::UnboundedSender<DownloadProgress>>);

impl ProgressSender {
    pub fn new(tx: mpsc::UnboundedSender<DownloadProgress>) -> Self {
        Self(Some(tx))
    }

    pub fn disabled() -> Self {
        Self(None)
    }

    /// Best-effort delivery. A closed or missing receiver is not an error.
    pub fn send(&self, progress: DownloadProgress) {
        if let Some(tx) = &self.0 {
            let _ = tx.send(progress);
        }
    }
}
