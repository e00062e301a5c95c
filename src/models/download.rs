use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Requested output container kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Video,
    Audio,
}

/// Everything a single download needs. Built fresh per request and
/// immutable for its duration.
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    pub url: String,
    pub output_dir: PathBuf,
    pub output_format: OutputFormat,
    pub cookies_file: Option<PathBuf>,
    pub ffmpeg_path: Option<PathBuf>,
}

impl DownloadConfig {
    pub fn new(url: impl Into<String>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            output_dir: output_dir.into(),
            output_format: OutputFormat::Video,
            cookies_file: None,
            ffmpeg_path: None,
        }
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }
}

/// Terminal result of a successful download.
#[derive(Debug, Clone, Serialize)]
pub struct DownloadOutcome {
    pub title: String,
    pub id: String,
    pub artist: Option<String>,
    pub file_path: PathBuf,
}
