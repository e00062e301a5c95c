use std::path::PathBuf;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::DownloadError;
use crate::models::{DownloadConfig, DownloadProgress, Messages, ProgressStatus};

/// Output filename template handed to the engine, relative to the output
/// directory. Title truncated so the path stays within filesystem limits.
pub const OUTPUT_TEMPLATE: &str = "%(title).120s [%(id)s].%(ext)s";

pub const RETRIES: u32 = 10;
pub const FRAGMENT_RETRIES: u32 = 10;
pub const CONCURRENT_FRAGMENTS: u32 = 4;

/// Post-processing step requested from the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostProcessor {
    ExtractAudio { codec: String, quality: String },
    EmbedMetadata,
}

impl PostProcessor {
    pub fn mp3_at_192() -> Self {
        Self::ExtractAudio {
            codec: "mp3".into(),
            quality: "192".into(),
        }
    }
}

/// The options mapping passed across the extraction-engine boundary.
/// [`EngineOptions::base`] holds what every platform shares; the per-platform
/// builders overlay format selection and the post-processing pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineOptions {
    pub output_dir: PathBuf,
    pub output_template: String,
    pub format: String,
    pub merge_output_format: Option<String>,
    pub postprocessors: Vec<PostProcessor>,
    pub extractor_args: Vec<String>,
    pub no_playlist: bool,
    pub retries: u32,
    pub fragment_retries: u32,
    pub concurrent_fragments: u32,
    pub no_warnings: bool,
    /// YouTube sets this to `Some(0)` to skip age-restriction filtering.
    pub age_limit: Option<u32>,
    pub no_check_certificate: bool,
    pub ffmpeg_location: Option<PathBuf>,
    pub cookies_file: Option<PathBuf>,
}

impl EngineOptions {
    pub fn base(config: &DownloadConfig, ffmpeg: Option<&std::path::Path>) -> Self {
        Self {
            output_dir: config.output_dir.clone(),
            output_template: OUTPUT_TEMPLATE.to_string(),
            format: String::new(),
            merge_output_format: None,
            postprocessors: Vec::new(),
            extractor_args: Vec::new(),
            no_playlist: true,
            retries: RETRIES,
            fragment_retries: FRAGMENT_RETRIES,
            concurrent_fragments: CONCURRENT_FRAGMENTS,
            no_warnings: true,
            age_limit: None,
            no_check_certificate: false,
            ffmpeg_location: ffmpeg.map(|p| p.to_path_buf()),
            cookies_file: config.cookies_file.clone(),
        }
    }
}

/// Which post-processor the engine reported starting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostKind {
    ExtractAudio,
    Metadata,
    Other,
}

/// Raw event stream from the engine, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    Downloading {
        downloaded: u64,
        total: Option<u64>,
        speed: String,
        eta: String,
    },
    /// Raw transfer finished; post-processing may follow.
    Finished,
    PostStarted { kind: PostKind },
    PostFinished,
    Error,
}

/// Metadata the engine hands back on success.
#[derive(Debug, Clone)]
pub struct EngineInfo {
    pub title: String,
    pub id: String,
    pub file_path: PathBuf,
}

pub type EngineEventSender = mpsc::UnboundedSender<EngineEvent>;

/// The shared extraction engine, seen only through this seam so the manager
/// can be exercised without spawning yt-dlp.
#[async_trait]
pub trait ExtractionEngine: Send + Sync {
    async fn extract(
        &self,
        url: &str,
        options: &EngineOptions,
        events: EngineEventSender,
    ) -> Result<EngineInfo, DownloadError>;
}

/// Normalizes a raw engine event into the progress contract: percent is
/// `downloaded*100/total` when the total is known, 0 otherwise; the phase
/// boundaries use the fixed 95/97/99 markers. Percent is deliberately not
/// monotonic across the download/post-processing boundary.
pub fn normalize_event(event: &EngineEvent, messages: &Messages) -> DownloadProgress {
    match event {
        EngineEvent::Downloading {
            downloaded,
            total,
            speed,
            eta,
        } => {
            let percent = match total {
                Some(t) if *t > 0 => *downloaded as f64 * 100.0 / *t as f64,
                _ => 0.0,
            };
            DownloadProgress {
                percent,
                speed: speed.clone(),
                eta: eta.clone(),
                status: ProgressStatus::Downloading,
                message: messages.downloading(percent),
            }
        }
        EngineEvent::Finished => {
            DownloadProgress::at(95.0, ProgressStatus::Processing, &messages.processing)
        }
        EngineEvent::PostStarted { kind } => {
            let message = match kind {
                PostKind::ExtractAudio => &messages.extracting_audio,
                PostKind::Metadata => &messages.adding_metadata,
                PostKind::Other => &messages.post_processing,
            };
            DownloadProgress::at(97.0, ProgressStatus::Processing, message)
        }
        EngineEvent::PostFinished => {
            DownloadProgress::at(99.0, ProgressStatus::Processing, &messages.finalizing)
        }
        EngineEvent::Error => {
            DownloadProgress::status(ProgressStatus::Error, &messages.download_error)
        }
    }
}
