pub mod cli;
pub mod core;
pub mod error;
pub mod models;
pub mod platforms;

pub use crate::core::manager::DownloadManager;
pub use error::DownloadError;
pub use models::{
    DownloadConfig, DownloadOutcome, DownloadProgress, Messages, OutputFormat, ProgressSender,
    ProgressStatus,
};
pub use platforms::Platform;
