pub mod download;
pub mod messages;
pub mod progress;

pub use download::{DownloadConfig, DownloadOutcome, OutputFormat};
pub use messages::Messages;
pub use progress::{DownloadProgress, ProgressSender, ProgressStatus};
