use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;

/// Resolve the transcoding tool once at startup; the result is injected into
/// the manager instead of being lazily cached per downloader.
pub async fn resolve(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if probe(Path::new("ffmpeg")).await {
        return Some(PathBuf::from("ffmpeg"));
    }
    None
}

async fn probe(binary: &Path) -> bool {
    tokio::process::Command::new(binary)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Audio transcoding seam. The Audiomack flow treats a transcode failure as
/// non-fatal, so implementations report errors instead of panicking and the
/// caller decides what to keep.
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Convert `input` to mp3 at `output`. Success requires the output file
    /// to exist afterwards.
    async fn to_mp3(&self, input: &Path, output: &Path) -> anyhow::Result<()>;
}

pub struct FfmpegTranscoder {
    binary: PathBuf,
}

impl FfmpegTranscoder {
    pub fn new(binary: PathBuf) -> Self {
        Self { binary }
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn to_mp3(&self, input: &Path, output: &Path) -> anyhow::Result<()> {
        let status = tokio::process::Command::new(&self.binary)
            .args([
                "-i".as_ref(),
                input.as_os_str(),
                "-acodec".as_ref(),
                "libmp3lame".as_ref(),
                "-q:a".as_ref(),
                "2".as_ref(),
                output.as_os_str(),
                "-y".as_ref(),
            ])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await?;

        if !status.success() {
            anyhow::bail!("ffmpeg salió con código {}", status);
        }
        if !tokio::fs::try_exists(output).await.unwrap_or(false) {
            anyhow::bail!("ffmpeg no produjo {:?}", output);
        }
        Ok(())
    }
}
