use std::path::{Path, PathBuf};

use futures::StreamExt;
use tokio::io::AsyncWriteExt;

use crate::error::DownloadError;
use crate::models::{DownloadProgress, Messages, ProgressSender, ProgressStatus};

pub const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// The direct transfer occupies the 60–95% band of the overall flow.
const BAND_START: f64 = 60.0;
const BAND_SPAN: f64 = 35.0;

fn part_path_for(output: &Path) -> PathBuf {
    let mut part = output.as_os_str().to_owned();
    part.push(".part");
    PathBuf::from(part)
}

/// Maps transferred bytes into the 60–95% band; stays at the band start
/// when the content length is unknown.
fn band_percent(downloaded: u64, total: Option<u64>) -> f64 {
    match total {
        Some(t) if t > 0 => BAND_START + (downloaded as f64 / t as f64) * BAND_SPAN,
        _ => BAND_START,
    }
}

/// Stream a media URL straight to disk with a browser-like identity,
/// reporting incremental progress. Writes through a `.part` file and
/// renames on completion.
pub async fn fetch_to_file(
    client: &reqwest::Client,
    url: &str,
    referer: &str,
    output: &Path,
    progress: &ProgressSender,
    messages: &Messages,
) -> Result<u64, DownloadError> {
    if let Some(parent) = output.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let response = client
        .get(url)
        .header(reqwest::header::USER_AGENT, USER_AGENT)
        .header(reqwest::header::REFERER, referer)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        return Err(DownloadError::HttpStatus {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }

    if let Some(ct) = response.headers().get(reqwest::header::CONTENT_TYPE) {
        if ct.to_str().map(|v| v.contains("text/html")).unwrap_or(false) {
            return Err(DownloadError::HtmlResponse);
        }
    }

    let total = response.content_length();
    let part_path = part_path_for(output);
    let file = tokio::fs::File::create(&part_path).await?;
    let mut file = tokio::io::BufWriter::with_capacity(256 * 1024, file);

    let mut downloaded: u64 = 0;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        downloaded += chunk.len() as u64;

        if let Some(t) = total {
            progress.send(DownloadProgress::at(
                band_percent(downloaded, Some(t)),
                ProgressStatus::Downloading,
                messages.transfer(downloaded / 1024, t / 1024),
            ));
        }
    }
    file.flush().await?;
    drop(file);

    tokio::fs::rename(&part_path, output).await?;
    Ok(downloaded)
}
