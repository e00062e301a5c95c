use std::path::PathBuf;
use std::time::Duration;

use crate::core::browser::{BrowserLauncher, BrowserSession};
use crate::core::ffmpeg::Transcoder;
use crate::core::http;
use crate::error::DownloadError;
use crate::models::{
    DownloadConfig, DownloadOutcome, DownloadProgress, Messages, OutputFormat, ProgressSender,
    ProgressStatus,
};

pub mod metadata;

use metadata::TrackMetadata;

const PAGE_SETTLE: Duration = Duration::from_secs(3);
const BANNER_SETTLE: Duration = Duration::from_secs(1);
const BUFFER_WAIT: Duration = Duration::from_secs(8);
const PLAY_BUTTON_TIMEOUT: Duration = Duration::from_secs(10);
const COOKIE_BANNER_TIMEOUT: Duration = Duration::from_secs(2);

const COOKIE_BANNER_SELECTOR: &str = "[class*='qc-cmp2'] button[mode='primary']";
const PLAY_BUTTON_SELECTOR: &str = "[data-amlabs-play-button='true']";
const OVERLAY_SCRIPT: &str = r#"
    document.querySelectorAll('[class*="qc-cmp2"], [class*="WebToApp"]').forEach(el => el.remove());
"#;
const REFERER: &str = "https://audiomack.com/";

/// No extraction-engine support exists for this platform: play the track in
/// a scripted browser and lift the streaming URL out of its network traffic.
pub async fn download(
    config: &DownloadConfig,
    browser: &dyn BrowserLauncher,
    client: &reqwest::Client,
    transcoder: Option<&dyn Transcoder>,
    progress: &ProgressSender,
    messages: &Messages,
) -> Result<DownloadOutcome, DownloadError> {
    progress.send(DownloadProgress::status(
        ProgressStatus::Downloading,
        &messages.audiomack_starting,
    ));

    let (streaming_url, meta) = extract_streaming_url(browser, &config.url, progress, messages).await?;
    let streaming_url = streaming_url.ok_or(DownloadError::StreamingUrlNotFound)?;
    let meta = meta.sanitized();

    progress.send(DownloadProgress::at(
        55.0,
        ProgressStatus::Downloading,
        messages.downloading_track(&meta.title),
    ));

    let ext = metadata::extension_for(&streaming_url);
    let dest = config.output_dir.join(meta.destination_filename(ext));
    tokio::fs::create_dir_all(&config.output_dir).await?;

    http::fetch_to_file(client, &streaming_url, REFERER, &dest, progress, messages).await?;

    let final_path = if config.output_format == OutputFormat::Audio && ext == "m4a" {
        maybe_transcode(dest, transcoder, progress, messages).await
    } else {
        dest
    };

    progress.send(DownloadProgress::at(
        100.0,
        ProgressStatus::Finished,
        messages.finished(&meta.title),
    ));

    Ok(DownloadOutcome {
        title: meta.title,
        id: meta.id,
        artist: Some(meta.artist),
        file_path: final_path,
    })
}

/// Runs the scripted-browser part with unconditional teardown.
async fn extract_streaming_url(
    browser: &dyn BrowserLauncher,
    url: &str,
    progress: &ProgressSender,
    messages: &Messages,
) -> Result<(Option<String>, TrackMetadata), DownloadError> {
    let mut session = browser
        .launch()
        .await
        .map_err(|e| DownloadError::Browser(e.to_string()))?;

    let result = drive_page(session.as_mut(), url, progress, messages).await;
    session.close().await;
    result
}

async fn drive_page(
    session: &mut dyn BrowserSession,
    url: &str,
    progress: &ProgressSender,
    messages: &Messages,
) -> Result<(Option<String>, TrackMetadata), DownloadError> {
    progress.send(DownloadProgress::at(
        10.0,
        ProgressStatus::Downloading,
        &messages.loading_page,
    ));
    session
        .navigate(url)
        .await
        .map_err(|e| DownloadError::Browser(e.to_string()))?;
    tokio::time::sleep(PAGE_SETTLE).await;

    progress.send(DownloadProgress::at(
        15.0,
        ProgressStatus::Downloading,
        &messages.closing_popups,
    ));
    let banner_dismissed = session
        .click_selector(COOKIE_BANNER_SELECTOR, COOKIE_BANNER_TIMEOUT)
        .await
        .is_ok();
    if banner_dismissed {
        tokio::time::sleep(BANNER_SETTLE).await;
    } else {
        tracing::debug!("cookie banner no encontrado, continuando");
    }

    if let Err(e) = session.evaluate(OVERLAY_SCRIPT).await {
        tracing::warn!("fallo al retirar overlays: {}", e);
    }

    let mut meta = TrackMetadata::from_url(url);
    let refined = match session.first_heading_text().await {
        Ok(Some(heading)) => meta.refine_from_heading(&heading),
        Ok(None) => false,
        Err(e) => {
            tracing::warn!("fallo al leer el encabezado: {}", e);
            false
        }
    };
    if !refined {
        tracing::debug!("metadatos tomados de la URL: {:?}", meta);
    }

    progress.send(DownloadProgress::at(
        25.0,
        ProgressStatus::Downloading,
        &messages.starting_playback,
    ));
    session
        .click_selector(PLAY_BUTTON_SELECTOR, PLAY_BUTTON_TIMEOUT)
        .await
        .map_err(|e| DownloadError::PlayControlNotFound(e.to_string()))?;

    progress.send(DownloadProgress::at(
        35.0,
        ProgressStatus::Downloading,
        &messages.waiting_for_audio,
    ));
    tokio::time::sleep(BUFFER_WAIT).await;

    progress.send(DownloadProgress::at(
        50.0,
        ProgressStatus::Downloading,
        &messages.searching_stream,
    ));
    let log = session.request_log();
    let streaming_url =
        metadata::find_streaming_url(log.iter().map(String::as_str)).map(str::to_owned);

    Ok((streaming_url, meta))
}

/// Transcode m4a to mp3 when a tool is available. Fails open: the original
/// file is kept and returned if anything goes wrong, and the intermediate is
/// deleted only after a successful conversion.
async fn maybe_transcode(
    dest: PathBuf,
    transcoder: Option<&dyn Transcoder>,
    progress: &ProgressSender,
    messages: &Messages,
) -> PathBuf {
    let Some(transcoder) = transcoder else {
        return dest;
    };

    progress.send(DownloadProgress::at(
        96.0,
        ProgressStatus::Processing,
        &messages.converting,
    ));

    let mp3_path = dest.with_extension("mp3");
    match transcoder.to_mp3(&dest, &mp3_path).await {
        Ok(()) => {
            if let Err(e) = tokio::fs::remove_file(&dest).await {
                tracing::warn!("no se pudo borrar el intermedio {:?}: {}", dest, e);
            }
            mp3_path
        }
        Err(e) => {
            tracing::warn!("conversión a mp3 falló, conservando m4a: {}", e);
            dest
        }
    }
}
