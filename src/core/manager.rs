use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::core::browser::BrowserLauncher;
use crate::core::engine::{self, EngineOptions, ExtractionEngine};
use crate::core::ffmpeg::{FfmpegTranscoder, Transcoder};
use crate::error::DownloadError;
use crate::models::{
    DownloadConfig, DownloadOutcome, DownloadProgress, Messages, ProgressSender, ProgressStatus,
};
use crate::platforms::{self, Platform};

/// Routes a URL to its platform and runs the download. One download in
/// flight per call; the manager itself holds no per-download state, so a
/// single instance serves the whole process.
pub struct DownloadManager {
    engine: Arc<dyn ExtractionEngine>,
    browser: Arc<dyn BrowserLauncher>,
    transcoder: Option<Arc<dyn Transcoder>>,
    ffmpeg_path: Option<PathBuf>,
    client: reqwest::Client,
    messages: Messages,
    progress: ProgressSender,
}

impl DownloadManager {
    /// `ffmpeg_path` is resolved once by the caller (see `core::ffmpeg`)
    /// and injected; the same path drives both the engine options and the
    /// Audiomack transcode step.
    pub fn new(
        engine: Arc<dyn ExtractionEngine>,
        browser: Arc<dyn BrowserLauncher>,
        ffmpeg_path: Option<PathBuf>,
        progress: ProgressSender,
    ) -> Self {
        let transcoder: Option<Arc<dyn Transcoder>> = ffmpeg_path
            .clone()
            .map(|p| Arc::new(FfmpegTranscoder::new(p)) as Arc<dyn Transcoder>);
        Self {
            engine,
            browser,
            transcoder,
            ffmpeg_path,
            client: reqwest::Client::new(),
            messages: Messages::default(),
            progress,
        }
    }

    pub fn with_messages(mut self, messages: Messages) -> Self {
        self.messages = messages;
        self
    }

    pub fn with_transcoder(mut self, transcoder: Arc<dyn Transcoder>) -> Self {
        self.transcoder = Some(transcoder);
        self
    }

    /// Display name of the platform claiming the URL, or the configured
    /// "unknown" sentinel. Pure function of the registry; no side effects.
    pub fn detect_platform(&self, url: &str) -> &str {
        Platform::detect(url)
            .map(Platform::name)
            .unwrap_or(&self.messages.unknown_platform)
    }

    /// Registered platform display names, in resolution order.
    pub fn supported_platforms() -> Vec<&'static str> {
        Platform::supported_names()
    }

    /// Resolve and run. Every failure is emitted once on the progress
    /// channel and also returned; nothing is swallowed here.
    pub async fn download(&self, config: &DownloadConfig) -> Result<DownloadOutcome, DownloadError> {
        let platform = Platform::detect(&config.url).ok_or_else(|| DownloadError::UnsupportedUrl {
            supported: Platform::supported_names().join(", "),
        })?;
        tracing::debug!("URL {} resuelta a {}", config.url, platform.name());

        let result = self.dispatch(platform, config).await;
        if let Err(e) = &result {
            self.progress.send(DownloadProgress::status(
                ProgressStatus::Error,
                self.messages.error(&e.to_string()),
            ));
        }
        result
    }

    /// Per-download ffmpeg override wins over the injected path. Every arm
    /// builds its own options, so no platform can reach the engine without
    /// them.
    async fn dispatch(
        &self,
        platform: Platform,
        config: &DownloadConfig,
    ) -> Result<DownloadOutcome, DownloadError> {
        let ffmpeg = config
            .ffmpeg_path
            .as_deref()
            .or(self.ffmpeg_path.as_deref());
        match platform {
            Platform::Audiomack => {
                platforms::audiomack::download(
                    config,
                    self.browser.as_ref(),
                    &self.client,
                    self.transcoder.as_deref(),
                    &self.progress,
                    &self.messages,
                )
                .await
            }
            Platform::YouTube => {
                self.run_engine(config, platforms::youtube::engine_options(config, ffmpeg))
                    .await
            }
            Platform::Twitter => {
                self.run_engine(config, platforms::twitter::engine_options(config, ffmpeg))
                    .await
            }
            Platform::Instagram => {
                self.run_engine(config, platforms::instagram::engine_options(config, ffmpeg))
                    .await
            }
        }
    }

    async fn run_engine(
        &self,
        config: &DownloadConfig,
        options: EngineOptions,
    ) -> Result<DownloadOutcome, DownloadError> {
        self.progress.send(DownloadProgress::status(
            ProgressStatus::Downloading,
            &self.messages.starting,
        ));

        // Surface filesystem problems before any network activity.
        tokio::fs::create_dir_all(&config.output_dir).await?;

        let (tx, mut rx) = mpsc::unbounded_channel();
        let progress = self.progress.clone();
        let messages = self.messages.clone();
        let forwarder = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                progress.send(engine::normalize_event(&event, &messages));
            }
        });

        let result = self.engine.extract(&config.url, &options, tx).await;
        let _ = forwarder.await;

        let info = result?;
        self.progress.send(DownloadProgress::at(
            100.0,
            ProgressStatus::Finished,
            self.messages.finished(&info.title),
        ));

        Ok(DownloadOutcome {
            title: info.title,
            id: info.id,
            artist: None,
            file_path: info.file_path,
        })
    }
}
