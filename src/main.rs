use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::sync::mpsc;

use mediagrab::cli::Cli;
use mediagrab::core::browser::ChromiumLauncher;
use mediagrab::core::{ffmpeg, ytdlp::YtdlpEngine};
use mediagrab::{DownloadConfig, DownloadManager, Messages, Platform, ProgressSender};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    if cli.list_platforms {
        for name in DownloadManager::supported_platforms() {
            println!("{}", name);
        }
        return Ok(());
    }

    let url = cli.url.clone().context("falta la URL a descargar")?;

    if cli.detect {
        let name = Platform::detect(&url)
            .map(|p| p.name().to_string())
            .unwrap_or_else(|| Messages::default().unknown_platform);
        println!("{}", name);
        return Ok(());
    }

    let (tx, mut rx) = mpsc::unbounded_channel();
    let progress = ProgressSender::new(tx);

    let ffmpeg_path = ffmpeg::resolve(cli.ffmpeg_path.as_deref()).await;
    if ffmpeg_path.is_none() {
        tracing::warn!("ffmpeg no encontrado; sin mezcla ni conversión de audio");
    }

    let engine = Arc::new(YtdlpEngine::locate().await?);
    let manager = DownloadManager::new(engine, Arc::new(ChromiumLauncher), ffmpeg_path, progress);

    let mut config = DownloadConfig::new(url, cli.output_dir.clone()).with_format(cli.output_format());
    config.cookies_file = cli.cookies.clone();
    config.ffmpeg_path = cli.ffmpeg_path.clone();

    // The download runs on its own task; this task just renders progress.
    let worker = tokio::spawn(async move { manager.download(&config).await });

    while let Some(event) = rx.recv().await {
        println!("[{:?}] {:>5.1}% {}", event.status, event.percent, event.message);
    }

    let outcome = worker.await??;
    println!("Archivo: {}", outcome.file_path.display());
    Ok(())
}
