use std::path::{Path, PathBuf};
use std::process::Stdio;

use anyhow::anyhow;
use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::core::engine::{
    EngineEvent, EngineEventSender, EngineInfo, EngineOptions, ExtractionEngine, PostKind,
    PostProcessor,
};
use crate::error::DownloadError;

const PROGRESS_TEMPLATE: &str =
    "download:%(progress.downloaded_bytes|0)s|%(progress.total_bytes|0)s|%(progress._speed_str|)s|%(progress._eta_str|)s";

/// Adapter that shells out to the yt-dlp binary.
pub struct YtdlpEngine {
    binary: PathBuf,
}

impl YtdlpEngine {
    pub fn new(binary: PathBuf) -> Self {
        Self { binary }
    }

    /// Find yt-dlp on PATH or in the managed location, downloading the
    /// release binary as a last resort.
    pub async fn locate() -> anyhow::Result<Self> {
        Ok(Self::new(ensure_ytdlp().await?))
    }
}

pub async fn find_ytdlp() -> Option<PathBuf> {
    let bin_name = if cfg!(target_os = "windows") {
        "yt-dlp.exe"
    } else {
        "yt-dlp"
    };

    if let Ok(status) = tokio::process::Command::new(bin_name)
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
    {
        if status.success() {
            return Some(PathBuf::from(bin_name));
        }
    }

    let managed = managed_ytdlp_path()?;
    if managed.exists() {
        return Some(managed);
    }

    None
}

fn managed_ytdlp_path() -> Option<PathBuf> {
    let data = dirs::data_dir()?;
    let bin_name = if cfg!(target_os = "windows") {
        "yt-dlp.exe"
    } else {
        "yt-dlp"
    };
    Some(data.join("mediagrab").join("bin").join(bin_name))
}

pub async fn ensure_ytdlp() -> anyhow::Result<PathBuf> {
    if let Some(path) = find_ytdlp().await {
        return Ok(path);
    }

    download_ytdlp_binary().await
}

async fn download_ytdlp_binary() -> anyhow::Result<PathBuf> {
    let target =
        managed_ytdlp_path().ok_or_else(|| anyhow!("no se pudo determinar el directorio de datos"))?;

    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let download_url = if cfg!(target_os = "windows") {
        "https://github.com/yt-dlp/yt-dlp/releases/latest/download/yt-dlp.exe"
    } else if cfg!(target_os = "macos") {
        "https://github.com/yt-dlp/yt-dlp/releases/latest/download/yt-dlp_macos"
    } else {
        "https://github.com/yt-dlp/yt-dlp/releases/latest/download/yt-dlp"
    };

    tracing::info!("descargando yt-dlp a {:?}", target);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(120))
        .build()?;

    let response = client.get(download_url).send().await?;
    if !response.status().is_success() {
        return Err(anyhow!("fallo al descargar yt-dlp: HTTP {}", response.status()));
    }

    let bytes = response.bytes().await?;
    tokio::fs::write(&target, &bytes).await?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o755);
        tokio::fs::set_permissions(&target, perms).await?;
    }

    Ok(target)
}

/// Maps the options mapping onto yt-dlp's command line.
fn build_args(url: &str, options: &EngineOptions) -> Vec<String> {
    let mut args = vec!["-f".to_string(), options.format.clone()];

    if let Some(container) = &options.merge_output_format {
        args.push("--merge-output-format".into());
        args.push(container.clone());
    }

    for pp in &options.postprocessors {
        match pp {
            PostProcessor::ExtractAudio { codec, quality } => {
                args.push("-x".into());
                args.push("--audio-format".into());
                args.push(codec.clone());
                args.push("--audio-quality".into());
                args.push(quality.clone());
            }
            PostProcessor::EmbedMetadata => {
                args.push("--embed-metadata".into());
            }
        }
    }

    for extractor_arg in &options.extractor_args {
        args.push("--extractor-args".into());
        args.push(extractor_arg.clone());
    }

    if options.no_playlist {
        args.push("--no-playlist".into());
    }
    if options.no_warnings {
        args.push("--no-warnings".into());
    }
    if let Some(limit) = options.age_limit {
        args.push("--age-limit".into());
        args.push(limit.to_string());
    }
    if options.no_check_certificate {
        args.push("--no-check-certificates".into());
    }

    args.push("--retries".into());
    args.push(options.retries.to_string());
    args.push("--fragment-retries".into());
    args.push(options.fragment_retries.to_string());
    args.push("--concurrent-fragments".into());
    args.push(options.concurrent_fragments.to_string());

    if let Some(ffmpeg) = &options.ffmpeg_location {
        args.push("--ffmpeg-location".into());
        args.push(ffmpeg.to_string_lossy().into_owned());
    }
    if let Some(cookies) = &options.cookies_file {
        args.push("--cookies".into());
        args.push(cookies.to_string_lossy().into_owned());
    }

    args.push("--newline".into());
    args.push("--progress-template".into());
    args.push(PROGRESS_TEMPLATE.into());

    let template = options
        .output_dir
        .join(&options.output_template)
        .to_string_lossy()
        .into_owned();
    args.push("-o".into());
    args.push(template);
    args.push(url.to_string());

    args
}

/// One `download:` line from the progress template.
fn parse_progress_line(line: &str) -> Option<EngineEvent> {
    let rest = line.trim().strip_prefix("download:")?;
    let mut fields = rest.split('|');
    let downloaded = fields.next()?.trim().parse::<u64>().ok()?;
    let total = fields.next()?.trim().parse::<u64>().ok().filter(|t| *t > 0);
    let speed = fields.next().unwrap_or("").trim().to_string();
    let eta = fields.next().unwrap_or("").trim().to_string();
    Some(EngineEvent::Downloading {
        downloaded,
        total,
        speed,
        eta,
    })
}

/// Classifies post-processor banner lines like `[ExtractAudio] ...`.
fn parse_post_line(line: &str) -> Option<PostKind> {
    let tag = line.trim().strip_prefix('[')?;
    let tag = tag.split(']').next()?;
    match tag {
        t if t.contains("ExtractAudio") => Some(PostKind::ExtractAudio),
        t if t.contains("Metadata") => Some(PostKind::Metadata),
        t if t == "Merger" || t.starts_with("Fixup") => Some(PostKind::Other),
        _ => None,
    }
}

/// Feeds raw yt-dlp stdout lines into engine events, inserting the single
/// `Finished` event once the transfer completes.
struct LineMapper {
    finished_sent: bool,
    last_post: Option<PostKind>,
}

impl LineMapper {
    fn new() -> Self {
        Self {
            finished_sent: false,
            last_post: None,
        }
    }

    fn map(&mut self, line: &str) -> Vec<EngineEvent> {
        if let Some(event) = parse_progress_line(line) {
            let mut out = Vec::new();
            if let EngineEvent::Downloading {
                downloaded,
                total: Some(total),
                ..
            } = &event
            {
                let complete = *total > 0 && downloaded >= total;
                out.push(event.clone());
                if complete && !self.finished_sent {
                    self.finished_sent = true;
                    out.push(EngineEvent::Finished);
                }
                return out;
            }
            return vec![event];
        }

        if let Some(kind) = parse_post_line(line) {
            if !self.finished_sent {
                self.finished_sent = true;
                let mut out = vec![EngineEvent::Finished];
                self.last_post = Some(kind);
                out.push(EngineEvent::PostStarted { kind });
                return out;
            }
            if self.last_post != Some(kind) {
                self.last_post = Some(kind);
                return vec![EngineEvent::PostStarted { kind }];
            }
        }

        Vec::new()
    }
}

async fn fetch_info(binary: &Path, url: &str, options: &EngineOptions) -> Result<(String, String), DownloadError> {
    let mut args = vec![
        "--dump-json".to_string(),
        "--no-warnings".to_string(),
        "--no-playlist".to_string(),
    ];
    if options.no_check_certificate {
        args.push("--no-check-certificates".into());
    }
    if let Some(cookies) = &options.cookies_file {
        args.push("--cookies".into());
        args.push(cookies.to_string_lossy().into_owned());
    }
    args.push(url.to_string());

    let output = tokio::process::Command::new(binary)
        .args(&args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| DownloadError::Engine(format!("fallo al ejecutar yt-dlp: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(DownloadError::Engine(stderr.trim().to_string()));
    }

    let json: serde_json::Value = serde_json::from_slice(&output.stdout)
        .map_err(|e| DownloadError::Engine(format!("yt-dlp devolvió JSON inválido: {}", e)))?;

    let title = json
        .get("title")
        .and_then(|v| v.as_str())
        .unwrap_or("unknown")
        .to_string();
    let id = json
        .get("id")
        .and_then(|v| v.as_str())
        .unwrap_or("unknown")
        .to_string();

    Ok((title, id))
}

/// Newest completed file in the output dir whose name carries the media id.
/// The fallback for id-less names only considers files modified after
/// `started`, so a pre-existing file in a shared folder is never reported as
/// the result.
async fn find_downloaded_file(
    output_dir: &Path,
    id: &str,
    started: std::time::SystemTime,
) -> Result<PathBuf, DownloadError> {
    let mut best: Option<(PathBuf, std::time::SystemTime)> = None;
    let mut best_any: Option<(PathBuf, std::time::SystemTime)> = None;

    let mut entries = tokio::fs::read_dir(output_dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        if name.ends_with(".part") || name.ends_with(".ytdl") || name.starts_with('.') {
            continue;
        }
        let modified = match entry.metadata().await.and_then(|m| m.modified()) {
            Ok(m) => m,
            Err(_) => continue,
        };
        if modified >= started && best_any.as_ref().map(|(_, t)| modified > *t).unwrap_or(true) {
            best_any = Some((path.clone(), modified));
        }
        if !id.is_empty() && name.contains(id) {
            if best.as_ref().map(|(_, t)| modified > *t).unwrap_or(true) {
                best = Some((path, modified));
            }
        }
    }

    best.or(best_any)
        .map(|(p, _)| p)
        .ok_or_else(|| DownloadError::Engine(format!("archivo descargado no encontrado en {:?}", output_dir)))
}

#[async_trait]
impl ExtractionEngine for YtdlpEngine {
    async fn extract(
        &self,
        url: &str,
        options: &EngineOptions,
        events: EngineEventSender,
    ) -> Result<EngineInfo, DownloadError> {
        let (title, id) = fetch_info(&self.binary, url, options).await?;

        let args = build_args(url, options);
        tracing::debug!("yt-dlp {:?}", args);

        let started = std::time::SystemTime::now();

        let mut child = tokio::process::Command::new(&self.binary)
            .args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| DownloadError::Engine(format!("fallo al iniciar yt-dlp: {}", e)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| DownloadError::Engine("sin stdout".into()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| DownloadError::Engine("sin stderr".into()))?;

        let event_tx = events.clone();
        let reader_task = tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            let mut mapper = LineMapper::new();
            while let Ok(Some(line)) = lines.next_line().await {
                for event in mapper.map(&line) {
                    let _ = event_tx.send(event);
                }
            }
        });

        let stderr_task = tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            let mut collected = String::new();
            while let Ok(Some(line)) = lines.next_line().await {
                if !collected.is_empty() {
                    collected.push('\n');
                }
                collected.push_str(&line);
            }
            collected
        });

        let status = child
            .wait()
            .await
            .map_err(|e| DownloadError::Engine(format!("proceso yt-dlp falló: {}", e)))?;

        let _ = reader_task.await;
        let stderr_text = stderr_task.await.unwrap_or_default();

        if !status.success() {
            let _ = events.send(EngineEvent::Error);
            let detail = if stderr_text.is_empty() {
                format!("yt-dlp salió con código {}", status)
            } else {
                stderr_text.trim().to_string()
            };
            return Err(DownloadError::Engine(detail));
        }

        let _ = events.send(EngineEvent::PostFinished);

        let file_path = find_downloaded_file(&options.output_dir, &id, started).await?;
        Ok(EngineInfo {
            title,
            id,
            file_path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DownloadConfig, OutputFormat};
    use crate::platforms;

    fn options_for(url: &str, format: OutputFormat, ffmpeg: Option<&Path>) -> EngineOptions {
        let config = DownloadConfig::new(url, "/tmp/media").with_format(format);
        platforms::Platform::detect(url)
            .and_then(|p| platforms::engine_options(p, &config, ffmpeg))
            .expect("generic platform")
    }

    #[test]
    fn args_include_format_and_template() {
        let opts = options_for(
            "https://youtu.be/abc123",
            OutputFormat::Video,
            Some(Path::new("/usr/bin/ffmpeg")),
        );
        let args = build_args("https://youtu.be/abc123", &opts);
        let joined = args.join(" ");
        assert!(joined.contains("-f bestvideo+bestaudio/best"));
        assert!(joined.contains("--merge-output-format mp4"));
        assert!(joined.contains("--no-playlist"));
        assert!(joined.contains("--retries 10"));
        assert!(joined.contains("--fragment-retries 10"));
        assert!(joined.contains("--concurrent-fragments 4"));
        assert!(joined.contains("%(title).120s [%(id)s].%(ext)s"));
        assert!(args.last().unwrap() == "https://youtu.be/abc123");
    }

    #[test]
    fn args_for_audio_request_extraction() {
        let opts = options_for(
            "https://youtu.be/abc123",
            OutputFormat::Audio,
            Some(Path::new("/usr/bin/ffmpeg")),
        );
        let args = build_args("https://youtu.be/abc123", &opts);
        let joined = args.join(" ");
        assert!(joined.contains("-f bestaudio/best"));
        assert!(joined.contains("-x --audio-format mp3 --audio-quality 192"));
        assert!(joined.contains("--embed-metadata"));
    }

    #[test]
    fn args_carry_cookies_when_provided() {
        let mut config =
            DownloadConfig::new("https://youtu.be/abc123", "/tmp/media").with_format(OutputFormat::Video);
        config.cookies_file = Some("/tmp/cookies.txt".into());
        let opts = platforms::engine_options(platforms::Platform::YouTube, &config, None).unwrap();
        let args = build_args(&config.url, &opts);
        let joined = args.join(" ");
        assert!(joined.contains("--cookies /tmp/cookies.txt"));
    }

    #[test]
    fn progress_line_parses_fields() {
        let event = parse_progress_line("download:2048|4096|1.0MiB/s|00:12").unwrap();
        assert_eq!(
            event,
            EngineEvent::Downloading {
                downloaded: 2048,
                total: Some(4096),
                speed: "1.0MiB/s".into(),
                eta: "00:12".into(),
            }
        );
    }

    #[test]
    fn progress_line_zero_total_is_unknown() {
        let event = parse_progress_line("download:2048|0||").unwrap();
        match event {
            EngineEvent::Downloading { total, .. } => assert!(total.is_none()),
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn non_progress_lines_are_ignored() {
        assert!(parse_progress_line("[download] Destination: x.mp4").is_none());
        assert!(parse_progress_line("").is_none());
    }

    #[test]
    fn post_lines_classified_by_tag() {
        assert_eq!(
            parse_post_line("[ExtractAudio] Destination: a.mp3"),
            Some(PostKind::ExtractAudio)
        );
        assert_eq!(parse_post_line("[Metadata] Adding metadata"), Some(PostKind::Metadata));
        assert_eq!(parse_post_line("[Merger] Merging formats"), Some(PostKind::Other));
        assert_eq!(parse_post_line("[download] 50%"), None);
    }

    #[test]
    fn mapper_emits_finished_once_at_completion() {
        let mut mapper = LineMapper::new();
        let first = mapper.map("download:50|100||");
        assert_eq!(first.len(), 1);
        let done = mapper.map("download:100|100||");
        assert_eq!(done.len(), 2);
        assert_eq!(done[1], EngineEvent::Finished);
        // A later post line must not repeat Finished.
        let post = mapper.map("[ExtractAudio] Destination: a.mp3");
        assert_eq!(
            post,
            vec![EngineEvent::PostStarted {
                kind: PostKind::ExtractAudio
            }]
        );
    }

    #[test]
    fn mapper_dedupes_repeated_post_lines() {
        let mut mapper = LineMapper::new();
        mapper.map("download:100|100||");
        mapper.map("[ExtractAudio] start");
        let repeat = mapper.map("[ExtractAudio] still going");
        assert!(repeat.is_empty());
        let next = mapper.map("[Metadata] tagging");
        assert_eq!(next, vec![EngineEvent::PostStarted { kind: PostKind::Metadata }]);
    }

    #[tokio::test]
    async fn find_downloaded_file_prefers_id_match() {
        let dir = tempfile::tempdir().unwrap();
        let started = std::time::SystemTime::now();
        tokio::fs::write(dir.path().join("other [zzz].mp4"), b"x").await.unwrap();
        tokio::fs::write(dir.path().join("wanted [abc123].mp4"), b"x").await.unwrap();
        tokio::fs::write(dir.path().join("leftover.part"), b"x").await.unwrap();

        let found = find_downloaded_file(dir.path(), "abc123", started).await.unwrap();
        assert!(found.to_string_lossy().contains("abc123"));
    }

    #[tokio::test]
    async fn find_downloaded_file_ignores_preexisting_files() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("old movie.mp4"), b"x").await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        // Nothing named after the id and nothing newer than the start mark.
        let started = std::time::SystemTime::now();
        let err = find_downloaded_file(dir.path(), "abc123", started).await;
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn find_downloaded_file_falls_back_to_fresh_files_only() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("old movie.mp4"), b"x").await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        let started = std::time::SystemTime::now();
        tokio::fs::write(dir.path().join("renamed output.mp3"), b"x").await.unwrap();

        // The id never matches after an audio-extraction rename, but the
        // fresh file is still the download's product.
        let found = find_downloaded_file(dir.path(), "abc123", started).await.unwrap();
        assert!(found.to_string_lossy().contains("renamed output"));
    }
}
