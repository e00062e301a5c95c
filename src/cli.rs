use std::path::PathBuf;

use clap::Parser;

use crate::models::OutputFormat;

#[derive(Debug, Parser)]
#[command(name = "mediagrab", about = "Descarga vídeo y audio de YouTube, X, Instagram y Audiomack")]
pub struct Cli {
    /// URL to download.
    pub url: Option<String>,

    /// Directory where the media file is written.
    #[arg(long, default_value = "downloads")]
    pub output_dir: PathBuf,

    /// Download audio only (mp3).
    #[arg(long)]
    pub audio: bool,

    /// Netscape-format cookie file passed to the extraction engine.
    #[arg(long)]
    pub cookies: Option<PathBuf>,

    /// Explicit ffmpeg binary; auto-detected when omitted.
    #[arg(long)]
    pub ffmpeg_path: Option<PathBuf>,

    /// Print the platform the URL belongs to and exit.
    #[arg(long)]
    pub detect: bool,

    /// List supported platforms and exit.
    #[arg(long)]
    pub list_platforms: bool,
}

impl Cli {
    pub fn output_format(&self) -> OutputFormat {
        if self.audio {
            OutputFormat::Audio
        } else {
            OutputFormat::Video
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_video() {
        let cli = Cli::parse_from(["mediagrab", "https://youtu.be/x"]);
        assert_eq!(cli.output_format(), OutputFormat::Video);
        assert_eq!(cli.output_dir, PathBuf::from("downloads"));
    }

    #[test]
    fn audio_flag_switches_format() {
        let cli = Cli::parse_from(["mediagrab", "--audio", "https://youtu.be/x"]);
        assert_eq!(cli.output_format(), OutputFormat::Audio);
    }

    #[test]
    fn list_platforms_needs_no_url() {
        let cli = Cli::parse_from(["mediagrab", "--list-platforms"]);
        assert!(cli.url.is_none());
        assert!(cli.list_platforms);
    }
}
