use std::path::Path;

use crate::core::engine::{EngineOptions, PostProcessor};
use crate::models::{DownloadConfig, OutputFormat};

/// YouTube-specific overlay on the shared engine options. Skipping the
/// age-restriction filter and certificate checks is deliberate behavior.
pub fn engine_options(config: &DownloadConfig, ffmpeg: Option<&Path>) -> EngineOptions {
    let mut opts = EngineOptions::base(config, ffmpeg);
    opts.age_limit = Some(0);
    opts.no_check_certificate = true;

    match config.output_format {
        OutputFormat::Audio => {
            opts.format = "bestaudio/best".into();
            opts.postprocessors = vec![PostProcessor::mp3_at_192(), PostProcessor::EmbedMetadata];
        }
        OutputFormat::Video => {
            if ffmpeg.is_some() {
                opts.format = "bestvideo+bestaudio/best".into();
                opts.merge_output_format = Some("mp4".into());
            } else {
                // Without the mux tool only a pre-merged stream works.
                opts.format = "best".into();
            }
        }
    }

    opts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(format: OutputFormat) -> DownloadConfig {
        DownloadConfig::new("https://youtu.be/abc123", "/tmp/media").with_format(format)
    }

    #[test]
    fn video_with_ffmpeg_merges_into_mp4() {
        let opts = engine_options(&config(OutputFormat::Video), Some(Path::new("ffmpeg")));
        assert_eq!(opts.format, "bestvideo+bestaudio/best");
        assert_eq!(opts.merge_output_format.as_deref(), Some("mp4"));
        assert!(opts.postprocessors.is_empty());
    }

    #[test]
    fn video_without_ffmpeg_falls_back_to_premuxed() {
        let opts = engine_options(&config(OutputFormat::Video), None);
        assert_eq!(opts.format, "best");
        assert!(opts.merge_output_format.is_none());
    }

    #[test]
    fn audio_extracts_mp3_and_tags_metadata() {
        let opts = engine_options(&config(OutputFormat::Audio), Some(Path::new("ffmpeg")));
        assert_eq!(opts.format, "bestaudio/best");
        assert_eq!(
            opts.postprocessors,
            vec![
                PostProcessor::ExtractAudio {
                    codec: "mp3".into(),
                    quality: "192".into()
                },
                PostProcessor::EmbedMetadata,
            ]
        );
    }

    #[test]
    fn platform_quirks_always_applied() {
        let opts = engine_options(&config(OutputFormat::Video), None);
        assert_eq!(opts.age_limit, Some(0));
        assert!(opts.no_check_certificate);
    }
}
