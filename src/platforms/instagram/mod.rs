use std::path::Path;

use crate::core::engine::{EngineOptions, PostProcessor};
use crate::models::{DownloadConfig, OutputFormat};

/// Extractor tweak: skip DASH manifests, which need login for some posts.
const EXTRACTOR_ARGS: &str = "instagram:skip=dash";

pub fn engine_options(config: &DownloadConfig, ffmpeg: Option<&Path>) -> EngineOptions {
    let mut opts = EngineOptions::base(config, ffmpeg);
    opts.extractor_args = vec![EXTRACTOR_ARGS.to_string()];

    match config.output_format {
        OutputFormat::Audio => {
            opts.format = "bestaudio/best".into();
            opts.postprocessors = vec![PostProcessor::mp3_at_192()];
        }
        OutputFormat::Video => {
            if ffmpeg.is_some() {
                opts.format = "bestvideo+bestaudio/best".into();
                opts.merge_output_format = Some("mp4".into());
            } else {
                opts.format = "best".into();
            }
        }
    }

    opts
}
