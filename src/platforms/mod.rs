use std::path::Path;

use serde::Serialize;

use crate::core::engine::EngineOptions;
use crate::models::DownloadConfig;

pub mod audiomack;
pub mod instagram;
pub mod twitter;
pub mod youtube;

/// The closed set of supported platforms. Declaration order is the
/// resolution order: a URL whose text matches several domain lists goes to
/// the first entry, by contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Platform {
    YouTube,
    Twitter,
    Instagram,
    Audiomack,
}

impl Platform {
    pub const ALL: [Platform; 4] = [
        Platform::YouTube,
        Platform::Twitter,
        Platform::Instagram,
        Platform::Audiomack,
    ];

    /// Display name shown to users and in error messages.
    pub fn name(self) -> &'static str {
        match self {
            Platform::YouTube => "YouTube",
            Platform::Twitter => "X (Twitter)",
            Platform::Instagram => "Instagram",
            Platform::Audiomack => "Audiomack",
        }
    }

    /// Domain substrings this platform claims.
    pub fn domains(self) -> &'static [&'static str] {
        match self {
            Platform::YouTube => &[
                "youtube.com",
                "youtu.be",
                "youtube-nocookie.com",
                "music.youtube.com",
            ],
            Platform::Twitter => &["twitter.com", "x.com", "mobile.twitter.com", "mobile.x.com"],
            Platform::Instagram => &["instagram.com", "www.instagram.com", "instagr.am"],
            Platform::Audiomack => &["audiomack.com", "www.audiomack.com"],
        }
    }

    /// Case-insensitive substring test over the whole URL, not a host parse.
    pub fn matches(self, url: &str) -> bool {
        let url = url.to_lowercase();
        self.domains().iter().any(|domain| url.contains(domain))
    }

    /// First registered platform claiming the URL, in declaration order.
    pub fn detect(url: &str) -> Option<Platform> {
        Self::ALL.into_iter().find(|p| p.matches(url))
    }

    pub fn supported_names() -> Vec<&'static str> {
        Self::ALL.into_iter().map(Platform::name).collect()
    }
}

/// Merged engine options for the platforms that delegate to the shared
/// extraction engine. `None` for Audiomack, whose flow never touches it.
pub fn engine_options(
    platform: Platform,
    config: &DownloadConfig,
    ffmpeg: Option<&Path>,
) -> Option<EngineOptions> {
    match platform {
        Platform::YouTube => Some(youtube::engine_options(config, ffmpeg)),
        Platform::Twitter => Some(twitter::engine_options(config, ffmpeg)),
        Platform::Instagram => Some(instagram::engine_options(config, ffmpeg)),
        Platform::Audiomack => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_each_registered_domain() {
        let cases = [
            ("https://www.youtube.com/watch?v=abc", Platform::YouTube),
            ("https://youtu.be/abc123", Platform::YouTube),
            ("https://music.youtube.com/watch?v=abc", Platform::YouTube),
            ("https://x.com/u/status/1", Platform::Twitter),
            ("https://mobile.twitter.com/u/status/1", Platform::Twitter),
            ("https://www.instagram.com/reel/xyz", Platform::Instagram),
            ("https://instagr.am/p/xyz", Platform::Instagram),
            ("https://audiomack.com/artist/song/track", Platform::Audiomack),
        ];
        for (url, expected) in cases {
            assert_eq!(Platform::detect(url), Some(expected), "{}", url);
        }
    }

    #[test]
    fn detection_is_case_insensitive() {
        assert_eq!(
            Platform::detect("HTTPS://WWW.YOUTUBE.COM/watch?v=abc"),
            Some(Platform::YouTube)
        );
    }

    #[test]
    fn unknown_urls_detect_nothing() {
        assert_eq!(Platform::detect("https://example.com/video"), None);
        assert_eq!(Platform::detect(""), None);
    }

    #[test]
    fn multi_match_resolves_by_declaration_order() {
        // Contains both a YouTube and an Audiomack domain substring; the
        // registry order decides, not match length or specificity.
        let url = "https://youtube.com/redirect?to=audiomack.com/a/song/b";
        assert_eq!(Platform::detect(url), Some(Platform::YouTube));
    }

    #[test]
    fn supported_names_follow_registry_order() {
        assert_eq!(
            Platform::supported_names(),
            vec!["YouTube", "X (Twitter)", "Instagram", "Audiomack"]
        );
    }

    #[test]
    fn audiomack_has_no_engine_options() {
        let config = DownloadConfig::new("https://audiomack.com/a/song/b", "/tmp");
        assert!(engine_options(Platform::Audiomack, &config, None).is_none());
    }
}
