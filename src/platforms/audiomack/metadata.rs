use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

pub const TITLE_MAX: usize = 100;
pub const ARTIST_MAX: usize = 50;

/// Substring that marks the streaming request among captured traffic.
pub const STREAM_HOST: &str = "music.audiomack.com";

static TRACK_PATH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"audiomack\.com/([^/]+)/song/([^/?]+)").unwrap());
static ILLEGAL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"[<>:"/\\|?*]"#).unwrap());
static WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackMetadata {
    pub title: String,
    pub artist: String,
    pub id: String,
}

impl Default for TrackMetadata {
    fn default() -> Self {
        Self {
            title: "Unknown".into(),
            artist: "Unknown".into(),
            id: "unknown".into(),
        }
    }
}

impl TrackMetadata {
    /// Derive artist/title/id from the canonical `/<artist>/song/<slug>`
    /// page path. Falls back to placeholders when the URL has another shape.
    pub fn from_url(url: &str) -> Self {
        let mut meta = Self::default();
        if let Some(caps) = TRACK_PATH_RE.captures(url) {
            meta.artist = title_case(&caps[1].replace('-', " "));
            meta.title = title_case(&caps[2].replace('-', " "));
            meta.id = caps[2].to_string();
        }
        meta
    }

    /// Refine artist/title from the page's first heading: first line is the
    /// artist, second the title; a single line is treated as title only.
    /// Returns whether anything was applied.
    pub fn refine_from_heading(&mut self, heading: &str) -> bool {
        let lines: Vec<&str> = heading
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();
        match lines.as_slice() {
            [] => false,
            [title] => {
                self.title = title.to_string();
                true
            }
            [artist, title, ..] => {
                self.artist = artist.to_string();
                self.title = title.to_string();
                true
            }
        }
    }

    /// Copy with filename-safe, length-capped fields.
    pub fn sanitized(&self) -> Self {
        Self {
            title: clean(&self.title, TITLE_MAX),
            artist: clean(&self.artist, ARTIST_MAX),
            id: self.id.clone(),
        }
    }

    pub fn destination_filename(&self, ext: &str) -> String {
        format!("{} - {} [{}].{}", self.artist, self.title, self.id, ext)
    }
}

/// Collapse line breaks, strip filename-illegal characters, collapse runs of
/// whitespace, and cap the length. Idempotent.
pub fn clean(text: &str, max_chars: usize) -> String {
    let text: String = text.nfc().collect();
    let text = text.replace(['\n', '\r'], " ");
    let text = ILLEGAL_RE.replace_all(&text, "_");
    let text = WS_RE.replace_all(&text, " ");
    text.trim().chars().take(max_chars).collect::<String>().trim_end().to_string()
}

/// First match wins; scanning stops at the first streaming-host URL.
pub fn find_streaming_url<'a, I>(request_urls: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    request_urls.into_iter().find(|url| url.contains(STREAM_HOST))
}

/// `.m4a` marker in the streaming URL decides the container; mp3 otherwise.
pub fn extension_for(streaming_url: &str) -> &'static str {
    if streaming_url.contains(".m4a") {
        "m4a"
    } else {
        "mp3"
    }
}

fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_from_track_url() {
        let meta =
            TrackMetadata::from_url("https://audiomack.com/bad-bunny/song/tit-me-pregunto");
        assert_eq!(meta.artist, "Bad Bunny");
        assert_eq!(meta.title, "Tit Me Pregunto");
        assert_eq!(meta.id, "tit-me-pregunto");
    }

    #[test]
    fn metadata_ignores_query_string() {
        let meta = TrackMetadata::from_url("https://audiomack.com/artist/song/slug?ref=feed");
        assert_eq!(meta.id, "slug");
    }

    #[test]
    fn metadata_falls_back_on_other_paths() {
        let meta = TrackMetadata::from_url("https://audiomack.com/some-artist/album/x");
        assert_eq!(meta, TrackMetadata::default());
    }

    #[test]
    fn heading_with_two_lines_sets_both() {
        let mut meta = TrackMetadata::default();
        assert!(meta.refine_from_heading("The Artist\nThe Title"));
        assert_eq!(meta.artist, "The Artist");
        assert_eq!(meta.title, "The Title");
    }

    #[test]
    fn heading_with_one_line_is_title_only() {
        let mut meta = TrackMetadata::from_url("https://audiomack.com/a/song/b");
        let artist_before = meta.artist.clone();
        assert!(meta.refine_from_heading("  Solo Title  "));
        assert_eq!(meta.title, "Solo Title");
        assert_eq!(meta.artist, artist_before);
    }

    #[test]
    fn empty_heading_applies_nothing() {
        let mut meta = TrackMetadata::default();
        assert!(!meta.refine_from_heading("\n  \n"));
        assert_eq!(meta, TrackMetadata::default());
    }

    #[test]
    fn clean_strips_illegal_characters() {
        let out = clean("a<b>c:d\"e/f\\g|h?i*j", 100);
        for c in ['<', '>', ':', '"', '/', '\\', '|', '?', '*'] {
            assert!(!out.contains(c), "contains {:?}", c);
        }
    }

    #[test]
    fn clean_collapses_breaks_and_whitespace() {
        assert_eq!(clean("line\none\r\n  two   three ", 100), "line one two three");
    }

    #[test]
    fn clean_caps_length() {
        let long = "x".repeat(300);
        assert_eq!(clean(&long, TITLE_MAX).chars().count(), TITLE_MAX);
        assert!(clean(&long, ARTIST_MAX).chars().count() <= ARTIST_MAX);
    }

    #[test]
    fn clean_is_idempotent() {
        let inputs = [
            "Título: con/ilegales*y\nrupturas",
            "   spaced   out   ",
            "plain",
            "caps exactly at the boundary with trailing space ",
        ];
        for input in inputs {
            let once = clean(input, TITLE_MAX);
            assert_eq!(clean(&once, TITLE_MAX), once, "input {:?}", input);
        }
    }

    #[test]
    fn sanitized_caps_title_and_artist() {
        let meta = TrackMetadata {
            title: "t".repeat(200),
            artist: "a".repeat(200),
            id: "id1".into(),
        };
        let s = meta.sanitized();
        assert_eq!(s.title.chars().count(), TITLE_MAX);
        assert_eq!(s.artist.chars().count(), ARTIST_MAX);
        assert_eq!(s.id, "id1");
    }

    #[test]
    fn first_matching_log_entry_wins() {
        let log = [
            "https://cdn.example.com/player.js",
            "https://music.audiomack.com/stream/track-a.m4a",
            "https://music.audiomack.com/stream/track-b.m4a",
        ];
        assert_eq!(
            find_streaming_url(log),
            Some("https://music.audiomack.com/stream/track-a.m4a")
        );
    }

    #[test]
    fn no_match_yields_none() {
        let log = ["https://cdn.example.com/a.js", "https://ads.example.com/b"];
        assert_eq!(find_streaming_url(log), None);
    }

    #[test]
    fn extension_from_streaming_url() {
        assert_eq!(extension_for("https://music.audiomack.com/t.m4a?x=1"), "m4a");
        assert_eq!(extension_for("https://music.audiomack.com/t"), "mp3");
    }

    #[test]
    fn destination_filename_shape() {
        let meta = TrackMetadata {
            title: "Song".into(),
            artist: "Artist".into(),
            id: "slug".into(),
        };
        assert_eq!(meta.destination_filename("m4a"), "Artist - Song [slug].m4a");
    }
}
