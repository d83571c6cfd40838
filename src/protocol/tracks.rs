use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Opaque resource a voice transport needs to start streaming a track.
///
/// `locator` is whatever the resolving source hands out (a direct URL or a
/// filesystem path); `length` is a hint, not a promise.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamHandle {
    pub locator: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<Duration>,
}

impl StreamHandle {
    pub fn new(locator: impl Into<String>) -> Self {
        Self {
            locator: locator.into(),
            length: None,
        }
    }

    pub fn with_length(mut self, length: Duration) -> Self {
        self.length = Some(length);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.locator.trim().is_empty()
    }
}

/// A resolved, playable track. Never mutated once a source builds it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub title: String,
    /// Human-readable origin, e.g. the URL the user pasted.
    pub source_url: String,
    #[serde(skip)]
    pub stream_handle: StreamHandle,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploader: Option<String>,
}

impl Track {
    pub fn new(
        title: impl Into<String>,
        source_url: impl Into<String>,
        stream_handle: StreamHandle,
    ) -> Self {
        Self {
            title: title.into(),
            source_url: source_url.into(),
            stream_handle,
            duration_seconds: None,
            thumbnail_url: None,
            uploader: None,
        }
    }

    pub fn with_duration(mut self, seconds: u64) -> Self {
        self.duration_seconds = Some(seconds);
        self
    }

    pub fn with_uploader(mut self, uploader: impl Into<String>) -> Self {
        self.uploader = Some(uploader.into());
        self
    }

    pub fn with_thumbnail(mut self, url: impl Into<String>) -> Self {
        self.thumbnail_url = Some(url.into());
        self
    }

    /// `m:ss`, or `h:mm:ss` for anything an hour or longer.
    pub fn formatted_duration(&self) -> Option<String> {
        self.duration_seconds.map(format_duration)
    }
}

pub fn format_duration(seconds: u64) -> String {
    let (h, m, s) = (seconds / 3600, (seconds % 3600) / 60, seconds % 60);
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m}:{s:02}")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_track() -> Track {
        Track::new(
            "Never Gonna Give You Up",
            "https://cdn.example.com/rick.mp3",
            StreamHandle::new("https://cdn.example.com/rick.mp3"),
        )
        .with_duration(212)
        .with_uploader("Rick Astley")
    }

    #[test]
    fn test_duration_formatting() {
        assert_eq!(format_duration(0), "0:00");
        assert_eq!(format_duration(212), "3:32");
        assert_eq!(format_duration(3725), "1:02:05");
        assert_eq!(sample_track().formatted_duration().as_deref(), Some("3:32"));
    }

    #[test]
    fn test_track_serializes_camelcase_without_stream_handle() {
        let json = serde_json::to_value(sample_track()).unwrap();

        assert_eq!(json["sourceUrl"], "https://cdn.example.com/rick.mp3");
        assert_eq!(json["durationSeconds"], 212);
        assert_eq!(json["uploader"], "Rick Astley");
        assert!(json.get("streamHandle").is_none());
        assert!(json.get("thumbnailUrl").is_none());
    }

    #[test]
    fn test_blank_stream_handle_is_empty() {
        assert!(StreamHandle::new("  ").is_empty());
        assert!(!StreamHandle::new("/music/a.mp3").is_empty());
    }
}
