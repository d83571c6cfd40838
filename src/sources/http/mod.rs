use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use tracing::{debug, warn};

use crate::{
    common::types::{AnyResult, AudioFormat},
    protocol::{StreamHandle, Track},
    sources::{ResolveError, SourcePlugin},
};

/// Direct audio URLs. Nothing is downloaded; with probing on, a `HEAD`
/// request checks the URL answers with something that looks like audio.
pub struct HttpSource {
    url_regex: Regex,
    client: Option<reqwest::Client>,
}

impl HttpSource {
    pub fn new(probe: bool) -> AnyResult<Self> {
        let client = if probe {
            Some(
                reqwest::Client::builder()
                    .timeout(Duration::from_secs(10))
                    .build()?,
            )
        } else {
            None
        };

        Ok(Self {
            url_regex: Regex::new(r"^(?:https?|icy)://")?,
            client,
        })
    }

    /// Last non-empty path segment without its extension, falling back to
    /// the host.
    fn title_from_url(url: &str) -> String {
        let without_scheme = url.split_once("://").map(|(_, rest)| rest).unwrap_or(url);
        let path = without_scheme
            .split(['?', '#'])
            .next()
            .unwrap_or(without_scheme);
        let mut segments = path.split('/');
        let host = segments.next().unwrap_or_default();

        let title = segments
            .filter(|s| !s.is_empty())
            .last()
            .map(|segment| {
                let decoded = urlencoding::decode(segment)
                    .map(|s| s.into_owned())
                    .unwrap_or_else(|_| segment.to_string());
                match decoded.rsplit_once('.') {
                    Some((stem, _)) if !stem.is_empty() => stem.to_string(),
                    _ => decoded,
                }
            });

        title.unwrap_or_else(|| host.to_string())
    }

    fn host_of(url: &str) -> Option<String> {
        url.split_once("://")
            .and_then(|(_, rest)| rest.split(['/', '?', '#']).next())
            .filter(|h| !h.is_empty())
            .map(str::to_string)
    }

    async fn probe(client: &reqwest::Client, url: &str) -> Result<(), ResolveError> {
        let response = client
            .head(url)
            .send()
            .await
            .map_err(|e| ResolveError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ResolveError::Network(format!(
                "{} answered HTTP {}",
                url,
                response.status()
            )));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        debug!("Probed {}: content-type {:?}", url, content_type);

        // Plenty of servers send octet-stream for audio; only reject types we
        // know are something else.
        if !content_type.is_empty()
            && !content_type.starts_with("application/octet-stream")
            && !AudioFormat::from_mime(content_type).is_known()
        {
            warn!("Rejecting {}: content-type {}", url, content_type);
            return Err(ResolveError::Unsupported(format!(
                "{url} is {content_type}, not audio"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl SourcePlugin for HttpSource {
    fn name(&self) -> &str {
        "http"
    }

    fn can_handle(&self, identifier: &str) -> bool {
        self.url_regex.is_match(identifier)
    }

    async fn resolve(&self, identifier: &str) -> Result<Track, ResolveError> {
        if let Some(client) = &self.client {
            Self::probe(client, identifier).await?;
        }

        let mut track = Track::new(
            Self::title_from_url(identifier),
            identifier,
            StreamHandle::new(identifier),
        );
        if let Some(host) = Self::host_of(identifier) {
            track = track.with_uploader(host);
        }
        Ok(track)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_is_decoded_file_stem() {
        assert_eq!(
            HttpSource::title_from_url("https://cdn.example.com/music/My%20Song.mp3?sig=1"),
            "My Song"
        );
        assert_eq!(
            HttpSource::title_from_url("http://radio.example.com:8000/live/"),
            "live"
        );
        assert_eq!(
            HttpSource::title_from_url("icy://radio.example.com"),
            "radio.example.com"
        );
    }

    #[test]
    fn handles_only_web_schemes() {
        let source = HttpSource::new(false).unwrap();
        assert!(source.can_handle("https://a.example/x.mp3"));
        assert!(source.can_handle("icy://radio.example"));
        assert!(!source.can_handle("file:///x.mp3"));
        assert!(!source.can_handle("localsearch:x"));
    }

    #[tokio::test]
    async fn resolves_without_probe() {
        let source = HttpSource::new(false).unwrap();
        let track = source
            .resolve("https://cdn.example.com/a/track.ogg")
            .await
            .unwrap();

        assert_eq!(track.title, "track");
        assert_eq!(track.source_url, "https://cdn.example.com/a/track.ogg");
        assert_eq!(track.stream_handle.locator, "https://cdn.example.com/a/track.ogg");
        assert_eq!(track.uploader.as_deref(), Some("cdn.example.com"));
        assert_eq!(track.duration_seconds, None);
    }
}
