use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::{
    common::types::AudioFormat,
    protocol::{StreamHandle, Track},
    sources::{ResolveError, SourcePlugin},
};

const SEARCH_PREFIX: &str = "localsearch:";
const FILE_PREFIX: &str = "file://";
const COVER_NAMES: [&str; 4] = ["cover.jpg", "cover.png", "folder.jpg", "folder.png"];

/// Files on disk: `file://` URLs, absolute paths, and `localsearch:` queries
/// over the configured library directories.
pub struct LocalSource {
    directories: Vec<PathBuf>,
}

impl LocalSource {
    pub fn new(directories: &[String]) -> Self {
        let directories: Vec<PathBuf> = directories.iter().map(PathBuf::from).collect();
        for dir in &directories {
            if !dir.is_dir() {
                warn!("Local library directory does not exist: {}", dir.display());
            }
        }
        Self { directories }
    }

    /// Blocking: stats `path`. Run it off the async workers.
    fn track_for(path: &Path) -> Result<Track, ResolveError> {
        if !path.is_file() {
            return Err(ResolveError::NoMatches(path.display().to_string()));
        }
        if !AudioFormat::from_path(path).is_known() {
            return Err(ResolveError::Unsupported(path.display().to_string()));
        }

        let title = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let locator = path.to_string_lossy().into_owned();

        let mut track = Track::new(title, format!("{FILE_PREFIX}{locator}"), StreamHandle::new(locator));
        if let Some(parent) = path.parent() {
            if let Some(folder) = parent.file_name() {
                track = track.with_uploader(folder.to_string_lossy());
            }
            if let Some(cover) = COVER_NAMES
                .iter()
                .map(|name| parent.join(name))
                .find(|candidate| candidate.is_file())
            {
                track = track.with_thumbnail(format!("{FILE_PREFIX}{}", cover.display()));
            }
        }
        Ok(track)
    }

    /// First audio file, in path order, whose stem contains every term.
    fn search(directories: &[PathBuf], terms: &[String]) -> Option<PathBuf> {
        let mut matches: Vec<PathBuf> = directories
            .iter()
            .flat_map(|dir| WalkDir::new(dir).follow_links(true).into_iter())
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| AudioFormat::from_path(path).is_known())
            .filter(|path| {
                let stem = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().to_lowercase())
                    .unwrap_or_default();
                terms.iter().all(|term| stem.contains(term.as_str()))
            })
            .collect();

        matches.sort();
        matches.into_iter().next()
    }
}

#[async_trait]
impl SourcePlugin for LocalSource {
    fn name(&self) -> &str {
        "local"
    }

    fn can_handle(&self, identifier: &str) -> bool {
        identifier.starts_with(SEARCH_PREFIX)
            || identifier.starts_with(FILE_PREFIX)
            || Path::new(identifier).is_absolute()
    }

    async fn resolve(&self, identifier: &str) -> Result<Track, ResolveError> {
        if let Some(query) = identifier.strip_prefix(SEARCH_PREFIX) {
            let terms: Vec<String> = query.split_whitespace().map(str::to_lowercase).collect();
            if terms.is_empty() {
                return Err(ResolveError::EmptyQuery);
            }

            let directories = self.directories.clone();
            let found = tokio::task::spawn_blocking(move || {
                Self::search(&directories, &terms).map(|path| Self::track_for(&path))
            })
            .await
            .map_err(|e| ResolveError::Io(e.to_string()))?;

            return match found {
                Some(track) => {
                    debug!("localsearch {:?} matched {:?}", query, track.as_ref().map(|t| &t.title));
                    track
                }
                None => Err(ResolveError::NoMatches(query.trim().to_string())),
            };
        }

        let raw = identifier.strip_prefix(FILE_PREFIX).unwrap_or(identifier);
        let path = urlencoding::decode(raw)
            .map(|s| PathBuf::from(s.as_ref()))
            .unwrap_or_else(|_| PathBuf::from(raw));
        tokio::task::spawn_blocking(move || Self::track_for(&path))
            .await
            .map_err(|e| ResolveError::Io(e.to_string()))?
    }
}
