use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Identity of a playable item as the host library describes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaItem {
    pub path: PathBuf,
    pub title: String,
    #[serde(default)]
    pub show_title: Option<String>,
    #[serde(default)]
    pub season: Option<u32>,
    #[serde(default)]
    pub episode: Option<u32>,
    /// Saved resume offset, cleared when the item is marked watched.
    #[serde(default)]
    pub resume: Option<Duration>,
}

impl MediaItem {
    pub fn new(path: impl Into<PathBuf>, title: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            title: title.into(),
            show_title: None,
            season: None,
            episode: None,
            resume: None,
        }
    }

    pub fn with_episode(mut self, season: u32, episode: u32) -> Self {
        self.season = Some(season);
        self.episode = Some(episode);
        self
    }
}

/// Where a resolved next item came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NextItemSource {
    /// Episode ordering in the host library.
    Library,
    /// The currently active playlist.
    Playlist,
    /// Pushed by an external integration alongside the playing item.
    Provided,
}

impl NextItemSource {
    pub fn as_str(self) -> &'static str {
        match self {
            NextItemSource::Library => "library",
            NextItemSource::Playlist => "playlist",
            NextItemSource::Provided => "provided",
        }
    }
}

impl fmt::Display for NextItemSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NextItem {
    pub item: MediaItem,
    pub source: NextItemSource,
}

impl NextItem {
    pub fn new(item: MediaItem, source: NextItemSource) -> Self {
        Self { item, source }
    }
}
