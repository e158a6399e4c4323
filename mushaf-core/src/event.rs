use crate::error::{CoreError, ErrorKind};
use crate::model::{NavigationTarget, Page, PageNumber, Word, WordId};
use crate::timeline::PlaybackStatus;
use std::sync::Arc;
use std::time::Duration;

/// Observable state changes, published in the order they happen.
#[derive(Debug, Clone)]
pub enum MushafEvent {
    /// A fetch for this page was issued
    PageLoading { page_number: PageNumber },
    /// A new page became current
    PageChanged { page: Arc<Page> },
    /// The latest page fetch failed; the previous page is still shown
    PageFailed {
        page_number: PageNumber,
        kind: ErrorKind,
        message: String,
    },
    /// A navigation intent could not be resolved; nothing changed
    NavigationFailed {
        target: NavigationTarget,
        kind: ErrorKind,
        message: String,
    },
    /// The clicked word changed
    SelectionChanged { word: Option<Word> },
    /// The audio-highlighted word changed
    HighlightChanged { word_id: Option<WordId> },
    /// Playing / paused / stopped transitions
    PlaybackChanged {
        status: PlaybackStatus,
        position: Duration,
    },
    /// Audio or timings are missing; playback degrades to silent/no highlight
    AudioUnavailable { kind: ErrorKind, message: String },
}

impl MushafEvent {
    pub(crate) fn navigation_failed(target: NavigationTarget, error: &CoreError) -> Self {
        Self::NavigationFailed {
            target,
            kind: error.kind(),
            message: error.to_string(),
        }
    }

    pub(crate) fn audio_unavailable(error: &CoreError) -> Self {
        Self::AudioUnavailable {
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}
