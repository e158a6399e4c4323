use crate::model::{AyahNumber, LayoutId, PageNumber, RecitationId, SurahNumber, WordId};
use std::path::PathBuf;
use thiserror::Error;

/// Coarse failure classes surfaced to the view layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Page or ayah outside the corpus bounds; user-correctable.
    OutOfRange,
    /// Ayah or word missing from the index; corpus/index mismatch.
    NotFound,
    /// Audio or timing data missing for a recitation; degrade silently.
    Unavailable,
    /// Fetch failed; keep the last good state, retry is manual.
    NetworkFailure,
    /// Configuration or local I/O problem.
    Config,
    /// The navigator event loop is no longer running.
    Shutdown,
}

#[derive(Debug, Error)]
pub enum CoreError {
    // Configuration errors
    #[error("Config file not found at {path}. A template has been created.")]
    ConfigNotFound { path: PathBuf },

    #[error("Invalid config: {message}")]
    ConfigInvalid { message: String },

    #[error("Failed to parse config file: {0}")]
    ConfigParseError(#[from] toml::de::Error),

    // Range errors
    #[error("Page {page} is outside 1..={total_pages}")]
    PageOutOfRange {
        page: PageNumber,
        total_pages: PageNumber,
    },

    #[error("Surah {surah} is outside 1..=114")]
    SurahOutOfRange { surah: SurahNumber },

    #[error("Ayah {surah}:{ayah} is outside 1..={max_ayah}")]
    AyahOutOfRange {
        surah: SurahNumber,
        ayah: AyahNumber,
        max_ayah: AyahNumber,
    },

    // Index errors
    #[error("Ayah {surah}:{ayah} has no page in layout {layout_id}")]
    AyahNotFound {
        surah: SurahNumber,
        ayah: AyahNumber,
        layout_id: LayoutId,
    },

    #[error("Word {word_id} is not on any indexed page")]
    WordNotFound { word_id: WordId },

    #[error("Page {page} not found")]
    PageNotFound { page: PageNumber },

    #[error("Layout {layout_id} not found")]
    LayoutNotFound { layout_id: LayoutId },

    // Audio errors
    #[error("No timing data for ayah {surah}:{ayah} (recitation {recitation_id})")]
    TimingUnavailable {
        surah: SurahNumber,
        ayah: AyahNumber,
        recitation_id: RecitationId,
    },

    #[error("No audio for word {word_id} (recitation {recitation_id})")]
    WordAudioUnavailable {
        word_id: WordId,
        recitation_id: RecitationId,
    },

    // Network errors
    #[error("Network request failed: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Network request failed: {0}")]
    MiddlewareError(#[from] reqwest_middleware::Error),

    #[error("{url} returned status {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("Malformed response: {reason}")]
    MalformedResponse { reason: String },

    // IO errors
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Navigator stopped")]
    NavigatorStopped,
}

impl CoreError {
    /// Classify this error for user-facing handling.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::ConfigNotFound { .. }
            | Self::ConfigInvalid { .. }
            | Self::ConfigParseError(_)
            | Self::IoError(_) => ErrorKind::Config,
            Self::PageOutOfRange { .. }
            | Self::SurahOutOfRange { .. }
            | Self::AyahOutOfRange { .. } => ErrorKind::OutOfRange,
            Self::AyahNotFound { .. }
            | Self::WordNotFound { .. }
            | Self::PageNotFound { .. }
            | Self::LayoutNotFound { .. } => ErrorKind::NotFound,
            Self::TimingUnavailable { .. } | Self::WordAudioUnavailable { .. } => {
                ErrorKind::Unavailable
            }
            Self::NetworkError(_)
            | Self::MiddlewareError(_)
            | Self::HttpStatus { .. }
            | Self::MalformedResponse { .. } => ErrorKind::NetworkFailure,
            Self::NavigatorStopped => ErrorKind::Shutdown,
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
