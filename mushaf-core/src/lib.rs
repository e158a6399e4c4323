pub mod config;
pub mod error;
pub mod event;
pub mod model;
pub mod navigation;
pub mod navigator;
pub mod page_store;
pub mod paths;
pub mod provider;
pub mod resolver;
pub mod time;
pub mod timeline;

#[cfg(test)]
mod fixtures;

pub use config::{
    ApiConfig, AudioConfig, LoggingConfig, MushafConfig, MushafReaderConfig, CONFIG_TEMPLATE,
    DEFAULT_BASE_URL,
};

pub use error::{CoreError, ErrorKind, Result};
pub use event::MushafEvent;
pub use model::{
    AudioTiming, AyahAudio, AyahLocation, AyahNumber, Layout, LayoutId, LayoutsResponse, Line,
    LineType, NavigationTarget, Page, PageNumber, PageTarget, RecitationId, SearchResponse,
    SearchResult, SelectionState, SurahCatalog, SurahInfo, SurahNamesResponse, SurahNumber, Word,
    WordAudio, WordId, DEFAULT_LAYOUT_ID, SURAH_COUNT,
};
pub use navigation::{AyahLookup, Effect, NavigationController, ReadingState};
pub use navigator::{bootstrap, Navigator, NavigatorHandle};
pub use page_store::{Completion, PageRequest, PageState, PageStore, RequestOutcome};
pub use paths::{
    cache_dir, config_dir, config_path, log_file_path, APP_DIR_NAME, CONFIG_FILE_NAME,
    LOG_FILE_NAME,
};
pub use provider::{MediaOutput, MushafApi, SearchQuery, DEFAULT_SEARCH_LIMIT};
pub use resolver::{AyahIndex, LocationResolver, PageWordRange, WordIndex};
pub use time::DurationExt;
pub use timeline::{
    AudioTimeline, AutoStop, AyahKey, AyahTimings, LoadOutcome, MediaCommand, PlaybackStatus,
    TimingLoad, Transition,
};
