//! Boundaries to the outside world: the Mushaf REST service and the host's
//! media element.

use crate::error::CoreError;
use crate::model::{
    AyahAudio, AyahLocation, AyahNumber, Layout, LayoutId, Page, PageNumber, RecitationId,
    SearchResponse, SurahNamesResponse, SurahNumber, WordAudio, WordId,
};
use crate::timeline::MediaCommand;
use async_trait::async_trait;
use std::time::Duration;

/// Default number of search hits requested.
pub const DEFAULT_SEARCH_LIMIT: usize = 20;

/// Query parameters for a text search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    /// Free text, matched by the backend
    pub text: String,
    /// Maximum number of ranked hits
    pub limit: usize,
}

impl SearchQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            limit: DEFAULT_SEARCH_LIMIT,
        }
    }

    #[must_use]
    pub const fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Trimmed query text; `None` when there is nothing to search for.
    #[must_use]
    pub fn trimmed(&self) -> Option<&str> {
        let text = self.text.trim();
        (!text.is_empty()).then_some(text)
    }
}

/// Read-only access to the Mushaf service.
///
/// Implementations report a missing page or ayah mapping as a not-found
/// error and missing audio as an unavailable error. They must never
/// substitute placeholder data for a failed call.
#[async_trait]
pub trait MushafApi: Send + Sync {
    /// Provider name, for logging
    fn name(&self) -> &'static str;

    /// `GET /qul/layouts`
    async fn layouts(&self) -> Result<Vec<Layout>, CoreError>;

    /// `GET /qul/page/{page}`
    async fn page(&self, page_number: PageNumber) -> Result<Page, CoreError>;

    /// `GET /qul/surah-names`
    async fn surah_names(&self) -> Result<SurahNamesResponse, CoreError>;

    /// `GET /qul/search?q=&limit=`
    async fn search(&self, query: &SearchQuery) -> Result<SearchResponse, CoreError>;

    /// `GET /mushaf/surah/{s}/ayah/{a}/page?layout_id=`
    async fn ayah_page(
        &self,
        surah: SurahNumber,
        ayah: AyahNumber,
        layout_id: LayoutId,
    ) -> Result<AyahLocation, CoreError>;

    /// `GET /audio/ayah/{s}/{a}/recitation/{r}`
    async fn ayah_audio(
        &self,
        surah: SurahNumber,
        ayah: AyahNumber,
        recitation_id: RecitationId,
    ) -> Result<AyahAudio, CoreError>;

    /// `GET /audio/word/{id}/recitation/{r}`
    async fn word_audio(
        &self,
        word_id: WordId,
        recitation_id: RecitationId,
    ) -> Result<WordAudio, CoreError>;
}

/// The host's audio element. Calls must not block.
pub trait MediaOutput: Send {
    fn load(&mut self, url: &str);

    fn seek(&mut self, position: Duration);

    fn play(&mut self);

    fn pause(&mut self);

    /// Dispatch a timeline command to the matching method.
    fn apply(&mut self, command: &MediaCommand) {
        match command {
            MediaCommand::Load { url } => self.load(url),
            MediaCommand::Seek(position) => self.seek(*position),
            MediaCommand::Play => self.play(),
            MediaCommand::Pause => self.pause(),
        }
    }
}
