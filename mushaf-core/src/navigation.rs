//! The reading-position state machine.
//!
//! [`NavigationController`] owns the current page, the click selection and
//! the audio timeline, and is the only place that issues page requests or
//! touches [`SelectionState`]. It never performs I/O: every operation returns
//! the [`Effect`]s the caller must execute, and completions are fed back in
//! through the `complete_*` methods. Observable changes are published as
//! [`MushafEvent`]s in the order they happen.

use crate::error::CoreError;
use crate::event::MushafEvent;
use crate::model::{
    AyahAudio, AyahLocation, AyahNumber, Layout, LayoutId, NavigationTarget, Page, PageNumber,
    RecitationId, SearchResult, SelectionState, SurahCatalog, SurahNumber, Word, WordAudio,
    WordId,
};
use crate::page_store::{Completion, PageRequest, PageState, PageStore, RequestOutcome};
use crate::resolver::LocationResolver;
use crate::timeline::{
    AudioTimeline, AutoStop, AyahKey, LoadOutcome, MediaCommand, PlaybackStatus, TimingLoad,
    Transition,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

const LOG_TARGET: &str = "mushaf::navigation";

/// Capacity of the event broadcast channel.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Ticket for an ayah-to-page lookup against the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AyahLookup {
    /// Navigation intent this lookup belongs to
    pub nav_seq: u64,
    pub surah: SurahNumber,
    pub ayah: AyahNumber,
    pub layout_id: LayoutId,
}

/// Work the caller must perform on behalf of the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Fetch a page and report back via [`NavigationController::complete_page`]
    FetchPage(PageRequest),
    /// Look up an ayah's page and report back via [`NavigationController::complete_ayah_lookup`]
    LookupAyah(AyahLookup),
    /// Fetch ayah timings and report back via [`NavigationController::complete_timings`]
    LoadTimings(TimingLoad),
    /// Fetch word audio and report back via [`NavigationController::complete_word_audio`]
    FetchWordAudio {
        word_id: WordId,
        recitation_id: RecitationId,
        generation: u64,
    },
    /// Apply to the media element
    Media(MediaCommand),
    /// Call [`NavigationController::auto_stop_fired`] after the delay, replacing any earlier schedule
    ScheduleAutoStop(AutoStop),
}

/// Point-in-time copy of the externally visible state.
#[derive(Debug, Clone)]
pub struct ReadingState {
    pub current_page: Option<Arc<Page>>,
    pub page_state: PageState,
    pub selection: SelectionState,
    pub playback: PlaybackStatus,
    pub position: Duration,
}

impl ReadingState {
    #[must_use]
    pub fn current_page_number(&self) -> Option<PageNumber> {
        self.current_page.as_ref().map(|page| page.page_number)
    }
}

fn transition_effects(transition: Transition) -> Vec<Effect> {
    transition
        .commands
        .into_iter()
        .map(Effect::Media)
        .chain(transition.auto_stop.map(Effect::ScheduleAutoStop))
        .collect()
}

pub struct NavigationController {
    layout: Layout,
    recitation_id: RecitationId,
    resolver: LocationResolver,
    pages: PageStore,
    timeline: AudioTimeline,
    selected_word: Option<Word>,
    nav_seq: u64,
    event_tx: broadcast::Sender<MushafEvent>,
}

impl NavigationController {
    #[must_use]
    pub fn new(layout: Layout, recitation_id: RecitationId, resolver: LocationResolver) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            layout,
            recitation_id,
            resolver,
            pages: PageStore::new(),
            timeline: AudioTimeline::new(),
            selected_word: None,
            nav_seq: 0,
            event_tx,
        }
    }

    /// Subscribe to state change events
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<MushafEvent> {
        self.event_tx.subscribe()
    }

    fn emit(&self, event: MushafEvent) {
        // No subscribers is fine
        let _ = self.event_tx.send(event);
    }

    pub fn set_surahs(&mut self, surahs: SurahCatalog) {
        self.resolver.set_surahs(surahs);
    }

    // Accessors

    #[must_use]
    pub const fn layout(&self) -> &Layout {
        &self.layout
    }

    #[must_use]
    pub const fn recitation_id(&self) -> RecitationId {
        self.recitation_id
    }

    #[must_use]
    pub const fn resolver(&self) -> &LocationResolver {
        &self.resolver
    }

    #[must_use]
    pub const fn timeline(&self) -> &AudioTimeline {
        &self.timeline
    }

    #[must_use]
    pub const fn page_state(&self) -> &PageState {
        self.pages.state()
    }

    #[must_use]
    pub fn current_page(&self) -> Option<&Arc<Page>> {
        self.pages.current_page()
    }

    #[must_use]
    pub fn current_page_number(&self) -> Option<PageNumber> {
        self.pages.current_page_number()
    }

    #[must_use]
    pub const fn selected_word(&self) -> Option<&Word> {
        self.selected_word.as_ref()
    }

    #[must_use]
    pub const fn highlighted_word_id(&self) -> Option<WordId> {
        self.timeline.highlighted_word_id()
    }

    #[must_use]
    pub fn selection(&self) -> SelectionState {
        SelectionState {
            selected_word: self.selected_word.clone(),
            highlighted_word_id: self.highlighted_word_id(),
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> ReadingState {
        ReadingState {
            current_page: self.current_page().cloned(),
            page_state: self.page_state().clone(),
            selection: self.selection(),
            playback: self.timeline.status(),
            position: self.timeline.position(),
        }
    }

    // Navigation

    fn fail_navigation(&self, target: NavigationTarget, error: &CoreError) {
        warn!(target: LOG_TARGET, "Cannot navigate to {}: {}", target, error);
        self.emit(MushafEvent::navigation_failed(target, error));
    }

    fn request_page(&mut self, page_number: PageNumber) -> Vec<Effect> {
        match self.pages.request(page_number) {
            RequestOutcome::Fetch(request) => {
                self.emit(MushafEvent::PageLoading { page_number });
                vec![Effect::FetchPage(request)]
            }
            RequestOutcome::Cached(_) => Vec::new(),
        }
    }

    fn resolve_and_request(&mut self, target: NavigationTarget) -> Vec<Effect> {
        match self.resolver.resolve(target, &self.layout) {
            Ok(resolved) => self.request_page(resolved.page),
            Err(error) => {
                self.fail_navigation(target, &error);
                Vec::new()
            }
        }
    }

    /// Navigate to page `page`, clamped silently into the layout.
    pub fn go_to_page(&mut self, page: i64) -> Vec<Effect> {
        self.nav_seq += 1;
        let clamped = self.layout.clamp_page(page);
        if i64::from(clamped) != page {
            debug!(target: LOG_TARGET, "Clamped page {} to {}", page, clamped);
        }
        self.request_page(clamped)
    }

    /// The page navigation is heading to: the pending request, else the current page.
    fn base_page(&self) -> PageNumber {
        self.pages
            .pending()
            .map(|request| request.page_number)
            .or_else(|| self.current_page_number())
            .unwrap_or(1)
    }

    pub fn next_page(&mut self) -> Vec<Effect> {
        self.go_to_page(i64::from(self.base_page()) + 1)
    }

    pub fn previous_page(&mut self) -> Vec<Effect> {
        self.go_to_page(i64::from(self.base_page()) - 1)
    }

    /// Navigate to the page holding `surah:ayah`. An invalid or unknown
    /// address leaves the current page untouched.
    pub fn go_to_ayah(&mut self, surah: SurahNumber, ayah: AyahNumber) -> Vec<Effect> {
        self.nav_seq += 1;
        let target = NavigationTarget::Ayah { surah, ayah };
        if let Err(error) = self.resolver.check_ayah(surah, ayah) {
            self.fail_navigation(target, &error);
            return Vec::new();
        }
        if self.resolver.needs_lookup(surah, ayah) {
            debug!(target: LOG_TARGET, "Ayah {}:{} not indexed, looking up", surah, ayah);
            return vec![Effect::LookupAyah(AyahLookup {
                nav_seq: self.nav_seq,
                surah,
                ayah,
                layout_id: self.layout.id,
            })];
        }
        self.resolve_and_request(target)
    }

    /// Apply the answer to an [`Effect::LookupAyah`].
    pub fn complete_ayah_lookup(
        &mut self,
        lookup: AyahLookup,
        result: Result<AyahLocation, CoreError>,
    ) -> Vec<Effect> {
        let current = lookup.nav_seq == self.nav_seq;
        let target = NavigationTarget::Ayah {
            surah: lookup.surah,
            ayah: lookup.ayah,
        };
        match result {
            Ok(location) if lookup.layout_id == self.layout.id => {
                self.resolver
                    .record_ayah_page(lookup.surah, lookup.ayah, location.page_number);
            }
            Ok(_) => {
                debug!(
                    target: LOG_TARGET,
                    "Dropping ayah lookup for layout {} (active layout {})",
                    lookup.layout_id,
                    self.layout.id
                );
                return Vec::new();
            }
            Err(error) => {
                if current {
                    self.fail_navigation(target, &error);
                }
                return Vec::new();
            }
        }

        if !current {
            debug!(
                target: LOG_TARGET,
                "Lookup for {} superseded by a newer navigation", target
            );
            return Vec::new();
        }
        self.resolve_and_request(target)
    }

    /// Navigate to the page holding `word_id`. Only words on pages seen this
    /// session are indexed.
    pub fn go_to_word(&mut self, word_id: WordId) -> Vec<Effect> {
        self.navigate(NavigationTarget::Word { word_id })
    }

    /// Navigate to `target` without clamping; out-of-range pages fail.
    pub fn navigate(&mut self, target: NavigationTarget) -> Vec<Effect> {
        match target {
            NavigationTarget::Ayah { surah, ayah } => self.go_to_ayah(surah, ayah),
            NavigationTarget::Page { .. } | NavigationTarget::Word { .. } => {
                self.nav_seq += 1;
                self.resolve_and_request(target)
            }
        }
    }

    /// Jump to a search hit. This is ayah navigation, nothing more.
    pub fn select_search_result(&mut self, result: &SearchResult) -> Vec<Effect> {
        if let Some(page) = result.page.filter(|page| self.layout.contains_page(*page)) {
            self.resolver.record_ayah_page(result.surah, result.ayah, page);
        }
        self.go_to_ayah(result.surah, result.ayah)
    }

    /// Apply the answer to an [`Effect::FetchPage`].
    pub fn complete_page(&mut self, seq: u64, result: Result<Page, CoreError>) {
        match self.pages.complete(seq, result) {
            Completion::Applied { page, page_changed } => {
                self.resolver.record_page(&page);
                self.emit(MushafEvent::PageChanged {
                    page: Arc::clone(&page),
                });
                if page_changed {
                    self.reset_selection();
                }
            }
            Completion::Failed { page_number, error } => {
                self.emit(MushafEvent::PageFailed {
                    page_number,
                    kind: error.kind(),
                    message: error.to_string(),
                });
            }
            Completion::Stale => {}
        }
    }

    fn reset_selection(&mut self) {
        if self.selected_word.take().is_some() {
            self.emit(MushafEvent::SelectionChanged { word: None });
        }
        if self.timeline.highlighted_word_id().is_some() {
            self.timeline.clear_highlight();
            self.emit(MushafEvent::HighlightChanged { word_id: None });
        }
    }

    // Selection

    /// Select a word on the current page.
    ///
    /// # Errors
    ///
    /// Returns a not-found error when the word is not on the current page.
    pub fn select_word(&mut self, word_id: WordId) -> Result<(), CoreError> {
        let word = self
            .current_page()
            .and_then(|page| page.word(word_id))
            .cloned()
            .ok_or(CoreError::WordNotFound { word_id })?;
        if self.selected_word.as_ref() != Some(&word) {
            self.selected_word = Some(word.clone());
            self.emit(MushafEvent::SelectionChanged { word: Some(word) });
        }
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        if self.selected_word.take().is_some() {
            self.emit(MushafEvent::SelectionChanged { word: None });
        }
    }

    // Audio

    /// Run a timeline operation and publish any status or highlight change.
    fn with_timeline<R>(&mut self, f: impl FnOnce(&mut AudioTimeline) -> R) -> R {
        let status = self.timeline.status();
        let highlighted = self.timeline.highlighted_word_id();

        let result = f(&mut self.timeline);

        if self.timeline.status() != status {
            self.emit(MushafEvent::PlaybackChanged {
                status: self.timeline.status(),
                position: self.timeline.position(),
            });
        }
        if self.timeline.highlighted_word_id() != highlighted {
            self.emit(MushafEvent::HighlightChanged {
                word_id: self.timeline.highlighted_word_id(),
            });
        }
        result
    }

    /// Load `surah:ayah` for the active recitation and play it once the
    /// timings arrive.
    pub fn play_ayah(&mut self, surah: SurahNumber, ayah: AyahNumber) -> Vec<Effect> {
        if let Err(error) = self.resolver.check_ayah(surah, ayah) {
            self.fail_navigation(NavigationTarget::Ayah { surah, ayah }, &error);
            return Vec::new();
        }
        let key = AyahKey {
            surah,
            ayah,
            recitation_id: self.recitation_id,
        };
        let (load, transition) = self.with_timeline(|timeline| timeline.begin_load(key));
        let mut effects = transition_effects(transition);
        effects.push(Effect::LoadTimings(load));
        effects
    }

    /// Apply the answer to an [`Effect::LoadTimings`].
    pub fn complete_timings(
        &mut self,
        load: TimingLoad,
        result: Result<AyahAudio, CoreError>,
    ) -> Vec<Effect> {
        // Any playback command issued meanwhile cancels the autoplay
        let autoplay = load.playback_generation == self.timeline.generation();
        match self.with_timeline(|timeline| timeline.finish_load(load, result)) {
            LoadOutcome::Loaded(transition) => {
                let mut effects = transition_effects(transition);
                if autoplay {
                    info!(target: LOG_TARGET, "Playing {}", load.key);
                    effects.extend(transition_effects(self.with_timeline(AudioTimeline::play)));
                }
                effects
            }
            LoadOutcome::Unavailable(error) => {
                self.emit(MushafEvent::audio_unavailable(&error));
                Vec::new()
            }
            LoadOutcome::Stale => Vec::new(),
        }
    }

    /// Play a single word, stopping automatically at the end of its window.
    pub fn play_word(&mut self, word_id: WordId) -> Vec<Effect> {
        let generation = self.with_timeline(AudioTimeline::begin_word);
        vec![Effect::FetchWordAudio {
            word_id,
            recitation_id: self.recitation_id,
            generation,
        }]
    }

    /// Apply the answer to an [`Effect::FetchWordAudio`].
    pub fn complete_word_audio(
        &mut self,
        generation: u64,
        result: Result<WordAudio, CoreError>,
    ) -> Vec<Effect> {
        match result {
            Ok(audio) => self
                .with_timeline(|timeline| timeline.play_word(generation, &audio))
                .map(transition_effects)
                .unwrap_or_default(),
            Err(error) => {
                if generation == self.timeline.generation() {
                    warn!(target: LOG_TARGET, "Word audio unavailable: {}", error);
                    self.emit(MushafEvent::audio_unavailable(&error));
                }
                Vec::new()
            }
        }
    }

    pub fn toggle_play_pause(&mut self) -> Vec<Effect> {
        transition_effects(self.with_timeline(AudioTimeline::toggle_play_pause))
    }

    pub fn play(&mut self) -> Vec<Effect> {
        transition_effects(self.with_timeline(AudioTimeline::play))
    }

    pub fn pause(&mut self) -> Vec<Effect> {
        transition_effects(self.with_timeline(AudioTimeline::pause))
    }

    pub fn seek(&mut self, position: Duration) -> Vec<Effect> {
        transition_effects(self.with_timeline(|timeline| timeline.seek(position)))
    }

    /// Periodic clock update from the media element.
    pub fn on_tick(&mut self, position: Duration) -> Vec<Effect> {
        transition_effects(self.with_timeline(|timeline| timeline.on_tick(position)))
    }

    pub fn on_duration_known(&mut self, duration: Duration) {
        self.with_timeline(|timeline| timeline.on_duration_known(duration));
    }

    pub fn on_ended(&mut self) {
        self.with_timeline(AudioTimeline::on_ended);
    }

    /// A scheduled [`Effect::ScheduleAutoStop`] fired.
    pub fn auto_stop_fired(&mut self, generation: u64) -> Vec<Effect> {
        transition_effects(self.with_timeline(|timeline| timeline.auto_stop(generation)))
    }
}
