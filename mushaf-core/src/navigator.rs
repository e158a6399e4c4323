//! Event loop that owns the [`NavigationController`] and runs its effects.
//!
//! User intents, media clock events and fetch completions all arrive as
//! messages on one channel and are applied in arrival order, so every state
//! change is totally ordered. Fetches run as spawned tasks that post their
//! result back to the loop; nothing awaits inside the loop itself.

use crate::error::{CoreError, Result};
use crate::event::MushafEvent;
use crate::model::{
    AyahAudio, AyahLocation, AyahNumber, LayoutId, NavigationTarget, Page, RecitationId,
    SearchResponse, SearchResult, SurahCatalog, SurahNumber, WordAudio, WordId,
};
use crate::navigation::{AyahLookup, Effect, NavigationController, ReadingState};
use crate::provider::{MediaOutput, MushafApi, SearchQuery};
use crate::resolver::{AyahIndex, LocationResolver, WordIndex};
use crate::timeline::{AutoStop, TimingLoad};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const LOG_TARGET: &str = "mushaf::navigator";

enum Message {
    // User intents
    GoToPage(i64),
    NextPage,
    PreviousPage,
    GoToAyah(SurahNumber, AyahNumber),
    Navigate(NavigationTarget),
    SelectSearchResult(SearchResult),
    SelectWord(WordId, oneshot::Sender<Result<()>>),
    ClearSelection,
    PlayAyah(SurahNumber, AyahNumber),
    PlayWord(WordId),
    TogglePlayPause,
    Pause,
    Seek(Duration),
    Snapshot(oneshot::Sender<ReadingState>),

    // Media clock
    Tick(Duration),
    DurationKnown(Duration),
    Ended,

    // Completions
    PageLoaded(u64, Result<Page>),
    AyahLocated(AyahLookup, Result<AyahLocation>),
    TimingsLoaded(TimingLoad, Result<AyahAudio>),
    WordAudioLoaded(u64, Result<WordAudio>),
    AutoStopFired(u64),
}

/// Cloneable front end to a running [`Navigator`].
///
/// Every method fails with [`CoreError::NavigatorStopped`] once the loop has
/// exited.
#[derive(Clone)]
pub struct NavigatorHandle {
    tx: mpsc::UnboundedSender<Message>,
    api: Arc<dyn MushafApi>,
}

impl NavigatorHandle {
    fn send(&self, message: Message) -> Result<()> {
        self.tx
            .send(message)
            .map_err(|_| CoreError::NavigatorStopped)
    }

    /// Go to `page`, clamped into the layout.
    ///
    /// # Errors
    ///
    /// Returns an error if the navigator has stopped.
    pub fn go_to_page(&self, page: i64) -> Result<()> {
        self.send(Message::GoToPage(page))
    }

    /// # Errors
    ///
    /// Returns an error if the navigator has stopped.
    pub fn next_page(&self) -> Result<()> {
        self.send(Message::NextPage)
    }

    /// # Errors
    ///
    /// Returns an error if the navigator has stopped.
    pub fn previous_page(&self) -> Result<()> {
        self.send(Message::PreviousPage)
    }

    /// # Errors
    ///
    /// Returns an error if the navigator has stopped.
    pub fn go_to_ayah(&self, surah: SurahNumber, ayah: AyahNumber) -> Result<()> {
        self.send(Message::GoToAyah(surah, ayah))
    }

    /// # Errors
    ///
    /// Returns an error if the navigator has stopped.
    pub fn go_to_word(&self, word_id: WordId) -> Result<()> {
        self.send(Message::Navigate(NavigationTarget::Word { word_id }))
    }

    /// # Errors
    ///
    /// Returns an error if the navigator has stopped.
    pub fn navigate(&self, target: NavigationTarget) -> Result<()> {
        self.send(Message::Navigate(target))
    }

    /// # Errors
    ///
    /// Returns an error if the navigator has stopped.
    pub fn select_search_result(&self, result: SearchResult) -> Result<()> {
        self.send(Message::SelectSearchResult(result))
    }

    /// Select a word on the current page.
    ///
    /// # Errors
    ///
    /// Returns a not-found error if the word is not on the current page, or
    /// an error if the navigator has stopped.
    pub async fn select_word(&self, word_id: WordId) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.send(Message::SelectWord(word_id, reply))?;
        rx.await.map_err(|_| CoreError::NavigatorStopped)?
    }

    /// # Errors
    ///
    /// Returns an error if the navigator has stopped.
    pub fn clear_selection(&self) -> Result<()> {
        self.send(Message::ClearSelection)
    }

    /// # Errors
    ///
    /// Returns an error if the navigator has stopped.
    pub fn play_ayah(&self, surah: SurahNumber, ayah: AyahNumber) -> Result<()> {
        self.send(Message::PlayAyah(surah, ayah))
    }

    /// # Errors
    ///
    /// Returns an error if the navigator has stopped.
    pub fn play_word(&self, word_id: WordId) -> Result<()> {
        self.send(Message::PlayWord(word_id))
    }

    /// # Errors
    ///
    /// Returns an error if the navigator has stopped.
    pub fn toggle_play_pause(&self) -> Result<()> {
        self.send(Message::TogglePlayPause)
    }

    /// # Errors
    ///
    /// Returns an error if the navigator has stopped.
    pub fn pause(&self) -> Result<()> {
        self.send(Message::Pause)
    }

    /// # Errors
    ///
    /// Returns an error if the navigator has stopped.
    pub fn seek(&self, position: Duration) -> Result<()> {
        self.send(Message::Seek(position))
    }

    /// Media clock update.
    ///
    /// # Errors
    ///
    /// Returns an error if the navigator has stopped.
    pub fn tick(&self, position: Duration) -> Result<()> {
        self.send(Message::Tick(position))
    }

    /// # Errors
    ///
    /// Returns an error if the navigator has stopped.
    pub fn duration_known(&self, duration: Duration) -> Result<()> {
        self.send(Message::DurationKnown(duration))
    }

    /// The media element reached the end of its source.
    ///
    /// # Errors
    ///
    /// Returns an error if the navigator has stopped.
    pub fn ended(&self) -> Result<()> {
        self.send(Message::Ended)
    }

    /// Current reading state, after every message sent before this call.
    ///
    /// # Errors
    ///
    /// Returns an error if the navigator has stopped.
    pub async fn snapshot(&self) -> Result<ReadingState> {
        let (reply, rx) = oneshot::channel();
        self.send(Message::Snapshot(reply))?;
        rx.await.map_err(|_| CoreError::NavigatorStopped)
    }

    /// Run a text search. Results are navigated to with
    /// [`select_search_result`](Self::select_search_result).
    ///
    /// # Errors
    ///
    /// Returns an error if the search request fails.
    pub async fn search(&self, query: &SearchQuery) -> Result<SearchResponse> {
        let Some(text) = query.trimmed() else {
            return Ok(SearchResponse {
                query: String::new(),
                results_count: 0,
                results: Vec::new(),
            });
        };
        let query = SearchQuery::new(text).with_limit(query.limit);
        debug!(target: LOG_TARGET, "Searching for {:?} via {}", query.text, self.api.name());
        self.api.search(&query).await
    }
}

/// Owns the controller and executes its effects against the collaborators.
pub struct Navigator {
    controller: NavigationController,
    api: Arc<dyn MushafApi>,
    media: Box<dyn MediaOutput>,
    tx: mpsc::UnboundedSender<Message>,
    rx: mpsc::UnboundedReceiver<Message>,
    auto_stop: Option<JoinHandle<()>>,
    cancel_token: CancellationToken,
}

impl Navigator {
    /// Create a navigator
    ///
    /// # Arguments
    /// * `controller` - State machine to drive, usually from [`bootstrap`]
    /// * `api` - Mushaf service used for page, index and audio fetches
    /// * `media` - The host media element
    /// * `cancel_token` - Optional external cancellation token for graceful shutdown
    #[must_use]
    pub fn new(
        controller: NavigationController,
        api: Arc<dyn MushafApi>,
        media: Box<dyn MediaOutput>,
        cancel_token: Option<CancellationToken>,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            controller,
            api,
            media,
            tx,
            rx,
            auto_stop: None,
            cancel_token: cancel_token.unwrap_or_default(),
        }
    }

    #[must_use]
    pub fn handle(&self) -> NavigatorHandle {
        NavigatorHandle {
            tx: self.tx.clone(),
            api: Arc::clone(&self.api),
        }
    }

    /// Subscribe to state change events
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<MushafEvent> {
        self.controller.subscribe()
    }

    /// Get a clone of the cancellation token
    #[must_use]
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// Start the navigator in a background task
    #[must_use]
    pub fn start(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(mut self) {
        info!(
            target: LOG_TARGET,
            "Navigator running (layout {}, {} pages, recitation {})",
            self.controller.layout().id,
            self.controller.layout().total_pages,
            self.controller.recitation_id()
        );

        loop {
            tokio::select! {
                () = self.cancel_token.cancelled() => {
                    info!(target: LOG_TARGET, "Navigator shutting down");
                    break;
                }
                message = self.rx.recv() => {
                    match message {
                        Some(message) => self.handle_message(message),
                        None => break,
                    }
                }
            }
        }

        if let Some(task) = self.auto_stop.take() {
            task.abort();
        }
    }

    fn handle_message(&mut self, message: Message) {
        let nav = &mut self.controller;
        let effects = match message {
            Message::GoToPage(page) => nav.go_to_page(page),
            Message::NextPage => nav.next_page(),
            Message::PreviousPage => nav.previous_page(),
            Message::GoToAyah(surah, ayah) => nav.go_to_ayah(surah, ayah),
            Message::Navigate(target) => nav.navigate(target),
            Message::SelectSearchResult(result) => nav.select_search_result(&result),
            Message::SelectWord(word_id, reply) => {
                let _ = reply.send(nav.select_word(word_id));
                Vec::new()
            }
            Message::ClearSelection => {
                nav.clear_selection();
                Vec::new()
            }
            Message::PlayAyah(surah, ayah) => nav.play_ayah(surah, ayah),
            Message::PlayWord(word_id) => nav.play_word(word_id),
            Message::TogglePlayPause => nav.toggle_play_pause(),
            Message::Pause => nav.pause(),
            Message::Seek(position) => nav.seek(position),
            Message::Snapshot(reply) => {
                let _ = reply.send(nav.snapshot());
                Vec::new()
            }
            Message::Tick(position) => nav.on_tick(position),
            Message::DurationKnown(duration) => {
                nav.on_duration_known(duration);
                Vec::new()
            }
            Message::Ended => {
                nav.on_ended();
                Vec::new()
            }
            Message::PageLoaded(seq, result) => {
                nav.complete_page(seq, result);
                Vec::new()
            }
            Message::AyahLocated(lookup, result) => nav.complete_ayah_lookup(lookup, result),
            Message::TimingsLoaded(load, result) => nav.complete_timings(load, result),
            Message::WordAudioLoaded(generation, result) => {
                nav.complete_word_audio(generation, result)
            }
            Message::AutoStopFired(generation) => nav.auto_stop_fired(generation),
        };
        self.execute(effects);
    }

    fn execute(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::FetchPage(request) => {
                    let api = Arc::clone(&self.api);
                    self.spawn_fetch(async move {
                        let result = api.page(request.page_number).await;
                        Message::PageLoaded(request.seq, result)
                    });
                }
                Effect::LookupAyah(lookup) => {
                    let api = Arc::clone(&self.api);
                    self.spawn_fetch(async move {
                        let result = api
                            .ayah_page(lookup.surah, lookup.ayah, lookup.layout_id)
                            .await;
                        Message::AyahLocated(lookup, result)
                    });
                }
                Effect::LoadTimings(load) => {
                    let api = Arc::clone(&self.api);
                    self.spawn_fetch(async move {
                        let key = load.key;
                        let result = api
                            .ayah_audio(key.surah, key.ayah, key.recitation_id)
                            .await;
                        Message::TimingsLoaded(load, result)
                    });
                }
                Effect::FetchWordAudio {
                    word_id,
                    recitation_id,
                    generation,
                } => {
                    let api = Arc::clone(&self.api);
                    self.spawn_fetch(async move {
                        let result = api.word_audio(word_id, recitation_id).await;
                        Message::WordAudioLoaded(generation, result)
                    });
                }
                Effect::Media(command) => self.media.apply(&command),
                Effect::ScheduleAutoStop(auto_stop) => self.schedule_auto_stop(auto_stop),
            }
        }
    }

    fn spawn_fetch<F>(&self, fetch: F)
    where
        F: std::future::Future<Output = Message> + Send + 'static,
    {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            // The loop may have exited while the fetch was in flight
            let _ = tx.send(fetch.await);
        });
    }

    fn schedule_auto_stop(&mut self, auto_stop: AutoStop) {
        if let Some(previous) = self.auto_stop.take() {
            previous.abort();
        }
        debug!(
            target: LOG_TARGET,
            "Auto-stop in {:?} (generation {})", auto_stop.after, auto_stop.generation
        );
        let tx = self.tx.clone();
        self.auto_stop = Some(tokio::spawn(async move {
            tokio::time::sleep(auto_stop.after).await;
            let _ = tx.send(Message::AutoStopFired(auto_stop.generation));
        }));
    }
}

/// Load the layout and surah metadata and build a controller for them.
///
/// Falls back to the first published layout when `layout_id` is not offered
/// by the service. Missing surah metadata only disables ayah bounds checks.
///
/// # Errors
///
/// Returns an error if the layouts cannot be fetched or none are published.
pub async fn bootstrap(
    api: &dyn MushafApi,
    layout_id: LayoutId,
    recitation_id: RecitationId,
) -> Result<NavigationController> {
    let layouts = api.layouts().await?;
    let layout = match layouts.iter().position(|layout| layout.id == layout_id) {
        Some(idx) => layouts.into_iter().nth(idx),
        None => {
            let fallback = layouts.into_iter().next();
            if let Some(layout) = &fallback {
                warn!(
                    target: LOG_TARGET,
                    "Layout {} not offered by {}, using layout {}", layout_id, api.name(), layout.id
                );
            }
            fallback
        }
    }
    .filter(|layout| layout.total_pages > 0)
    .ok_or(CoreError::LayoutNotFound { layout_id })?;

    let surahs = match api.surah_names().await {
        Ok(response) => SurahCatalog::from(response),
        Err(e) => {
            warn!(target: LOG_TARGET, "Surah metadata unavailable: {}", e);
            SurahCatalog::default()
        }
    };

    info!(
        target: LOG_TARGET,
        "Using layout {} ({} pages) from {}", layout.id, layout.total_pages, api.name()
    );
    let resolver = LocationResolver::new(AyahIndex::new(layout.id), WordIndex::default())
        .with_surahs(surahs);
    Ok(NavigationController::new(layout, recitation_id, resolver))
}
