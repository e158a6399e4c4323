//! Deterministic corpus and collaborators shared by unit tests.

use crate::error::CoreError;
use crate::model::{
    AudioTiming, AyahAudio, AyahLocation, AyahNumber, Layout, LayoutId, Line, LineType, Page,
    PageNumber, RecitationId, SearchResponse, SearchResult, SurahInfo, SurahNamesResponse,
    SurahNumber, Word, WordAudio, WordId,
};
use crate::provider::{MediaOutput, MushafApi, SearchQuery};
use crate::resolver::{AyahIndex, LocationResolver, WordIndex};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const TOTAL_PAGES: PageNumber = 604;
pub const WORDS_PER_PAGE: WordId = 10;
pub const RECITATION_ID: RecitationId = 7;

/// Ayah-to-page entries of the fixture corpus.
pub const AYAH_PAGES: [((SurahNumber, AyahNumber), PageNumber); 4] =
    [((1, 1), 1), ((1, 7), 1), ((2, 1), 2), ((2, 6), 3)];

pub fn layout() -> Layout {
    Layout::new(1, TOTAL_PAGES)
}

/// First and last word id on `page_number`. Ids run contiguously across pages.
pub const fn word_range(page_number: PageNumber) -> (WordId, WordId) {
    let first = (page_number - 1) * WORDS_PER_PAGE + 1;
    (first, first + WORDS_PER_PAGE - 1)
}

fn ayah_line(line_number: u32, first: WordId, last: WordId) -> Line {
    Line {
        line_number,
        line_type: LineType::Ayah,
        is_centered: false,
        content: String::new(),
        words: (first..=last)
            .map(|word_id| Word {
                word_id,
                text: format!("w{word_id}"),
            })
            .collect(),
        first_word_id: Some(first),
        last_word_id: Some(last),
        surah_number: None,
    }
}

/// A page with a surah header followed by two ayah lines.
pub fn page(page_number: PageNumber) -> Page {
    let (first, last) = word_range(page_number);
    let mid = first + WORDS_PER_PAGE / 2;
    Page {
        page_number,
        total_lines: 3,
        lines: vec![
            Line {
                line_number: 1,
                line_type: LineType::SurahName,
                is_centered: true,
                content: "سورة".into(),
                words: Vec::new(),
                first_word_id: None,
                last_word_id: None,
                surah_number: Some(1),
            },
            ayah_line(2, first, mid - 1),
            ayah_line(3, mid, last),
        ],
    }
}

pub fn word(word_id: WordId) -> Word {
    Word {
        word_id,
        text: format!("w{word_id}"),
    }
}

pub fn resolver() -> LocationResolver {
    LocationResolver::new(AyahIndex::with_entries(1, AYAH_PAGES), WordIndex::default())
}

pub fn audio_url(surah: SurahNumber, ayah: AyahNumber) -> String {
    format!("https://audio.example/{surah:03}{ayah:03}.mp3")
}

/// Four words of 250ms each, starting at the page's first word.
pub fn ayah_audio(surah: SurahNumber, ayah: AyahNumber) -> AyahAudio {
    let page = AYAH_PAGES
        .iter()
        .find(|(key, _)| *key == (surah, ayah))
        .map_or(1, |(_, page)| *page);
    let (first, _) = word_range(page);
    AyahAudio {
        surah,
        ayah,
        recitation_id: RECITATION_ID,
        audio_url: audio_url(surah, ayah),
        word_timings: (0..4u32)
            .map(|i| AudioTiming {
                word_id: first + i,
                start_time: Duration::from_millis(u64::from(i) * 250),
                end_time: Duration::from_millis(u64::from(i + 1) * 250),
            })
            .collect(),
    }
}

/// Word `w` plays from `w * 100ms` for 400ms of a shared recording.
pub fn word_audio(word_id: WordId) -> WordAudio {
    WordAudio {
        word_id,
        audio_url: "https://audio.example/words.mp3".into(),
        start_time: Duration::from_millis(u64::from(word_id) * 100),
        end_time: Duration::from_millis(u64::from(word_id) * 100 + 400),
    }
}

/// In-memory [`MushafApi`] over the fixture corpus.
#[derive(Default)]
pub struct FixtureApi {
    page_delays: HashMap<PageNumber, Duration>,
    failing_pages: Vec<PageNumber>,
    missing_timings: Vec<(SurahNumber, AyahNumber)>,
    calls: Mutex<Vec<String>>,
}

impl FixtureApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay the response for `page_number` by `delay`.
    pub fn with_page_delay(mut self, page_number: PageNumber, delay: Duration) -> Self {
        self.page_delays.insert(page_number, delay);
        self
    }

    pub fn with_failing_page(mut self, page_number: PageNumber) -> Self {
        self.failing_pages.push(page_number);
        self
    }

    pub fn with_missing_timings(mut self, surah: SurahNumber, ayah: AyahNumber) -> Self {
        self.missing_timings.push((surah, ayah));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn record(&self, call: String) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }
}

#[async_trait]
impl MushafApi for FixtureApi {
    fn name(&self) -> &'static str {
        "fixture"
    }

    async fn layouts(&self) -> Result<Vec<Layout>, CoreError> {
        self.record("layouts".into());
        Ok(vec![Layout::new(14, 604), layout()])
    }

    async fn page(&self, page_number: PageNumber) -> Result<Page, CoreError> {
        self.record(format!("page {page_number}"));
        if let Some(delay) = self.page_delays.get(&page_number) {
            tokio::time::sleep(*delay).await;
        }
        if self.failing_pages.contains(&page_number) {
            return Err(CoreError::HttpStatus {
                url: format!("http://fixture/qul/page/{page_number}"),
                status: 503,
            });
        }
        if !(1..=TOTAL_PAGES).contains(&page_number) {
            return Err(CoreError::PageNotFound { page: page_number });
        }
        Ok(page(page_number))
    }

    async fn surah_names(&self) -> Result<SurahNamesResponse, CoreError> {
        self.record("surah_names".into());
        let surahs = vec![
            SurahInfo {
                surah_number: 1,
                name_arabic: "الفاتحة".into(),
                name_english: "Al-Fatihah".into(),
                total_ayahs: 7,
            },
            SurahInfo {
                surah_number: 2,
                name_arabic: "البقرة".into(),
                name_english: "Al-Baqarah".into(),
                total_ayahs: 286,
            },
        ];
        Ok(SurahNamesResponse {
            surah_names: surahs
                .iter()
                .map(|s| (s.surah_number, s.name_arabic.clone()))
                .collect(),
            surahs,
        })
    }

    async fn search(&self, query: &SearchQuery) -> Result<SearchResponse, CoreError> {
        self.record(format!("search {}", query.text));
        let results = vec![SearchResult {
            word_id: 11,
            surah: 2,
            ayah: 1,
            text: "الم".into(),
            page: None,
            translation: None,
        }];
        Ok(SearchResponse {
            query: query.text.clone(),
            results_count: results.len(),
            results,
        })
    }

    async fn ayah_page(
        &self,
        surah: SurahNumber,
        ayah: AyahNumber,
        layout_id: LayoutId,
    ) -> Result<AyahLocation, CoreError> {
        self.record(format!("ayah_page {surah}:{ayah}"));
        AYAH_PAGES
            .iter()
            .find(|(key, _)| *key == (surah, ayah))
            .map(|(_, page_number)| AyahLocation {
                page_number: *page_number,
            })
            .ok_or(CoreError::AyahNotFound {
                surah,
                ayah,
                layout_id,
            })
    }

    async fn ayah_audio(
        &self,
        surah: SurahNumber,
        ayah: AyahNumber,
        recitation_id: RecitationId,
    ) -> Result<AyahAudio, CoreError> {
        self.record(format!("ayah_audio {surah}:{ayah}"));
        if self.missing_timings.contains(&(surah, ayah)) {
            return Err(CoreError::TimingUnavailable {
                surah,
                ayah,
                recitation_id,
            });
        }
        Ok(ayah_audio(surah, ayah))
    }

    async fn word_audio(
        &self,
        word_id: WordId,
        _recitation_id: RecitationId,
    ) -> Result<WordAudio, CoreError> {
        self.record(format!("word_audio {word_id}"));
        Ok(word_audio(word_id))
    }
}

/// [`MediaOutput`] that records every call it receives.
#[derive(Clone, Default)]
pub struct RecordingMedia {
    log: Arc<Mutex<Vec<String>>>,
}

impl RecordingMedia {
    pub fn log(&self) -> Vec<String> {
        self.log.lock().map(|l| l.clone()).unwrap_or_default()
    }

    fn push(&self, entry: String) {
        if let Ok(mut log) = self.log.lock() {
            log.push(entry);
        }
    }
}

impl MediaOutput for RecordingMedia {
    fn load(&mut self, url: &str) {
        self.push(format!("load {url}"));
    }

    fn seek(&mut self, position: Duration) {
        self.push(format!("seek {}", position.as_millis()));
    }

    fn play(&mut self) {
        self.push("play".into());
    }

    fn pause(&mut self) {
        self.push("pause".into());
    }
}
