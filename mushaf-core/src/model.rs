//! Data shapes exchanged with the Mushaf service and held in memory.

use crate::time::millis;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Corpus-wide word identifier; monotonic across pages and lines.
pub type WordId = u32;
pub type PageNumber = u32;
pub type SurahNumber = u32;
pub type AyahNumber = u32;
pub type RecitationId = u32;
pub type LayoutId = u32;

/// Number of surahs in the corpus.
pub const SURAH_COUNT: SurahNumber = 114;

/// Default pagination scheme requested at startup.
pub const DEFAULT_LAYOUT_ID: LayoutId = 1;

const fn default_lines_per_page() -> u32 {
    15
}

/// A named pagination scheme.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layout {
    pub id: LayoutId,
    #[serde(default)]
    pub name: Option<String>,
    pub total_pages: PageNumber,
    #[serde(default = "default_lines_per_page")]
    pub lines_per_page: u32,
    #[serde(default)]
    pub font_name: String,
}

impl Layout {
    /// Create a layout with the default line count and no font.
    #[must_use]
    pub fn new(id: LayoutId, total_pages: PageNumber) -> Self {
        Self {
            id,
            name: None,
            total_pages,
            lines_per_page: default_lines_per_page(),
            font_name: String::new(),
        }
    }

    /// Whether `page` addresses a page of this layout.
    #[must_use]
    pub const fn contains_page(&self, page: PageNumber) -> bool {
        page >= 1 && page <= self.total_pages
    }

    /// Clamp `page` into `1..=total_pages`.
    #[must_use]
    pub fn clamp_page(&self, page: i64) -> PageNumber {
        let clamped = page.clamp(1, i64::from(self.total_pages.max(1)));
        PageNumber::try_from(clamped).unwrap_or(1)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutsResponse {
    pub layouts: Vec<Layout>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineType {
    Ayah,
    SurahName,
    Basmallah,
}

/// A single addressable word token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Word {
    pub word_id: WordId,
    pub text: String,
}

/// One rendered line. Only `ayah` lines carry words.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Line {
    pub line_number: u32,
    pub line_type: LineType,
    #[serde(default)]
    pub is_centered: bool,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub words: Vec<Word>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_word_id: Option<WordId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_word_id: Option<WordId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub surah_number: Option<SurahNumber>,
}

impl Line {
    /// Words addressable on this line; empty for surah-name and basmallah lines.
    #[must_use]
    pub fn words(&self) -> &[Word] {
        match self.line_type {
            LineType::Ayah => &self.words,
            LineType::SurahName | LineType::Basmallah => &[],
        }
    }
}

/// A materialised page as returned by `/qul/page/{n}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub page_number: PageNumber,
    pub total_lines: u32,
    pub lines: Vec<Line>,
}

impl Page {
    /// All addressable words in reading order.
    pub fn words(&self) -> impl Iterator<Item = &Word> {
        self.lines.iter().flat_map(|line| line.words().iter())
    }

    /// Inclusive word id range covered by this page, if it has any ayah lines.
    #[must_use]
    pub fn word_range(&self) -> Option<(WordId, WordId)> {
        let ids = self.lines.iter().flat_map(|line| {
            let words = line.words();
            let first = line
                .first_word_id
                .filter(|_| line.line_type == LineType::Ayah)
                .or_else(|| words.first().map(|w| w.word_id));
            let last = line
                .last_word_id
                .filter(|_| line.line_type == LineType::Ayah)
                .or_else(|| words.last().map(|w| w.word_id));
            first.into_iter().chain(last)
        });

        ids.fold(None, |acc, id| match acc {
            None => Some((id, id)),
            Some((lo, hi)) => Some((lo.min(id), hi.max(id))),
        })
    }

    /// Look up a word on this page.
    #[must_use]
    pub fn word(&self, word_id: WordId) -> Option<&Word> {
        self.words().find(|w| w.word_id == word_id)
    }

    #[must_use]
    pub fn contains_word(&self, word_id: WordId) -> bool {
        self.word(word_id).is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurahInfo {
    pub surah_number: SurahNumber,
    pub name_arabic: String,
    pub name_english: String,
    pub total_ayahs: AyahNumber,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurahNamesResponse {
    #[serde(default)]
    pub surah_names: BTreeMap<SurahNumber, String>,
    pub surahs: Vec<SurahInfo>,
}

/// Surah metadata used to bound ayah numbers.
#[derive(Debug, Clone, Default)]
pub struct SurahCatalog {
    surahs: BTreeMap<SurahNumber, SurahInfo>,
}

impl SurahCatalog {
    #[must_use]
    pub fn new(surahs: Vec<SurahInfo>) -> Self {
        Self {
            surahs: surahs.into_iter().map(|s| (s.surah_number, s)).collect(),
        }
    }

    #[must_use]
    pub fn get(&self, surah: SurahNumber) -> Option<&SurahInfo> {
        self.surahs.get(&surah)
    }

    #[must_use]
    pub fn total_ayahs(&self, surah: SurahNumber) -> Option<AyahNumber> {
        self.get(surah).map(|s| s.total_ayahs)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.surahs.is_empty()
    }
}

impl From<SurahNamesResponse> for SurahCatalog {
    fn from(response: SurahNamesResponse) -> Self {
        Self::new(response.surahs)
    }
}

/// A ranked hit from the search backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    #[serde(alias = "word_index")]
    pub word_id: WordId,
    pub surah: SurahNumber,
    pub ayah: AyahNumber,
    pub text: String,
    #[serde(default)]
    pub page: Option<PageNumber>,
    #[serde(default)]
    pub translation: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub query: String,
    pub results_count: usize,
    pub results: Vec<SearchResult>,
}

/// Answer of the ayah -> page lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AyahLocation {
    pub page_number: PageNumber,
}

/// A word's audio window within its recitation, in milliseconds on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioTiming {
    pub word_id: WordId,
    #[serde(with = "millis")]
    pub start_time: Duration,
    #[serde(with = "millis")]
    pub end_time: Duration,
}

impl AudioTiming {
    /// Half-open containment: `start <= t < end`.
    #[must_use]
    pub fn contains(&self, position: Duration) -> bool {
        self.start_time <= position && position < self.end_time
    }

    #[must_use]
    pub fn duration(&self) -> Duration {
        self.end_time.saturating_sub(self.start_time)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AyahAudio {
    pub surah: SurahNumber,
    pub ayah: AyahNumber,
    pub recitation_id: RecitationId,
    pub audio_url: String,
    pub word_timings: Vec<AudioTiming>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordAudio {
    pub word_id: WordId,
    pub audio_url: String,
    #[serde(with = "millis")]
    pub start_time: Duration,
    #[serde(with = "millis")]
    pub end_time: Duration,
}

impl WordAudio {
    #[must_use]
    pub const fn timing(&self) -> AudioTiming {
        AudioTiming {
            word_id: self.word_id,
            start_time: self.start_time,
            end_time: self.end_time,
        }
    }
}

/// The single normalised navigation input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NavigationTarget {
    Page { page: PageNumber },
    Ayah { surah: SurahNumber, ayah: AyahNumber },
    Word { word_id: WordId },
}

impl std::fmt::Display for NavigationTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Page { page } => write!(f, "page {page}"),
            Self::Ayah { surah, ayah } => write!(f, "ayah {surah}:{ayah}"),
            Self::Word { word_id } => write!(f, "word {word_id}"),
        }
    }
}

/// A concrete, validated page address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageTarget {
    pub page: PageNumber,
}

/// Click selection and audio highlight; independent of each other.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionState {
    pub selected_word: Option<Word>,
    pub highlighted_word_id: Option<WordId>,
}
