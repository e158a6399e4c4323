//! Pure mapping between page, surah:ayah and word-id addressing.
//!
//! Nothing here performs I/O. Index contents are fed in by the navigation
//! controller as lookups and page loads complete; resolution is a function of
//! the target, the active [`Layout`] and those indexes alone.

use crate::error::{CoreError, Result};
use crate::model::{
    AyahNumber, Layout, LayoutId, NavigationTarget, Page, PageNumber, PageTarget, SurahCatalog,
    SurahNumber, WordId, SURAH_COUNT,
};
use std::collections::HashMap;
use tracing::{debug, warn};

const LOG_TARGET: &str = "mushaf::resolver";

/// Session cache of `(surah, ayah) -> page` for one layout.
#[derive(Debug, Clone, Default)]
pub struct AyahIndex {
    layout_id: LayoutId,
    pages: HashMap<(SurahNumber, AyahNumber), PageNumber>,
}

impl AyahIndex {
    #[must_use]
    pub fn new(layout_id: LayoutId) -> Self {
        Self {
            layout_id,
            pages: HashMap::new(),
        }
    }

    /// Build an index from known entries.
    #[must_use]
    pub fn with_entries(
        layout_id: LayoutId,
        entries: impl IntoIterator<Item = ((SurahNumber, AyahNumber), PageNumber)>,
    ) -> Self {
        Self {
            layout_id,
            pages: entries.into_iter().collect(),
        }
    }

    #[must_use]
    pub const fn layout_id(&self) -> LayoutId {
        self.layout_id
    }

    pub fn insert(&mut self, surah: SurahNumber, ayah: AyahNumber, page: PageNumber) {
        self.pages.insert((surah, ayah), page);
    }

    #[must_use]
    pub fn page_of(&self, surah: SurahNumber, ayah: AyahNumber) -> Option<PageNumber> {
        self.pages.get(&(surah, ayah)).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

/// Inclusive word id range of one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWordRange {
    pub page: PageNumber,
    pub first: WordId,
    pub last: WordId,
}

/// Word ranges of materialised pages, sorted by page.
///
/// Ranges are monotonic across pages, so both the page order and the word
/// order agree and lookups can binary search on either.
#[derive(Debug, Clone, Default)]
pub struct WordIndex {
    ranges: Vec<PageWordRange>,
}

impl WordIndex {
    /// Record a page's range. Returns `false` (and records nothing) when the
    /// range would break monotonicity with its neighbours.
    pub fn record(&mut self, range: PageWordRange) -> bool {
        if range.first > range.last {
            warn!(target: LOG_TARGET, "Ignoring inverted word range {:?}", range);
            return false;
        }

        match self.ranges.binary_search_by_key(&range.page, |r| r.page) {
            Ok(idx) => {
                let prev_ok = idx == 0 || self.ranges[idx - 1].last < range.first;
                let next_ok = self
                    .ranges
                    .get(idx + 1)
                    .map_or(true, |next| range.last < next.first);
                if prev_ok && next_ok {
                    self.ranges[idx] = range;
                    true
                } else {
                    warn!(target: LOG_TARGET, "Word range {:?} overlaps a neighbouring page", range);
                    false
                }
            }
            Err(idx) => {
                let prev_ok = idx == 0 || self.ranges[idx - 1].last < range.first;
                let next_ok = self
                    .ranges
                    .get(idx)
                    .map_or(true, |next| range.last < next.first);
                if prev_ok && next_ok {
                    self.ranges.insert(idx, range);
                    true
                } else {
                    warn!(target: LOG_TARGET, "Word range {:?} overlaps a neighbouring page", range);
                    false
                }
            }
        }
    }

    /// Page whose range contains `word_id`.
    #[must_use]
    pub fn page_of(&self, word_id: WordId) -> Option<PageNumber> {
        let idx = self.ranges.partition_point(|r| r.last < word_id);
        self.ranges
            .get(idx)
            .filter(|r| r.first <= word_id)
            .map(|r| r.page)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

/// Resolves any [`NavigationTarget`] into a concrete [`PageTarget`].
#[derive(Debug, Clone, Default)]
pub struct LocationResolver {
    ayahs: AyahIndex,
    words: WordIndex,
    surahs: SurahCatalog,
}

impl LocationResolver {
    #[must_use]
    pub fn new(ayahs: AyahIndex, words: WordIndex) -> Self {
        Self {
            ayahs,
            words,
            surahs: SurahCatalog::default(),
        }
    }

    /// Attach surah metadata so ayah numbers can be bounds-checked.
    #[must_use]
    pub fn with_surahs(mut self, surahs: SurahCatalog) -> Self {
        self.surahs = surahs;
        self
    }

    pub fn set_surahs(&mut self, surahs: SurahCatalog) {
        self.surahs = surahs;
    }

    #[must_use]
    pub const fn ayahs(&self) -> &AyahIndex {
        &self.ayahs
    }

    #[must_use]
    pub const fn words(&self) -> &WordIndex {
        &self.words
    }

    pub fn record_ayah_page(&mut self, surah: SurahNumber, ayah: AyahNumber, page: PageNumber) {
        debug!(target: LOG_TARGET, "Ayah {}:{} -> page {}", surah, ayah, page);
        self.ayahs.insert(surah, ayah, page);
    }

    /// Index the word range of a freshly materialised page.
    pub fn record_page(&mut self, page: &Page) {
        if let Some((first, last)) = page.word_range() {
            self.words.record(PageWordRange {
                page: page.page_number,
                first,
                last,
            });
        }
    }

    /// Bounds-check an ayah address without consulting the page index.
    ///
    /// # Errors
    ///
    /// Returns an out-of-range error when the surah is not in `1..=114`, the
    /// ayah is zero, or the ayah exceeds the surah's length when known.
    pub fn check_ayah(&self, surah: SurahNumber, ayah: AyahNumber) -> Result<()> {
        if !(1..=SURAH_COUNT).contains(&surah) {
            return Err(CoreError::SurahOutOfRange { surah });
        }
        let max_ayah = self.surahs.total_ayahs(surah);
        if ayah == 0 || max_ayah.is_some_and(|max| ayah > max) {
            return Err(CoreError::AyahOutOfRange {
                surah,
                ayah,
                max_ayah: max_ayah.unwrap_or(AyahNumber::MAX),
            });
        }
        Ok(())
    }

    /// Whether resolving this ayah needs an index lookup first.
    #[must_use]
    pub fn needs_lookup(&self, surah: SurahNumber, ayah: AyahNumber) -> bool {
        self.ayahs.page_of(surah, ayah).is_none()
    }

    /// Resolve `target` against `layout`.
    ///
    /// # Errors
    ///
    /// Returns an out-of-range error for pages outside the layout or invalid
    /// ayah addresses, and a not-found error when an ayah or word has no
    /// indexed page.
    pub fn resolve(&self, target: NavigationTarget, layout: &Layout) -> Result<PageTarget> {
        match target {
            NavigationTarget::Page { page } => {
                if layout.contains_page(page) {
                    Ok(PageTarget { page })
                } else {
                    Err(CoreError::PageOutOfRange {
                        page,
                        total_pages: layout.total_pages,
                    })
                }
            }
            NavigationTarget::Ayah { surah, ayah } => {
                self.check_ayah(surah, ayah)?;
                let not_found = || CoreError::AyahNotFound {
                    surah,
                    ayah,
                    layout_id: layout.id,
                };
                let page = self.ayahs.page_of(surah, ayah).ok_or_else(not_found)?;
                // An index entry outside the layout is a corpus mismatch, not a user error
                if layout.contains_page(page) {
                    Ok(PageTarget { page })
                } else {
                    Err(not_found())
                }
            }
            NavigationTarget::Word { word_id } => self
                .words
                .page_of(word_id)
                .filter(|page| layout.contains_page(*page))
                .map(|page| PageTarget { page })
                .ok_or(CoreError::WordNotFound { word_id }),
        }
    }
}
