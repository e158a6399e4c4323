//! Holds the materialised page and arbitrates overlapping page fetches.
//!
//! Every request gets a sequence number. Only a completion carrying the
//! latest sequence number is applied; anything older is stale and dropped,
//! so rapid page turns can never let an earlier page overwrite a later one.

use crate::error::{CoreError, ErrorKind};
use crate::model::{Page, PageNumber};
use std::sync::Arc;
use tracing::{debug, info, warn};

const LOG_TARGET: &str = "mushaf::page_store";

/// Observable state of the store.
#[derive(Debug, Clone, Default)]
pub enum PageState {
    #[default]
    Idle,
    Loading {
        page_number: PageNumber,
    },
    Ready(Arc<Page>),
    Failed {
        page_number: PageNumber,
        kind: ErrorKind,
        reason: String,
    },
}

impl PageState {
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        matches!(self, Self::Loading { .. })
    }
}

/// Ticket for an issued fetch; hand it back to [`PageStore::complete`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub seq: u64,
    pub page_number: PageNumber,
}

#[derive(Debug, Clone)]
pub enum RequestOutcome {
    /// The caller must fetch this page and report back.
    Fetch(PageRequest),
    /// The page is already materialised; no fetch needed.
    Cached(Arc<Page>),
}

#[derive(Debug)]
pub enum Completion {
    /// The response became the current page.
    Applied {
        page: Arc<Page>,
        page_changed: bool,
    },
    /// The latest request failed; the previous page is retained.
    Failed {
        page_number: PageNumber,
        error: CoreError,
    },
    /// A newer request superseded this one; nothing changed.
    Stale,
}

#[derive(Debug, Default)]
pub struct PageStore {
    latest_seq: u64,
    pending: Option<PageRequest>,
    state: PageState,
    current: Option<Arc<Page>>,
}

impl PageStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start navigating to `page_number`. Any request still in flight becomes stale.
    pub fn request(&mut self, page_number: PageNumber) -> RequestOutcome {
        self.latest_seq += 1;

        if let Some(current) = self
            .current
            .as_ref()
            .filter(|page| page.page_number == page_number)
        {
            debug!(target: LOG_TARGET, "Page {} already materialised", page_number);
            self.pending = None;
            self.state = PageState::Ready(Arc::clone(current));
            return RequestOutcome::Cached(Arc::clone(current));
        }

        let request = PageRequest {
            seq: self.latest_seq,
            page_number,
        };
        if let Some(previous) = self.pending.replace(request) {
            debug!(
                target: LOG_TARGET,
                "Superseding in-flight request for page {} (seq {})",
                previous.page_number, previous.seq
            );
        }
        self.state = PageState::Loading { page_number };
        RequestOutcome::Fetch(request)
    }

    /// Apply the result of a fetch issued by [`request`](Self::request).
    pub fn complete(&mut self, seq: u64, result: Result<Page, CoreError>) -> Completion {
        let Some(request) = self.pending.filter(|pending| pending.seq == seq) else {
            debug!(
                target: LOG_TARGET,
                "Discarding stale page response (seq {}, latest {})", seq, self.latest_seq
            );
            return Completion::Stale;
        };
        self.pending = None;

        let result = result.and_then(|page| {
            if page.page_number == request.page_number {
                Ok(page)
            } else {
                Err(CoreError::MalformedResponse {
                    reason: format!(
                        "requested page {} but received page {}",
                        request.page_number, page.page_number
                    ),
                })
            }
        });

        match result {
            Ok(page) => {
                let page_changed = self.current_page_number() != Some(page.page_number);
                let page = Arc::new(page);
                info!(
                    target: LOG_TARGET,
                    "Page {} ready ({} lines)", page.page_number, page.lines.len()
                );
                self.current = Some(Arc::clone(&page));
                self.state = PageState::Ready(Arc::clone(&page));
                Completion::Applied { page, page_changed }
            }
            Err(error) => {
                warn!(
                    target: LOG_TARGET,
                    "Failed to load page {}: {}", request.page_number, error
                );
                self.state = PageState::Failed {
                    page_number: request.page_number,
                    kind: error.kind(),
                    reason: error.to_string(),
                };
                Completion::Failed {
                    page_number: request.page_number,
                    error,
                }
            }
        }
    }

    #[must_use]
    pub const fn state(&self) -> &PageState {
        &self.state
    }

    /// The last successfully materialised page, kept across failures.
    #[must_use]
    pub fn current_page(&self) -> Option<&Arc<Page>> {
        self.current.as_ref()
    }

    #[must_use]
    pub fn current_page_number(&self) -> Option<PageNumber> {
        self.current.as_ref().map(|page| page.page_number)
    }

    #[must_use]
    pub const fn pending(&self) -> Option<PageRequest> {
        self.pending
    }
}
