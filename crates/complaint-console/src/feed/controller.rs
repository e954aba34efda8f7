//! Infinite-scroll complaint list

use complaint_client::{Complaint, PageRequest};
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::Mutex;

use super::scroll::{ScrollPosition, ScrollTrigger};
use super::submitters::{spawn_enrichment, EnrichmentHandle, SubmitterDirectory};
use super::window::PageWindow;
use crate::error::Result;
use crate::gateway::ComplaintGateway;

/// Default number of complaints per page
pub const DEFAULT_PAGE_SIZE: u64 = 10;

const LOAD_FAILED: &str = "Failed to load complaints";

/// What a `load` call did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// A page was fetched and applied
    Loaded { page: u64, appended: usize },
    /// Another fetch was in flight; nothing was requested
    Skipped,
    /// The last page is already loaded; nothing was requested
    Exhausted,
}

/// Result of a `load` call.
///
/// `outcome` is final when `load` returns. Submitter enrichment for the
/// fetched page completes separately through `enrichment`.
#[derive(Debug)]
pub struct LoadReport {
    pub outcome: LoadOutcome,
    pub enrichment: Option<EnrichmentHandle>,
}

impl LoadReport {
    fn idle(outcome: LoadOutcome) -> Self {
        Self {
            outcome,
            enrichment: None,
        }
    }
}

/// Point-in-time copy of the list view
#[derive(Debug, Clone, PartialEq)]
pub struct FeedSnapshot {
    pub items: Vec<Complaint>,
    pub current_page: u64,
    pub total_pages: u64,
    pub total_items: u64,
    pub has_more: bool,
    pub loading: bool,
    pub error: Option<String>,
}

struct FeedState {
    window: PageWindow<Complaint>,
    loading: bool,
    error: Option<String>,
}

fn window_of(state: &mut FeedState) -> &mut PageWindow<Complaint> {
    &mut state.window
}

/// Paginated complaint list with scroll-driven loading.
///
/// At most one page fetch is in flight at a time; overlapping triggers are
/// dropped rather than queued.
pub struct ComplaintFeed {
    gateway: Arc<dyn ComplaintGateway>,
    directory: Arc<SubmitterDirectory>,
    state: Arc<Mutex<FeedState>>,
    scroll: StdMutex<ScrollTrigger>,
}

impl ComplaintFeed {
    pub fn new(gateway: Arc<dyn ComplaintGateway>, page_size: u64) -> Self {
        let directory = Arc::new(SubmitterDirectory::new(Arc::clone(&gateway)));
        Self::with_directory(gateway, directory, page_size)
    }

    /// Create a feed sharing an existing submitter cache
    pub fn with_directory(
        gateway: Arc<dyn ComplaintGateway>,
        directory: Arc<SubmitterDirectory>,
        page_size: u64,
    ) -> Self {
        Self {
            gateway,
            directory,
            state: Arc::new(Mutex::new(FeedState {
                window: PageWindow::new(page_size.max(1)),
                loading: false,
                error: None,
            })),
            scroll: StdMutex::new(ScrollTrigger::default()),
        }
    }

    /// Replace the scroll trigger (custom threshold)
    pub fn with_scroll_threshold(self, threshold: f64) -> Self {
        Self {
            scroll: StdMutex::new(ScrollTrigger::new(threshold)),
            ..self
        }
    }

    pub fn directory(&self) -> &Arc<SubmitterDirectory> {
        &self.directory
    }

    /// Fetch a page.
    ///
    /// With `reset` the next response replaces the list and restarts at page
    /// 1; the current items stay visible until that response arrives.
    /// Otherwise the next page is appended. On failure the error slot is set
    /// and the list is left as it was.
    pub async fn load(&self, reset: bool) -> Result<LoadReport> {
        let request = {
            let mut state = self.state.lock().await;
            if state.loading {
                tracing::debug!(reset, "Page fetch already in flight, skipping");
                return Ok(LoadReport::idle(LoadOutcome::Skipped));
            }
            if !reset && state.window.is_loaded() && !state.window.has_more() {
                return Ok(LoadReport::idle(LoadOutcome::Exhausted));
            }

            let page = if reset { 1 } else { state.window.next_page() };
            state.loading = true;
            state.error = None;
            PageRequest::new(page, state.window.page_size())
        };

        tracing::debug!(page = request.page, limit = request.limit, "Fetching complaints");
        let result = self.gateway.list_complaints(request).await;

        let mut state = self.state.lock().await;
        state.loading = false;

        let page = match result {
            Ok(page) => page,
            Err(err) => {
                tracing::warn!(page = request.page, error = %err, "Failed to load complaints");
                state.error = Some(err.user_message(LOAD_FAILED));
                return Err(err);
            }
        };

        if reset {
            state.window.reset();
        }
        let records = page.items.clone();
        state.window.apply(page);
        let current_page = state.window.current_page();
        tracing::info!(
            page = current_page,
            total_pages = state.window.total_pages(),
            appended = records.len(),
            "Complaints loaded"
        );
        drop(state);

        if reset {
            self.rearm_scroll();
        }

        let enrichment = spawn_enrichment(
            Arc::clone(&self.directory),
            Arc::clone(&self.state),
            &records,
            window_of,
        );

        Ok(LoadReport {
            outcome: LoadOutcome::Loaded {
                page: current_page,
                appended: records.len(),
            },
            enrichment,
        })
    }

    /// Feed a scroll event; loads the next page on entering the near-bottom
    /// zone. Returns `None` when no load was triggered.
    ///
    /// The trigger stays disarmed after a failed load until the viewport
    /// leaves the zone; retry with `load(false)`.
    pub async fn on_scroll(&self, position: ScrollPosition) -> Result<Option<LoadReport>> {
        let fire = self
            .scroll
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .observe(position);

        if !fire {
            return Ok(None);
        }
        self.load(false).await.map(Some)
    }

    /// Swap in the server's representation of a record
    pub async fn replace(&self, record: &Complaint) -> usize {
        self.state.lock().await.window.replace(record)
    }

    pub async fn get(&self, id: &str) -> Option<Complaint> {
        self.state.lock().await.window.find(id).cloned()
    }

    pub async fn items(&self) -> Vec<Complaint> {
        self.state.lock().await.window.items().to_vec()
    }

    pub async fn has_more(&self) -> bool {
        self.state.lock().await.window.has_more()
    }

    pub async fn is_loading(&self) -> bool {
        self.state.lock().await.loading
    }

    pub async fn error(&self) -> Option<String> {
        self.state.lock().await.error.clone()
    }

    pub async fn snapshot(&self) -> FeedSnapshot {
        let state = self.state.lock().await;
        FeedSnapshot {
            items: state.window.items().to_vec(),
            current_page: state.window.current_page(),
            total_pages: state.window.total_pages(),
            total_items: state.window.total_items(),
            has_more: state.window.has_more(),
            loading: state.loading,
            error: state.error.clone(),
        }
    }

    fn rearm_scroll(&self) {
        self.scroll
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .rearm();
    }
}
