//! Session-lifetime submitter lookup cache and background enrichment

use complaint_client::{Complaint, UserSummary};
use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{Mutex, OnceCell};
use tokio::task::JoinHandle;

use super::window::PageWindow;
use crate::error::Result;
use crate::gateway::ComplaintGateway;

/// Memoized submitter summaries, keyed by user id.
///
/// Concurrent lookups for the same id share one request. Failed lookups
/// are not cached. Entries live until [`SubmitterDirectory::invalidate`].
pub struct SubmitterDirectory {
    gateway: Arc<dyn ComplaintGateway>,
    cells: StdMutex<HashMap<String, Arc<OnceCell<UserSummary>>>>,
}

impl SubmitterDirectory {
    pub fn new(gateway: Arc<dyn ComplaintGateway>) -> Self {
        Self {
            gateway,
            cells: StdMutex::new(HashMap::new()),
        }
    }

    fn cell(&self, user_id: &str) -> Arc<OnceCell<UserSummary>> {
        let mut cells = self.cells.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(cells.entry(user_id.to_string()).or_default())
    }

    /// Resolve a submitter, hitting the gateway at most once per id
    pub async fn resolve(&self, user_id: &str) -> Result<UserSummary> {
        let cell = self.cell(user_id);
        cell.get_or_try_init(|| async {
            tracing::debug!(user_id, "Looking up submitter");
            self.gateway.get_submitter(user_id).await
        })
        .await
        .cloned()
    }

    /// Cached summary, without a lookup
    pub fn cached(&self, user_id: &str) -> Option<UserSummary> {
        let cells = self.cells.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        cells.get(user_id).and_then(|cell| cell.get().cloned())
    }

    /// Number of resolved entries
    pub fn len(&self) -> usize {
        let cells = self.cells.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        cells.values().filter(|cell| cell.initialized()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every cached summary
    pub fn invalidate(&self) {
        self.cells
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }
}

/// Outcome of one enrichment pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrichmentReport {
    /// Distinct submitters resolved
    pub resolved: usize,
    /// Distinct submitters whose lookup failed
    pub failed: usize,
    /// Records patched in the window
    pub patched: usize,
}

/// Completion signal for a background enrichment pass
#[derive(Debug)]
pub struct EnrichmentHandle {
    task: JoinHandle<EnrichmentReport>,
}

impl EnrichmentHandle {
    /// Wait for the pass to finish
    pub async fn finished(self) -> EnrichmentReport {
        match self.task.await {
            Ok(report) => report,
            Err(err) => {
                tracing::error!(error = %err, "Submitter enrichment task failed");
                EnrichmentReport::default()
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Distinct submitter ids among records lacking an embedded summary
pub fn missing_submitters(records: &[Complaint]) -> BTreeSet<String> {
    records
        .iter()
        .filter(|record| record.user.is_none())
        .map(|record| record.user_id.clone())
        .collect()
}

/// Resolve missing submitters in the background and splice them into the
/// window as each lookup returns.
///
/// Returns `None` when every record already carries its submitter.
pub(crate) fn spawn_enrichment<S>(
    directory: Arc<SubmitterDirectory>,
    state: Arc<Mutex<S>>,
    records: &[Complaint],
    window: fn(&mut S) -> &mut PageWindow<Complaint>,
) -> Option<EnrichmentHandle>
where
    S: Send + 'static,
{
    let user_ids = missing_submitters(records);
    if user_ids.is_empty() {
        return None;
    }

    let task = tokio::spawn(async move {
        let mut lookups: FuturesUnordered<_> = user_ids
            .into_iter()
            .map(|user_id| {
                let directory = Arc::clone(&directory);
                async move {
                    let result = directory.resolve(&user_id).await;
                    (user_id, result)
                }
            })
            .collect();

        let mut report = EnrichmentReport::default();
        while let Some((user_id, result)) = lookups.next().await {
            match result {
                Ok(summary) => {
                    report.resolved += 1;
                    let mut state = state.lock().await;
                    report.patched += window(&mut state).splice_submitter(&summary);
                }
                Err(err) => {
                    report.failed += 1;
                    tracing::error!(user_id = %user_id, error = %err, "Failed to resolve submitter");
                }
            }
        }

        tracing::debug!(
            resolved = report.resolved,
            failed = report.failed,
            patched = report.patched,
            "Submitter enrichment finished"
        );
        report
    });

    Some(EnrichmentHandle { task })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{MockGateway, MockOp};

    fn user(id: &str) -> UserSummary {
        UserSummary {
            id: id.into(),
            first_name: None,
            last_name: None,
            email: format!("{id}@example.com"),
        }
    }

    #[tokio::test]
    async fn test_resolve_is_memoized() {
        let gateway = Arc::new(MockGateway::new().with_user(user("u1")));
        let directory = SubmitterDirectory::new(gateway.clone());

        let (a, b) = tokio::join!(directory.resolve("u1"), directory.resolve("u1"));
        assert_eq!(a.unwrap(), b.unwrap());
        assert_eq!(directory.resolve("u1").await.unwrap().email, "u1@example.com");
        assert_eq!(gateway.calls(MockOp::Submitter), 1);
        assert_eq!(directory.len(), 1);
    }

    #[tokio::test]
    async fn test_failures_are_not_cached_and_invalidate_resets() {
        let gateway = Arc::new(MockGateway::new().with_user(user("u1")));
        let directory = SubmitterDirectory::new(gateway.clone());

        assert!(directory.resolve("ghost").await.is_err());
        assert!(directory.resolve("ghost").await.is_err());
        assert_eq!(gateway.calls(MockOp::Submitter), 2);

        directory.resolve("u1").await.unwrap();
        assert!(directory.cached("u1").is_some());

        directory.invalidate();
        assert!(directory.cached("u1").is_none());
        directory.resolve("u1").await.unwrap();
        assert_eq!(gateway.calls(MockOp::Submitter), 4);
    }
}
