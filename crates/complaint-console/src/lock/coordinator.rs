//! Advisory edit-lock coordinator
//!
//! Tracks which complaints this console has checked out for editing.
//! Expiry is enforced two ways:
//! - lazily: every query compares `now` against the deadline
//! - eagerly: a timer task purges the entry and emits [`LockEvent::Expired`]
//!
//! Neither path notifies the server; the server-side lock expires on its own.

use complaint_client::Complaint;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::error::{ConsoleError, Result};
use crate::gateway::ComplaintGateway;

/// Default lock lifetime (5 minutes)
pub const DEFAULT_LOCK_TTL: Duration = Duration::from_secs(300);

/// Lock lifecycle notifications
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockEvent {
    Acquired { complaint_id: String, generation: u64 },
    Released { complaint_id: String, generation: u64 },
    Expired { complaint_id: String, generation: u64 },
}

/// A held advisory lock
#[derive(Debug, Clone)]
pub struct LockGrant {
    pub complaint_id: String,
    pub acquired_at: Instant,
    pub expires_at: Instant,
    /// Distinguishes successive locks on the same complaint
    pub generation: u64,
    /// The record as returned by the fetch-with-lock call
    pub record: Complaint,
}

impl LockGrant {
    /// Whether the lock is still within its deadline
    pub fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }

    /// Time left before expiry
    pub fn remaining(&self, now: Instant) -> Duration {
        self.expires_at.saturating_duration_since(now)
    }

    /// Version observed when the lock was taken
    pub fn version(&self) -> u64 {
        self.record.version
    }
}

struct LockEntry {
    grant: LockGrant,
    timer: JoinHandle<()>,
}

#[derive(Default)]
struct LockTable {
    held: HashMap<String, LockEntry>,
    /// In-flight acquisitions: complaint id -> generation
    pending: HashMap<String, u64>,
    next_generation: u64,
}

impl LockTable {
    fn allocate_generation(&mut self) -> u64 {
        self.next_generation += 1;
        self.next_generation
    }
}

/// Client-side tracker of checked-out complaints.
///
/// At most one live lock exists per complaint. `release` is idempotent and
/// safe to race against the expiry timer.
pub struct LockCoordinator {
    gateway: Arc<dyn ComplaintGateway>,
    ttl: Duration,
    table: Arc<Mutex<LockTable>>,
    events: broadcast::Sender<LockEvent>,
}

impl LockCoordinator {
    /// Create a coordinator with the given lock lifetime
    pub fn new(gateway: Arc<dyn ComplaintGateway>, ttl: Duration) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            gateway,
            ttl,
            table: Arc::new(Mutex::new(LockTable::default())),
            events,
        }
    }

    /// Create a coordinator with the default 5 minute lifetime
    pub fn with_default_ttl(gateway: Arc<dyn ComplaintGateway>) -> Self {
        Self::new(gateway, DEFAULT_LOCK_TTL)
    }

    /// Configured lock lifetime
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Subscribe to lock lifecycle events
    pub fn subscribe(&self) -> broadcast::Receiver<LockEvent> {
        self.events.subscribe()
    }

    /// Acquire the advisory lock for a complaint.
    ///
    /// Returns the existing grant without a network call when a live lock is
    /// already held. Fails with [`ConsoleError::LockPending`] if another
    /// acquisition for the same complaint is in flight, and with
    /// [`ConsoleError::Cancelled`] if the lock was released before the
    /// fetch-with-lock call returned.
    pub async fn acquire(&self, complaint_id: &str) -> Result<LockGrant> {
        let generation = {
            let mut table = self.table.lock().await;

            if let Some(entry) = table.held.get(complaint_id) {
                if entry.grant.is_live(Instant::now()) {
                    tracing::debug!(complaint_id, "Reusing held edit lock");
                    return Ok(entry.grant.clone());
                }
                self.purge_expired(&mut table, complaint_id);
            }

            if table.pending.contains_key(complaint_id) {
                return Err(ConsoleError::LockPending(complaint_id.to_string()));
            }

            let generation = table.allocate_generation();
            table.pending.insert(complaint_id.to_string(), generation);
            generation
        };

        tracing::debug!(complaint_id, generation, "Requesting edit lock");
        let result = self.gateway.get_complaint(complaint_id, true).await;

        let mut table = self.table.lock().await;
        if table.pending.get(complaint_id) != Some(&generation) {
            tracing::warn!(complaint_id, generation, "Discarding lock response for released complaint");
            return Err(ConsoleError::Cancelled(complaint_id.to_string()));
        }
        table.pending.remove(complaint_id);

        let record = result?;
        let acquired_at = Instant::now();
        let grant = LockGrant {
            complaint_id: complaint_id.to_string(),
            acquired_at,
            expires_at: acquired_at + self.ttl,
            generation,
            record,
        };

        let timer = self.spawn_expiry(complaint_id.to_string(), generation, grant.expires_at);
        table.held.insert(
            complaint_id.to_string(),
            LockEntry {
                grant: grant.clone(),
                timer,
            },
        );

        tracing::info!(complaint_id, generation, ttl_secs = self.ttl.as_secs(), "Edit lock acquired");
        let _ = self.events.send(LockEvent::Acquired {
            complaint_id: complaint_id.to_string(),
            generation,
        });

        Ok(grant)
    }

    /// Release the lock for a complaint.
    ///
    /// Also abandons any in-flight acquisition. Returns whether a held lock
    /// was dropped; releasing an unheld lock is a no-op.
    pub async fn release(&self, complaint_id: &str) -> bool {
        let mut table = self.table.lock().await;
        table.pending.remove(complaint_id);

        match table.held.remove(complaint_id) {
            Some(entry) => {
                entry.timer.abort();
                tracing::debug!(complaint_id, generation = entry.grant.generation, "Edit lock released");
                let _ = self.events.send(LockEvent::Released {
                    complaint_id: complaint_id.to_string(),
                    generation: entry.grant.generation,
                });
                true
            }
            None => false,
        }
    }

    /// Drop every lock and pending acquisition (session teardown)
    pub async fn release_all(&self) {
        let mut table = self.table.lock().await;
        table.pending.clear();
        for (complaint_id, entry) in table.held.drain() {
            entry.timer.abort();
            let _ = self.events.send(LockEvent::Released {
                complaint_id,
                generation: entry.grant.generation,
            });
        }
    }

    /// Whether a live lock is held for the complaint
    pub async fn is_held(&self, complaint_id: &str) -> bool {
        self.grant(complaint_id).await.is_some()
    }

    /// The live grant for a complaint, if any
    pub async fn grant(&self, complaint_id: &str) -> Option<LockGrant> {
        let table = self.table.lock().await;
        table
            .held
            .get(complaint_id)
            .map(|entry| &entry.grant)
            .filter(|grant| grant.is_live(Instant::now()))
            .cloned()
    }

    /// Whether an acquisition is in flight for the complaint
    pub async fn is_pending(&self, complaint_id: &str) -> bool {
        self.table.lock().await.pending.contains_key(complaint_id)
    }

    /// All live grants
    pub async fn held(&self) -> Vec<LockGrant> {
        let now = Instant::now();
        let table = self.table.lock().await;
        table
            .held
            .values()
            .map(|entry| &entry.grant)
            .filter(|grant| grant.is_live(now))
            .cloned()
            .collect()
    }

    fn purge_expired(&self, table: &mut LockTable, complaint_id: &str) {
        if let Some(entry) = table.held.remove(complaint_id) {
            entry.timer.abort();
            tracing::debug!(complaint_id, "Purged expired edit lock");
            let _ = self.events.send(LockEvent::Expired {
                complaint_id: complaint_id.to_string(),
                generation: entry.grant.generation,
            });
        }
    }

    fn spawn_expiry(&self, complaint_id: String, generation: u64, deadline: Instant) -> JoinHandle<()> {
        let table = Arc::clone(&self.table);
        let events = self.events.clone();

        tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;

            let mut table = table.lock().await;
            let current = table.held.get(&complaint_id).map(|entry| entry.grant.generation);
            if current != Some(generation) {
                return;
            }
            table.held.remove(&complaint_id);
            drop(table);

            tracing::info!(complaint_id = %complaint_id, generation, "Edit lock expired");
            let _ = events.send(LockEvent::Expired {
                complaint_id,
                generation,
            });
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::mock::sample_complaint;
    use crate::gateway::{MockFailure, MockGateway, MockOp};

    fn coordinator(gateway: &Arc<MockGateway>) -> LockCoordinator {
        LockCoordinator::with_default_ttl(gateway.clone())
    }

    fn gateway() -> Arc<MockGateway> {
        Arc::new(MockGateway::new().with_complaints(vec![
            sample_complaint("c1", "u1"),
            sample_complaint("c2", "u2"),
        ]))
    }

    #[tokio::test]
    async fn test_release_is_idempotent() {
        let gateway = gateway();
        let locks = coordinator(&gateway);

        assert!(!locks.release("c1").await);

        locks.acquire("c1").await.unwrap();
        assert!(locks.release("c1").await);
        assert!(!locks.release("c1").await);
        assert!(!locks.is_held("c1").await);
    }

    #[tokio::test]
    async fn test_second_acquire_reuses_live_lock() {
        let gateway = gateway();
        let locks = coordinator(&gateway);

        let first = locks.acquire("c1").await.unwrap();
        let second = locks.acquire("c1").await.unwrap();

        assert_eq!(first.generation, second.generation);
        assert_eq!(gateway.calls(MockOp::Get), 1);
    }

    #[tokio::test]
    async fn test_failed_acquire_records_nothing() {
        let gateway = gateway();
        let locks = coordinator(&gateway);
        gateway.fail_next(MockOp::Get, MockFailure::Server(423));

        let err = locks.acquire("c1").await.unwrap_err();
        assert!(matches!(err, ConsoleError::Rejected { status: 423, .. }));
        assert!(!locks.is_held("c1").await);
        assert!(!locks.is_pending("c1").await);

        // No automatic retry; the caller retries explicitly
        assert_eq!(gateway.calls(MockOp::Get), 1);
        locks.acquire("c1").await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_expiry_emits_event() {
        let gateway = gateway();
        let locks = coordinator(&gateway);
        let mut events = locks.subscribe();

        let grant = locks.acquire("c1").await.unwrap();
        assert!(matches!(events.recv().await.unwrap(), LockEvent::Acquired { .. }));

        tokio::time::sleep(DEFAULT_LOCK_TTL + Duration::from_millis(1)).await;

        assert_eq!(
            events.recv().await.unwrap(),
            LockEvent::Expired {
                complaint_id: "c1".into(),
                generation: grant.generation
            }
        );
        assert!(!locks.is_held("c1").await);
        assert_eq!(gateway.calls(MockOp::Get), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_lazy_expiry_without_timer() {
        let gateway = gateway();
        let locks = coordinator(&gateway);
        let grant = locks.acquire("c1").await.unwrap();

        // Jump the clock without yielding to the timer task
        tokio::time::advance(DEFAULT_LOCK_TTL).await;
        assert!(!grant.is_live(Instant::now()));
        assert!(locks.grant("c1").await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_release_during_acquire_discards_response() {
        let gateway = Arc::new(
            MockGateway::new()
                .with_complaints(vec![sample_complaint("c1", "u1")])
                .with_delay(MockOp::Get, Duration::from_secs(2)),
        );
        let locks = Arc::new(coordinator(&gateway));

        let pending = {
            let locks = locks.clone();
            tokio::spawn(async move { locks.acquire("c1").await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(locks.is_pending("c1").await);

        let err = locks.acquire("c1").await.unwrap_err();
        assert!(matches!(err, ConsoleError::LockPending(_)));

        locks.release("c1").await;
        let result = pending.await.unwrap();
        assert!(matches!(result, Err(ConsoleError::Cancelled(_))));
        assert!(!locks.is_held("c1").await);
        assert_eq!(gateway.calls(MockOp::Get), 1);
    }

    #[tokio::test]
    async fn test_release_all() {
        let gateway = gateway();
        let locks = coordinator(&gateway);
        locks.acquire("c1").await.unwrap();
        locks.acquire("c2").await.unwrap();
        assert_eq!(locks.held().await.len(), 2);

        locks.release_all().await;
        assert!(locks.held().await.is_empty());
    }
}
