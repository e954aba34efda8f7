//! Per-complaint edit sessions: lock, validate, submit, reconcile

use complaint_client::{Complaint, ComplaintStatus};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use super::validation::{validate_note, validate_status};
use crate::error::{ConsoleError, Result};
use crate::feed::ComplaintFeed;
use crate::gateway::ComplaintGateway;
use crate::lock::{LockCoordinator, LockEvent};

const LOCK_FAILED: &str = "Failed to lock complaint for editing";
const NOTE_FAILED: &str = "Failed to add note";
const STATUS_FAILED: &str = "Failed to update status";
const CONFLICT_RELOADED: &str =
    "This complaint was changed by someone else. The latest version has been loaded.";

/// The two editing affordances; at most one is open per complaint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Affordance {
    AddNote,
    ChangeStatus,
}

/// Edit state of one complaint as seen by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditState {
    Idle,
    Locking { affordance: Affordance },
    Editing { affordance: Affordance },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Locking,
    Editing,
}

#[derive(Debug, Clone)]
struct EditSession {
    /// Identifies this session; responses for an older ticket are stale
    ticket: u64,
    phase: Phase,
    affordance: Affordance,
    lock_generation: Option<u64>,
    locked_version: u64,
    submitting: bool,
}

#[derive(Default)]
struct EditorInner {
    sessions: HashMap<String, EditSession>,
    errors: HashMap<String, String>,
    next_ticket: u64,
}

enum Mutation<'a> {
    Note(&'a str),
    Status(ComplaintStatus),
}

impl Mutation<'_> {
    fn affordance(&self) -> Affordance {
        match self {
            Mutation::Note(_) => Affordance::AddNote,
            Mutation::Status(_) => Affordance::ChangeStatus,
        }
    }

    fn fallback(&self) -> &'static str {
        match self {
            Mutation::Note(_) => NOTE_FAILED,
            Mutation::Status(_) => STATUS_FAILED,
        }
    }
}

/// Drives the add-note and change-status flows.
///
/// ```text
/// Idle --begin--> Locking --ok--> Editing --submit ok--> Idle
/// Locking --fail--> Idle          Editing --cancel/timeout--> Idle
///                                 Editing --submit fail--> Editing
/// ```
///
/// Lock order is editor state, then lock coordinator, then feed. The editor
/// never holds its own state across a gateway call.
pub struct ComplaintEditor {
    gateway: Arc<dyn ComplaintGateway>,
    locks: Arc<LockCoordinator>,
    feed: Arc<ComplaintFeed>,
    inner: Arc<Mutex<EditorInner>>,
}

impl ComplaintEditor {
    pub fn new(
        gateway: Arc<dyn ComplaintGateway>,
        locks: Arc<LockCoordinator>,
        feed: Arc<ComplaintFeed>,
    ) -> Self {
        Self {
            gateway,
            locks,
            feed,
            inner: Arc::new(Mutex::new(EditorInner::default())),
        }
    }

    /// Open an affordance for a complaint, acquiring its lock if needed.
    ///
    /// Switching affordances on a complaint that is already locking or
    /// editing reuses that lock.
    pub async fn begin_edit(&self, complaint_id: &str, affordance: Affordance) -> Result<EditState> {
        let ticket = {
            let mut inner = self.inner.lock().await;
            inner.errors.remove(complaint_id);

            if let Some(existing) = inner.sessions.get(complaint_id).cloned() {
                let reusable = match existing.phase {
                    Phase::Locking => true,
                    Phase::Editing => self.lock_is_current(complaint_id, existing.lock_generation).await,
                };
                if reusable {
                    if let Some(session) = inner.sessions.get_mut(complaint_id) {
                        session.affordance = affordance;
                    }
                    tracing::debug!(complaint_id, ?affordance, "Switched edit affordance");
                    return Ok(state_of(existing.phase, affordance));
                }
                inner.sessions.remove(complaint_id);
            }

            inner.next_ticket += 1;
            let ticket = inner.next_ticket;
            inner.sessions.insert(
                complaint_id.to_string(),
                EditSession {
                    ticket,
                    phase: Phase::Locking,
                    affordance,
                    lock_generation: None,
                    locked_version: 0,
                    submitting: false,
                },
            );
            ticket
        };

        let result = self.locks.acquire(complaint_id).await;

        let mut inner = self.inner.lock().await;
        let current = inner
            .sessions
            .get(complaint_id)
            .is_some_and(|session| session.ticket == ticket);

        let grant = match result {
            Ok(grant) if current => grant,
            Ok(grant) => {
                // Session closed while locking; drop the grant unless a newer
                // session already owns it
                let owned = inner
                    .sessions
                    .get(complaint_id)
                    .is_some_and(|session| session.lock_generation == Some(grant.generation));
                drop(inner);
                if !owned {
                    self.locks.release(complaint_id).await;
                }
                tracing::debug!(complaint_id, "Edit cancelled while locking");
                return Err(ConsoleError::Cancelled(complaint_id.to_string()));
            }
            Err(ConsoleError::Cancelled(_)) => {
                if current {
                    inner.sessions.remove(complaint_id);
                }
                tracing::debug!(complaint_id, "Lock released while locking, edit closed");
                return Err(ConsoleError::Cancelled(complaint_id.to_string()));
            }
            Err(err) => {
                if current {
                    inner.sessions.remove(complaint_id);
                    inner
                        .errors
                        .insert(complaint_id.to_string(), err.user_message(LOCK_FAILED));
                }
                drop(inner);
                if err.is_unauthorized() {
                    self.teardown().await;
                }
                return Err(err);
            }
        };

        let affordance = match inner.sessions.get_mut(complaint_id) {
            Some(session) => {
                session.phase = Phase::Editing;
                session.lock_generation = Some(grant.generation);
                session.locked_version = grant.version();
                session.affordance
            }
            None => return Err(ConsoleError::Cancelled(complaint_id.to_string())),
        };
        drop(inner);

        self.feed.replace(&grant.record).await;
        Ok(EditState::Editing { affordance })
    }

    /// Close the open affordance and release the lock
    pub async fn cancel(&self, complaint_id: &str) -> bool {
        let had_session = {
            let mut inner = self.inner.lock().await;
            inner.errors.remove(complaint_id);
            inner.sessions.remove(complaint_id).is_some()
        };
        self.locks.release(complaint_id).await;
        if had_session {
            tracing::debug!(complaint_id, "Edit cancelled");
        }
        had_session
    }

    /// Current edit state; an expired lock reads as `Idle`
    pub async fn state(&self, complaint_id: &str) -> EditState {
        let mut inner = self.inner.lock().await;
        let Some(session) = inner.sessions.get(complaint_id).cloned() else {
            return EditState::Idle;
        };

        if session.phase == Phase::Editing
            && !self.lock_is_current(complaint_id, session.lock_generation).await
        {
            inner.sessions.remove(complaint_id);
            return EditState::Idle;
        }
        state_of(session.phase, session.affordance)
    }

    /// Error message shown for a complaint, if any
    pub async fn error_for(&self, complaint_id: &str) -> Option<String> {
        self.inner.lock().await.errors.get(complaint_id).cloned()
    }

    /// Complaints with an open session, without checking lock liveness
    pub async fn open_sessions(&self) -> Vec<String> {
        let inner = self.inner.lock().await;
        let mut ids: Vec<String> = inner.sessions.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Validate and append a note
    pub async fn submit_note(&self, complaint_id: &str, note: &str) -> Result<Complaint> {
        let note = match validate_note(note) {
            Ok(note) => note,
            Err(err) => return Err(self.record_error(complaint_id, err).await),
        };
        self.submit(complaint_id, Mutation::Note(note)).await
    }

    /// Validate and apply a status transition
    pub async fn submit_status(
        &self,
        complaint_id: &str,
        status: Option<ComplaintStatus>,
    ) -> Result<Complaint> {
        let status = match validate_status(status) {
            Ok(status) => status,
            Err(err) => return Err(self.record_error(complaint_id, err).await),
        };
        self.submit(complaint_id, Mutation::Status(status)).await
    }

    /// Close every session and drop every lock (sign-out or 401)
    pub async fn teardown(&self) {
        {
            let mut inner = self.inner.lock().await;
            inner.sessions.clear();
            inner.errors.clear();
        }
        self.locks.release_all().await;
        tracing::info!("Edit sessions torn down");
    }

    /// Close sessions whose lock expires, as the expiry happens.
    ///
    /// Lazy checks in [`ComplaintEditor::state`] cover the same ground; this
    /// makes the close observable without polling.
    pub fn watch_lock_events(&self) -> JoinHandle<()> {
        let mut events = self.locks.subscribe();
        let inner = Arc::clone(&self.inner);

        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(LockEvent::Expired {
                        complaint_id,
                        generation,
                    }) => {
                        let mut inner = inner.lock().await;
                        let owned = inner
                            .sessions
                            .get(&complaint_id)
                            .is_some_and(|session| session.lock_generation == Some(generation));
                        if owned {
                            inner.sessions.remove(&complaint_id);
                            tracing::info!(complaint_id = %complaint_id, "Edit closed after lock expiry");
                        }
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Lock event watcher lagged");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }

    async fn submit(&self, complaint_id: &str, mutation: Mutation<'_>) -> Result<Complaint> {
        let (ticket, locked_version) = {
            let mut inner = self.inner.lock().await;
            let Some(session) = inner.sessions.get(complaint_id).cloned() else {
                return Err(ConsoleError::NotEditing(complaint_id.to_string()));
            };
            if session.phase != Phase::Editing || session.affordance != mutation.affordance() {
                return Err(ConsoleError::NotEditing(complaint_id.to_string()));
            }
            if session.submitting {
                return Err(ConsoleError::Busy("Submission already in progress".into()));
            }
            if !self.lock_is_current(complaint_id, session.lock_generation).await {
                inner.sessions.remove(complaint_id);
                tracing::info!(complaint_id, "Submit refused, edit lock expired");
                return Err(ConsoleError::LockExpired(complaint_id.to_string()));
            }

            inner.errors.remove(complaint_id);
            if let Some(session) = inner.sessions.get_mut(complaint_id) {
                session.submitting = true;
            }
            (session.ticket, session.locked_version)
        };

        let result = match &mutation {
            Mutation::Note(note) => self.gateway.add_note(complaint_id, note).await,
            Mutation::Status(status) => self.gateway.change_status(complaint_id, *status).await,
        };

        let mut inner = self.inner.lock().await;
        let current = inner
            .sessions
            .get(complaint_id)
            .is_some_and(|session| session.ticket == ticket);

        match result {
            Ok(record) => {
                if record.version != locked_version + 1 {
                    tracing::warn!(
                        complaint_id,
                        locked_version,
                        version = record.version,
                        "Complaint was modified concurrently, accepting server copy"
                    );
                }
                if current {
                    inner.sessions.remove(complaint_id);
                } else {
                    tracing::warn!(complaint_id, "Submit completed after the edit was closed");
                }
                drop(inner);

                self.feed.replace(&record).await;
                if current {
                    self.locks.release(complaint_id).await;
                }
                tracing::info!(complaint_id, version = record.version, "Complaint updated");
                Ok(record)
            }
            Err(err) if err.is_unauthorized() => {
                drop(inner);
                self.teardown().await;
                Err(err)
            }
            Err(err) if err.is_conflict() => {
                if !current {
                    return Err(err);
                }
                inner.sessions.remove(complaint_id);
                inner
                    .errors
                    .insert(complaint_id.to_string(), err.user_message(CONFLICT_RELOADED));
                drop(inner);

                tracing::warn!(complaint_id, error = %err, "Edit rejected as conflicting, reloading");
                self.locks.release(complaint_id).await;
                self.reload(complaint_id).await;
                Err(err)
            }
            Err(err) => {
                if current {
                    if let Some(session) = inner.sessions.get_mut(complaint_id) {
                        session.submitting = false;
                    }
                    inner
                        .errors
                        .insert(complaint_id.to_string(), err.user_message(mutation.fallback()));
                }
                tracing::warn!(complaint_id, error = %err, "Submit failed, lock retained");
                Err(err)
            }
        }
    }

    /// Refetch without a lock and swap the fresh copy into the list
    async fn reload(&self, complaint_id: &str) {
        match self.gateway.get_complaint(complaint_id, false).await {
            Ok(record) => {
                self.feed.replace(&record).await;
            }
            Err(err) => {
                tracing::error!(complaint_id, error = %err, "Failed to reload complaint after conflict");
            }
        }
    }

    async fn record_error(&self, complaint_id: &str, err: ConsoleError) -> ConsoleError {
        self.inner
            .lock()
            .await
            .errors
            .insert(complaint_id.to_string(), err.user_message(""));
        err
    }

    async fn lock_is_current(&self, complaint_id: &str, generation: Option<u64>) -> bool {
        match (self.locks.grant(complaint_id).await, generation) {
            (Some(grant), Some(generation)) => grant.generation == generation,
            _ => false,
        }
    }
}

fn state_of(phase: Phase, affordance: Affordance) -> EditState {
    match phase {
        Phase::Locking => EditState::Locking { affordance },
        Phase::Editing => EditState::Editing { affordance },
    }
}
