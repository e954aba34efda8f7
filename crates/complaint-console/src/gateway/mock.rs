//! In-memory gateway for testing.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use complaint_client::{
    Complaint, ComplaintCategory, ComplaintStatus, ComplaintType, PageLinks, PageMeta,
    PageRequest, Paginated, UserSummary,
};
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use super::ComplaintGateway;
use crate::error::{ConsoleError, Result};

/// Gateway operations, for call counting and failure injection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOp {
    List,
    Get,
    Note,
    Status,
    Submitter,
}

/// Failure to inject into the next call of an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    Unauthorized,
    NotFound,
    Conflict,
    Server(u16),
    Network,
}

impl MockFailure {
    fn into_error(self) -> ConsoleError {
        match self {
            MockFailure::Unauthorized => ConsoleError::Unauthorized("Token expired".into()),
            MockFailure::NotFound => ConsoleError::NotFound("Complaint not found".into()),
            MockFailure::Conflict => {
                ConsoleError::Conflict("Complaint was modified by another user".into())
            }
            MockFailure::Server(status) => ConsoleError::Rejected {
                status,
                message: "Internal server error".into(),
            },
            MockFailure::Network => ConsoleError::Transport("connection reset".into()),
        }
    }
}

#[derive(Default)]
struct MockState {
    complaints: Vec<Complaint>,
    users: HashMap<String, UserSummary>,
    failures: HashMap<MockOp, VecDeque<MockFailure>>,
    delays: HashMap<MockOp, Duration>,
    calls: HashMap<MockOp, u32>,
}

/// Mock gateway backed by an in-memory complaint list.
///
/// Mutations bump `version` by one, like the real backend. Failures and
/// per-operation delays can be scripted to exercise error and
/// interleaving paths.
#[derive(Default)]
pub struct MockGateway {
    state: Mutex<MockState>,
}

impl MockGateway {
    /// Create an empty mock gateway.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the complaint list.
    pub fn with_complaints(self, complaints: Vec<Complaint>) -> Self {
        self.lock().complaints = complaints;
        self
    }

    /// Register a submitter summary.
    pub fn with_user(self, user: UserSummary) -> Self {
        self.lock().users.insert(user.id.clone(), user);
        self
    }

    /// Delay every call of `op` by `delay`.
    pub fn with_delay(self, op: MockOp, delay: Duration) -> Self {
        self.lock().delays.insert(op, delay);
        self
    }

    /// Fail the next call of `op`.
    pub fn fail_next(&self, op: MockOp, failure: MockFailure) {
        self.lock().failures.entry(op).or_default().push_back(failure);
    }

    /// Number of calls made for `op`.
    pub fn calls(&self, op: MockOp) -> u32 {
        self.lock().calls.get(&op).copied().unwrap_or(0)
    }

    /// Number of calls made across all operations.
    pub fn total_calls(&self) -> u32 {
        self.lock().calls.values().sum()
    }

    /// Current server-side copy of a complaint.
    pub fn complaint(&self, id: &str) -> Option<Complaint> {
        self.lock().complaints.iter().find(|c| c.id == id).cloned()
    }

    /// Simulate another actor modifying a complaint.
    pub fn touch(&self, id: &str) {
        if let Some(complaint) = self.lock().complaints.iter_mut().find(|c| c.id == id) {
            complaint.version += 1;
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Count the call, apply any delay, then pop a scripted failure.
    async fn enter(&self, op: MockOp) -> Result<()> {
        let delay = {
            let mut state = self.lock();
            *state.calls.entry(op).or_insert(0) += 1;
            state.delays.get(&op).copied()
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        match self.lock().failures.get_mut(&op).and_then(VecDeque::pop_front) {
            Some(failure) => Err(failure.into_error()),
            None => Ok(()),
        }
    }

    fn mutate(&self, id: &str, apply: impl FnOnce(&mut Complaint)) -> Result<Complaint> {
        let mut state = self.lock();
        let complaint = state
            .complaints
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| ConsoleError::NotFound(format!("Complaint {} not found", id)))?;

        apply(complaint);
        complaint.version += 1;
        complaint.updated_at = Utc::now();
        Ok(complaint.clone())
    }
}

#[async_trait]
impl ComplaintGateway for MockGateway {
    async fn list_complaints(&self, page: PageRequest) -> Result<Paginated<Complaint>> {
        self.enter(MockOp::List).await?;

        let state = self.lock();
        let limit = page.limit.max(1);
        let total_items = state.complaints.len() as u64;
        let total_pages = total_items.div_ceil(limit);
        let start = (page.page.saturating_sub(1) * limit) as usize;
        let items: Vec<Complaint> = state
            .complaints
            .iter()
            .skip(start)
            .take(limit as usize)
            .cloned()
            .collect();

        Ok(Paginated {
            meta: PageMeta {
                item_count: items.len() as u64,
                total_items,
                items_per_page: limit,
                total_pages,
                current_page: page.page,
            },
            items,
            links: PageLinks::default(),
        })
    }

    async fn get_complaint(&self, id: &str, _lock: bool) -> Result<Complaint> {
        self.enter(MockOp::Get).await?;
        self.complaint(id)
            .ok_or_else(|| ConsoleError::NotFound(format!("Complaint {} not found", id)))
    }

    async fn add_note(&self, id: &str, _note: &str) -> Result<Complaint> {
        self.enter(MockOp::Note).await?;
        self.mutate(id, |_| {})
    }

    async fn change_status(&self, id: &str, status: ComplaintStatus) -> Result<Complaint> {
        self.enter(MockOp::Status).await?;
        self.mutate(id, |complaint| complaint.status = status)
    }

    async fn get_submitter(&self, user_id: &str) -> Result<UserSummary> {
        self.enter(MockOp::Submitter).await?;
        self.lock()
            .users
            .get(user_id)
            .cloned()
            .ok_or_else(|| ConsoleError::NotFound(format!("User {} not found", user_id)))
    }
}

/// A pending complaint with fixed timestamps, for fixtures.
pub fn sample_complaint(id: &str, user_id: &str) -> Complaint {
    let created: DateTime<Utc> = Utc
        .with_ymd_and_hms(2024, 5, 1, 8, 0, 0)
        .single()
        .unwrap_or_default();

    Complaint {
        id: id.to_string(),
        title: format!("Complaint {}", id),
        description: "Streetlight out for a week".to_string(),
        user_id: user_id.to_string(),
        agency_id: "agency-1".to_string(),
        complaint_type: ComplaintType::Category(ComplaintCategory::PublicHealth),
        location: "Elm Street".to_string(),
        files: Vec::new(),
        status: ComplaintStatus::Pending,
        version: 1,
        created_at: created,
        updated_at: created,
        agency: None,
        user: None,
    }
}
