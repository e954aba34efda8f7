//! Remote complaint gateway abstraction.
//!
//! The console core talks to the backend only through [`ComplaintGateway`]:
//! - [`ApiClient`] for the real REST backend
//! - [`MockGateway`] for tests

pub mod mock;

pub use mock::{MockFailure, MockGateway, MockOp};

use async_trait::async_trait;
use complaint_client::{
    ApiClient, Complaint, ComplaintStatus, PageRequest, Paginated, UserSummary,
};

use crate::error::Result;

/// Complaint endpoints used by the lock, feed, and editor components.
#[async_trait]
pub trait ComplaintGateway: Send + Sync {
    /// Fetch one page of complaints.
    async fn list_complaints(&self, page: PageRequest) -> Result<Paginated<Complaint>>;

    /// Fetch a complaint; `lock` requests an advisory exclusive checkout.
    async fn get_complaint(&self, id: &str, lock: bool) -> Result<Complaint>;

    /// Append a note, returning the server's updated record.
    async fn add_note(&self, id: &str, note: &str) -> Result<Complaint>;

    /// Transition status, returning the server's updated record.
    async fn change_status(&self, id: &str, status: ComplaintStatus) -> Result<Complaint>;

    /// Resolve a submitter's identity summary.
    async fn get_submitter(&self, user_id: &str) -> Result<UserSummary>;
}

#[async_trait]
impl ComplaintGateway for ApiClient {
    async fn list_complaints(&self, page: PageRequest) -> Result<Paginated<Complaint>> {
        Ok(ApiClient::list_complaints(self, page).await?)
    }

    async fn get_complaint(&self, id: &str, lock: bool) -> Result<Complaint> {
        Ok(ApiClient::get_complaint(self, id, lock).await?)
    }

    async fn add_note(&self, id: &str, note: &str) -> Result<Complaint> {
        Ok(ApiClient::add_note(self, id, note).await?)
    }

    async fn change_status(&self, id: &str, status: ComplaintStatus) -> Result<Complaint> {
        Ok(ApiClient::change_status(self, id, status).await?)
    }

    async fn get_submitter(&self, user_id: &str) -> Result<UserSummary> {
        Ok(self.get_user_summary(user_id).await?)
    }
}
