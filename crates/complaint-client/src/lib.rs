//! Rust client for the complaint management REST API
//!
//! # Example
//!
//! ```rust,no_run
//! use complaint_client::{ApiClient, ClientConfig, ComplaintStatus, PageRequest, Session};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let session = Session::new();
//! let client = ApiClient::new(ClientConfig::default(), session.clone())?;
//!
//! let response = client.sign_in("staff@example.com", "correct horse").await?;
//! if let Some(data) = complaint_client::SessionData::from_sign_in(&response) {
//!     session.establish(data);
//! }
//!
//! let page = client.list_complaints(PageRequest::new(1, 10)).await?;
//! let locked = client.get_complaint(&page.items[0].id, true).await?;
//! client.change_status(&locked.id, ComplaintStatus::InProgress).await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod session;
pub mod types;

// Re-export main types
pub use client::ApiClient;
pub use error::{ClientError, Result};
pub use session::{Session, SessionData};
pub use types::*;
