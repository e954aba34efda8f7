//! Complaint Console - staff console core for complaint management
//!
//! Sits on top of [`complaint_client`] and adds the stateful parts of the
//! console:
//!
//! - **Edit locks** ([`lock`]): advisory, TTL-bound checkouts of complaints,
//!   checked lazily on every query and purged eagerly by a timer
//! - **Complaint feed** ([`feed`]): infinite-scroll pagination with an
//!   in-flight guard and background submitter enrichment
//! - **Editor** ([`editor`]): the add-note / change-status flow with local
//!   validation, wholesale reconciliation and stale-response guards
//! - **Views** ([`auth`], [`agencies`], [`users`], [`dashboard`]): thin state
//!   holders over the remaining REST endpoints
//!
//! # Example
//!
//! ```rust,ignore
//! use complaint_console::{Affordance, Console, ConsoleConfig};
//! use complaint_client::{ComplaintStatus, Session};
//!
//! let console = Console::new(ConsoleConfig::default(), Session::new())?;
//! console.login().sign_in("staff@example.com", "correct horse").await?;
//!
//! console.load_complaints(true).await?;
//! console.editor().begin_edit("c1", Affordance::ChangeStatus).await?;
//! console.editor().submit_status("c1", Some(ComplaintStatus::Resolved)).await?;
//! ```

pub mod agencies;
pub mod auth;
pub mod cli;
pub mod config;
pub mod console;
pub mod dashboard;
pub mod editor;
pub mod error;
pub mod feed;
pub mod gateway;
pub mod lock;
pub mod users;

pub use config::ConsoleConfig;
pub use console::Console;
pub use editor::{Affordance, ComplaintEditor, EditState};
pub use error::{ConsoleError, Result};
pub use feed::{ComplaintFeed, LoadOutcome, LoadReport, ScrollPosition, SubmitterDirectory};
pub use gateway::ComplaintGateway;
pub use lock::{LockCoordinator, LockEvent, LockGrant};
