//! Advisory edit locks for complaints
//!
//! Locks are a client-side TTL cache over the server's checkout flag; they
//! are never assumed to agree with the server.

mod coordinator;

pub use coordinator::{LockCoordinator, LockEvent, LockGrant, DEFAULT_LOCK_TTL};
