//! Paginated complaint list with background submitter enrichment

mod controller;
mod scroll;
mod submitters;
mod window;

pub use controller::{ComplaintFeed, FeedSnapshot, LoadOutcome, LoadReport, DEFAULT_PAGE_SIZE};
pub use scroll::{ScrollPosition, ScrollTrigger, DEFAULT_SCROLL_THRESHOLD};
pub use submitters::{missing_submitters, EnrichmentHandle, EnrichmentReport, SubmitterDirectory};
pub use window::PageWindow;
