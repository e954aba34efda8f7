//! Note and status transition flow for complaints

mod flow;
mod validation;

pub use flow::{Affordance, ComplaintEditor, EditState};
pub use validation::{validate_note, validate_status, MIN_NOTE_LEN};
