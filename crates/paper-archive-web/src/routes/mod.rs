//! Route handlers for the gateway API.
//!
//! Handlers validate and translate; every credentialed call happens inside
//! the core archive. Errors map to status codes in `helpers`.

mod artifact;
mod documents;
mod history;
mod reading;

pub use artifact::get_artifact;
pub use documents::{delete_document, upload_document};
pub use history::get_history;
pub use reading::{close_reading, offset_for_page, open_reading, sync_position};
