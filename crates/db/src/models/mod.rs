//! Document models and listing projections.
//!
//! Each submodule contains:
//! - A `Serialize` + `Deserialize` document struct matching the stored JSON
//! - The projection types returned by the secondary indexes over it

pub mod comment;
pub mod file;
pub mod listing;
pub mod page;

pub use comment::Comment;
pub use file::{AttachmentInfo, FileRecord};
pub use listing::{Breadcrumb, HistoryEntry, HistoryRow, PageIndexEntry, Paged};
pub use page::{Page, PageContent};
