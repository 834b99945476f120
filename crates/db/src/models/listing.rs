//! Projections returned by listing queries.

use serde::{Deserialize, Serialize};
use wikifeat_core::types::{timestamp_format, DocId, Timestamp};

/// Value emitted by the history index for one frozen copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub editor: String,
    /// Length of the raw content in UTF-16 code units.
    #[serde(rename = "contentSize")]
    pub content_size: u64,
    #[serde(rename = "documentId")]
    pub document_id: DocId,
    #[serde(rename = "documentRev")]
    pub document_rev: String,
}

/// One row of a page's history listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRow {
    /// Id of the history copy.
    pub id: DocId,
    /// When this version of the page was written.
    #[serde(with = "timestamp_format")]
    pub timestamp: Timestamp,
    #[serde(flatten)]
    pub entry: HistoryEntry,
}

/// Summary row of the page, child and descendant indexes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageIndexEntry {
    pub id: DocId,
    pub slug: String,
    pub title: String,
    pub owner: String,
    pub editor: String,
    #[serde(with = "timestamp_format")]
    pub timestamp: Timestamp,
}

/// One step of the navigation trail from the wiki root to a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breadcrumb {
    pub name: String,
    #[serde(rename = "pageId")]
    pub page_id: DocId,
    #[serde(rename = "wikiId")]
    pub wiki_id: String,
    /// Id of the crumb's parent page, empty at the root.
    pub parent: String,
}

/// A page of listing rows plus the total number of rows across all pages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paged<T> {
    #[serde(rename = "totalRows")]
    pub total_rows: usize,
    pub rows: Vec<T>,
}

impl<T> Paged<T> {
    pub fn new(total_rows: usize, rows: Vec<T>) -> Self {
        Self { total_rows, rows }
    }
}

impl<T> Default for Paged<T> {
    fn default() -> Self {
        Self::new(0, Vec::new())
    }
}
