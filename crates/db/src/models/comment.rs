//! Page comment documents.

use serde::{Deserialize, Serialize};
use wikifeat_core::error::CoreError;
use wikifeat_core::types::{timestamp_format, DocId, Timestamp};
use wikifeat_core::wiki::{validate_author, validate_doc_type, validate_owning_page, DOC_TYPE_COMMENT};

use super::page::PageContent;

/// A comment attached to a page. Comments are edited in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: DocId,
    #[serde(rename = "type", default = "comment_type")]
    pub doc_type: String,
    #[serde(default)]
    pub owning_page: DocId,
    /// Comment this one replies to, for threading.
    #[serde(default)]
    pub parent_comment: Option<DocId>,
    #[serde(default)]
    pub author: String,
    #[serde(with = "timestamp_format", default = "chrono::Utc::now")]
    pub created_time: Timestamp,
    #[serde(with = "timestamp_format", default = "chrono::Utc::now")]
    pub modified_time: Timestamp,
    #[serde(default)]
    pub content: PageContent,
    #[serde(default)]
    pub deleted: bool,
}

fn comment_type() -> String {
    DOC_TYPE_COMMENT.to_string()
}

impl Comment {
    pub fn new(raw: impl Into<String>) -> Self {
        let now = chrono::Utc::now();
        Self {
            id: DocId::new(),
            doc_type: comment_type(),
            owning_page: DocId::new(),
            parent_comment: None,
            author: String::new(),
            created_time: now,
            modified_time: now,
            content: PageContent::new(raw),
            deleted: false,
        }
    }

    pub fn in_reply_to(mut self, parent: impl Into<DocId>) -> Self {
        self.parent_comment = Some(parent.into());
        self
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        validate_doc_type(&self.doc_type, DOC_TYPE_COMMENT)?;
        validate_author(&self.author)?;
        validate_owning_page(&self.owning_page)?;
        Ok(())
    }
}
