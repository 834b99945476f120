//! File record documents. The binary content lives in attachments on the
//! record itself.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use wikifeat_core::error::CoreError;
use wikifeat_core::types::{timestamp_format, DocId, Timestamp};
use wikifeat_core::wiki::{validate_doc_type, validate_file_name, DOC_TYPE_FILE};

/// Attachment metadata as reported by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentInfo {
    pub content_type: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub digest: String,
    #[serde(default)]
    pub length: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revpos: Option<u64>,
    #[serde(default)]
    pub stub: bool,
}

impl AttachmentInfo {
    pub fn is_image(&self) -> bool {
        self.content_type.starts_with("image/")
    }
}

/// Metadata document for an uploaded file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: DocId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "uploadedBy", default)]
    pub uploaded_by: String,
    #[serde(with = "timestamp_format", default = "chrono::Utc::now")]
    pub timestamp: Timestamp,
    #[serde(rename = "type", default = "file_type")]
    pub doc_type: String,
    #[serde(
        rename = "_attachments",
        default,
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub attachments: BTreeMap<String, AttachmentInfo>,
}

fn file_type() -> String {
    DOC_TYPE_FILE.to_string()
}

impl FileRecord {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: DocId::new(),
            name: name.into(),
            description: description.into(),
            uploaded_by: String::new(),
            timestamp: chrono::Utc::now(),
            doc_type: file_type(),
            attachments: BTreeMap::new(),
        }
    }

    pub fn has_image(&self) -> bool {
        self.attachments.values().any(AttachmentInfo::is_image)
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        validate_doc_type(&self.doc_type, DOC_TYPE_FILE)?;
        validate_file_name(&self.name)?;
        Ok(())
    }

    /// Mark every attachment as a stub so a metadata write keeps the
    /// stored content.
    pub fn keep_attachments(&mut self, stored: BTreeMap<String, AttachmentInfo>) {
        self.attachments = stored
            .into_iter()
            .map(|(name, info)| (name, AttachmentInfo { stub: true, ..info }))
            .collect();
    }
}
