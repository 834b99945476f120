//! Wiki page documents.

use serde::{Deserialize, Serialize};
use wikifeat_core::error::CoreError;
use wikifeat_core::types::{timestamp_format, DocId, Timestamp};
use wikifeat_core::wiki::{
    validate_authorship, validate_doc_type, validate_owning_page, validate_title, DOC_TYPE_PAGE,
};

/// Page body: the author's markup and its rendered, sanitized HTML.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageContent {
    #[serde(default)]
    pub raw: String,
    #[serde(default)]
    pub formatted: String,
}

impl PageContent {
    pub fn new(raw: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            formatted: String::new(),
        }
    }
}

/// A page document, either the current version (`id == owning_page`) or a
/// frozen history copy (`id != owning_page`, empty slug).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// Filled from the document id on read.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: DocId,
    #[serde(default)]
    pub slug: String,
    #[serde(rename = "type", default = "page_type")]
    pub doc_type: String,
    pub title: String,
    #[serde(default)]
    pub owner: String,
    #[serde(rename = "editor", default)]
    pub last_editor: String,
    #[serde(with = "timestamp_format", default = "chrono::Utc::now")]
    pub timestamp: Timestamp,
    #[serde(default)]
    pub content: PageContent,
    #[serde(default)]
    pub parent: Option<DocId>,
    #[serde(default)]
    pub lineage: Vec<DocId>,
    #[serde(default)]
    pub owning_page: DocId,
    #[serde(default)]
    pub comments_disabled: bool,
    #[serde(
        rename = "fileAttachments",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub file_attachments: Vec<DocId>,
}

fn page_type() -> String {
    DOC_TYPE_PAGE.to_string()
}

impl Page {
    /// A new, unsaved page with the given title and raw markup.
    pub fn new(title: impl Into<String>, raw: impl Into<String>) -> Self {
        Self {
            id: DocId::new(),
            slug: String::new(),
            doc_type: page_type(),
            title: title.into(),
            owner: String::new(),
            last_editor: String::new(),
            timestamp: chrono::Utc::now(),
            content: PageContent::new(raw),
            parent: None,
            lineage: Vec::new(),
            owning_page: DocId::new(),
            comments_disabled: false,
            file_attachments: Vec::new(),
        }
    }

    /// Place the page under `parent`.
    pub fn with_parent(mut self, parent: impl Into<DocId>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Parent id, treating an empty string as no parent.
    pub fn parent_id(&self) -> Option<&str> {
        self.parent.as_deref().filter(|p| !p.is_empty())
    }

    /// A history copy is any page document that is not the addressable version.
    pub fn is_history(&self) -> bool {
        !self.id.is_empty() && self.id != self.owning_page
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        validate_doc_type(&self.doc_type, DOC_TYPE_PAGE)?;
        validate_title(&self.title)?;
        validate_authorship(&self.owner, &self.last_editor)?;
        validate_owning_page(&self.owning_page)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    fn valid_page() -> Page {
        let mut page = Page::new("Home", "# Home");
        page.owner = "joe".into();
        page.last_editor = "joe".into();
        page.owning_page = "p1".into();
        page
    }

    #[test]
    fn valid_page_passes() {
        assert!(valid_page().validate().is_ok());
    }

    #[test]
    fn rejects_wrong_type() {
        let mut page = valid_page();
        page.doc_type = "comment".into();
        assert_matches!(page.validate(), Err(CoreError::Validation(_)));
    }

    #[test]
    fn rejects_missing_editor() {
        let mut page = valid_page();
        page.last_editor.clear();
        assert_matches!(page.validate(), Err(CoreError::Validation(msg)) if msg.contains("editor"));
    }

    #[test]
    fn rejects_missing_owning_page() {
        let mut page = valid_page();
        page.owning_page.clear();
        assert_matches!(page.validate(), Err(CoreError::Validation(_)));
    }

    #[test]
    fn wire_field_names() {
        let mut page = valid_page();
        page.file_attachments = vec!["f1".into()];
        let value = serde_json::to_value(&page).unwrap();
        assert_eq!(value["type"], "page");
        assert_eq!(value["editor"], "joe");
        assert_eq!(value["owning_page"], "p1");
        assert_eq!(value["comments_disabled"], false);
        assert_eq!(value["fileAttachments"], json!(["f1"]));
        assert!(value.get("id").is_none());
    }

    #[test]
    fn deserializes_minimal_document() {
        let page: Page = serde_json::from_value(json!({
            "title": "T",
            "timestamp": "2024-05-01T10:00:00.000000Z",
            "parent": "",
        }))
        .unwrap();
        assert_eq!(page.doc_type, "page");
        assert_eq!(page.parent_id(), None);
        assert!(page.lineage.is_empty());
    }

    #[test]
    fn history_detection() {
        let mut page = valid_page();
        page.id = "p1".into();
        assert!(!page.is_history());
        page.id = "copy".into();
        assert!(page.is_history());
    }
}
