//! Secondary indexes carried by every wiki database.
//!
//! Each index exists twice: as a JavaScript map function installed in a
//! CouchDB design document, and as [`WikiIndex::emit`], the same projection
//! written in Rust for [`MemoryStore`](crate::store::MemoryStore). The two
//! must stay in step. Every index reduces with `_count`.

use serde_json::{json, Map, Value};
use wikifeat_core::wiki::{DOC_TYPE_COMMENT, DOC_TYPE_FILE, DOC_TYPE_PAGE};

/// Design document holding the page and file indexes.
pub const DESIGN_DOC_WIKIT: &str = "wikit";

/// Design document holding the comment indexes.
pub const DESIGN_DOC_COMMENTS: &str = "wikit_comments";

/// The secondary indexes of a wiki database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WikiIndex {
    /// Frozen history copies keyed by `[owning_page, timestamp]`.
    History,
    /// Current pages keyed by title.
    PageIndex,
    /// Current pages keyed by parent page id.
    ChildPageIndex,
    /// Current pages keyed by `[ancestor_id, lineage]`, one row per ancestor.
    Descendants,
    /// Current pages keyed by slug.
    PageBySlug,
    /// Every page document keyed by slug, for uniqueness counting.
    SlugCount,
    /// File records keyed by name.
    FileIndex,
    /// File records with an image attachment, keyed by name.
    ImageFileIndex,
    /// Comments keyed by `[owning_page, created_time]`.
    CommentsForPage,
}

impl WikiIndex {
    pub const ALL: [WikiIndex; 9] = [
        WikiIndex::History,
        WikiIndex::PageIndex,
        WikiIndex::ChildPageIndex,
        WikiIndex::Descendants,
        WikiIndex::PageBySlug,
        WikiIndex::SlugCount,
        WikiIndex::FileIndex,
        WikiIndex::ImageFileIndex,
        WikiIndex::CommentsForPage,
    ];

    pub fn design_doc(self) -> &'static str {
        match self {
            WikiIndex::CommentsForPage => DESIGN_DOC_COMMENTS,
            _ => DESIGN_DOC_WIKIT,
        }
    }

    pub fn view_name(self) -> &'static str {
        match self {
            WikiIndex::History => "getHistory",
            WikiIndex::PageIndex => "getIndex",
            WikiIndex::ChildPageIndex => "getChildPageIndex",
            WikiIndex::Descendants => "getDescendants",
            WikiIndex::PageBySlug => "getPageBySlug",
            WikiIndex::SlugCount => "checkUniqueSlug",
            WikiIndex::FileIndex => "getFileIndex",
            WikiIndex::ImageFileIndex => "getImageFileIndex",
            WikiIndex::CommentsForPage => "getCommentsForPage",
        }
    }

    /// JavaScript map function for the CouchDB view.
    pub fn map_source(self) -> &'static str {
        match self {
            WikiIndex::History => {
                r#"function(doc) {
  if (doc.type === "page" && doc._id !== doc.owning_page) {
    emit([doc.owning_page, doc.timestamp], {
      documentId: doc._id,
      documentRev: doc._rev,
      editor: doc.editor,
      contentSize: doc.content.raw.length
    });
  }
}"#
            }
            WikiIndex::PageIndex => {
                r#"function(doc) {
  if (doc.type === "page" && doc._id === doc.owning_page) {
    emit(doc.title, {id: doc._id, slug: doc.slug, title: doc.title,
      owner: doc.owner, editor: doc.editor, timestamp: doc.timestamp});
  }
}"#
            }
            WikiIndex::ChildPageIndex => {
                r#"function(doc) {
  if (doc.type === "page" && doc._id === doc.owning_page) {
    emit(doc.parent, {id: doc._id, slug: doc.slug, title: doc.title,
      owner: doc.owner, editor: doc.editor, timestamp: doc.timestamp});
  }
}"#
            }
            WikiIndex::Descendants => {
                r#"function(doc) {
  if (doc.type === "page" && doc._id === doc.owning_page) {
    for (var i in doc.lineage) {
      emit([doc.lineage[i], doc.lineage], {id: doc._id, slug: doc.slug,
        title: doc.title, owner: doc.owner, editor: doc.editor,
        timestamp: doc.timestamp});
    }
  }
}"#
            }
            WikiIndex::PageBySlug => {
                r#"function(doc) {
  if (doc.type === "page" && doc._id === doc.owning_page) {
    emit(doc.slug, {pageRev: doc._rev, page: doc});
  }
}"#
            }
            WikiIndex::SlugCount => {
                r#"function(doc) {
  if (doc.type === "page") {
    emit(doc.slug, 1);
  }
}"#
            }
            WikiIndex::FileIndex => {
                r#"function(doc) {
  if (doc.type === "file") {
    emit(doc.name, doc);
  }
}"#
            }
            WikiIndex::ImageFileIndex => {
                r#"function(doc) {
  if (doc.type === "file" && doc._attachments) {
    for (var name in doc._attachments) {
      var ct = doc._attachments[name].content_type || "";
      if (ct.substring(0, 6) === "image/") {
        emit(doc.name, doc);
        return;
      }
    }
  }
}"#
            }
            WikiIndex::CommentsForPage => {
                r#"function(doc) {
  if (doc.type === "comment") {
    emit([doc.owning_page, doc.created_time], doc);
  }
}"#
            }
        }
    }

    /// Rows this index emits for one document, as `(key, value)` pairs.
    ///
    /// `doc` is the stored body (without `_id`/`_rev`); `id` and `rev` are
    /// the document's id and current revision.
    pub fn emit(self, id: &str, rev: &str, doc: &Value) -> Vec<(Value, Value)> {
        let doc_type = str_field(doc, "type");
        let owning_page = str_field(doc, "owning_page");
        let is_page = doc_type == DOC_TYPE_PAGE;
        let is_current_page = is_page && owning_page == id;

        match self {
            WikiIndex::History if is_page && owning_page != id => {
                let raw = doc
                    .get("content")
                    .and_then(|c| c.get("raw"))
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                vec![(
                    json!([owning_page, field(doc, "timestamp")]),
                    json!({
                        "documentId": id,
                        "documentRev": rev,
                        "editor": field(doc, "editor"),
                        // JavaScript string length counts UTF-16 units.
                        "contentSize": raw.encode_utf16().count(),
                    }),
                )]
            }
            WikiIndex::PageIndex if is_current_page => {
                vec![(field(doc, "title"), index_entry(id, doc))]
            }
            WikiIndex::ChildPageIndex if is_current_page => {
                vec![(field(doc, "parent"), index_entry(id, doc))]
            }
            WikiIndex::Descendants if is_current_page => {
                let lineage = field(doc, "lineage");
                lineage
                    .as_array()
                    .map(|ancestors| {
                        ancestors
                            .iter()
                            .map(|a| (json!([a, lineage]), index_entry(id, doc)))
                            .collect()
                    })
                    .unwrap_or_default()
            }
            WikiIndex::PageBySlug if is_current_page => {
                vec![(
                    field(doc, "slug"),
                    json!({ "pageRev": rev, "page": doc }),
                )]
            }
            WikiIndex::SlugCount if is_page => vec![(field(doc, "slug"), json!(1))],
            WikiIndex::FileIndex if doc_type == DOC_TYPE_FILE => {
                vec![(field(doc, "name"), doc.clone())]
            }
            WikiIndex::ImageFileIndex if doc_type == DOC_TYPE_FILE && has_image(doc) => {
                vec![(field(doc, "name"), doc.clone())]
            }
            WikiIndex::CommentsForPage if doc_type == DOC_TYPE_COMMENT => {
                vec![(
                    json!([owning_page, field(doc, "created_time")]),
                    doc.clone(),
                )]
            }
            _ => Vec::new(),
        }
    }
}

/// Design documents (name without the `_design/` prefix, body) to install.
pub fn design_documents() -> Vec<(&'static str, Value)> {
    [DESIGN_DOC_WIKIT, DESIGN_DOC_COMMENTS]
        .into_iter()
        .map(|ddoc| {
            let views: Map<String, Value> = WikiIndex::ALL
                .iter()
                .filter(|index| index.design_doc() == ddoc)
                .map(|index| {
                    (
                        index.view_name().to_string(),
                        json!({ "map": index.map_source(), "reduce": "_count" }),
                    )
                })
                .collect();
            (ddoc, json!({ "language": "javascript", "views": views }))
        })
        .collect()
}

// ---- private helpers ----

fn field(doc: &Value, name: &str) -> Value {
    doc.get(name).cloned().unwrap_or(Value::Null)
}

fn str_field<'a>(doc: &'a Value, name: &str) -> &'a str {
    doc.get(name).and_then(Value::as_str).unwrap_or_default()
}

fn index_entry(id: &str, doc: &Value) -> Value {
    json!({
        "id": id,
        "slug": field(doc, "slug"),
        "title": field(doc, "title"),
        "owner": field(doc, "owner"),
        "editor": field(doc, "editor"),
        "timestamp": field(doc, "timestamp"),
    })
}

fn has_image(doc: &Value) -> bool {
    doc.get("_attachments")
        .and_then(Value::as_object)
        .map(|atts| {
            atts.values().any(|att| {
                att.get("content_type")
                    .and_then(Value::as_str)
                    .is_some_and(|ct| ct.starts_with("image/"))
            })
        })
        .unwrap_or(false)
}
