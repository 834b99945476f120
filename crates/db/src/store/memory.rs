//! Process-local [`DocumentStore`].
//!
//! Keeps every database in memory behind a [`tokio::sync::RwLock`] and
//! reproduces CouchDB's revision rules: a write to an existing document
//! must carry its current revision, a write that carries a revision for a
//! missing document is rejected, and copies need a free destination id.
//! Only the current revision of a document is retained, so copying or
//! reading an older revision fails.
//!
//! Index queries evaluate [`WikiIndex::emit`] over every document on each
//! call, which is fine for tests and small embedded wikis.

use std::collections::{BTreeMap, HashMap};

use serde_json::{json, Map, Value};
use tokio::sync::RwLock;
use wikifeat_core::hashing::attachment_digest;

use super::collation::compare_keys;
use super::{
    strip_meta, AttachmentData, DocumentStore, IndexQuery, IndexResult, IndexRow, MultiDocRow,
    Reduce, StoreError,
};
use crate::indexes::WikiIndex;

#[derive(Debug, Clone)]
struct StoredAttachment {
    content_type: String,
    data: Vec<u8>,
    digest: String,
    revpos: u64,
}

#[derive(Debug, Clone)]
struct StoredDoc {
    generation: u64,
    rev: String,
    body: Value,
    attachments: BTreeMap<String, StoredAttachment>,
}

impl StoredDoc {
    /// Body as returned to readers, with attachment stubs.
    fn public_body(&self) -> Value {
        let mut body = self.body.clone();
        if !self.attachments.is_empty() {
            let stubs: Map<String, Value> = self
                .attachments
                .iter()
                .map(|(name, att)| {
                    (
                        name.clone(),
                        json!({
                            "content_type": att.content_type,
                            "digest": att.digest,
                            "length": att.data.len(),
                            "revpos": att.revpos,
                            "stub": true,
                        }),
                    )
                })
                .collect();
            if let Some(obj) = body.as_object_mut() {
                obj.insert("_attachments".into(), Value::Object(stubs));
            }
        }
        body
    }

    fn bump(&mut self) -> String {
        self.generation += 1;
        self.rev = make_rev(self.generation);
        self.rev.clone()
    }
}

type Database = BTreeMap<String, StoredDoc>;

/// In-memory document store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    databases: RwLock<HashMap<String, Database>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents in a database (0 when it does not exist).
    pub async fn document_count(&self, db: &str) -> usize {
        self.databases
            .read()
            .await
            .get(db)
            .map(|docs| docs.len())
            .unwrap_or(0)
    }
}

fn make_rev(generation: u64) -> String {
    format!("{generation}-{}", uuid::Uuid::new_v4().simple())
}

fn missing_db(db: &str) -> StoreError {
    StoreError::NotFound(format!("database {db} does not exist"))
}

fn missing_doc(id: &str) -> StoreError {
    StoreError::NotFound(format!("document {id} is missing"))
}

fn check_rev(doc: &StoredDoc, rev: &str) -> Result<(), StoreError> {
    if doc.rev != rev {
        return Err(StoreError::Conflict(format!(
            "revision {rev} is not current"
        )));
    }
    Ok(())
}

/// Split a submitted body into the stored body and the names of the
/// attachments it keeps.
fn split_body(doc: &Value) -> Result<(Value, Option<Vec<String>>), StoreError> {
    let Some(obj) = doc.as_object() else {
        return Err(StoreError::Backend {
            status: 400,
            reason: "Document must be a JSON object".into(),
        });
    };
    let mut body = obj.clone();
    body.remove("_id");
    body.remove("_rev");
    let kept = body
        .remove("_attachments")
        .and_then(|atts| atts.as_object().map(|m| m.keys().cloned().collect()));
    Ok((Value::Object(body), kept))
}

impl DocumentStore for MemoryStore {
    async fn put(
        &self,
        db: &str,
        id: &str,
        doc: &Value,
        rev: Option<&str>,
    ) -> Result<String, StoreError> {
        let (body, kept) = split_body(doc)?;
        let mut dbs = self.databases.write().await;
        let docs = dbs.get_mut(db).ok_or_else(|| missing_db(db))?;

        match (docs.get_mut(id), rev) {
            (Some(existing), Some(rev)) => {
                check_rev(existing, rev)?;
                let kept = kept.unwrap_or_default();
                existing.attachments.retain(|name, _| kept.contains(name));
                existing.body = body;
                Ok(existing.bump())
            }
            (Some(_), None) => Err(StoreError::Conflict(format!(
                "document {id} already exists"
            ))),
            (None, Some(rev)) => Err(StoreError::Conflict(format!(
                "document {id} does not exist at revision {rev}"
            ))),
            (None, None) => {
                let stored = StoredDoc {
                    generation: 1,
                    rev: make_rev(1),
                    body,
                    attachments: BTreeMap::new(),
                };
                let rev = stored.rev.clone();
                docs.insert(id.to_string(), stored);
                Ok(rev)
            }
        }
    }

    async fn get(&self, db: &str, id: &str) -> Result<(Value, String), StoreError> {
        let dbs = self.databases.read().await;
        let docs = dbs.get(db).ok_or_else(|| missing_db(db))?;
        let doc = docs.get(id).ok_or_else(|| missing_doc(id))?;
        Ok((strip_meta(doc.public_body()), doc.rev.clone()))
    }

    async fn delete(&self, db: &str, id: &str, rev: &str) -> Result<String, StoreError> {
        let mut dbs = self.databases.write().await;
        let docs = dbs.get_mut(db).ok_or_else(|| missing_db(db))?;
        let doc = docs.get(id).ok_or_else(|| missing_doc(id))?;
        check_rev(doc, rev)?;
        let tombstone = make_rev(doc.generation + 1);
        docs.remove(id);
        Ok(tombstone)
    }

    async fn copy(
        &self,
        db: &str,
        from_id: &str,
        from_rev: &str,
        to_id: &str,
    ) -> Result<String, StoreError> {
        let mut dbs = self.databases.write().await;
        let docs = dbs.get_mut(db).ok_or_else(|| missing_db(db))?;
        let source = docs.get(from_id).ok_or_else(|| missing_doc(from_id))?;
        check_rev(source, from_rev)?;
        if docs.contains_key(to_id) {
            return Err(StoreError::Conflict(format!(
                "copy destination {to_id} already exists"
            )));
        }
        let copy = StoredDoc {
            generation: 1,
            rev: make_rev(1),
            body: source.body.clone(),
            attachments: source.attachments.clone(),
        };
        let rev = copy.rev.clone();
        docs.insert(to_id.to_string(), copy);
        Ok(rev)
    }

    async fn query_index(
        &self,
        db: &str,
        index: WikiIndex,
        query: &IndexQuery,
    ) -> Result<IndexResult, StoreError> {
        let dbs = self.databases.read().await;
        let docs = dbs.get(db).ok_or_else(|| missing_db(db))?;

        let mut rows: Vec<IndexRow> = docs
            .iter()
            .flat_map(|(id, doc)| {
                index
                    .emit(id, &doc.rev, &doc.public_body())
                    .into_iter()
                    .map(move |(key, value)| IndexRow {
                        id: Some(id.clone()),
                        key,
                        value,
                    })
            })
            .collect();
        let total_rows = rows.len();

        rows.sort_by(|a, b| compare_keys(&a.key, &b.key).then_with(|| a.id.cmp(&b.id)));
        if query.descending {
            rows.reverse();
        }
        rows.retain(|row| in_range(row, query));

        let rows = match query.reduce {
            Reduce::None => rows,
            Reduce::Count if rows.is_empty() => Vec::new(),
            Reduce::Count => vec![IndexRow {
                id: None,
                key: Value::Null,
                value: json!(rows.len()),
            }],
            Reduce::Grouped { level } => group_counts(rows, level),
        };

        let total_rows = match query.reduce {
            Reduce::None => total_rows,
            _ => rows.len(),
        };
        let rows = rows
            .into_iter()
            .skip(query.skip)
            .take(query.limit.unwrap_or(usize::MAX))
            .collect();

        Ok(IndexResult { total_rows, rows })
    }

    async fn put_attachment(
        &self,
        db: &str,
        id: &str,
        rev: &str,
        name: &str,
        content_type: &str,
        data: Vec<u8>,
    ) -> Result<String, StoreError> {
        let mut dbs = self.databases.write().await;
        let docs = dbs.get_mut(db).ok_or_else(|| missing_db(db))?;
        let doc = docs.get_mut(id).ok_or_else(|| missing_doc(id))?;
        check_rev(doc, rev)?;
        let new_rev = doc.bump();
        let attachment = StoredAttachment {
            content_type: content_type.to_string(),
            digest: attachment_digest(&data),
            data,
            revpos: doc.generation,
        };
        doc.attachments.insert(name.to_string(), attachment);
        Ok(new_rev)
    }

    async fn get_attachment(
        &self,
        db: &str,
        id: &str,
        rev: Option<&str>,
        name: &str,
    ) -> Result<AttachmentData, StoreError> {
        let dbs = self.databases.read().await;
        let docs = dbs.get(db).ok_or_else(|| missing_db(db))?;
        let doc = docs.get(id).ok_or_else(|| missing_doc(id))?;
        if rev.is_some_and(|rev| rev != doc.rev) {
            return Err(StoreError::NotFound(format!(
                "revision of {id} is no longer available"
            )));
        }
        let att = doc
            .attachments
            .get(name)
            .ok_or_else(|| StoreError::NotFound(format!("attachment {name} is missing")))?;
        Ok(AttachmentData {
            content_type: att.content_type.clone(),
            data: att.data.clone(),
        })
    }

    async fn delete_attachment(
        &self,
        db: &str,
        id: &str,
        rev: &str,
        name: &str,
    ) -> Result<String, StoreError> {
        let mut dbs = self.databases.write().await;
        let docs = dbs.get_mut(db).ok_or_else(|| missing_db(db))?;
        let doc = docs.get_mut(id).ok_or_else(|| missing_doc(id))?;
        check_rev(doc, rev)?;
        if doc.attachments.remove(name).is_none() {
            return Err(StoreError::NotFound(format!("attachment {name} is missing")));
        }
        Ok(doc.bump())
    }

    async fn get_multiple(&self, db: &str, ids: &[String]) -> Result<Vec<MultiDocRow>, StoreError> {
        let dbs = self.databases.read().await;
        let docs = dbs.get(db).ok_or_else(|| missing_db(db))?;
        Ok(ids
            .iter()
            .map(|id| match docs.get(id) {
                Some(doc) => MultiDocRow {
                    id: id.clone(),
                    rev: Some(doc.rev.clone()),
                    doc: Some(doc.public_body()),
                },
                None => MultiDocRow {
                    id: id.clone(),
                    rev: None,
                    doc: None,
                },
            })
            .collect())
    }

    async fn create_database(&self, db: &str) -> Result<(), StoreError> {
        let mut dbs = self.databases.write().await;
        if dbs.contains_key(db) {
            return Err(StoreError::Conflict(format!("database {db} already exists")));
        }
        dbs.insert(db.to_string(), Database::new());
        Ok(())
    }

    async fn delete_database(&self, db: &str) -> Result<(), StoreError> {
        self.databases
            .write()
            .await
            .remove(db)
            .map(|_| ())
            .ok_or_else(|| missing_db(db))
    }

    async fn install_indexes(&self, db: &str) -> Result<(), StoreError> {
        // Indexes are evaluated from `WikiIndex::emit`; only the database must exist.
        if self.databases.read().await.contains_key(db) {
            Ok(())
        } else {
            Err(missing_db(db))
        }
    }
}

fn in_range(row: &IndexRow, query: &IndexQuery) -> bool {
    use std::cmp::Ordering::{Greater, Less};

    if let Some(key) = &query.key {
        if compare_keys(&row.key, key).is_ne() {
            return false;
        }
    }
    let (below, above) = if query.descending {
        (Greater, Less)
    } else {
        (Less, Greater)
    };
    if let Some(start) = &query.start_key {
        if compare_keys(&row.key, start) == below {
            return false;
        }
    }
    if let Some(end) = &query.end_key {
        if compare_keys(&row.key, end) == above {
            return false;
        }
    }
    true
}

fn group_key(key: &Value, level: Option<usize>) -> Value {
    match (key, level) {
        (Value::Array(items), Some(level)) => {
            Value::Array(items.iter().take(level).cloned().collect())
        }
        _ => key.clone(),
    }
}

/// Collapse sorted rows into one count per group key.
fn group_counts(rows: Vec<IndexRow>, level: Option<usize>) -> Vec<IndexRow> {
    let mut grouped: Vec<IndexRow> = Vec::new();
    for row in rows {
        let key = group_key(&row.key, level);
        match grouped.last_mut() {
            Some(last) if compare_keys(&last.key, &key).is_eq() => {
                let count = last.value.as_u64().unwrap_or(0) + 1;
                last.value = json!(count);
            }
            _ => grouped.push(IndexRow {
                id: None,
                key,
                value: json!(1),
            }),
        }
    }
    grouped
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    const DB: &str = "wiki_test";

    async fn store() -> MemoryStore {
        let store = MemoryStore::new();
        store.create_database(DB).await.unwrap();
        store
    }

    fn page(id: &str, owning: &str, slug: &str, ts: &str) -> Value {
        json!({
            "type": "page", "title": id, "slug": slug, "owner": "joe",
            "editor": "joe", "timestamp": ts, "content": { "raw": "x" },
            "parent": null, "lineage": [id], "owning_page": owning,
        })
    }

    #[tokio::test]
    async fn put_requires_current_revision() {
        let store = store().await;
        let doc = json!({ "a": 1 });
        let rev = store.put(DB, "d", &doc, None).await.unwrap();
        assert!(rev.starts_with("1-"));

        assert_matches!(store.put(DB, "d", &doc, None).await, Err(StoreError::Conflict(_)));
        assert_matches!(
            store.put(DB, "d", &doc, Some("1-stale")).await,
            Err(StoreError::Conflict(_))
        );
        let rev2 = store.put(DB, "d", &json!({ "a": 2 }), Some(&rev)).await.unwrap();
        assert!(rev2.starts_with("2-"));

        let (body, current) = store.get(DB, "d").await.unwrap();
        assert_eq!(body["a"], 2);
        assert_eq!(current, rev2);
    }

    #[tokio::test]
    async fn put_with_revision_on_missing_document_conflicts() {
        let store = store().await;
        assert_matches!(
            store.put(DB, "nope", &json!({}), Some("1-x")).await,
            Err(StoreError::Conflict(_))
        );
    }

    #[tokio::test]
    async fn missing_database_is_not_found() {
        let store = MemoryStore::new();
        assert_matches!(store.get("other", "d").await, Err(StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn copy_duplicates_body_and_attachments() {
        let store = store().await;
        let rev = store.put(DB, "src", &json!({ "v": 1 }), None).await.unwrap();
        let rev = store
            .put_attachment(DB, "src", &rev, "a.txt", "text/plain", b"abc".to_vec())
            .await
            .unwrap();
        let copy_rev = store.copy(DB, "src", &rev, "dst").await.unwrap();
        assert!(copy_rev.starts_with("1-"));

        let (body, _) = store.get(DB, "dst").await.unwrap();
        assert_eq!(body["v"], 1);
        assert_eq!(body["_attachments"]["a.txt"]["length"], 3);

        assert_matches!(
            store.copy(DB, "src", &rev, "dst").await,
            Err(StoreError::Conflict(_))
        );
        assert_matches!(
            store.copy(DB, "src", "1-old", "dst2").await,
            Err(StoreError::Conflict(_))
        );
    }

    #[tokio::test]
    async fn put_without_attachment_stubs_drops_attachments() {
        let store = store().await;
        let rev = store.put(DB, "f", &json!({}), None).await.unwrap();
        let rev = store
            .put_attachment(DB, "f", &rev, "a", "text/plain", b"1".to_vec())
            .await
            .unwrap();
        let (body, _) = store.get(DB, "f").await.unwrap();
        let rev = store.put(DB, "f", &body, Some(&rev)).await.unwrap();
        assert!(store.get_attachment(DB, "f", None, "a").await.is_ok());

        store.put(DB, "f", &json!({}), Some(&rev)).await.unwrap();
        assert_matches!(
            store.get_attachment(DB, "f", None, "a").await,
            Err(StoreError::NotFound(_))
        );
    }

    #[tokio::test]
    async fn delete_checks_revision() {
        let store = store().await;
        let rev = store.put(DB, "d", &json!({}), None).await.unwrap();
        assert_matches!(store.delete(DB, "d", "9-x").await, Err(StoreError::Conflict(_)));
        store.delete(DB, "d", &rev).await.unwrap();
        assert_matches!(store.get(DB, "d").await, Err(StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn descending_range_with_grouped_count() {
        let store = store().await;
        store
            .put(DB, "p1", &page("p1", "p1", "one", "2024-01-01T00:00:00.000000Z"), None)
            .await
            .unwrap();
        for (i, ts) in ["2024-01-02T00:00:00.000000Z", "2024-01-03T00:00:00.000000Z"]
            .iter()
            .enumerate()
        {
            store
                .put(DB, &format!("h{i}"), &page("h", "p1", "", ts), None)
                .await
                .unwrap();
        }
        store
            .put(DB, "other", &page("x", "p2", "", "2024-01-04T00:00:00.000000Z"), None)
            .await
            .unwrap();

        let range = IndexQuery::new()
            .range(json!(["p1", {}]), json!(["p1"]))
            .descending();
        let rows = store
            .query_index(DB, WikiIndex::History, &range)
            .await
            .unwrap();
        assert_eq!(rows.total_rows, 3, "total_rows covers the whole index");
        assert_eq!(rows.rows.len(), 2);
        assert_eq!(rows.rows[0].id.as_deref(), Some("h1"));
        assert_eq!(rows.rows[1].id.as_deref(), Some("h0"));

        let count = store
            .query_index(
                DB,
                WikiIndex::History,
                &range.clone().reduce(Reduce::Grouped { level: Some(1) }),
            )
            .await
            .unwrap();
        assert_eq!(count.first_count(), 2);
        assert_eq!(count.rows[0].key, json!(["p1"]));

        let paged = store
            .query_index(DB, WikiIndex::History, &range.skip(1).limit(Some(1)))
            .await
            .unwrap();
        assert_eq!(paged.rows.len(), 1);
        assert_eq!(paged.rows[0].id.as_deref(), Some("h0"));
    }

    #[tokio::test]
    async fn exact_key_count() {
        let store = store().await;
        let ts = "2024-01-01T00:00:00.000000Z";
        store.put(DB, "a", &page("a", "a", "same", ts), None).await.unwrap();
        store.put(DB, "b", &page("b", "b", "same", ts), None).await.unwrap();
        store.put(DB, "c", &page("c", "c", "other", ts), None).await.unwrap();

        let result = store
            .query_index(
                DB,
                WikiIndex::SlugCount,
                &IndexQuery::new().key("same").reduce(Reduce::Grouped { level: None }),
            )
            .await
            .unwrap();
        assert_eq!(result.first_count(), 2);

        let none = store
            .query_index(
                DB,
                WikiIndex::SlugCount,
                &IndexQuery::new().key("missing").reduce(Reduce::Count),
            )
            .await
            .unwrap();
        assert!(none.rows.is_empty());
        assert_eq!(none.first_count(), 0);
    }

    #[tokio::test]
    async fn get_multiple_preserves_order_and_marks_missing() {
        let store = store().await;
        store.put(DB, "a", &json!({ "n": 1 }), None).await.unwrap();
        store.put(DB, "b", &json!({ "n": 2 }), None).await.unwrap();
        let rows = store
            .get_multiple(DB, &["b".to_string(), "zz".to_string(), "a".to_string()])
            .await
            .unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].doc.as_ref().unwrap()["n"], 2);
        assert!(rows[1].doc.is_none());
        assert_eq!(rows[2].id, "a");
    }

    #[tokio::test]
    async fn attachment_round_trip_and_digest() {
        let store = store().await;
        let rev = store.put(DB, "f", &json!({ "type": "file" }), None).await.unwrap();
        let rev2 = store
            .put_attachment(DB, "f", &rev, "pic.png", "image/png", vec![1, 2, 3])
            .await
            .unwrap();
        assert_matches!(
            store
                .put_attachment(DB, "f", &rev, "pic.png", "image/png", vec![])
                .await,
            Err(StoreError::Conflict(_))
        );

        let att = store.get_attachment(DB, "f", Some(&rev2), "pic.png").await.unwrap();
        assert_eq!(att.content_type, "image/png");
        assert_eq!(att.data, vec![1, 2, 3]);

        let (body, _) = store.get(DB, "f").await.unwrap();
        assert_eq!(
            body["_attachments"]["pic.png"]["digest"],
            attachment_digest(&[1, 2, 3])
        );

        let rev3 = store.delete_attachment(DB, "f", &rev2, "pic.png").await.unwrap();
        assert!(rev3.starts_with("3-"));
        assert_matches!(
            store.get_attachment(DB, "f", None, "pic.png").await,
            Err(StoreError::NotFound(_))
        );
    }

    #[tokio::test]
    async fn database_lifecycle() {
        let store = MemoryStore::new();
        store.create_database(DB).await.unwrap();
        assert_matches!(store.create_database(DB).await, Err(StoreError::Conflict(_)));
        store.install_indexes(DB).await.unwrap();
        store.delete_database(DB).await.unwrap();
        assert_matches!(store.install_indexes(DB).await, Err(StoreError::NotFound(_)));
    }
}
