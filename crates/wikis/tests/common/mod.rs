#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::Value;
use wikifeat_db::indexes::WikiIndex;
use wikifeat_db::models::{Comment, FileRecord, Page};
use wikifeat_db::store::{AttachmentData, IndexQuery, IndexResult, MultiDocRow, Reduce};
use wikifeat_db::{DocumentStore, MemoryStore, StoreError};
use wikifeat_wikis::{provision, WikiEngine};

pub const WIKI: &str = "test";
pub const WIKI_DB: &str = "wiki_test";

/// A memory store with the test wiki provisioned, plus an engine over it.
pub async fn setup() -> (Arc<MemoryStore>, WikiEngine<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    provision::create_wiki(store.as_ref(), WIKI)
        .await
        .expect("provision test wiki");
    let engine = WikiEngine::new(Arc::clone(&store));
    (store, engine)
}

pub fn page(title: &str, raw: &str) -> Page {
    Page::new(title, raw)
}

pub fn child_page(title: &str, parent: &str) -> Page {
    Page::new(title, format!("# {title}")).with_parent(parent)
}

pub fn comment(raw: &str) -> Comment {
    Comment::new(raw)
}

pub fn file(name: &str) -> FileRecord {
    FileRecord::new(name, format!("{name} description"))
}

// ---------------------------------------------------------------------------
// Fault injection
// ---------------------------------------------------------------------------

/// A [`MemoryStore`] that fails selected operations on demand.
#[derive(Default)]
pub struct FlakyStore {
    pub inner: MemoryStore,
    failing_updates: Mutex<HashSet<String>>,
    failing_deletes: Mutex<HashSet<String>>,
    fail_counts: AtomicBool,
    fail_rows: AtomicBool,
}

impl FlakyStore {
    /// Fail every write to an existing document `id`.
    pub fn fail_updates_of(&self, id: &str) {
        self.failing_updates.lock().unwrap().insert(id.to_string());
    }

    /// Fail every delete of document `id`.
    pub fn fail_deletes_of(&self, id: &str) {
        self.failing_deletes.lock().unwrap().insert(id.to_string());
    }

    /// Fail every reduced index query.
    pub fn fail_count_queries(&self, fail: bool) {
        self.fail_counts.store(fail, Ordering::SeqCst);
    }

    /// Fail every unreduced index query.
    pub fn fail_row_queries(&self, fail: bool) {
        self.fail_rows.store(fail, Ordering::SeqCst);
    }

    fn unavailable(reason: &str) -> StoreError {
        StoreError::Backend {
            status: 503,
            reason: reason.to_string(),
        }
    }
}

impl DocumentStore for FlakyStore {
    async fn put(
        &self,
        db: &str,
        id: &str,
        doc: &Value,
        rev: Option<&str>,
    ) -> Result<String, StoreError> {
        let failing = rev.is_some() && self.failing_updates.lock().unwrap().contains(id);
        if failing {
            return Err(Self::unavailable("write failed"));
        }
        self.inner.put(db, id, doc, rev).await
    }

    async fn get(&self, db: &str, id: &str) -> Result<(Value, String), StoreError> {
        self.inner.get(db, id).await
    }

    async fn delete(&self, db: &str, id: &str, rev: &str) -> Result<String, StoreError> {
        let failing = self.failing_deletes.lock().unwrap().contains(id);
        if failing {
            return Err(Self::unavailable("delete failed"));
        }
        self.inner.delete(db, id, rev).await
    }

    async fn copy(
        &self,
        db: &str,
        from_id: &str,
        from_rev: &str,
        to_id: &str,
    ) -> Result<String, StoreError> {
        self.inner.copy(db, from_id, from_rev, to_id).await
    }

    async fn query_index(
        &self,
        db: &str,
        index: WikiIndex,
        query: &IndexQuery,
    ) -> Result<IndexResult, StoreError> {
        let failing = match query.reduce {
            Reduce::None => &self.fail_rows,
            _ => &self.fail_counts,
        };
        if failing.load(Ordering::SeqCst) {
            return Err(Self::unavailable("query failed"));
        }
        self.inner.query_index(db, index, query).await
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
        self.inner
            .put_attachment(db, id, rev, name, content_type, data)
            .await
    }

    async fn get_attachment(
        &self,
        db: &str,
        id: &str,
        rev: Option<&str>,
        name: &str,
    ) -> Result<AttachmentData, StoreError> {
        self.inner.get_attachment(db, id, rev, name).await
    }

    async fn delete_attachment(
        &self,
        db: &str,
        id: &str,
        rev: &str,
        name: &str,
    ) -> Result<String, StoreError> {
        self.inner.delete_attachment(db, id, rev, name).await
    }

    async fn get_multiple(&self, db: &str, ids: &[String]) -> Result<Vec<MultiDocRow>, StoreError> {
        self.inner.get_multiple(db, ids).await
    }

    async fn create_database(&self, db: &str) -> Result<(), StoreError> {
        self.inner.create_database(db).await
    }

    async fn delete_database(&self, db: &str) -> Result<(), StoreError> {
        self.inner.delete_database(db).await
    }

    async fn install_indexes(&self, db: &str) -> Result<(), StoreError> {
        self.inner.install_indexes(db).await
    }
}

/// Like [`setup`], over a [`FlakyStore`] with no faults armed.
pub async fn flaky_setup() -> (Arc<FlakyStore>, WikiEngine<FlakyStore>) {
    let store = Arc::new(FlakyStore::default());
    provision::create_wiki(store.as_ref(), WIKI)
        .await
        .expect("provision test wiki");
    let engine = WikiEngine::new(Arc::clone(&store));
    (store, engine)
}
