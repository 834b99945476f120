//! Page lifecycle: create, update, delete and reads.
//!
//! Every edit freezes the pre-edit document as a history copy (a fresh id,
//! the same `owning_page`, an empty slug) before the current document is
//! overwritten. Slug uniqueness is enforced after each write; on a
//! duplicate the steps already taken are undone in reverse order before the
//! conflict is returned.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tokio_util::task::TaskTracker;
use wikifeat_core::content::render_and_sanitize;
use wikifeat_core::pagination::Pagination;
use wikifeat_core::types::new_doc_id;
use wikifeat_core::wiki::{generate_slug, validate_slug, wiki_db_name, DOC_TYPE_PAGE};
use wikifeat_db::indexes::WikiIndex;
use wikifeat_db::models::{Breadcrumb, Page};
use wikifeat_db::store::IndexQuery;
use wikifeat_db::DocumentStore;

use crate::cleanup::{spawn_history_deletes, StaleCopy};
use crate::error::{NotFoundExt, WikiError, WikiResult};
use crate::lineage::get_lineage;
use crate::queries::QueryEngine;
use crate::uniqueness::check_for_duplicate_slug;

/// Creates, edits and deletes wiki pages.
pub struct PageManager<S> {
    store: Arc<S>,
    queries: QueryEngine<S>,
    cleanup: TaskTracker,
}

impl<S: DocumentStore> PageManager<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            queries: QueryEngine::new(Arc::clone(&store)),
            store,
            cleanup: TaskTracker::new(),
        }
    }

    /// Create the page when `rev` is empty, otherwise update it.
    pub async fn save(
        &self,
        wiki: &str,
        page: Page,
        id: &str,
        rev: &str,
        editor: &str,
    ) -> WikiResult<String> {
        if rev.is_empty() {
            self.create(wiki, page, id, editor).await
        } else {
            self.update(wiki, page, id, rev, editor).await
        }
    }

    /// Create a new page at `id`, returning its first revision.
    pub async fn create(
        &self,
        wiki: &str,
        mut page: Page,
        id: &str,
        editor: &str,
    ) -> WikiResult<String> {
        let db = wiki_db_name(wiki);

        page.owner = editor.to_string();
        self.prepare(&db, &mut page, id, editor).await?;

        let rev = self.store.put(&db, id, &to_body(&page)?, None).await?;

        if let Err(e) = check_for_duplicate_slug(self.store.as_ref(), &db, &page.slug).await {
            tracing::warn!(db = %db, page_id = id, slug = %page.slug, "Rolling back page create");
            self.discard(&db, id, &rev).await;
            return Err(e);
        }

        tracing::info!(db = %db, page_id = id, slug = %page.slug, editor, "Page created");
        Ok(rev)
    }

    /// Update the current page at `id`.
    ///
    /// `rev` must be the page's current revision. The pre-edit document is
    /// kept as a history copy. The owner never changes.
    pub async fn update(
        &self,
        wiki: &str,
        mut page: Page,
        id: &str,
        rev: &str,
        editor: &str,
    ) -> WikiResult<String> {
        let db = wiki_db_name(wiki);

        let (original_body, _) = self.store.get(&db, id).await.or_not_found("page", id)?;
        let mut original: Page = serde_json::from_value(original_body.clone())?;
        original.id = id.to_string();
        if original.is_history() {
            return Err(WikiError::validation("History entries cannot be edited"));
        }

        page.owner = original.owner.clone();
        self.prepare(&db, &mut page, id, editor).await?;

        // Freeze the pre-edit state. Copying at the caller's revision makes a
        // stale token fail here, before anything is written.
        let copy_id = new_doc_id();
        let copy_rev = self.store.copy(&db, id, rev, &copy_id).await?;
        let copy_rev = match self.clear_copy_slug(&db, &copy_id, &copy_rev).await {
            Ok(copy_rev) => copy_rev,
            Err(e) => {
                self.discard(&db, &copy_id, &copy_rev).await;
                return Err(e);
            }
        };

        let new_rev = match self.store.put(&db, id, &to_body(&page)?, Some(rev)).await {
            Ok(new_rev) => new_rev,
            Err(e) => {
                self.discard(&db, &copy_id, &copy_rev).await;
                return Err(e.into());
            }
        };

        if let Err(e) = check_for_duplicate_slug(self.store.as_ref(), &db, &page.slug).await {
            tracing::warn!(
                db = %db,
                page_id = id,
                slug = %page.slug,
                "Rolling back page update"
            );
            self.discard(&db, &copy_id, &copy_rev).await;
            if let Err(restore) = self.store.put(&db, id, &original_body, Some(&new_rev)).await {
                tracing::error!(error = %restore, db = %db, page_id = id, "Failed to restore page");
            }
            return Err(e);
        }

        tracing::info!(
            db = %db,
            page_id = id,
            history_id = %copy_id,
            slug = %page.slug,
            editor,
            "Page updated"
        );
        Ok(new_rev)
    }

    /// Read a page document (current or history) with its revision.
    pub async fn read(&self, wiki: &str, id: &str) -> WikiResult<(Page, String)> {
        let db = wiki_db_name(wiki);
        let (body, rev) = self.store.get(&db, id).await.or_not_found("page", id)?;
        let mut page: Page = serde_json::from_value(body)?;
        page.id = id.to_string();
        Ok((page, rev))
    }

    /// Resolve the current page carrying `slug`.
    pub async fn read_by_slug(&self, wiki: &str, slug: &str) -> WikiResult<(Page, String)> {
        let db = wiki_db_name(wiki);
        let query = IndexQuery::new().key(slug).limit(Some(1));
        let result = self
            .store
            .query_index(&db, WikiIndex::PageBySlug, &query)
            .await?;
        let row = result
            .rows
            .into_iter()
            .next()
            .ok_or_else(|| WikiError::not_found("page", slug))?;

        let rev = row
            .value
            .get("pageRev")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let mut page: Page =
            serde_json::from_value(row.value.get("page").cloned().unwrap_or(Value::Null))?;
        if let Some(id) = row.id {
            page.id = id;
        }
        Ok((page, rev))
    }

    /// Read several pages in one round trip. Missing ids are skipped.
    pub async fn read_multiple(&self, wiki: &str, ids: &[String]) -> WikiResult<Vec<Page>> {
        let db = wiki_db_name(wiki);
        let rows = self.store.get_multiple(&db, ids).await?;
        rows.into_iter()
            .filter_map(|row| row.doc.map(|doc| (row.id, doc)))
            .map(|(id, doc)| -> WikiResult<Page> {
                let mut page: Page = serde_json::from_value(doc)?;
                page.id = id;
                Ok(page)
            })
            .collect()
    }

    /// Delete the current page at `id` and, in the background, its history.
    pub async fn delete(&self, wiki: &str, id: &str, rev: &str) -> WikiResult<String> {
        let db = wiki_db_name(wiki);

        let (page, _) = self.read(wiki, id).await?;
        if page.is_history() {
            return Err(WikiError::validation("History entries cannot be deleted"));
        }

        let history = self
            .queries
            .history(wiki, id, Pagination::unbounded())
            .await?;

        let deleted_rev = self.store.delete(&db, id, rev).await?;

        let copies: Vec<StaleCopy> = history
            .rows
            .into_iter()
            .map(|row| StaleCopy {
                id: row.entry.document_id,
                rev: row.entry.document_rev,
            })
            .collect();
        tracing::info!(
            db = %db,
            page_id = id,
            history_copies = copies.len(),
            "Page deleted"
        );
        spawn_history_deletes(&self.cleanup, &self.store, &db, copies);

        Ok(deleted_rev)
    }

    /// Navigation trail from the wiki root down to `page_id`.
    pub async fn breadcrumbs(&self, wiki: &str, page_id: &str) -> WikiResult<Vec<Breadcrumb>> {
        let (page, _) = self.read(wiki, page_id).await?;

        let ancestor_ids = page
            .lineage
            .split_last()
            .map(|(_, ancestors)| ancestors.to_vec())
            .unwrap_or_default();
        let mut trail = if ancestor_ids.is_empty() {
            Vec::new()
        } else {
            self.read_multiple(wiki, &ancestor_ids).await?
        };
        trail.push(page);

        Ok(trail
            .into_iter()
            .map(|p| {
                let parent = match p.lineage.len() {
                    n if n >= 2 => p.lineage[n - 2].clone(),
                    _ => String::new(),
                };
                Breadcrumb {
                    name: p.title,
                    page_id: p.id,
                    wiki_id: wiki.to_string(),
                    parent,
                }
            })
            .collect())
    }

    /// Wait until every spawned history delete has finished.
    ///
    /// Takes `&mut self` so no other call can reopen the tracker while
    /// this one is still waiting on it.
    pub async fn wait_for_cleanup(&mut self) {
        self.cleanup.close();
        self.cleanup.wait().await;
        self.cleanup.reopen();
    }

    // ---- private helpers ----

    /// Fill the derived fields of a page about to be written as the current
    /// version of `id`, then validate it.
    async fn prepare(&self, db: &str, page: &mut Page, id: &str, editor: &str) -> WikiResult<()> {
        page.id = id.to_string();
        page.doc_type = DOC_TYPE_PAGE.to_string();
        page.owning_page = id.to_string();
        page.last_editor = editor.to_string();
        page.slug = generate_slug(&page.title);
        page.timestamp = Utc::now();
        page.content.formatted = render_and_sanitize(&page.content.raw);

        page.validate()?;
        validate_slug(&page.slug)?;

        page.lineage = get_lineage(self.store.as_ref(), db, id, page.parent_id()).await?;
        Ok(())
    }

    /// Blank the slug of a fresh history copy.
    async fn clear_copy_slug(&self, db: &str, copy_id: &str, copy_rev: &str) -> WikiResult<String> {
        let (mut body, _) = self.store.get(db, copy_id).await?;
        if let Some(obj) = body.as_object_mut() {
            obj.insert("slug".into(), Value::String(String::new()));
            obj.remove("id");
        }
        Ok(self.store.put(db, copy_id, &body, Some(copy_rev)).await?)
    }

    /// Best-effort compensating delete.
    async fn discard(&self, db: &str, id: &str, rev: &str) {
        if let Err(e) = self.store.delete(db, id, rev).await {
            tracing::error!(error = %e, db = %db, doc_id = id, "Compensating delete failed");
        }
    }
}

/// Stored form of a page. The id lives in the store key, not the body.
fn to_body(page: &Page) -> WikiResult<Value> {
    let mut body = serde_json::to_value(page)?;
    if let Some(obj) = body.as_object_mut() {
        obj.remove("id");
    }
    Ok(body)
}
