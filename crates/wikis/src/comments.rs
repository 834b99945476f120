//! Page comments. Comments are edited in place: no history, no slug.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use wikifeat_core::content::render_and_sanitize;
use wikifeat_core::pagination::Pagination;
use wikifeat_core::wiki::{wiki_db_name, DOC_TYPE_COMMENT};
use wikifeat_db::indexes::WikiIndex;
use wikifeat_db::models::{Comment, PageContent, Paged};
use wikifeat_db::store::{IndexQuery, Reduce};
use wikifeat_db::DocumentStore;

use crate::error::{NotFoundExt, WikiError, WikiResult};
use crate::queries::fetch_page;

pub struct CommentManager<S> {
    store: Arc<S>,
}

impl<S: DocumentStore> CommentManager<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Create a comment on `page_id` by `author`.
    pub async fn create(
        &self,
        wiki: &str,
        mut comment: Comment,
        id: &str,
        page_id: &str,
        author: &str,
    ) -> WikiResult<String> {
        let db = wiki_db_name(wiki);
        let now = Utc::now();

        comment.id = id.to_string();
        comment.doc_type = DOC_TYPE_COMMENT.to_string();
        comment.owning_page = page_id.to_string();
        comment.author = author.to_string();
        comment.created_time = now;
        comment.modified_time = now;
        comment.deleted = false;
        comment.content.formatted = render_and_sanitize(&comment.content.raw);
        comment.validate()?;

        let rev = self.store.put(&db, id, &to_body(&comment)?, None).await?;
        tracing::info!(db = %db, comment_id = id, page_id, author, "Comment created");
        Ok(rev)
    }

    /// Replace a comment's content. Author, page and creation time are kept.
    pub async fn update(
        &self,
        wiki: &str,
        content: PageContent,
        id: &str,
        rev: &str,
    ) -> WikiResult<String> {
        let db = wiki_db_name(wiki);
        let (mut comment, _) = self.read(wiki, id).await?;
        if comment.deleted {
            return Err(WikiError::validation("Deleted comments cannot be edited"));
        }

        comment.content.formatted = render_and_sanitize(&content.raw);
        comment.content.raw = content.raw;
        comment.modified_time = Utc::now();
        comment.validate()?;

        let new_rev = self.store.put(&db, id, &to_body(&comment)?, Some(rev)).await?;
        tracing::info!(db = %db, comment_id = id, "Comment updated");
        Ok(new_rev)
    }

    pub async fn read(&self, wiki: &str, id: &str) -> WikiResult<(Comment, String)> {
        let db = wiki_db_name(wiki);
        let (body, rev) = self.store.get(&db, id).await.or_not_found("comment", id)?;
        let mut comment: Comment = serde_json::from_value(body)?;
        comment.id = id.to_string();
        Ok((comment, rev))
    }

    /// Mark a comment deleted and blank its content. The document stays so
    /// replies keep their thread.
    pub async fn delete(&self, wiki: &str, id: &str, rev: &str) -> WikiResult<String> {
        let db = wiki_db_name(wiki);
        let (mut comment, _) = self.read(wiki, id).await?;

        comment.deleted = true;
        comment.content = PageContent::default();
        comment.modified_time = Utc::now();

        let new_rev = self.store.put(&db, id, &to_body(&comment)?, Some(rev)).await?;
        tracing::info!(db = %db, comment_id = id, "Comment deleted");
        Ok(new_rev)
    }

    /// Remove a comment document entirely.
    pub async fn purge(&self, wiki: &str, id: &str, rev: &str) -> WikiResult<String> {
        let db = wiki_db_name(wiki);
        let new_rev = self
            .store
            .delete(&db, id, rev)
            .await
            .or_not_found("comment", id)?;
        tracing::info!(db = %db, comment_id = id, "Comment purged");
        Ok(new_rev)
    }

    /// Comments on a page, oldest first.
    pub async fn list_for_page(
        &self,
        wiki: &str,
        page_id: &str,
        pagination: Pagination,
    ) -> WikiResult<Paged<Comment>> {
        let db = wiki_db_name(wiki);
        let range = IndexQuery::new().range(json!([page_id]), json!([page_id, {}]));
        let (total, rows) = fetch_page(
            self.store.as_ref(),
            &db,
            WikiIndex::CommentsForPage,
            range,
            Reduce::Count,
            pagination,
        )
        .await?;

        let comments = rows
            .into_iter()
            .map(|row| -> WikiResult<Comment> {
                let mut comment: Comment = serde_json::from_value(row.value)?;
                if let Some(id) = row.id {
                    comment.id = id;
                }
                Ok(comment)
            })
            .collect::<WikiResult<Vec<_>>>()?;
        Ok(Paged::new(total, comments))
    }
}

fn to_body(comment: &Comment) -> WikiResult<serde_json::Value> {
    let mut body = serde_json::to_value(comment)?;
    if let Some(obj) = body.as_object_mut() {
        obj.remove("id");
    }
    Ok(body)
}
