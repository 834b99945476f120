//! History and index listings.
//!
//! A paginated listing needs two reads: the requested page of rows and the
//! total row count. They are independent, so both queries are dispatched
//! together with [`tokio::try_join!`] and the first failure fails the call.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use wikifeat_core::pagination::Pagination;
use wikifeat_core::types::Timestamp;
use wikifeat_core::wiki::wiki_db_name;
use wikifeat_db::indexes::WikiIndex;
use wikifeat_db::models::{HistoryEntry, HistoryRow, PageIndexEntry, Paged};
use wikifeat_db::store::{IndexQuery, IndexRow, Reduce};
use wikifeat_db::DocumentStore;

use crate::error::{WikiError, WikiResult};

/// Run the count and the page of a listing concurrently.
///
/// `count_reduce` selects how the total is computed over the same key
/// range as the rows.
pub(crate) async fn fetch_page<S: DocumentStore>(
    store: &S,
    db: &str,
    index: WikiIndex,
    range: IndexQuery,
    count_reduce: Reduce,
    pagination: Pagination,
) -> WikiResult<(usize, Vec<IndexRow>)> {
    let count_query = range.clone().reduce(count_reduce);
    let page_query = range
        .reduce(Reduce::None)
        .skip(pagination.skip())
        .limit(pagination.limit());

    tracing::debug!(
        db,
        index = index.view_name(),
        skip = page_query.skip,
        limit = ?page_query.limit,
        "Dispatching listing queries"
    );

    let (count, page) = tokio::try_join!(
        store.query_index(db, index, &count_query),
        store.query_index(db, index, &page_query),
    )?;
    Ok((count.first_count(), page.rows))
}

/// Deserialize row values into `T`.
pub(crate) fn values<T: DeserializeOwned>(rows: Vec<IndexRow>) -> WikiResult<Vec<T>> {
    rows.into_iter()
        .map(|row| serde_json::from_value::<T>(row.value).map_err(WikiError::from))
        .collect()
}

/// Paginated and unpaginated listings over the wiki indexes.
pub struct QueryEngine<S> {
    store: Arc<S>,
}

impl<S> Clone for QueryEngine<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: DocumentStore> QueryEngine<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// History of a page, newest first.
    ///
    /// `total_rows` counts every history copy of the page, which is the
    /// number of edits made to it.
    pub async fn history(
        &self,
        wiki: &str,
        page_id: &str,
        pagination: Pagination,
    ) -> WikiResult<Paged<HistoryRow>> {
        let db = wiki_db_name(wiki);
        let range = IndexQuery::new()
            .range(json!([page_id, {}]), json!([page_id]))
            .descending();
        let (total, rows) = fetch_page(
            self.store.as_ref(),
            &db,
            WikiIndex::History,
            range,
            Reduce::Grouped { level: Some(1) },
            pagination,
        )
        .await?;

        let rows = rows
            .into_iter()
            .map(history_row)
            .collect::<WikiResult<Vec<_>>>()?;
        Ok(Paged::new(total, rows))
    }

    /// Every current page of a wiki, ordered by title.
    pub async fn page_index(
        &self,
        wiki: &str,
        pagination: Pagination,
    ) -> WikiResult<Paged<PageIndexEntry>> {
        let db = wiki_db_name(wiki);
        let (total, rows) = fetch_page(
            self.store.as_ref(),
            &db,
            WikiIndex::PageIndex,
            IndexQuery::new(),
            Reduce::Count,
            pagination,
        )
        .await?;
        Ok(Paged::new(total, values(rows)?))
    }

    /// Direct children of a page.
    pub async fn child_page_index(
        &self,
        wiki: &str,
        page_id: &str,
    ) -> WikiResult<Vec<PageIndexEntry>> {
        let db = wiki_db_name(wiki);
        let query = IndexQuery::new().key(page_id);
        let result = self
            .store
            .query_index(&db, WikiIndex::ChildPageIndex, &query)
            .await?;
        values(result.rows)
    }

    /// Every current page below `page_id` in the hierarchy, at any depth.
    pub async fn descendants(
        &self,
        wiki: &str,
        page_id: &str,
    ) -> WikiResult<Vec<PageIndexEntry>> {
        let db = wiki_db_name(wiki);
        let query = IndexQuery::new().range(json!([page_id]), json!([page_id, {}]));
        let result = self
            .store
            .query_index(&db, WikiIndex::Descendants, &query)
            .await?;
        let entries: Vec<PageIndexEntry> = values(result.rows)?;
        Ok(entries.into_iter().filter(|e| e.id != page_id).collect())
    }

    /// Number of rows an index holds for `key`.
    pub async fn count(&self, wiki: &str, index: WikiIndex, key: Value) -> WikiResult<usize> {
        let db = wiki_db_name(wiki);
        let query = IndexQuery::new().key(key).reduce(Reduce::Count);
        Ok(self.store.query_index(&db, index, &query).await?.first_count())
    }
}

fn history_row(row: IndexRow) -> WikiResult<HistoryRow> {
    let entry: HistoryEntry = serde_json::from_value(row.value)?;
    let timestamp: Timestamp =
        serde_json::from_value(row.key.get(1).cloned().unwrap_or(Value::Null))?;
    Ok(HistoryRow {
        id: row.id.unwrap_or_else(|| entry.document_id.clone()),
        timestamp,
        entry,
    })
}
