//! Post-write slug uniqueness check.
//!
//! The store has no unique indexes and no multi-document transactions, so
//! a slug is checked after the page carrying it has been written: the slug
//! count index is queried and more than one page document with the slug is
//! a conflict, which the caller compensates for.
//!
//! The check is best effort. Two writers racing on the same slug can both
//! observe a count of one before either write reaches the index, leaving a
//! duplicate that only the next check on that slug reports. A count of zero
//! (index not caught up yet) is accepted.

use wikifeat_db::indexes::WikiIndex;
use wikifeat_db::store::{IndexQuery, Reduce};
use wikifeat_db::DocumentStore;

use crate::error::{WikiError, WikiResult};

/// Fail with a conflict when more than one page document carries `slug`.
pub async fn check_for_duplicate_slug<S: DocumentStore>(
    store: &S,
    db: &str,
    slug: &str,
) -> WikiResult<()> {
    let query = IndexQuery::new()
        .key(slug)
        .reduce(Reduce::Grouped { level: None });
    let count = store
        .query_index(db, WikiIndex::SlugCount, &query)
        .await?
        .first_count();

    if count > 1 {
        tracing::warn!(db, slug, count, "Duplicate page slug detected");
        return Err(WikiError::conflict(format!(
            "A page with the slug '{slug}' already exists"
        )));
    }
    Ok(())
}
