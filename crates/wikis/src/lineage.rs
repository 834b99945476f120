//! Ancestor chains for the page hierarchy.

use wikifeat_core::types::DocId;
use wikifeat_db::models::Page;
use wikifeat_db::DocumentStore;

use crate::error::{NotFoundExt, WikiResult};

/// Compute the lineage of page `id`: the parent's lineage followed by `id`,
/// or just `[id]` for a root page.
pub async fn get_lineage<S: DocumentStore>(
    store: &S,
    db: &str,
    id: &str,
    parent: Option<&str>,
) -> WikiResult<Vec<DocId>> {
    let Some(parent_id) = parent else {
        return Ok(vec![id.to_string()]);
    };

    let (body, _) = store.get(db, parent_id).await.or_not_found("parent page", parent_id)?;
    let parent: Page = serde_json::from_value(body)?;

    let mut lineage = parent.lineage;
    lineage.push(id.to_string());
    Ok(lineage)
}
