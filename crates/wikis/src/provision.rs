//! Creation and removal of wiki databases.

use wikifeat_core::wiki::wiki_db_name;
use wikifeat_db::DocumentStore;

use crate::error::WikiResult;

/// Create the database for `wiki_id` and install its indexes.
///
/// If the indexes cannot be installed the new database is dropped again.
pub async fn create_wiki<S: DocumentStore>(store: &S, wiki_id: &str) -> WikiResult<()> {
    let db = wiki_db_name(wiki_id);
    store.create_database(&db).await?;

    if let Err(e) = store.install_indexes(&db).await {
        tracing::error!(error = %e, db = %db, "Index installation failed, dropping database");
        if let Err(drop_err) = store.delete_database(&db).await {
            tracing::error!(error = %drop_err, db = %db, "Failed to drop database");
        }
        return Err(e.into());
    }

    tracing::info!(db = %db, wiki_id, "Wiki database created");
    Ok(())
}

/// Drop the database for `wiki_id` with every page, comment and file in it.
pub async fn delete_wiki<S: DocumentStore>(store: &S, wiki_id: &str) -> WikiResult<()> {
    let db = wiki_db_name(wiki_id);
    store.delete_database(&db).await?;
    tracing::info!(db = %db, wiki_id, "Wiki database deleted");
    Ok(())
}
