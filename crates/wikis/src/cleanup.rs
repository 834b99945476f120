//! Fire-and-forget removal of history copies after a page delete.
//!
//! Leftover history copies only waste storage, so the deletes are spawned
//! and never awaited by the caller. Failures are logged.

use std::sync::Arc;

use tokio_util::task::TaskTracker;
use wikifeat_db::DocumentStore;

/// A history copy scheduled for deletion.
#[derive(Debug, Clone)]
pub(crate) struct StaleCopy {
    pub id: String,
    pub rev: String,
}

/// Spawn one delete per copy onto `tracker`.
pub(crate) fn spawn_history_deletes<S: DocumentStore>(
    tracker: &TaskTracker,
    store: &Arc<S>,
    db: &str,
    copies: Vec<StaleCopy>,
) {
    for copy in copies {
        let store = Arc::clone(store);
        let db = db.to_string();
        tracker.spawn(async move {
            match store.delete(&db, &copy.id, &copy.rev).await {
                Ok(_) => tracing::debug!(db = %db, history_id = %copy.id, "Deleted history copy"),
                Err(e) => tracing::error!(
                    error = %e,
                    db = %db,
                    history_id = %copy.id,
                    "Failed to delete history copy"
                ),
            }
        });
    }
}
