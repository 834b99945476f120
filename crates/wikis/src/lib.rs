//! Versioned wiki content engine.
//!
//! Pages keep an append-only edit history and unique URL slugs on top of a
//! store that only guarantees single-document atomicity. The managers here
//! take the store as an explicit `Arc` dependency:
//!
//! - [`PageManager`]: page create/update/delete with history copies,
//!   lineage and slug uniqueness.
//! - [`QueryEngine`]: history and index listings with concurrent counts.
//! - [`CommentManager`]: in-place editable comments.
//! - [`FileManager`]: file records and attachments.
//! - [`provision`]: wiki database creation and removal.

use std::sync::Arc;

use wikifeat_db::DocumentStore;

mod cleanup;
pub mod comments;
pub mod error;
pub mod files;
pub mod lineage;
pub mod pages;
pub mod provision;
pub mod queries;
pub mod uniqueness;

pub use comments::CommentManager;
pub use error::{WikiError, WikiResult};
pub use files::FileManager;
pub use pages::PageManager;
pub use queries::QueryEngine;

/// All managers of the engine sharing one store.
pub struct WikiEngine<S> {
    pub pages: PageManager<S>,
    pub queries: QueryEngine<S>,
    pub comments: CommentManager<S>,
    pub files: FileManager<S>,
}

impl<S: DocumentStore> WikiEngine<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            pages: PageManager::new(Arc::clone(&store)),
            queries: QueryEngine::new(Arc::clone(&store)),
            comments: CommentManager::new(Arc::clone(&store)),
            files: FileManager::new(store),
        }
    }
}
