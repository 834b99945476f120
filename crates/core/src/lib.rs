//! Domain helpers shared by the wiki storage and engine crates.
//!
//! Nothing in this crate performs I/O: it holds identifier and timestamp
//! types, the core error taxonomy, slug generation, validation rules,
//! Markdown rendering and pagination arithmetic.

pub mod content;
pub mod error;
pub mod hashing;
pub mod pagination;
pub mod types;
pub mod wiki;
