//! Document storage for wikis.
//!
//! - [`store::DocumentStore`] is the contract the content engine persists
//!   through: single-document atomic writes guarded by revision tokens,
//!   server-side copies, attachments, batch reads and secondary-index
//!   queries.
//! - [`store::MemoryStore`] and [`store::CouchStore`] implement it.
//! - [`indexes::WikiIndex`] catalogues the secondary indexes every wiki
//!   database carries.
//! - [`models`] holds the page, comment and file documents plus the index
//!   projections returned by listing queries.

pub mod config;
pub mod indexes;
pub mod models;
pub mod store;

pub use config::StoreConfig;
pub use store::{CouchStore, DocumentStore, MemoryStore, StoreError};
