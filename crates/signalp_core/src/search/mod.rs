//! Full-text search entry points.
//!
//! # Responsibility
//! - Expose domain-name queries backed by the SQLite FTS5 indexes.
//! - Keep search result shaping inside core.

pub mod fts;
