//! Streaming importer for GeoNames dump files.
//!
//! Fetches the tab-delimited dumps into a local cache, streams them row by
//! row (also from inside zip archives), resolves administrative references
//! inline through an in-memory code index plus deferred SQL lookups, and
//! bulk-upserts the rows in batched, per-file transactions. Reruns are safe:
//! every write is an insert-or-replace keyed on the upstream identifier.

pub mod app;
pub mod config;
pub mod db;
pub mod dialect;
pub mod domain;
pub mod download;
pub mod error;
pub mod filter;
pub mod import;
pub mod index;
pub mod mapper;
pub mod schema;
pub mod source;
pub mod writer;
