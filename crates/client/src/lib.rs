//! Client-side transclusion.
//!
//! This crate resolves content importers: links in a hypertext document that
//! stand for content held in another document. It provides the document
//! fetcher, the coalescing document cache, and the resolver shared by the
//! server and CLI.
//!
//! Documents are `scraper` trees, which are neither `Send` nor `Sync`; a
//! session runs on a single thread.

pub mod cache;
pub mod fetch;
pub mod location;
pub mod resolve;
pub mod session;

#[cfg(test)]
mod testing;

pub use cache::{CacheEntry, DocumentCache, DocumentReader, EntryState};
pub use fetch::{DocumentFetcher, FailureKind, FetchConfig, FetchFailure, HttpFetcher};
pub use location::LocationError;
pub use resolve::{ImportFailure, ImportTarget, Importer, ResolveConfig, ResolveReport, Resolver};
pub use session::{Transcluded, author_mode, transclude_document, transclude_html, transclude_location};
