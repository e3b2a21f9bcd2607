//! docdex - named, remotely-updatable full-text search indices.
//!
//! A record (`{id, name, url}`) names an index. The on-disk index for a
//! record lives in one directory per id and is refreshed wholesale: the
//! service downloads `<url>/whoosh-index.zip`, extracts its index
//! members into a fresh staging directory, swaps that directory into
//! place, and drops the cached open handle so the next search sees the
//! new content. A failed download or a corrupt archive leaves the
//! currently-serving index untouched.
//!
//! The full-text engine itself is pluggable behind
//! [`SearchEngine`](engine::SearchEngine); the bundled implementation
//! is [`TantivyEngine`].
//!
//! # Quick start
//!
//! ```no_run
//! use docdex::{DataDir, HttpFetcher, RecordStore, SearchService, TantivyEngine};
//!
//! let data_dir = DataDir::resolve(None).unwrap();
//! let store = RecordStore::open(&data_dir.records_db()).unwrap();
//! let record = store
//!     .add("library docs", Some("https://docs.example.org/lib"))
//!     .unwrap();
//!
//! let service =
//!     SearchService::new(data_dir, TantivyEngine::new(), HttpFetcher::new());
//! if service.update(&record).unwrap().is_updated() {
//!     for hit in service.search(&record, "interpolation", 10).unwrap() {
//!         println!("{} - {}", hit.title, hit.url);
//!     }
//! }
//! ```

pub mod cli;
pub mod data_dir;
pub mod engine;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod handle_cache;
pub mod record;
pub mod record_store;
pub mod service;
pub mod tantivy_engine;

pub use data_dir::DataDir;
pub use error::{Error, Result};
pub use fetch::{ArchiveFetcher, HttpFetcher};
pub use record::IndexRecord;
pub use record_store::RecordStore;
pub use service::{SearchHit, SearchService, UpdateOutcome};
pub use tantivy_engine::TantivyEngine;
