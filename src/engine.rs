use std::path::Path;

use crate::{error::Result, extract::DEFAULT_INDEX_EXTENSIONS};

/// A ranked document hit as the engine produces it, before the service
/// projects it into display form.
#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    /// Stored document name; projected to `{base}/{name}.html`.
    pub name: String,
    /// Stored document title, if the document carries one.
    pub title: Option<String>,
    /// Relevance score; hits arrive in descending score order.
    pub score: f32,
}

/// Abstracts the full-text engine behind the index lifecycle.
///
/// An engine owns its on-disk format: it knows how to open a directory
/// as an index and which archive members make up an index in that
/// format.
pub trait SearchEngine: Send + Sync {
    type Handle: IndexHandle;

    /// Open the on-disk index at `dir`.
    ///
    /// Fails with [`Error::IndexOpen`](crate::Error::IndexOpen) when the
    /// directory is missing or does not hold a readable index. Never
    /// creates one; downloaded archives are the only way an index comes
    /// into being.
    fn open(&self, dir: &Path) -> Result<Self::Handle>;

    /// Filename extensions of the archive members that make up an index
    /// in this engine's format. Defaults to the legacy Whoosh wire
    /// convention.
    fn archive_extensions(&self) -> &'static [&'static str] {
        DEFAULT_INDEX_EXTENSIONS
    }
}

/// An opened index.
///
/// Handles are cached per record id and hold their own resources, so a
/// handle stays usable while the backing directory is replaced
/// underneath it; it only goes away when the cache drops it.
pub trait IndexHandle: Send + Sync + 'static {
    /// Run `query` against the index, returning at most `limit` hits in
    /// the engine's relevance order.
    fn search(&self, query: &str, limit: usize) -> Result<Vec<Hit>>;
}
