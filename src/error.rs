use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("database error: {0}")]
    Redb(#[from] redb::Error),

    #[error("database storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("database transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("database table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("database commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("record encoding error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("search engine error: {0}")]
    Tantivy(#[from] tantivy::TantivyError),

    #[error("archive fetch failed: {0}")]
    Fetch(String),

    #[error("archive extract failed: {0}")]
    Extract(String),

    #[error("cannot open index at {path}: {reason}")]
    IndexOpen { path: PathBuf, reason: String },

    #[error("malformed query: {0}")]
    QueryParse(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("{kind} not found: {name}")]
    NotFound { kind: &'static str, name: String },

    #[error("data directory does not exist and could not be created: {0}")]
    DataDir(PathBuf),
}
