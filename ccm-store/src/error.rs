use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("refusing to overwrite existing store at {0}")]
    AlreadyExists(PathBuf),

    #[error("unknown table in dump: {0}")]
    UnknownTable(String),

    #[error("table {table} expects {expected} columns, record has {actual}")]
    ColumnCountMismatch {
        table: String,
        expected: usize,
        actual: usize,
    },

    #[error("table_record event for '{0}' arrived outside a table_start/table_end pair")]
    RecordOutsideTable(String),

    #[error(transparent)]
    Rusqlite(#[from] rusqlite::Error),

    #[error(transparent)]
    Refinery(#[from] refinery::Error),

    #[error(transparent)]
    Dump(#[from] ccm_dump::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
