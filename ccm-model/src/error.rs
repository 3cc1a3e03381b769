use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("malformed four-part name: '{0}'")]
    MalformedFpn(String),

    #[error("malformed full name: '{0}'")]
    MalformedFullName(String),

    #[error("object has no '{attribute}' attribute")]
    MissingAttribute { attribute: String },

    #[error("status_log entry does not match the expected format: '{0}'")]
    MalformedStatusLogEntry(String),

    #[error("unrecognised 'source' attribute kind: '{0}'")]
    UnknownSourceKind(String),

    #[error("archive member not found in backup for {object}: {path}")]
    ArchiveNotFound { object: String, path: PathBuf },

    #[error("running '{command}' for {object} failed with {status}")]
    ExternalTool {
        object: String,
        command: String,
        status: std::process::ExitStatus,
    },

    #[error(transparent)]
    Store(#[from] ccm_store::Error),

    #[error(transparent)]
    Archive(#[from] ccm_archive::Error),

    #[error(transparent)]
    Query(#[from] ccm_query::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
