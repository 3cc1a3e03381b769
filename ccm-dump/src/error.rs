use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{line}: unknown cell prefix: '{prefix}'")]
    UnknownCellPrefix { line: u64, prefix: String },

    #[error("{line}: unexpected end of input while reading text body")]
    UnterminatedText { line: u64 },

    #[error("{line}: expected 'te' but found: '{found}'")]
    MissingTextEnd { line: u64, found: String },

    #[error("{line}: unknown instruction: '{instruction}'")]
    UnknownInstruction { line: u64, instruction: String },

    #[error("{line}: unexpected line inside table body: '{found}'")]
    UnexpectedTableLine { line: u64, found: String },

    #[error("{line}: table end name differs, expected '{expected}', got '{actual}'")]
    TableNameMismatch {
        line: u64,
        expected: String,
        actual: String,
    },

    #[error("{line}: table end record count differs, expected {expected}, got {actual}")]
    TableCountMismatch {
        line: u64,
        expected: u64,
        actual: u64,
    },

    #[error("{line}: unexpected end of input")]
    UnexpectedEof { line: u64 },

    #[error(transparent)]
    Escape(#[from] ccm_escape::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
