use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("could not parse query: {0}")]
    Syntax(String),

    #[error("unexpected trailing input: '{0}'")]
    TrailingInput(String),

    #[error("unknown query function: {0}")]
    UnknownFunction(String),

    #[error("function {function} expects {expected} argument(s), got {actual}")]
    WrongArgCount {
        function: String,
        expected: usize,
        actual: usize,
    },

    #[error("malformed four-part name: '{0}'")]
    MalformedFpn(String),
}
