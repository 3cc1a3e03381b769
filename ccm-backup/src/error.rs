use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("no object found for four-part name '{0}'")]
    ObjectNotFound(String),

    #[error(transparent)]
    Store(#[from] ccm_store::Error),

    #[error(transparent)]
    Dump(#[from] ccm_dump::Error),

    #[error(transparent)]
    Model(#[from] ccm_model::Error),

    #[error(transparent)]
    Query(#[from] ccm_query::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
