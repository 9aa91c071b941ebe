use thiserror::Error;

#[derive(Debug, Error)]
pub enum MatchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("TEI encode error: {0}")]
    Encoder(String),

    #[error("Qdrant error: {0}")]
    Index(String),

    #[error("unknown product: {0}")]
    UnknownProduct(i64),

    #[error("catalog lookup failed: {0}")]
    Catalog(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl MatchError {
    pub(crate) fn catalog<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Catalog(Box::new(error))
    }
}
