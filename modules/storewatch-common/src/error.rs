use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreWatchError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Header row not found in tab '{0}': expected columns Brand, Location, Aggregator, Link, Latitude, Longitude")]
    HeaderNotFound(String),

    #[error("Tabular store error: {0}")]
    Store(String),

    #[error("Fetch error: {0}")]
    Fetch(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}
