use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("Unsupported store url: {0}")]
    UnsupportedUrl(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

impl From<StoreError> for pup_core::Error {
    fn from(err: StoreError) -> Self {
        pup_core::Error::storage(err.to_string())
    }
}
