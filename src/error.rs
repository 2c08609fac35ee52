use thiserror::Error;

#[derive(Error, Debug)]
pub enum MallError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Corrupt collection file: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("Config error: {0}")]
    ConfigError(#[from] toml::de::Error),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("User {0} already exists")]
    UserAlreadyExists(String),
    #[error("User {0} not found, please sign up")]
    UnknownUser(String),
    #[error("Invalid OTP")]
    InvalidOtp,
    #[error("Unable to fetch location: {0}")]
    LocationUnavailable(String),
    #[error("Internal error: {0}")]
    InternalError(#[from] Box<dyn std::error::Error + Send + Sync>),
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for MallError {
    fn from(err: rocksdb::Error) -> Self {
        MallError::InternalError(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, MallError>;
