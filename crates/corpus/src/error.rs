use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CorpusError>;

/// Corpus loading failures. All of them are fatal at startup.
#[derive(Error, Debug)]
pub enum CorpusError {
    /// The corpus file does not exist
    #[error("Corpus file not found: {}", .0.display())]
    DataUnavailable(PathBuf),

    /// None of the candidate encodings decoded the file
    #[error("Cannot decode {} with any of [{tried}]", path.display())]
    Encoding { path: PathBuf, tried: String },

    /// The required `filename` column is missing
    #[error("Corpus has no 'filename' column (headers: {headers:?})")]
    Schema { headers: Vec<String> },

    #[error("Invalid corpus options: {0}")]
    InvalidOptions(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl CorpusError {
    pub fn invalid_options(msg: impl Into<String>) -> Self {
        Self::InvalidOptions(msg.into())
    }
}
