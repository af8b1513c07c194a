use thiserror::Error;

pub type Result<T> = std::result::Result<T, SearchError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SearchError {
    #[error("Page size must be at least 1")]
    InvalidPageSize,

    #[error("Page {page} is out of range (1..={pages})")]
    PageOutOfRange { page: usize, pages: usize },
}
