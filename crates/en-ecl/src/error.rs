use thiserror::Error;

pub type EclResult<T> = Result<T, EclError>;

#[derive(Error, Debug)]
pub enum EclError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Bad record marker: expected {expected} bytes, found {found}")]
    BadMarker { expected: i32, found: i32 },

    #[error("Unknown record type mnemonic: {0:?}")]
    UnknownKind(String),

    #[error("Record {keyword} is {found}, expected {expected}")]
    KindMismatch {
        keyword: String,
        expected: &'static str,
        found: String,
    },

    #[error("Truncated record: {keyword}")]
    Truncated { keyword: String },

    #[error("Keyword is not 8-bit clean: {0:?}")]
    NonAsciiKeyword(String),

    #[error("Negative element count {count} in record {keyword}")]
    NegativeCount { keyword: String, count: i32 },
}
