use thiserror::Error;

pub type SmspecResult<T> = Result<T, SmspecError>;

#[derive(Error, Debug)]
pub enum SmspecError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Record error: {0}")]
    Ecl(#[from] en_ecl::EclError),

    #[error("Header is missing mandatory record: {keyword}")]
    MissingKeyword { keyword: &'static str },

    #[error("DIMENS record is malformed")]
    InvalidDimens,

    #[error("Invalid start date: {day}-{month}-{year}")]
    InvalidDate { day: i32, month: i32, year: i32 },

    #[error("Variable not found: {key}")]
    KeyNotFound { key: String },

    #[error("Record {what} has {found} entries, expected {expected}")]
    WrongLength {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("Summary data not found for case {case}")]
    NoSummaryData { case: String },
}
