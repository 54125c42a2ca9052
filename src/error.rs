use thiserror::Error;

pub type TradeResult<T> = Result<T, TradeParseError>;

#[derive(Debug, Error)]
pub enum TradeParseError {
    #[error(transparent)]
    Number(#[from] NumberError),

    #[error(transparent)]
    DateTime(#[from] DateTimeError),

    #[error(transparent)]
    File(#[from] FileError),
}

/// Errors from parsing numeric (decimal) field values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NumberError {
    #[error("empty numeric value")]
    Empty,

    #[error("invalid number: '{0}'")]
    InvalidNumber(String),

    #[error("negative value not allowed: {0}")]
    NegativeDisallowed(String),
}

/// Errors from parsing date/time field values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DateTimeError {
    #[error("empty datetime value")]
    Empty,

    #[error("could not parse datetime: '{0}'")]
    InvalidDateTime(String),
}

/// Errors preventing a whole file/stream from being parsed at all.
#[derive(Debug, Error)]
pub enum FileError {
    #[error("failed to read input: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to decode input with any known encoding")]
    UndecodableEncoding,

    #[error("failed to read CSV structure: {0}")]
    Csv(#[from] csv::Error),

    #[error("missing required columns: {0}")]
    MissingColumns(String),
}

/// A single row-level failure, collected as data rather than bubbled as an
/// error (see `ParseResult::errors`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowError {
    pub row_number: usize,
    pub column: Option<String>,
    pub message: String,
    pub raw_value: Option<String>,
}

impl std::fmt::Display for RowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.column {
            Some(col) => write!(f, "row {} (column: {}): {}", self.row_number, col, self.message),
            None => write!(f, "row {}: {}", self.row_number, self.message),
        }
    }
}

impl RowError {
    pub fn new(row_number: usize, message: impl Into<String>) -> Self {
        Self {
            row_number,
            column: None,
            message: message.into(),
            raw_value: None,
        }
    }

    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    pub fn with_raw_value(mut self, raw_value: impl Into<String>) -> Self {
        self.raw_value = Some(raw_value.into());
        self
    }
}

impl From<NumberError> for String {
    fn from(e: NumberError) -> Self {
        e.to_string()
    }
}

impl From<DateTimeError> for String {
    fn from(e: DateTimeError) -> Self {
        e.to_string()
    }
}
