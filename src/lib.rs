pub mod codec;
pub mod config;
pub mod cursor;
pub mod notify;
pub mod prompt;
pub mod reconcile;
pub mod record;
pub mod session;
pub mod store;
pub mod terminal;


#[derive(Debug, thiserror::Error)]
#[error("{context}: {detail}")]
pub struct Error {
    pub context: Box<ErrorContext>,
    pub detail: Box<ErrorDetail>,
}

#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub blob: String,
    pub line: Option<u64>,
}

impl ErrorContext {
    pub fn new(blob: impl Into<String>) -> Self {
        Self {
            blob: blob.into(),
            line: None,
        }
    }

    pub(crate) fn with_line(&self, line: u64) -> Self {
        Self {
            blob: self.blob.clone(),
            line: Some(line),
        }
    }

    pub(crate) fn error(&self, detail: ErrorDetail) -> Error {
        Error {
            context: Box::new(self.clone()),
            detail: Box::new(detail),
        }
    }
}

impl std::fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.line {
            Some(line) => write!(f, "{}:{line}", self.blob),
            None => f.write_str(&self.blob),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ErrorDetail {
    #[error("Missing columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),
    #[error("Failed to decode CSV: {0}")]
    Decode(csv::Error),
    #[error("Failed to encode CSV: {0}")]
    Encode(csv::Error),
    #[error("Duplicate columns: {}", .0.join(", "))]
    DuplicateColumns(Vec<String>),
    #[error("Row has {got} cells, header has {expected}")]
    RowWidth { expected: usize, got: usize },
}
