use thiserror::Error;

#[derive(Debug, Error)]
pub enum TallyError {
    /// A lookup asked for a key that was never inserted.
    #[error("key not found: {0:?}")]
    KeyNotFound(String),

    /// An input line could not be turned into a record.
    #[error("malformed input on line {line}: {reason}")]
    MalformedInput { line: usize, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TallyError>;

impl TallyError {
    /// True for the recoverable "treat as zero" case.
    pub fn is_not_found(&self) -> bool {
        return matches!(self, TallyError::KeyNotFound(_));
    }
}
