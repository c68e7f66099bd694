//! Common result and error types for invariant violations.

/// The standard result type for fallible internal operations.
///
/// `Err` indicates a broken internal invariant (a bug in cairn), not a
/// problem with the input. Input problems are either typed structural errors
/// of the owning crate or diagnostics in the sink.
pub type CairnResult<T> = Result<T, InternalError>;

/// An internal error indicating a bug in cairn, not a user input problem.
#[derive(Debug, thiserror::Error)]
#[error("internal compiler error: {message}")]
pub struct InternalError {
    /// Description of the internal error.
    pub message: String,
}

impl InternalError {
    /// Creates a new internal error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<String> for InternalError {
    fn from(message: String) -> Self {
        Self { message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_format() {
        let err = InternalError::new("placement missing");
        assert_eq!(format!("{err}"), "internal compiler error: placement missing");
    }

    #[test]
    fn from_string() {
        let err: InternalError = "from string".to_string().into();
        assert_eq!(err.message, "from string");
    }
}
