use std::fmt;

/// Result type alias for neobench core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for neobench core operations
#[derive(Debug)]
pub enum Error {
    /// Expression evaluation failures (undefined variable, bad arithmetic, ...)
    Eval(String),

    /// A value of the wrong kind was produced where a specific kind is required
    TypeMismatch {
        /// What the consumer needed, e.g. "integer"
        expected: &'static str,
        /// The offending value, rendered for diagnostics
        got: String,
    },

    /// Configuration errors, rejected before any client runs
    Config(String),

    /// I/O errors from the diagnostic sink or driver
    Io(std::io::Error),

    /// A client thread panicked
    ClientPanicked(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Eval(msg) => write!(f, "Evaluation error: {msg}"),
            Error::TypeMismatch { expected, got } => {
                write!(f, "Type mismatch: expected {expected}, got {got}")
            }
            Error::Config(msg) => write!(f, "Configuration error: {msg}"),
            Error::Io(e) => write!(f, "I/O error: {e}"),
            Error::ClientPanicked(msg) => write!(f, "Client thread panicked: {msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_mismatch_display_names_value() {
        let err = Error::TypeMismatch { expected: "integer", got: "1.5".to_string() };
        assert_eq!(err.to_string(), "Type mismatch: expected integer, got 1.5");
    }

    #[test]
    fn test_io_error_has_source() {
        use std::error::Error as _;

        let err: Error = std::io::Error::other("sink closed").into();
        assert!(err.source().is_some());
        assert!(err.to_string().contains("sink closed"));
    }
}
