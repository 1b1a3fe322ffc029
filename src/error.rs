use std::fmt;
use std::io;

pub(crate) type TintedResult<T> = Result<T, Error>;

/// Errors that can occur during tinted usage
#[derive(Debug)]
#[non_exhaustive]
pub enum Error {
    /// An I/O error occurred when reading a grammar file
    Io(io::Error),

    /// JSON parsing failed when loading a grammar.
    Json(serde_json::Error),

    /// A pattern of a grammar file does not compile.
    /// Grammars loaded from JSON are validated eagerly so this is reported at load time.
    #[allow(missing_docs)]
    InvalidRegex { pattern: String, reason: String },

    /// A grammar was not found in the registry.
    /// Only happens when asking to highlight or extend a language we can't find
    GrammarNotFound(String),

    /// A hook name that is not one of the known extension points.
    UnknownHook(String),

    /// A regex compilation error occurred during tokenization.
    /// Grammars built in code are only compiled when first used so this is where
    /// a broken pattern shows up for them.
    TokenizeRegex(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(err) => write!(f, "I/O error: {}", err),
            Error::Json(err) => write!(f, "JSON parsing error: {}", err),
            Error::InvalidRegex { pattern, reason } => {
                write!(f, "invalid pattern '{}': {}", pattern, reason)
            }
            Error::GrammarNotFound(name) => write!(f, "grammar '{}' not found", name),
            Error::UnknownHook(name) => write!(f, "unknown hook '{}'", name),
            Error::TokenizeRegex(message) => write!(f, "regex compilation error: {}", message),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::Json(err) => Some(err),
            Error::InvalidRegex { .. }
            | Error::GrammarNotFound(_)
            | Error::UnknownHook(_)
            | Error::TokenizeRegex(_) => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err)
    }
}
