//! Error taxonomy shared by every engine subsystem.

/// Errors that can cross a subsystem boundary and reach the protocol dispatcher.
///
/// Exactly the taxonomy of §7: `PathNotAbsolute`, `Io` (covers every
/// filesystem failure — not found, permission, is-a-directory, short read),
/// `NoSessionOpen`, `InvalidRegex`, `ColumnCountMismatch`, `MalformedCommand`,
/// `Internal`.
#[derive(Debug, Clone)]
pub enum EngineError {
    PathNotAbsolute(String),
    Io(String),
    NoSessionOpen,
    InvalidRegex(String),
    ColumnCountMismatch { expected: usize, found: usize },
    MalformedCommand(String),
    Internal(String),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PathNotAbsolute(path) => write!(f, "path is not absolute: {}", path),
            Self::Io(msg) => write!(f, "{}", msg),
            Self::NoSessionOpen => write!(f, "no session is open"),
            Self::InvalidRegex(msg) => write!(f, "invalid regex: {}", msg),
            Self::ColumnCountMismatch { expected, found } => {
                write!(f, "pattern has {} capture groups, expected {}", found, expected)
            }
            Self::MalformedCommand(msg) => write!(f, "malformed command: {}", msg),
            Self::Internal(msg) => write!(f, "internal error: {}", msg),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<std::io::Error> for EngineError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

impl From<regex::Error> for EngineError {
    fn from(e: regex::Error) -> Self {
        Self::InvalidRegex(e.to_string())
    }
}
