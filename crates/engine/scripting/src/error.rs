//! Error types for the script bridge

use thiserror::Error;

/// Result type for bridge operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the script bridge
#[derive(Error, Debug)]
pub enum Error {
    /// Path expression does not match the shape of the JSON document
    #[error("Malformed path {path:?} at segment {segment:?}: {fault}")]
    MalformedPath {
        path: String,
        segment: String,
        fault: PathFault,
    },

    /// Lua error, including errors raised by native bindings
    #[error("Lua error: {0}")]
    Lua(#[from] mlua::Error),

    /// JSON decoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// KDL parsing error
    #[error("KDL parse error: {0}")]
    KdlParse(#[from] kdl::KdlError),

    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Value cannot be turned into a tagged tree node
    #[error("Invalid node: {0}")]
    InvalidNode(String),

    /// No proxy has been installed for the binding type
    #[error("No proxy installed for {0}")]
    ProxyNotInstalled(&'static str),

    /// Configuration parsed but has the wrong shape
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

/// Why a path segment could not be resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathFault {
    /// Object has no member with this key
    MissingKey(String),
    /// Array is shorter than the requested index
    IndexOutOfRange { index: usize, len: usize },
    /// Member access attempted on a non-object
    NotAnObject(&'static str),
    /// Index access attempted on a non-array
    NotAnArray(&'static str),
    /// Bracketed index is not a non-negative integer
    InvalidIndex(String),
}

impl std::fmt::Display for PathFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathFault::MissingKey(key) => write!(f, "missing key {:?}", key),
            PathFault::IndexOutOfRange { index, len } => {
                write!(f, "index {} out of range for array of length {}", index, len)
            }
            PathFault::NotAnObject(found) => write!(f, "expected object, found {}", found),
            PathFault::NotAnArray(found) => write!(f, "expected array, found {}", found),
            PathFault::InvalidIndex(text) => write!(f, "invalid index {:?}", text),
        }
    }
}

impl Error {
    /// Convert into a Lua runtime error so a failing callback aborts the script
    pub fn into_lua_err(self) -> mlua::Error {
        match self {
            Error::Lua(e) => e,
            other => mlua::Error::RuntimeError(other.to_string()),
        }
    }
}
