use core::fmt;

/// Result alias for `scclust`.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by the clustering orchestrator.
///
/// Every variant is a synchronous, fatal-to-the-call failure. Nothing here
/// is retried and no partial result is ever written to the container.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Input was empty.
    EmptyInput,

    /// No adjacency matrix was supplied and none is stored on the container.
    MissingAdjacency,

    /// Restriction key has no annotation column on the container.
    MissingObsColumn {
        /// The missing column key.
        key: String,
    },

    /// Restriction named a category absent from the annotation column.
    UnknownCategory {
        /// The unknown category value.
        category: String,
        /// The column it was looked up in.
        key: String,
    },

    /// A partition-type override was combined with a flavor that ignores it.
    PartitionTypeUnsupported {
        /// The offending flavor.
        flavor: &'static str,
    },

    /// Flavor string not recognized.
    UnknownFlavor(String),

    /// The requested backend was compiled out of this build.
    BackendUnavailable {
        /// The flavor whose backend is missing.
        flavor: &'static str,
    },

    /// Matrix shape mismatch (string description).
    ShapeMismatch {
        /// Expected shape description.
        expected: String,
        /// Actual shape description.
        actual: String,
    },

    /// Invalid parameter value.
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Error message.
        message: &'static str,
    },

    /// Generic error with message.
    Other(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::EmptyInput => write!(f, "empty input provided"),
            Error::MissingAdjacency => write!(
                f,
                "no adjacency matrix: pass one explicitly or store \
                 connectivities on the container first"
            ),
            Error::MissingObsColumn { key } => {
                write!(f, "no annotation column '{key}' on the container")
            }
            Error::UnknownCategory { category, key } => {
                write!(f, "'{category}' is not a valid category for '{key}'")
            }
            Error::PartitionTypeUnsupported { flavor } => write!(
                f,
                "`partition` is only a valid argument for flavor \"vtraag\", not \"{flavor}\""
            ),
            Error::UnknownFlavor(flavor) => write!(
                f,
                "`flavor` needs to be \"vtraag\", \"igraph\" or \"taynaud\", got \"{flavor}\""
            ),
            Error::BackendUnavailable { flavor } => {
                write!(
                    f,
                    "backend for flavor \"{flavor}\" was not compiled into this build"
                )
            }
            Error::ShapeMismatch { expected, actual } => {
                write!(f, "shape mismatch: expected {expected}, actual {actual}")
            }
            Error::InvalidParameter { name, message } => {
                write!(f, "invalid parameter '{name}': {message}")
            }
            Error::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_category_and_key() {
        let err = Error::UnknownCategory {
            category: "B".into(),
            key: "batch".into(),
        };
        assert_eq!(err.to_string(), "'B' is not a valid category for 'batch'");
    }

    #[test]
    fn display_names_the_flavor() {
        let err = Error::UnknownFlavor("leiden".into());
        assert!(err.to_string().contains("\"leiden\""));
    }
}
