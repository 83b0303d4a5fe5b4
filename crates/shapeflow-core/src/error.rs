//! Error types shared across the diagram model.

use crate::shapes::ShapeId;
use thiserror::Error;

/// Version triple of the persisted diagram format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct FormatVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl FormatVersion {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self { major, minor, patch }
    }
}

impl std::fmt::Display for FormatVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Errors raised by structural diagram operations and persistence.
#[derive(Debug, Error)]
pub enum DiagramError {
    #[error("Shape not found: {0}")]
    ShapeNotFound(ShapeId),
    #[error("Cannot make {child} a child of {parent}: {parent} is its descendant")]
    Cycle { child: ShapeId, parent: ShapeId },
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Malformed diagram data: {0}")]
    Malformed(String),
    #[error("Diagram format {found} is newer than the supported {supported}")]
    IncompatibleVersion {
        found: FormatVersion,
        supported: FormatVersion,
    },
    #[error("Property error: {0}")]
    Property(#[from] PropertyError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for diagram operations.
pub type DiagramResult<T> = Result<T, DiagramError>;

/// Errors raised while reading or writing registered properties.
#[derive(Debug, Error)]
pub enum PropertyError {
    #[error("No getter registered or resolvable for {type_name}.{property}")]
    MissingGetter {
        type_name: &'static str,
        property: &'static str,
    },
    #[error("Unknown serializable type: {0}")]
    UnknownType(String),
    #[error("Malformed value for property {property}: {message}")]
    Malformed {
        property: &'static str,
        message: String,
    },
}

impl PropertyError {
    pub fn malformed(property: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Malformed {
            property,
            message: err.to_string(),
        }
    }
}

/// Result type for property access.
pub type PropertyResult<T> = Result<T, PropertyError>;

/// Rejection outcomes of acceptance-checked mutations.
///
/// Together with `Ok` this forms the tri-state result of interactive operations:
/// rejection is an expected outcome and never an error condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AcceptError {
    #[error("Shape type is not accepted here")]
    NotAccepted,
    #[error("Invalid input")]
    InvalidInput,
}

/// Result type for acceptance-checked mutations.
pub type AcceptResult<T> = Result<T, AcceptError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_ordering() {
        assert!(FormatVersion::new(1, 2, 0) > FormatVersion::new(1, 1, 9));
        assert!(FormatVersion::new(2, 0, 0) > FormatVersion::new(1, 9, 9));
        assert_eq!(FormatVersion::new(1, 1, 0).to_string(), "1.1.0");
    }

    #[test]
    fn test_error_messages() {
        let err = DiagramError::IncompatibleVersion {
            found: FormatVersion::new(3, 0, 0),
            supported: FormatVersion::new(1, 1, 0),
        };
        assert!(err.to_string().contains("3.0.0"));
        assert_eq!(AcceptError::NotAccepted.to_string(), "Shape type is not accepted here");
    }
}
