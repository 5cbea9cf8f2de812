use std::fmt;

use thiserror::Error;

use crate::dictionary::DictKind;

/// One problem reported while compiling or validating a definition.
///
/// `line` is the 1-based source line when the diagnostic comes from the
/// dictionary compiler, `0` otherwise.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub key: String,
    pub line: usize,
    pub message: String,
}

impl Diagnostic {
    pub fn new(key: impl Into<String>, line: usize, message: impl Into<String>) -> Self {
        Diagnostic {
            key: key.into(),
            line,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.line > 0 {
            write!(f, "line {}: [{}] {}", self.line, self.key, self.message)
        } else {
            write!(f, "[{}] {}", self.key, self.message)
        }
    }
}

/// Non-empty list of validation diagnostics.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValidationErrors(pub Vec<Diagnostic>);

impl ValidationErrors {
    pub fn single(key: impl Into<String>, message: impl Into<String>) -> Self {
        ValidationErrors(vec![Diagnostic::new(key, 0, message)])
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.as_slice() {
            [] => write!(f, "no diagnostics"),
            [one] => write!(f, "{one}"),
            [first, rest @ ..] => write!(f, "{first} (and {} more)", rest.len()),
        }
    }
}

#[derive(Error, Debug)]
pub enum GeoframeError {
    #[error("{dictionary} dictionary has no entry named '{key}'")]
    NotFound { dictionary: DictKind, key: String },

    #[error("Dictionary format error: {0}")]
    Format(String),

    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    #[error("Unable to perform file operation: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unable to swap the temporary dictionary into place: {0}")]
    Persist(String),

    #[error("UTF-8 Path error: {0}")]
    Utf8PathError(String),

    #[error("Unknown projection key: {0}")]
    UnknownProjection(String),

    #[error("Unknown unit name: {0}")]
    UnknownUnit(String),

    #[error("Unknown transformation method: {0}")]
    UnknownMethod(String),

    #[error("Projection {0} has no conversion formulas in this build")]
    ProjectionNotSupported(String),

    #[error("Point ({lng}, {lat}) is outside the domain of projection {projection}")]
    OutOfDomain {
        projection: String,
        lng: f64,
        lat: f64,
    },

    #[error("Invalid geodetic transformation '{name}': {reason}")]
    InvalidTransform { name: String, reason: String },

    #[error("Geodetic transformation '{0}' is disabled")]
    TransformDisabled(String),

    #[error("Error during the nom parsing: {0}")]
    NomParsingError(String),

    #[error("WKT error: {0}")]
    Wkt(String),

    #[error("Compilation cancelled by the warning handler at record '{0}'")]
    Cancelled(String),
}

impl From<tempfile::PersistError> for GeoframeError {
    fn from(err: tempfile::PersistError) -> Self {
        GeoframeError::Persist(err.error.to_string())
    }
}

impl GeoframeError {
    pub(crate) fn format(msg: impl Into<String>) -> Self {
        GeoframeError::Format(msg.into())
    }

    pub(crate) fn invalid_transform(name: &str, reason: impl Into<String>) -> Self {
        GeoframeError::InvalidTransform {
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    /// `true` for the system class of failures (I/O, temp-file swap).
    pub fn is_system_error(&self) -> bool {
        matches!(self, GeoframeError::Io(_) | GeoframeError::Persist(_))
    }
}

impl PartialEq for GeoframeError {
    fn eq(&self, other: &Self) -> bool {
        use GeoframeError::*;
        match (self, other) {
            (
                NotFound {
                    dictionary: d1,
                    key: k1,
                },
                NotFound {
                    dictionary: d2,
                    key: k2,
                },
            ) => d1 == d2 && k1 == k2,
            (Format(a), Format(b)) => a == b,
            (Validation(a), Validation(b)) => a == b,

            // I/O errors are not comparable: same variant means equal
            (Io(_), Io(_)) => true,

            (Persist(a), Persist(b)) => a == b,
            (Utf8PathError(a), Utf8PathError(b)) => a == b,
            (UnknownProjection(a), UnknownProjection(b)) => a == b,
            (UnknownUnit(a), UnknownUnit(b)) => a == b,
            (UnknownMethod(a), UnknownMethod(b)) => a == b,
            (ProjectionNotSupported(a), ProjectionNotSupported(b)) => a == b,
            (
                InvalidTransform {
                    name: n1,
                    reason: r1,
                },
                InvalidTransform {
                    name: n2,
                    reason: r2,
                },
            ) => n1 == n2 && r1 == r2,
            (
                OutOfDomain {
                    projection: p1,
                    lng: x1,
                    lat: y1,
                },
                OutOfDomain {
                    projection: p2,
                    lng: x2,
                    lat: y2,
                },
            ) => p1 == p2 && x1 == x2 && y1 == y2,
            (TransformDisabled(a), TransformDisabled(b)) => a == b,
            (NomParsingError(a), NomParsingError(b)) => a == b,
            (Wkt(a), Wkt(b)) => a == b,
            (Cancelled(a), Cancelled(b)) => a == b,
            _ => false,
        }
    }
}

#[cfg(test)]
mod test_errors {
    use super::*;

    #[test]
    fn test_validation_display() {
        let errs = ValidationErrors(vec![
            Diagnostic::new("TEST1", 2, "no transformation method specified"),
            Diagnostic::new("TEST1", 0, "second"),
        ]);
        assert_eq!(
            errs.to_string(),
            "line 2: [TEST1] no transformation method specified (and 1 more)"
        );
    }

    #[test]
    fn test_io_errors_compare_by_variant() {
        let a = GeoframeError::Io(std::io::Error::other("a"));
        let b = GeoframeError::Io(std::io::Error::other("b"));
        assert_eq!(a, b);
        assert!(a.is_system_error());
        assert_ne!(a, GeoframeError::Format("a".into()));
    }
}
