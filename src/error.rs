//! The error type used throughout this crate.

use std::fmt;

/// Stable error codes distinguishing the broad class of failure.
///
/// See the crate docs for the recovery policy: nothing is silently
/// swallowed, every failure propagates as a [`CodecError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Header or payload malformed.
    InvalidFormat,
    /// Reader advanced past the sentinel.
    UnexpectedEof,
    /// Schema structural check failed (arity, width, missing key, ...).
    ConstraintViolated,
    /// Encoding rejected due to a type mismatch or unsupported input.
    Encode,
    /// `String.match()` failed.
    StringMatch,
    /// `String.prefix()` failed.
    StringPrefix,
    /// `String.suffix()` failed.
    StringSuffix,
    /// `String.pattern()` failed.
    StringPattern,
    /// `Email` schema failed to parse.
    StringEmail,
    /// `URI` schema failed to parse.
    StringUrl,
    /// `Lang` schema failed to parse.
    StringLang,
    /// Numeric bound violated.
    OutOfRange,
    /// Date bound violated.
    DateOutOfRange,
    /// Offset would exceed the 13-bit header capacity.
    PayloadTooLarge,
    /// A dynamic value could not be encoded.
    UnsupportedType,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Structured detail attached to an error, when the failure carries more
/// context than the code alone.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorDetail {
    /// No extra detail.
    None,
    /// A byte-width mismatch (e.g. an `Int16` schema reading a 4-byte slot).
    Width { expected: u8, actual: u8 },
    /// A numeric range violation.
    Range {
        min: Option<f64>,
        max: Option<f64>,
        actual: f64,
    },
    /// A string comparison failure.
    StringMismatch { expected: String, actual: String },
    /// A required map key was absent.
    MissingKey { key: String },
}

/// The single error type returned by every fallible operation in this
/// crate.
///
/// Errors carry enough structure for a caller to build good diagnostics
/// without parsing a message string: a stable [`ErrorCode`], the component
/// that raised it, an optional field name, an optional byte position, and
/// an optional nested cause.
#[derive(Debug, Clone, PartialEq)]
pub struct CodecError {
    pub code: ErrorCode,
    pub component: &'static str,
    pub field: Option<String>,
    pub position: Option<usize>,
    pub detail: ErrorDetail,
    pub inner: Option<Box<CodecError>>,
}

impl CodecError {
    pub fn new(code: ErrorCode, component: &'static str) -> Self {
        CodecError {
            code,
            component,
            field: None,
            position: None,
            detail: ErrorDetail::None,
            inner: None,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_position(mut self, position: usize) -> Self {
        self.position = Some(position);
        self
    }

    pub fn with_detail(mut self, detail: ErrorDetail) -> Self {
        self.detail = detail;
        self
    }

    pub fn with_inner(mut self, inner: CodecError) -> Self {
        self.inner = Some(Box::new(inner));
        self
    }

    pub fn range(component: &'static str, min: Option<f64>, max: Option<f64>, actual: f64) -> Self {
        CodecError::new(ErrorCode::OutOfRange, component)
            .with_detail(ErrorDetail::Range { min, max, actual })
    }

    pub fn missing_key(component: &'static str, key: impl Into<String>) -> Self {
        let key = key.into();
        CodecError::new(ErrorCode::ConstraintViolated, component)
            .with_detail(ErrorDetail::MissingKey { key: key.clone() })
            .with_field(key)
    }
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} in {}", self.code, self.component)?;
        if let Some(field) = &self.field {
            write!(f, " (field `{field}`)")?;
        }
        if let Some(position) = self.position {
            write!(f, " at byte {position}")?;
        }
        match &self.detail {
            ErrorDetail::None => {}
            ErrorDetail::Width { expected, actual } => {
                write!(f, ": expected width {expected}, got {actual}")?;
            }
            ErrorDetail::Range { min, max, actual } => {
                write!(f, ": value {actual} out of range [{min:?}, {max:?}]")?;
            }
            ErrorDetail::StringMismatch { expected, actual } => {
                write!(f, ": expected `{expected}`, got `{actual}`")?;
            }
            ErrorDetail::MissingKey { key } => {
                write!(f, ": missing key `{key}`")?;
            }
        }
        if let Some(inner) = &self.inner {
            write!(f, "\ncaused by: {inner}")?;
        }
        Ok(())
    }
}

impl std::error::Error for CodecError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.inner.as_deref().map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CodecError>;
