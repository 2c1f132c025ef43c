use std::fmt;

use thiserror::Error;

/// A single structural finding from the layer-0 validator.
///
/// `path` is a JSON-pointer-style location inside the IR document, e.g.
/// `/messages/0/signals/2/bit_length`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaIssue {
    pub path: String,
    pub message: String,
}

impl fmt::Display for SchemaIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Structural failure of an IR document.
///
/// Raised when a document cannot be parsed into the typed model at all
/// (unknown keys, type mismatches, missing fields) or when the layer-0
/// validator finds primitive-range violations on the parsed model.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("IR document does not match the schema: {0}")]
    Parse(#[from] serde_yml::Error),

    #[error("IR document has {} structural issue(s), first: {}", .0.len(), first_issue(.0))]
    Invalid(Vec<SchemaIssue>),
}

/// Category of a semantic (layer-1) validation issue.
///
/// The string form is stable and intended for report consumption.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SemanticCategory {
    DlcOverflow,
    BitOverlap,
    RangeInverted,
    DefaultOutOfRange,
    ScaleZero,
    EnumOutOfRange,
    DuplicateId,
    DuplicateName,
}

impl SemanticCategory {
    /// Stable category string used in terminal output and reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            SemanticCategory::DlcOverflow => "DLC_OVERFLOW",
            SemanticCategory::BitOverlap => "BIT_OVERLAP",
            SemanticCategory::RangeInverted => "RANGE_INVERTED",
            SemanticCategory::DefaultOutOfRange => "DEFAULT_OUT_OF_RANGE",
            SemanticCategory::ScaleZero => "SCALE_ZERO",
            SemanticCategory::EnumOutOfRange => "ENUM_OUT_OF_RANGE",
            SemanticCategory::DuplicateId => "DUPLICATE_ID",
            SemanticCategory::DuplicateName => "DUPLICATE_NAME",
        }
    }
}

impl fmt::Display for SemanticCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single cross-field finding from the layer-1 validator.
#[derive(Debug, Clone, PartialEq)]
pub struct SemanticIssue {
    pub category: SemanticCategory,
    pub path: String,
    pub message: String,
}

impl fmt::Display for SemanticIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}: {}", self.category, self.path, self.message)
    }
}

/// Batch of semantic issues.
///
/// The layer-1 validator never short-circuits; every issue found in one pass
/// over the Spec ends up here.
#[derive(Debug, Error)]
#[error("IR document has {} semantic issue(s), first: {}", .issues.len(), first_issue(.issues))]
pub struct SemanticError {
    pub issues: Vec<SemanticIssue>,
}

fn first_issue<T: fmt::Display>(issues: &[T]) -> String {
    issues.first().map(T::to_string).unwrap_or_else(|| "none".into())
}

/// Failure of the reference bit codec.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("{got} raw value(s) supplied for a message with {expected} signal(s)")]
    ValueCount { expected: usize, got: usize },

    #[error("raw value {value:#x} is out of range for signal '{signal}'")]
    OutOfRange { signal: String, value: u64 },

    #[error("payload is {got} byte(s) but the message declares {expected}")]
    PayloadSize { expected: usize, got: usize },
}
