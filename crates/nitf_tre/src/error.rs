//! Error types that can be emitted from this library

use miette::Diagnostic;
use thiserror::Error;

use crate::field::FieldKind;

/// Error type for library
#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    /// Transparent wrapper for [`std::io::Error`]
    #[error(transparent)]
    IOError(#[from] std::io::Error),

    /// Transparent wrapper for [`binrw::Error`]
    #[error(transparent)]
    BinRWError(#[from] binrw::Error),

    /// The byte source ran out before a field could be read in full
    #[error("field {key} needs {expected} bytes but only {available} are available")]
    Truncated {
        /// Qualified key of the field being read
        key: String,
        /// Width the description asked for
        expected: usize,
        /// Bytes that were actually available
        available: usize,
    },

    /// A width, count or condition refers to a field that has not been read yet
    #[error("reference to {tag} cannot be resolved from the fields read so far")]
    MissingReference {
        /// The referenced tag
        tag: String,
    },

    /// A field the description requires is absent from the field store
    #[error("required field {key} is missing")]
    MissingField {
        /// Qualified key of the missing field
        key: String,
    },

    /// A value does not fit into its fixed slot
    #[error("value for {key} needs {length} bytes but the field is {width} wide")]
    FieldTooLong {
        /// Qualified key of the field
        key: String,
        /// Width of the slot
        width: usize,
        /// Length of the value after removing padding
        length: usize,
    },

    /// Field content does not convert to the requested number
    #[error("value `{value}` is not numeric")]
    NotNumeric {
        /// Lossy text form of the offending value
        value: String,
    },

    /// A value is not acceptable for its field kind
    #[error("invalid value for {key}: {reason}")]
    InvalidValue {
        /// Qualified key of the field
        key: String,
        /// What is wrong with it
        reason: String,
    },

    /// A value does not fit the width a field is being built with
    #[error("{kind} value needs {length} bytes but the field is {width} wide")]
    ValueTooLong {
        kind: FieldKind,
        width: usize,
        length: usize,
    },

    /// A value cannot be held by a field kind
    #[error("invalid {kind} value: {reason}")]
    InvalidContent { kind: FieldKind, reason: String },

    /// A computed width or count could not be evaluated
    #[error("expression `{expression}` failed: {reason}")]
    Arithmetic {
        /// The expression in postfix form
        expression: String,
        /// What went wrong
        reason: &'static str,
    },

    /// A tagged record header could not be parsed
    #[error("invalid tagged record header: {0}")]
    InvalidHeader(String),

    /// No description is available for the tag
    #[error("no description available for {tag}")]
    NoDescription {
        /// The TRE tag
        tag: String,
    },

    /// A description is not usable
    #[error(transparent)]
    MalformedDescription(#[from] DescriptionError),
}

/// Coarse classification of an [`Error`]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Io,
    Truncated,
    MissingReference,
    MissingField,
    FieldTooLong,
    NotNumeric,
    InvalidValue,
    Arithmetic,
    InvalidHeader,
    NoDescription,
    MalformedDescription,
}

impl Error {
    /// Returns the kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::IOError(_) => ErrorKind::Io,
            Error::BinRWError(binrw::Error::Io(_)) => ErrorKind::Io,
            Error::BinRWError(_) => ErrorKind::InvalidHeader,
            Error::Truncated { .. } => ErrorKind::Truncated,
            Error::MissingReference { .. } => ErrorKind::MissingReference,
            Error::MissingField { .. } => ErrorKind::MissingField,
            Error::FieldTooLong { .. } | Error::ValueTooLong { .. } => ErrorKind::FieldTooLong,
            Error::NotNumeric { .. } => ErrorKind::NotNumeric,
            Error::InvalidValue { .. } | Error::InvalidContent { .. } => ErrorKind::InvalidValue,
            Error::Arithmetic { .. } => ErrorKind::Arithmetic,
            Error::InvalidHeader(_) => ErrorKind::InvalidHeader,
            Error::NoDescription { .. } => ErrorKind::NoDescription,
            Error::MalformedDescription(_) => ErrorKind::MalformedDescription,
        }
    }

    /// Attach the qualified key of the field a value was meant for
    pub fn with_key(self, key: &str) -> Error {
        match self {
            Error::ValueTooLong { width, length, .. } => Error::FieldTooLong {
                key: key.to_owned(),
                width,
                length,
            },
            Error::InvalidContent { reason, .. } => Error::InvalidValue {
                key: key.to_owned(),
                reason,
            },
            err => err,
        }
    }
}

/// Problems found while validating a [`crate::description::Description`] or
/// [`crate::set::DescriptionSet`]
#[derive(Error, Diagnostic, Debug, Clone, PartialEq, Eq)]
pub enum DescriptionError {
    /// end of loop at {index} without a matching start
    #[error("end of loop at instruction {index} has no matching start")]
    UnmatchedLoopEnd { index: usize },

    /// end of condition at {index} without a matching start
    #[error("end of condition at instruction {index} has no matching start")]
    UnmatchedConditionEnd { index: usize },

    /// block opened at {index} is never closed
    #[error("block opened at instruction {index} is never closed")]
    UnclosedBlock { index: usize },

    /// instructions follow the end marker
    #[error("instruction {index} follows the end marker")]
    TrailingInstructions { index: usize },

    /// scalar tag is empty or contains the key separator
    #[error("instruction {index} has an invalid tag `{tag}`")]
    InvalidTag { index: usize, tag: String },

    /// fixed width of zero
    #[error("field {tag} has a fixed width of zero")]
    ZeroWidth { tag: String },

    /// reference to a tag not declared before it
    #[error("instruction {index} refers to {tag}, which is not declared before it")]
    UnknownReference { index: usize, tag: String },

    /// reference to a tag declared inside a loop that does not enclose it
    #[error("instruction {index} refers to {tag}, which is declared inside a loop that does not enclose it")]
    ReferenceOutOfScope { index: usize, tag: String },

    /// the same tag twice at one loop depth
    #[error("field {tag} is declared more than once at the same loop depth")]
    DuplicateTag { tag: String },

    /// the same key produced twice in one walk
    #[error("key {key} was produced twice in one pass")]
    DuplicateKey { key: String },

    /// postfix expression error
    #[error("invalid expression `{expression}`: {reason}")]
    InvalidExpression {
        expression: String,
        reason: &'static str,
    },

    /// condition text error
    #[error("invalid condition `{text}`")]
    InvalidCondition { text: String },

    /// value rule could not be built
    #[error("invalid rule `{rule}`: {reason}")]
    InvalidRule { rule: String, reason: String },

    /// default index outside the variant list
    #[error("default index {index} is out of range for {len} variants")]
    DefaultOutOfRange { index: usize, len: usize },
}

/// Generic result type with crate's Error as its error variant
pub type Result<T> = core::result::Result<T, Error>;
