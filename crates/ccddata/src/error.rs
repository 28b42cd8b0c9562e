use std::path::PathBuf;

use thiserror::Error;

use crate::unit::Unit;

/// Broad category of an [`Error`].
///
/// Callers that only care whether a failure was caused by a wrongly typed
/// argument, a well-typed but unacceptable value, malformed FITS bytes, or the
/// filesystem can match on this instead of on individual variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// An argument lacks a required capability or is of an unsupported kind.
    Type,
    /// An argument has the right kind but an unacceptable value.
    Value,
    /// Malformed or unsupported FITS content.
    Format,
    /// Filesystem failure.
    Io,
}

/// All errors produced by this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// No pixel array was supplied, or it has no elements.
    #[error("image data is required and must be non-empty")]
    MissingData,
    /// Metadata source is neither a mapping nor a header.
    #[error("metadata must be a mapping or a FITS header, got {0}")]
    InvalidMeta(&'static str),
    /// Assigned value does not provide the uncertainty capability.
    #[error("uncertainty must implement the Uncertainty capability, got {0}")]
    InvalidUncertainty(&'static str),
    /// Operation requires a different physical unit.
    #[error("unit must be {expected}, found {found}")]
    UnitMismatch { expected: Unit, found: Unit },
    /// Container holds more than one HDU.
    #[error("FITS container holds {0} HDUs; only single-HDU input is supported")]
    AmbiguousHdus(usize),
    /// Container holds no HDU at all.
    #[error("FITS container holds no HDUs")]
    EmptyHduList,
    /// Two arrays that must agree in shape do not.
    #[error("shape mismatch: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        found: Vec<usize>,
    },
    /// Gain must be finite and strictly positive.
    #[error("gain must be finite and positive, got {0}")]
    InvalidGain(f64),
    /// Header value or text that one 80-byte card cannot hold unchanged.
    #[error("{keyword} cannot be stored in a FITS card: {reason}")]
    InvalidValue {
        keyword: String,
        reason: &'static str,
    },
    /// Malformed FITS header block.
    #[error("invalid FITS header: {0}")]
    InvalidHeader(&'static str),
    /// Unrecognized BITPIX value.
    #[error("invalid BITPIX value: {0}")]
    InvalidBitpix(i64),
    /// A required keyword was not found in the header.
    #[error("missing required keyword: {0}")]
    MissingKeyword(&'static str),
    /// Keyword is too long or contains characters FITS does not allow.
    #[error("invalid keyword name: {0:?}")]
    InvalidKeyword(String),
    /// Premature end of data while reading.
    #[error("unexpected end of file")]
    UnexpectedEof,
    /// Refused to overwrite an existing file.
    #[error("file already exists: {}", .0.display())]
    FileExists(PathBuf),
    /// An I/O error from the standard library.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::MissingData
            | Error::InvalidMeta(_)
            | Error::InvalidUncertainty(_)
            | Error::UnitMismatch { .. } => ErrorKind::Type,
            Error::AmbiguousHdus(_)
            | Error::EmptyHduList
            | Error::ShapeMismatch { .. }
            | Error::InvalidGain(_)
            | Error::InvalidValue { .. } => ErrorKind::Value,
            Error::InvalidHeader(_)
            | Error::InvalidBitpix(_)
            | Error::MissingKeyword(_)
            | Error::InvalidKeyword(_)
            | Error::UnexpectedEof => ErrorKind::Format,
            Error::FileExists(_) | Error::Io(_) => ErrorKind::Io,
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = core::result::Result<T, Error>;
