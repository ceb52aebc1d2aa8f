//! The error taxonomy for every fallible operation in this crate.

use thiserror::Error;

/// Every way a rune operation can fail.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("secret must be at least 1 byte")]
    SecretTooShort,

    #[error("secret must be at most 55 bytes, got {0}")]
    SecretTooLong(usize),

    #[error("authentication code must be exactly 32 bytes, got {0}")]
    InvalidAuthBase(usize),

    #[error("malformed hex authentication code: {0}")]
    BadHex(#[from] hex::FromHexError),

    #[error("malformed base64 rune: {0}")]
    BadBase64(#[from] base64::DecodeError),

    #[error("field names may not contain punctuation")]
    InvalidField,

    #[error("unique id alternative must use the `=` operator and appear first")]
    InvalidUniqueId,

    #[error("unknown restriction operator")]
    UnknownOperator,

    #[error("alternative has no operator")]
    NoOperator,

    #[error("unique id restriction may not contain other alternatives")]
    UniqueIdHasAlternatives,

    #[error("unique id may not contain a hyphen")]
    HyphenInUniqueId,

    #[error("malformed rune text")]
    MalformedText,

    #[error("authentication code is not a valid extension of the secret")]
    Unauthorized,

    #[error("restriction failed: {0}")]
    PredicateFailed(String),
}

pub type Result<T> = std::result::Result<T, Error>;
