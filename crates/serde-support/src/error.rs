//! Errors raised by the primitive wire codec.

use thiserror::Error;

use crate::PrimitiveKind;

/// A wire text value that cannot be decoded into the requested primitive.
///
/// Codec failures are syntax failures: the formatter propagates them to the
/// caller instead of recording a diagnostic.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("'{text}' is not a valid {kind} value")]
    Invalid { kind: PrimitiveKind, text: String },

    #[error("{kind} value must not be empty")]
    Empty { kind: PrimitiveKind },

    #[error("invalid timestamp '{text}': {reason}")]
    Timestamp { text: String, reason: &'static str },
}

impl CodecError {
    pub(crate) fn invalid(kind: PrimitiveKind, text: &str) -> Self {
        CodecError::Invalid {
            kind,
            text: text.to_string(),
        }
    }

    pub(crate) fn timestamp(text: &str, reason: &'static str) -> Self {
        CodecError::Timestamp {
            text: text.to_string(),
            reason,
        }
    }
}
