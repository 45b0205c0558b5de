//! Primitive wire codec for the HL7v3 XML ITS 1.0 formatter.
//!
//! Every attribute-role leaf in an ITS 1.0 document is plain text. This crate
//! owns the mapping between that text and typed [`Primitive`] values, so the
//! formatter never has to know how a boolean, a decimal or a timestamp is
//! spelled on the wire.
//!
//! ```
//! use helios_its_support::{from_wire_text, to_wire_text, Primitive, PrimitiveKind};
//!
//! let value = from_wire_text("12.50", PrimitiveKind::Real).unwrap();
//! assert_eq!(to_wire_text(&value), "12.50");
//! assert_eq!(from_wire_text("true", PrimitiveKind::Boolean).unwrap(), Primitive::Boolean(true));
//! ```

mod error;
mod timestamp;

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub use error::CodecError;
pub use timestamp::{Timestamp, TimestampPrecision};

/// The primitive shapes an attribute value can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveKind {
    /// `true` / `false` (`1` / `0` accepted on input).
    Boolean,
    /// Signed integer.
    Integer,
    /// Arbitrary precision decimal, scale preserved.
    Real,
    /// Free text.
    String,
    /// A coded token: non-empty, no whitespace.
    Code,
    /// OID, UUID or RUID identifier.
    Uid,
    /// HL7 point in time.
    Timestamp,
}

impl PrimitiveKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrimitiveKind::Boolean => "boolean",
            PrimitiveKind::Integer => "integer",
            PrimitiveKind::Real => "real",
            PrimitiveKind::String => "string",
            PrimitiveKind::Code => "code",
            PrimitiveKind::Uid => "uid",
            PrimitiveKind::Timestamp => "timestamp",
        }
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded attribute value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Primitive {
    Boolean(bool),
    Integer(i64),
    Real(Decimal),
    String(String),
    Code(String),
    Uid(String),
    Timestamp(Timestamp),
}

impl Primitive {
    /// Returns the kind this value was decoded as.
    pub fn kind(&self) -> PrimitiveKind {
        match self {
            Primitive::Boolean(_) => PrimitiveKind::Boolean,
            Primitive::Integer(_) => PrimitiveKind::Integer,
            Primitive::Real(_) => PrimitiveKind::Real,
            Primitive::String(_) => PrimitiveKind::String,
            Primitive::Code(_) => PrimitiveKind::Code,
            Primitive::Uid(_) => PrimitiveKind::Uid,
            Primitive::Timestamp(_) => PrimitiveKind::Timestamp,
        }
    }

    /// Borrows the text of string-like values.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Primitive::String(s) | Primitive::Code(s) | Primitive::Uid(s) => Some(s),
            _ => None,
        }
    }
}

impl From<bool> for Primitive {
    #[inline]
    fn from(value: bool) -> Self {
        Primitive::Boolean(value)
    }
}

impl From<i64> for Primitive {
    #[inline]
    fn from(value: i64) -> Self {
        Primitive::Integer(value)
    }
}

impl From<Decimal> for Primitive {
    #[inline]
    fn from(value: Decimal) -> Self {
        Primitive::Real(value)
    }
}

impl From<Timestamp> for Primitive {
    #[inline]
    fn from(value: Timestamp) -> Self {
        Primitive::Timestamp(value)
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&to_wire_text(self))
    }
}

/// Formats a primitive as attribute text.
///
/// Escaping is left to the XML writer.
pub fn to_wire_text(value: &Primitive) -> String {
    match value {
        Primitive::Boolean(b) => bool_to_string(*b).to_string(),
        Primitive::Integer(i) => i.to_string(),
        Primitive::Real(d) => d.to_string(),
        Primitive::String(s) | Primitive::Code(s) | Primitive::Uid(s) => s.clone(),
        Primitive::Timestamp(ts) => ts.to_string(),
    }
}

/// Decodes attribute text into a primitive of the requested kind.
pub fn from_wire_text(text: &str, kind: PrimitiveKind) -> Result<Primitive, CodecError> {
    match kind {
        PrimitiveKind::Boolean => match text.trim() {
            "true" | "1" => Ok(Primitive::Boolean(true)),
            "false" | "0" => Ok(Primitive::Boolean(false)),
            other => Err(CodecError::invalid(kind, other)),
        },
        PrimitiveKind::Integer => text
            .trim()
            .parse::<i64>()
            .map(Primitive::Integer)
            .map_err(|_| CodecError::invalid(kind, text)),
        PrimitiveKind::Real => {
            let trimmed = text.trim();
            Decimal::from_str(trimmed)
                .or_else(|_| Decimal::from_scientific(trimmed))
                .map(Primitive::Real)
                .map_err(|_| CodecError::invalid(kind, text))
        }
        PrimitiveKind::String => Ok(Primitive::String(text.to_string())),
        PrimitiveKind::Code => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                Err(CodecError::Empty { kind })
            } else if trimmed.chars().any(char::is_whitespace) {
                Err(CodecError::invalid(kind, text))
            } else {
                Ok(Primitive::Code(trimmed.to_string()))
            }
        }
        PrimitiveKind::Uid => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                Err(CodecError::Empty { kind })
            } else if is_uid(trimmed) {
                Ok(Primitive::Uid(trimmed.to_string()))
            } else {
                Err(CodecError::invalid(kind, text))
            }
        }
        PrimitiveKind::Timestamp => Timestamp::parse(text).map(Primitive::Timestamp),
    }
}

/// OIDs are dotted digits, UUIDs hex with hyphens, RUIDs start with a letter.
fn is_uid(text: &str) -> bool {
    let oid = text
        .split('.')
        .all(|arc| !arc.is_empty() && arc.bytes().all(|b| b.is_ascii_digit()));
    let uuid = text.len() == 36
        && text
            .bytes()
            .all(|b| b.is_ascii_hexdigit() || b == b'-');
    let ruid = text.starts_with(|c: char| c.is_ascii_alphabetic())
        && text.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-');
    oid || uuid || ruid
}

/// Converts a Rust boolean to its wire representation.
#[inline]
pub fn bool_to_string(b: bool) -> &'static str {
    if b { "true" } else { "false" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_boolean_accepts_numeric_forms() {
        assert_eq!(
            from_wire_text("1", PrimitiveKind::Boolean).unwrap(),
            Primitive::Boolean(true)
        );
        assert_eq!(
            from_wire_text("false", PrimitiveKind::Boolean).unwrap(),
            Primitive::Boolean(false)
        );
        assert!(from_wire_text("yes", PrimitiveKind::Boolean).is_err());
    }

    #[test]
    fn test_real_keeps_scale() {
        let value = from_wire_text("1.50", PrimitiveKind::Real).unwrap();
        assert_eq!(value, Primitive::Real(dec!(1.50)));
        assert_eq!(to_wire_text(&value), "1.50");
    }

    #[test]
    fn test_real_accepts_scientific() {
        let value = from_wire_text("1.5e2", PrimitiveKind::Real).unwrap();
        assert_eq!(value, Primitive::Real(dec!(150)));
    }

    #[test]
    fn test_integer_rejects_fraction() {
        assert!(matches!(
            from_wire_text("4.2", PrimitiveKind::Integer),
            Err(CodecError::Invalid { kind: PrimitiveKind::Integer, .. })
        ));
    }

    #[test]
    fn test_code_rejects_whitespace() {
        assert!(from_wire_text("A B", PrimitiveKind::Code).is_err());
        assert_eq!(
            from_wire_text("", PrimitiveKind::Code),
            Err(CodecError::Empty {
                kind: PrimitiveKind::Code
            })
        );
    }

    #[test]
    fn test_uid_forms() {
        assert!(from_wire_text("2.16.840.1.113883.19", PrimitiveKind::Uid).is_ok());
        assert!(
            from_wire_text("6f1c2d3e-aaaa-bbbb-cccc-0123456789ab", PrimitiveKind::Uid).is_ok()
        );
        assert!(from_wire_text("2.16..840", PrimitiveKind::Uid).is_err());
        assert!(from_wire_text("not a uid", PrimitiveKind::Uid).is_err());
    }

    #[test]
    fn test_string_is_verbatim() {
        let value = from_wire_text("  padded  ", PrimitiveKind::String).unwrap();
        assert_eq!(value.as_str(), Some("  padded  "));
    }
}
