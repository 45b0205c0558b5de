use helios_hl7v3::CatalogError;
use helios_its_support::CodecError;

/// Fatal failures of a graph or parse call.
///
/// Anything that leaves the document unusable ends up here and aborts the
/// call. Structural and conformance problems are reported as diagnostics
/// instead (see [`crate::diagnostics`]).
#[derive(Debug)]
pub enum ItsError {
    /// XML syntax error reported by the reader
    Xml(quick_xml::Error),

    /// IO error while reading or writing a document
    Io(std::io::Error),

    /// Input that quick-xml accepts but that is not well-formed ITS XML
    Malformed(String),

    /// The document ended inside an open element
    UnexpectedEof(String),

    /// A type name that is not registered in the catalog
    UnknownType { name: String, path: String },

    /// A non-null element that would instantiate an abstract type
    AbstractType { name: String, path: String },

    /// Attribute text the primitive codec could not decode
    InvalidPrimitive { path: String, source: CodecError },

    /// A `nullFlavor` attribute carrying an unknown code
    InvalidNullFlavor { path: String, code: String },

    /// Broken type metadata (unknown supertype, inheritance cycle)
    Metadata(CatalogError),

    /// Invalid formatter configuration
    Config(String),

    /// Custom error message
    Custom(String),
}

impl std::fmt::Display for ItsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ItsError::Xml(e) => write!(f, "XML error: {}", e),
            ItsError::Io(e) => write!(f, "IO error: {}", e),
            ItsError::Malformed(msg) => write!(f, "malformed document: {}", msg),
            ItsError::UnexpectedEof(location) => {
                write!(f, "unexpected end of document {}", location)
            }
            ItsError::UnknownType { name, path } if path.is_empty() => {
                write!(f, "unknown type '{}'", name)
            }
            ItsError::UnknownType { name, path } => {
                write!(f, "unknown type '{}' at {}", name, path)
            }
            ItsError::AbstractType { name, path } => {
                write!(f, "cannot instantiate abstract type '{}' at {}", name, path)
            }
            ItsError::InvalidPrimitive { path, source } if path.is_empty() => {
                write!(f, "invalid primitive: {}", source)
            }
            ItsError::InvalidPrimitive { path, source } => {
                write!(f, "invalid primitive at {}: {}", path, source)
            }
            ItsError::InvalidNullFlavor { path, code } => {
                write!(f, "invalid nullFlavor '{}' at {}", code, path)
            }
            ItsError::Metadata(e) => write!(f, "metadata error: {}", e),
            ItsError::Config(msg) => write!(f, "configuration error: {}", msg),
            ItsError::Custom(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for ItsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ItsError::Xml(e) => Some(e),
            ItsError::Io(e) => Some(e),
            ItsError::InvalidPrimitive { source, .. } => Some(source),
            ItsError::Metadata(e) => Some(e),
            _ => None,
        }
    }
}

impl From<quick_xml::Error> for ItsError {
    fn from(err: quick_xml::Error) -> Self {
        ItsError::Xml(err)
    }
}

impl From<std::io::Error> for ItsError {
    fn from(err: std::io::Error) -> Self {
        ItsError::Io(err)
    }
}

impl From<CodecError> for ItsError {
    fn from(err: CodecError) -> Self {
        ItsError::InvalidPrimitive {
            path: String::new(),
            source: err,
        }
    }
}

impl From<CatalogError> for ItsError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::UnknownType { name } => ItsError::UnknownType {
                name,
                path: String::new(),
            },
            other => ItsError::Metadata(other),
        }
    }
}

impl From<String> for ItsError {
    fn from(msg: String) -> Self {
        ItsError::Custom(msg)
    }
}

impl From<&str> for ItsError {
    fn from(msg: &str) -> Self {
        ItsError::Custom(msg.to_string())
    }
}

/// Result type alias for formatter operations
pub type Result<T> = std::result::Result<T, ItsError>;

#[cfg(test)]
mod tests {
    use super::*;
    use helios_its_support::{from_wire_text, PrimitiveKind};
    use std::error::Error;

    #[test]
    fn test_codec_error_keeps_source() {
        let err: ItsError = from_wire_text("maybe", PrimitiveKind::Boolean)
            .unwrap_err()
            .into();
        assert!(err.source().is_some());
        assert!(err.to_string().starts_with("invalid primitive"));
    }

    #[test]
    fn test_unknown_type_from_catalog() {
        let err: ItsError = CatalogError::UnknownType {
            name: "XYZ".to_string(),
        }
        .into();
        assert!(matches!(err, ItsError::UnknownType { ref name, .. } if name == "XYZ"));
        assert_eq!(err.to_string(), "unknown type 'XYZ'");
    }
}
