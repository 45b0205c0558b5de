//! # Helios HL7v3 XML ITS 1.0 Formatter
//!
//! This crate graphs HL7v3 object graphs to XML ITS 1.0 and parses them
//! back, driven entirely by the static property metadata registered in a
//! [`TypeCatalog`](helios_hl7v3::TypeCatalog).
//!
//! ## Features
//!
//! - **Metadata-driven traversal**: attribute, element and association
//!   properties are emitted in a deterministic order (supertype levels
//!   first, then role, then sort key) and read back by wire name.
//! - **Choices and substitution**: `xsi:type` discriminators and
//!   per-candidate element names, resolved against the type hierarchy.
//! - **Null flavors**: null instances carry only `nullFlavor`; missing
//!   required values may be sent as `nullFlavor="NI"`.
//! - **Adapters**: per-type replacements for the generic traversal, able
//!   to call back into the engine for nested values.
//! - **Diagnostics**: every call returns a [`DiagnosticList`] and a
//!   [`ResultOutcome`]; unknown content is reported, never fatal.
//!
//! ## Example
//!
//! ```rust
//! use helios_hl7v3::{Instance, PrimitiveKind, PropertyDescriptor, TypeCatalog, TypeDefinition};
//! use helios_its_serde::{FormatterConfig, ItsFormatter, ResultOutcome};
//!
//! let catalog = TypeCatalog::with_core_datatypes()
//!     .with(
//!         TypeDefinition::new("Observation")
//!             .entry_point()
//!             .property(PropertyDescriptor::attribute("moodCode", PrimitiveKind::Code).with_fixed_value("EVN"))
//!             .property(PropertyDescriptor::element("code", "CE")),
//!     )
//!     .unwrap();
//! let formatter = ItsFormatter::builder(catalog)
//!     .config(FormatterConfig::for_testing())
//!     .build()
//!     .unwrap();
//!
//! let result = formatter.to_xml_string(&Instance::new("Observation")).unwrap();
//! assert!(result.value.starts_with(r#"<Observation xmlns="urn:hl7-org:v3""#));
//! assert!(result.value.contains(r#"moodCode="EVN""#));
//! assert_eq!(result.outcome, ResultOutcome::Accepted);
//! ```

mod config;
pub mod context;
pub mod diagnostics;
mod error;
mod formatter;
pub mod metadata;
pub mod registry;
pub mod validate;
pub mod xml;

pub use config::FormatterConfig;
pub use context::GraphContext;
pub use diagnostics::{DiagnosticDetail, DiagnosticList, IssueCode, ResultOutcome, Severity};
pub use error::{ItsError, Result};
pub use formatter::{FormatterResult, ItsFormatter, ItsFormatterBuilder};
pub use metadata::{MetadataResolver, TypeDescriptor};
pub use registry::{Adapter, AdapterRegistry, TextAdapter};
pub use validate::{CardinalityValidator, ConformanceValidator, ValidationContext};
pub use xml::{QuickXmlCursor, QuickXmlSink, StartNode, XmlAttribute, XmlCursor, XmlNode, XmlSink};
