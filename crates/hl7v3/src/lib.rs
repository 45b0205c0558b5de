//! # Helios HL7v3 model
//!
//! Static metadata and the instance model consumed by the XML ITS 1.0
//! formatter in `helios-its-serde`.
//!
//! - [`TypeDefinition`] / [`PropertyDescriptor`] declare, per hierarchy level,
//!   how each field of a type is carried on the wire.
//! - [`TypeCatalog`] holds every definition known to a formatter and answers
//!   supertype and assignability questions.
//! - [`Instance`] is the in-memory object the formatter graphs and parses.
//! - [`datatypes`] registers the core datatypes (II, CS, CE, ST, BL, INT, REAL,
//!   PQ, TS) and offers typed Rust structs for some of them.
//!
//! ```
//! use helios_hl7v3::{Instance, PropertyDescriptor, TypeCatalog, TypeDefinition};
//! use helios_hl7v3::datatypes::{self, II};
//!
//! let catalog = TypeCatalog::with_core_datatypes()
//!     .with(
//!         TypeDefinition::new("Patient")
//!             .entry_point()
//!             .property(PropertyDescriptor::element("id", II).mandatory()),
//!     )
//!     .unwrap();
//! assert!(catalog.contains("Patient"));
//!
//! let patient = Instance::new("Patient").with("id", Instance::new(datatypes::II));
//! assert!(patient.get_instance("id").is_some());
//! ```

mod catalog;
pub mod datatypes;
mod instance;
mod metadata;

pub use catalog::{CatalogError, TypeCatalog};
pub use datatypes::{ConversionError, ItsStructure};
pub use instance::{Instance, NullFlavor, Value};
pub use metadata::{
    ChoiceCandidate, Conformance, FieldDefinition, PropertyDescriptor, PropertyRole,
    PropertyType, TypeDefinition,
};

pub use helios_its_support::{Primitive, PrimitiveKind, Timestamp, TimestampPrecision};
