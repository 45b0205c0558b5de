//! XML ITS 1.0 wire handling.
//!
//! The engines never talk to quick-xml directly. They write through an
//! [`XmlSink`] and read through an [`XmlCursor`]; [`QuickXmlSink`] and
//! [`QuickXmlCursor`] are the implementations over quick-xml.
//!
//! ## Wire conventions
//!
//! ### Root element
//!
//! An entry-point type opens a root element named after itself. Any other
//! type is wrapped in a synthetic root (`instance` by default) that names
//! the type with `xsi:type`:
//!
//! ```xml
//! <PRPA_IN201305UV02 xmlns="urn:hl7-org:v3"
//!     xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">...</PRPA_IN201305UV02>
//!
//! <instance xmlns="urn:hl7-org:v3"
//!     xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:type="PQ" value="1" unit="mg"/>
//! ```
//!
//! ### Ordering
//!
//! Attributes come first, then datatype elements, then associations; see
//! [`crate::metadata`].
//!
//! ### Type discriminator
//!
//! When the runtime type of a value differs from the type its property
//! expects, the element carries `xsi:type`:
//!
//! ```xml
//! <value xsi:type="PQ" value="37.5" unit="Cel"/>
//! ```
//!
//! ### Null flavors
//!
//! A value that is deliberately absent is sent with its reason code and
//! nothing else. Associations additionally carry `xsi:nil`:
//!
//! ```xml
//! <id nullFlavor="UNK"/>
//! <subject xsi:nil="true" nullFlavor="NI"/>
//! ```
//!
//! ### Lists
//!
//! A collection-valued attribute is written as one space separated list;
//! a collection-valued element repeats once per member.

mod cursor;
mod de;
mod ser;
mod sink;
pub mod utils;

pub use cursor::{QuickXmlCursor, StartNode, XmlAttribute, XmlCursor, XmlNode};
pub use sink::{QuickXmlSink, XmlSink};
