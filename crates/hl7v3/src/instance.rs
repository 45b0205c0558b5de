//! The in-memory form of HL7v3 objects.
//!
//! An [`Instance`] is a typed bag of field values: it knows its runtime type
//! (the structural name registered in the catalog), optionally carries a
//! [`NullFlavor`], and maps field keys to [`Value`]s. The formatter reads and
//! assigns fields by the `field` key of each property descriptor.

use std::collections::BTreeMap;
use std::fmt;

use helios_its_support::Primitive;
use serde::{Deserialize, Serialize};

/// HL7 reasons for a value being absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NullFlavor {
    /// No information.
    NI,
    /// Invalid.
    INV,
    /// Other.
    OTH,
    /// Positive infinity.
    PINF,
    /// Negative infinity.
    NINF,
    /// Unencoded.
    UNC,
    /// Derived.
    DER,
    /// Unknown.
    UNK,
    /// Asked but unknown.
    ASKU,
    /// Temporarily unavailable.
    NAV,
    /// Sufficient quantity.
    QS,
    /// Not asked.
    NASK,
    /// Trace.
    TRC,
    /// Masked.
    MSK,
    /// Not applicable.
    NA,
    /// Not present.
    NP,
}

impl NullFlavor {
    const ALL: [NullFlavor; 16] = [
        NullFlavor::NI,
        NullFlavor::INV,
        NullFlavor::OTH,
        NullFlavor::PINF,
        NullFlavor::NINF,
        NullFlavor::UNC,
        NullFlavor::DER,
        NullFlavor::UNK,
        NullFlavor::ASKU,
        NullFlavor::NAV,
        NullFlavor::QS,
        NullFlavor::NASK,
        NullFlavor::TRC,
        NullFlavor::MSK,
        NullFlavor::NA,
        NullFlavor::NP,
    ];

    /// Returns the wire code.
    pub fn as_code(&self) -> &'static str {
        match self {
            NullFlavor::NI => "NI",
            NullFlavor::INV => "INV",
            NullFlavor::OTH => "OTH",
            NullFlavor::PINF => "PINF",
            NullFlavor::NINF => "NINF",
            NullFlavor::UNC => "UNC",
            NullFlavor::DER => "DER",
            NullFlavor::UNK => "UNK",
            NullFlavor::ASKU => "ASKU",
            NullFlavor::NAV => "NAV",
            NullFlavor::QS => "QS",
            NullFlavor::NASK => "NASK",
            NullFlavor::TRC => "TRC",
            NullFlavor::MSK => "MSK",
            NullFlavor::NA => "NA",
            NullFlavor::NP => "NP",
        }
    }

    /// Parses a wire code.
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|nf| nf.as_code() == code)
    }
}

impl fmt::Display for NullFlavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_code())
    }
}

/// A field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Primitive(Primitive),
    Instance(Instance),
    List(Vec<Value>),
}

impl Value {
    pub fn as_primitive(&self) -> Option<&Primitive> {
        match self {
            Value::Primitive(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_instance(&self) -> Option<&Instance> {
        match self {
            Value::Instance(i) => Some(i),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the members of a list, or the value itself as a single member.
    pub fn members(&self) -> &[Value] {
        match self {
            Value::List(items) => items,
            other => std::slice::from_ref(other),
        }
    }

    /// An empty list carries nothing to send.
    pub fn is_empty(&self) -> bool {
        matches!(self, Value::List(items) if items.is_empty())
    }

    /// Returns true when the value is an instance carrying a null flavor.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Instance(i) if i.is_null())
    }
}

impl From<Primitive> for Value {
    #[inline]
    fn from(value: Primitive) -> Self {
        Value::Primitive(value)
    }
}

impl From<Instance> for Value {
    #[inline]
    fn from(value: Instance) -> Self {
        Value::Instance(value)
    }
}

impl From<Vec<Value>> for Value {
    #[inline]
    fn from(value: Vec<Value>) -> Self {
        Value::List(value)
    }
}

impl From<Vec<Instance>> for Value {
    fn from(value: Vec<Instance>) -> Self {
        Value::List(value.into_iter().map(Value::Instance).collect())
    }
}

/// An HL7v3 object.
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    type_name: String,
    null_flavor: Option<NullFlavor>,
    fields: BTreeMap<String, Value>,
}

impl Instance {
    /// Creates an empty instance of the given runtime type.
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            null_flavor: None,
            fields: BTreeMap::new(),
        }
    }

    /// Creates an instance that carries only a null flavor.
    pub fn null(type_name: impl Into<String>, null_flavor: NullFlavor) -> Self {
        Self {
            null_flavor: Some(null_flavor),
            ..Self::new(type_name)
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn null_flavor(&self) -> Option<NullFlavor> {
        self.null_flavor
    }

    pub fn set_null_flavor(&mut self, null_flavor: Option<NullFlavor>) {
        self.null_flavor = null_flavor;
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        self.null_flavor.is_some()
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Reads a string-like primitive field.
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.get(field)
            .and_then(Value::as_primitive)
            .and_then(Primitive::as_str)
    }

    pub fn get_instance(&self, field: &str) -> Option<&Instance> {
        self.get(field).and_then(Value::as_instance)
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(field.into(), value.into());
    }

    /// Appends to a collection field, turning a single value into a list.
    pub fn push(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        let value = value.into();
        match self.fields.entry(field.into()) {
            std::collections::btree_map::Entry::Vacant(slot) => {
                slot.insert(Value::List(vec![value]));
            }
            std::collections::btree_map::Entry::Occupied(mut slot) => match slot.get_mut() {
                Value::List(items) => items.push(value),
                existing => {
                    let first = std::mem::replace(existing, Value::List(Vec::new()));
                    *existing = Value::List(vec![first, value]);
                }
            },
        }
    }

    /// Builder form of [`Instance::set`].
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(field, value);
        self
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.fields.remove(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// True when no field is set and no null flavor is carried.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.null_flavor.is_none()
    }
}
