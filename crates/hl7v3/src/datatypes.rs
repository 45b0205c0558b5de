//! Core HL7v3 datatypes.
//!
//! Only the handful of datatypes the formatter itself relies on live here:
//! their [`TypeDefinition`]s are registered by
//! [`TypeCatalog::with_core_datatypes`](crate::TypeCatalog::with_core_datatypes),
//! and a few of them have typed Rust counterparts implementing
//! [`ItsStructure`] for callers that prefer structs over [`Instance`]s.

use helios_its_support::{Primitive, PrimitiveKind, Timestamp};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::instance::{Instance, NullFlavor, Value};
use crate::metadata::{PropertyDescriptor, TypeDefinition};

pub const ANY: &str = "ANY";
pub const BL: &str = "BL";
pub const INT: &str = "INT";
pub const REAL: &str = "REAL";
pub const TS: &str = "TS";
pub const ST: &str = "ST";
pub const II: &str = "II";
pub const CS: &str = "CS";
pub const CE: &str = "CE";
pub const PQ: &str = "PQ";

/// Field key holding the character content of an `ST`.
pub const ST_VALUE_FIELD: &str = "value";

fn attr(name: &str, kind: PrimitiveKind, sort_key: i32) -> PropertyDescriptor {
    PropertyDescriptor::attribute(name, kind).with_sort_key(sort_key)
}

/// Returns the definitions of the core datatypes.
pub fn core_definitions() -> Vec<TypeDefinition> {
    let value_of = |name: &str, kind: PrimitiveKind| {
        TypeDefinition::new(name)
            .extends(ANY)
            .property(attr("value", kind, 1))
    };

    vec![
        TypeDefinition::new(ANY).abstract_type(),
        value_of(BL, PrimitiveKind::Boolean),
        value_of(INT, PrimitiveKind::Integer),
        value_of(REAL, PrimitiveKind::Real),
        value_of(TS, PrimitiveKind::Timestamp),
        // Character content is written by the text adapter.
        TypeDefinition::new(ST).extends(ANY),
        TypeDefinition::new(II)
            .extends(ANY)
            .property(attr("root", PrimitiveKind::Uid, 1))
            .property(attr("extension", PrimitiveKind::String, 2))
            .property(attr("assigningAuthorityName", PrimitiveKind::String, 3))
            .property(attr("displayable", PrimitiveKind::Boolean, 4)),
        TypeDefinition::new(CS)
            .extends(ANY)
            .property(attr("code", PrimitiveKind::Code, 1)),
        TypeDefinition::new(CE)
            .extends(ANY)
            .property(attr("code", PrimitiveKind::Code, 1))
            .property(attr("codeSystem", PrimitiveKind::Uid, 2))
            .property(attr("codeSystemName", PrimitiveKind::String, 3))
            .property(attr("codeSystemVersion", PrimitiveKind::String, 4))
            .property(attr("displayName", PrimitiveKind::String, 5))
            .property(PropertyDescriptor::element("originalText", ST).with_sort_key(1))
            .property(
                PropertyDescriptor::element("translation", CE)
                    .with_sort_key(2)
                    .repeating(),
            ),
        TypeDefinition::new(PQ)
            .extends(ANY)
            .property(attr("value", PrimitiveKind::Real, 1))
            .property(attr("unit", PrimitiveKind::Code, 2)),
    ]
}

/// A typed value could not be read out of an [`Instance`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConversionError {
    #[error("expected an instance of '{expected}', found '{found}'")]
    WrongType { expected: String, found: String },

    #[error("field '{field}' does not hold a {expected} value")]
    InvalidField {
        field: String,
        expected: PrimitiveKind,
    },
}

/// Conversion between a typed Rust struct and the formatter's [`Instance`].
pub trait ItsStructure: Sized {
    /// Structural name registered in the catalog.
    const TYPE_NAME: &'static str;

    fn to_instance(&self) -> Instance;

    fn from_instance(instance: &Instance) -> Result<Self, ConversionError>;
}

fn expect_type(instance: &Instance, expected: &str) -> Result<(), ConversionError> {
    if instance.type_name() == expected {
        Ok(())
    } else {
        Err(ConversionError::WrongType {
            expected: expected.to_string(),
            found: instance.type_name().to_string(),
        })
    }
}

fn read_text(
    instance: &Instance,
    field: &str,
    kind: PrimitiveKind,
) -> Result<Option<String>, ConversionError> {
    match instance.get(field) {
        None => Ok(None),
        Some(Value::Primitive(p)) if p.kind() == kind => Ok(p.as_str().map(str::to_string)),
        Some(_) => Err(ConversionError::InvalidField {
            field: field.to_string(),
            expected: kind,
        }),
    }
}

fn set_opt(instance: &mut Instance, field: &str, value: Option<Primitive>) {
    if let Some(value) = value {
        instance.set(field, value);
    }
}

/// Instance identifier.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Ii {
    pub null_flavor: Option<NullFlavor>,
    pub root: Option<String>,
    pub extension: Option<String>,
    pub assigning_authority_name: Option<String>,
    pub displayable: Option<bool>,
}

impl Ii {
    pub fn new(root: impl Into<String>, extension: impl Into<String>) -> Self {
        Self {
            root: Some(root.into()),
            extension: Some(extension.into()),
            ..Default::default()
        }
    }
}

impl ItsStructure for Ii {
    const TYPE_NAME: &'static str = II;

    fn to_instance(&self) -> Instance {
        let mut instance = Instance::new(II);
        instance.set_null_flavor(self.null_flavor);
        set_opt(&mut instance, "root", self.root.clone().map(Primitive::Uid));
        set_opt(
            &mut instance,
            "extension",
            self.extension.clone().map(Primitive::String),
        );
        set_opt(
            &mut instance,
            "assigningAuthorityName",
            self.assigning_authority_name.clone().map(Primitive::String),
        );
        set_opt(
            &mut instance,
            "displayable",
            self.displayable.map(Primitive::Boolean),
        );
        instance
    }

    fn from_instance(instance: &Instance) -> Result<Self, ConversionError> {
        expect_type(instance, II)?;
        let displayable = match instance.get("displayable") {
            None => None,
            Some(Value::Primitive(Primitive::Boolean(b))) => Some(*b),
            Some(_) => {
                return Err(ConversionError::InvalidField {
                    field: "displayable".to_string(),
                    expected: PrimitiveKind::Boolean,
                });
            }
        };
        Ok(Self {
            null_flavor: instance.null_flavor(),
            root: read_text(instance, "root", PrimitiveKind::Uid)?,
            extension: read_text(instance, "extension", PrimitiveKind::String)?,
            assigning_authority_name: read_text(
                instance,
                "assigningAuthorityName",
                PrimitiveKind::String,
            )?,
            displayable,
        })
    }
}

/// Simple coded value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Cs {
    pub null_flavor: Option<NullFlavor>,
    pub code: Option<String>,
}

impl Cs {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            null_flavor: None,
            code: Some(code.into()),
        }
    }
}

impl ItsStructure for Cs {
    const TYPE_NAME: &'static str = CS;

    fn to_instance(&self) -> Instance {
        let mut instance = Instance::new(CS);
        instance.set_null_flavor(self.null_flavor);
        set_opt(&mut instance, "code", self.code.clone().map(Primitive::Code));
        instance
    }

    fn from_instance(instance: &Instance) -> Result<Self, ConversionError> {
        expect_type(instance, CS)?;
        Ok(Self {
            null_flavor: instance.null_flavor(),
            code: read_text(instance, "code", PrimitiveKind::Code)?,
        })
    }
}

/// Physical quantity.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Pq {
    pub null_flavor: Option<NullFlavor>,
    pub value: Option<Decimal>,
    pub unit: Option<String>,
}

impl Pq {
    pub fn new(value: Decimal, unit: impl Into<String>) -> Self {
        Self {
            null_flavor: None,
            value: Some(value),
            unit: Some(unit.into()),
        }
    }
}

impl ItsStructure for Pq {
    const TYPE_NAME: &'static str = PQ;

    fn to_instance(&self) -> Instance {
        let mut instance = Instance::new(PQ);
        instance.set_null_flavor(self.null_flavor);
        set_opt(&mut instance, "value", self.value.map(Primitive::Real));
        set_opt(&mut instance, "unit", self.unit.clone().map(Primitive::Code));
        instance
    }

    fn from_instance(instance: &Instance) -> Result<Self, ConversionError> {
        expect_type(instance, PQ)?;
        let value = match instance.get("value") {
            None => None,
            Some(Value::Primitive(Primitive::Real(d))) => Some(*d),
            Some(_) => {
                return Err(ConversionError::InvalidField {
                    field: "value".to_string(),
                    expected: PrimitiveKind::Real,
                });
            }
        };
        Ok(Self {
            null_flavor: instance.null_flavor(),
            value,
            unit: read_text(instance, "unit", PrimitiveKind::Code)?,
        })
    }
}

/// Point in time.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Ts {
    pub null_flavor: Option<NullFlavor>,
    pub value: Option<Timestamp>,
}

impl ItsStructure for Ts {
    const TYPE_NAME: &'static str = TS;

    fn to_instance(&self) -> Instance {
        let mut instance = Instance::new(TS);
        instance.set_null_flavor(self.null_flavor);
        set_opt(&mut instance, "value", self.value.map(Primitive::Timestamp));
        instance
    }

    fn from_instance(instance: &Instance) -> Result<Self, ConversionError> {
        expect_type(instance, TS)?;
        let value = match instance.get("value") {
            None => None,
            Some(Value::Primitive(Primitive::Timestamp(ts))) => Some(*ts),
            Some(_) => {
                return Err(ConversionError::InvalidField {
                    field: "value".to_string(),
                    expected: PrimitiveKind::Timestamp,
                });
            }
        };
        Ok(Self {
            null_flavor: instance.null_flavor(),
            value,
        })
    }
}

/// Builds an `ST` instance holding `text`.
pub fn st(text: impl Into<String>) -> Instance {
    Instance::new(ST).with(ST_VALUE_FIELD, Primitive::String(text.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use helios_its_support::TimestampPrecision;
    use rust_decimal_macros::dec;

    #[test]
    fn test_ii_conversion() {
        let ii = Ii {
            displayable: Some(true),
            ..Ii::new("2.16.840.1.113883.19", "12345")
        };
        let instance = ii.to_instance();
        assert_eq!(instance.get_str("root"), Some("2.16.840.1.113883.19"));
        assert_eq!(Ii::from_instance(&instance).unwrap(), ii);
    }

    #[test]
    fn test_wrong_type_rejected() {
        let instance = Cs::new("M").to_instance();
        assert_eq!(
            Ii::from_instance(&instance),
            Err(ConversionError::WrongType {
                expected: "II".to_string(),
                found: "CS".to_string()
            })
        );
    }

    #[test]
    fn test_invalid_field_rejected() {
        let instance = Instance::new(PQ).with("value", Primitive::String("ten".into()));
        assert!(matches!(
            Pq::from_instance(&instance),
            Err(ConversionError::InvalidField { .. })
        ));
    }

    #[test]
    fn test_pq_and_ts_conversion() {
        let pq = Pq::new(dec!(37.5), "Cel");
        assert_eq!(Pq::from_instance(&pq.to_instance()).unwrap(), pq);

        let when = NaiveDate::from_ymd_opt(2024, 3, 1)
            .and_then(|d| d.and_hms_opt(8, 30, 0))
            .unwrap();
        let ts = Ts {
            null_flavor: None,
            value: Some(Timestamp::new(when, TimestampPrecision::Minute)),
        };
        assert_eq!(Ts::from_instance(&ts.to_instance()).unwrap(), ts);
    }

    #[test]
    fn test_null_flavor_carried() {
        let cs = Cs {
            null_flavor: Some(NullFlavor::UNK),
            code: None,
        };
        let instance = cs.to_instance();
        assert!(instance.is_null());
        assert_eq!(Cs::from_instance(&instance).unwrap(), cs);
    }
}
