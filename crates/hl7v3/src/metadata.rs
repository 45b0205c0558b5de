//! Declarative per-property metadata.
//!
//! A [`TypeDefinition`] describes one level of an HL7v3 type hierarchy: the
//! fields declared at that level and, for each field that is mapped onto the
//! wire, a [`PropertyDescriptor`]. Definitions are registered once in a
//! [`TypeCatalog`](crate::TypeCatalog) and never change afterwards.

use helios_its_support::PrimitiveKind;
use serde::{Deserialize, Serialize};

/// How a property is carried on the wire.
///
/// The declaration order of the variants is the emission order: attributes,
/// then elements, then associations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyRole {
    /// An XML attribute holding primitive text.
    Attribute,
    /// A child element holding a datatype.
    Element,
    /// A child element holding another model class.
    Association,
}

/// HL7 conformance of a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Conformance {
    #[default]
    Optional,
    /// Must be sent; a null flavor is acceptable.
    Required,
    /// Must be sent with a non-null value.
    Mandatory,
    /// Must be sent; a null flavor is acceptable, absence is not.
    Populated,
}

impl Conformance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Conformance::Optional => "optional",
            Conformance::Required => "required",
            Conformance::Mandatory => "mandatory",
            Conformance::Populated => "populated",
        }
    }
}

/// The statically declared type of a property.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PropertyType {
    /// Attribute text decoded by the primitive codec.
    Primitive(PrimitiveKind),
    /// A nested structure, named by its structural (wire) name.
    Structure(String),
}

impl PropertyType {
    pub fn structure_name(&self) -> Option<&str> {
        match self {
            PropertyType::Structure(name) => Some(name),
            PropertyType::Primitive(_) => None,
        }
    }
}

/// One candidate type of a choice property.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChoiceCandidate {
    /// Structural name of the candidate type.
    pub type_name: String,
    /// Wire name used instead of the property's name when this candidate is
    /// chosen. When absent the property name is used and the candidate is
    /// told apart by the type discriminator.
    pub name: Option<String>,
    /// Limits the candidate to documents whose root is this type.
    pub root: Option<String>,
}

impl ChoiceCandidate {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            name: None,
            root: None,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn scoped_to(mut self, root: impl Into<String>) -> Self {
        self.root = Some(root.into());
        self
    }

    /// Returns true when the candidate applies to a document rooted at `root`.
    pub fn applies_to_root(&self, root: &str) -> bool {
        self.root.as_deref().is_none_or(|scope| scope == root)
    }
}

/// Wire metadata of a single property.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PropertyDescriptor {
    /// Key of the value inside an [`Instance`](crate::Instance).
    pub field: String,
    /// Attribute or element local name on the wire.
    pub name: String,
    pub role: PropertyRole,
    pub conformance: Conformance,
    pub min_occurs: u32,
    /// `None` means unbounded.
    pub max_occurs: Option<u32>,
    /// Emission order within the declaring level and role.
    pub sort_key: i32,
    pub declared_type: PropertyType,
    /// Candidate types; more than one makes this a choice property.
    pub choices: Vec<ChoiceCandidate>,
    /// Text the attribute must carry.
    pub fixed_value: Option<String>,
    /// Text written when the attribute is absent.
    pub default_value: Option<String>,
}

impl PropertyDescriptor {
    fn new(name: impl Into<String>, role: PropertyRole, declared_type: PropertyType) -> Self {
        let name = name.into();
        Self {
            field: name.clone(),
            name,
            role,
            conformance: Conformance::Optional,
            min_occurs: 0,
            max_occurs: Some(1),
            sort_key: 0,
            declared_type,
            choices: Vec::new(),
            fixed_value: None,
            default_value: None,
        }
    }

    /// Declares an attribute-role property.
    pub fn attribute(name: impl Into<String>, kind: PrimitiveKind) -> Self {
        Self::new(name, PropertyRole::Attribute, PropertyType::Primitive(kind))
    }

    /// Declares an element-role (datatype) property.
    pub fn element(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self::new(
            name,
            PropertyRole::Element,
            PropertyType::Structure(type_name.into()),
        )
    }

    /// Declares an association-role (model class) property.
    pub fn association(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self::new(
            name,
            PropertyRole::Association,
            PropertyType::Structure(type_name.into()),
        )
    }

    /// Stores the value under a field key different from the wire name.
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = field.into();
        self
    }

    pub fn with_sort_key(mut self, sort_key: i32) -> Self {
        self.sort_key = sort_key;
        self
    }

    /// Sets the conformance; anything but `Optional` raises `min_occurs` to 1.
    pub fn with_conformance(mut self, conformance: Conformance) -> Self {
        self.conformance = conformance;
        if conformance != Conformance::Optional && self.min_occurs == 0 {
            self.min_occurs = 1;
        }
        self
    }

    pub fn required(self) -> Self {
        self.with_conformance(Conformance::Required)
    }

    pub fn mandatory(self) -> Self {
        self.with_conformance(Conformance::Mandatory)
    }

    pub fn populated(self) -> Self {
        self.with_conformance(Conformance::Populated)
    }

    pub fn with_occurs(mut self, min_occurs: u32, max_occurs: Option<u32>) -> Self {
        self.min_occurs = min_occurs;
        self.max_occurs = max_occurs;
        self
    }

    /// Shorthand for an unbounded collection.
    pub fn repeating(mut self) -> Self {
        self.max_occurs = None;
        self
    }

    /// Adds a candidate type. Candidates are tried in the order they are added.
    pub fn with_choice(mut self, candidate: ChoiceCandidate) -> Self {
        self.choices.push(candidate);
        self
    }

    pub fn with_fixed_value(mut self, value: impl Into<String>) -> Self {
        self.fixed_value = Some(value.into());
        self
    }

    pub fn with_default_value(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    #[inline]
    pub fn is_choice(&self) -> bool {
        self.choices.len() > 1
    }

    #[inline]
    pub fn is_collection(&self) -> bool {
        self.max_occurs != Some(1)
    }

    /// Finds the choice candidate whose own wire name is `name`.
    pub fn candidate_named(&self, name: &str) -> Option<&ChoiceCandidate> {
        self.choices
            .iter()
            .find(|c| c.name.as_deref() == Some(name))
    }

    /// Returns true when an element called `name` belongs to this property.
    pub fn matches_element(&self, name: &str) -> bool {
        self.role != PropertyRole::Attribute
            && (self.name == name || self.candidate_named(name).is_some())
    }
}

/// A field declared by one level of a type hierarchy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDefinition {
    pub name: String,
    /// `None` for fields that are not mapped onto the wire.
    pub metadata: Option<PropertyDescriptor>,
}

/// Static registration of one type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDefinition {
    /// Structural (wire) name, e.g. `II` or `PRPA_IN201305UV02`.
    pub name: String,
    pub supertype: Option<String>,
    /// May appear as a document root.
    pub entry_point: bool,
    pub is_abstract: bool,
    /// Fields declared at this level only.
    pub fields: Vec<FieldDefinition>,
}

impl TypeDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            supertype: None,
            entry_point: false,
            is_abstract: false,
            fields: Vec::new(),
        }
    }

    pub fn extends(mut self, supertype: impl Into<String>) -> Self {
        self.supertype = Some(supertype.into());
        self
    }

    pub fn entry_point(mut self) -> Self {
        self.entry_point = true;
        self
    }

    pub fn abstract_type(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    /// Declares a wire-mapped property.
    pub fn property(mut self, descriptor: PropertyDescriptor) -> Self {
        self.fields.push(FieldDefinition {
            name: descriptor.field.clone(),
            metadata: Some(descriptor),
        });
        self
    }

    /// Declares a field that carries no wire metadata.
    pub fn unmapped_field(mut self, name: impl Into<String>) -> Self {
        self.fields.push(FieldDefinition {
            name: name.into(),
            metadata: None,
        });
        self
    }
}
