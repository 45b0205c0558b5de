//! Conformance validation.
//!
//! The formatter runs a [`ConformanceValidator`] on every instance it
//! graphs or parses through the generic traversal (when validation is
//! enabled). Validators only report; they never stop the traversal.

use helios_hl7v3::{Conformance, Instance, PropertyDescriptor, PropertyRole, Value};

use crate::context::GraphContext;
use crate::diagnostics::{DiagnosticDetail, DiagnosticList, IssueCode};
use crate::metadata::TypeDescriptor;

/// What a validator knows about the call it runs in.
#[derive(Debug, Clone, Copy)]
pub struct ValidationContext<'a> {
    graph: &'a GraphContext<'a>,
    synthesizes_nulls: bool,
}

impl<'a> ValidationContext<'a> {
    pub fn new(graph: &'a GraphContext<'a>, synthesizes_nulls: bool) -> Self {
        Self {
            graph,
            synthesizes_nulls,
        }
    }

    pub fn graph(&self) -> &'a GraphContext<'a> {
        self.graph
    }

    /// True while graphing with auto-synthesis on: missing required element
    /// and association values will be sent as `nullFlavor="NI"`.
    pub fn synthesizes_nulls(&self) -> bool {
        self.synthesizes_nulls
    }

    pub fn path(&self) -> String {
        self.graph.path()
    }
}

/// Checks one instance against the properties of its type.
pub trait ConformanceValidator: Send + Sync {
    fn validate(
        &self,
        instance: &Instance,
        descriptor: &TypeDescriptor,
        context: &ValidationContext<'_>,
    ) -> DiagnosticList;
}

/// Default validator: conformance and occurrence bounds.
///
/// - Mandatory properties must be present and not null-flavored.
/// - Required and Populated properties must be present. Required element
///   and association properties are exempt while nulls are synthesized.
/// - Collections must hold between `min_occurs` and `max_occurs` members.
/// - Single-valued properties must not hold a list.
///
/// Attributes with a fixed or default value count as present, since that
/// text is written whenever the value is absent.
#[derive(Debug, Clone, Copy, Default)]
pub struct CardinalityValidator;

impl ConformanceValidator for CardinalityValidator {
    fn validate(
        &self,
        instance: &Instance,
        descriptor: &TypeDescriptor,
        context: &ValidationContext<'_>,
    ) -> DiagnosticList {
        let mut diagnostics = DiagnosticList::new();
        if instance.is_null() {
            return diagnostics;
        }

        for property in descriptor.properties() {
            let value = instance.get(&property.field);
            let count = value.map_or(0, |v| v.members().len());
            let path = property_path(context, property);

            if count == 0 && property.conformance != Conformance::Optional {
                if !is_implied(property, context) {
                    diagnostics.push(
                        DiagnosticDetail::error(
                            IssueCode::MissingValue,
                            format!(
                                "{} property '{}' of {} is absent",
                                property.conformance.as_str(),
                                property.name,
                                instance.type_name()
                            ),
                        )
                        .with_path(path.clone()),
                    );
                }
            } else if count < property.min_occurs as usize {
                diagnostics.push(
                    DiagnosticDetail::error(
                        IssueCode::Cardinality,
                        format!(
                            "'{}' holds {} value(s), at least {} expected",
                            property.name, count, property.min_occurs
                        ),
                    )
                    .with_path(path.clone()),
                );
            }

            if property.conformance == Conformance::Mandatory
                && value.is_some_and(|v| v.members().iter().any(Value::is_null))
            {
                diagnostics.push(
                    DiagnosticDetail::error(
                        IssueCode::NullNotAllowed,
                        format!("mandatory property '{}' carries a null flavor", property.name),
                    )
                    .with_path(path.clone()),
                );
            }

            if property.is_collection() {
                if let Some(max) = property.max_occurs
                    && count > max as usize
                {
                    diagnostics.push(
                        DiagnosticDetail::error(
                            IssueCode::Cardinality,
                            format!(
                                "'{}' holds {} values, at most {} allowed",
                                property.name, count, max
                            ),
                        )
                        .with_path(path),
                    );
                }
            } else if matches!(value, Some(Value::List(_))) {
                diagnostics.push(
                    DiagnosticDetail::error(
                        IssueCode::Cardinality,
                        format!("single-valued property '{}' holds a list", property.name),
                    )
                    .with_path(path),
                );
            }
        }

        diagnostics
    }
}

/// An absent value the engine will send anyway.
fn is_implied(property: &PropertyDescriptor, context: &ValidationContext<'_>) -> bool {
    match property.role {
        PropertyRole::Attribute => {
            property.fixed_value.is_some() || property.default_value.is_some()
        }
        PropertyRole::Element | PropertyRole::Association => {
            property.conformance == Conformance::Required && context.synthesizes_nulls()
        }
    }
}

fn property_path(context: &ValidationContext<'_>, property: &PropertyDescriptor) -> String {
    match property.role {
        PropertyRole::Attribute => context.graph().attribute_path(&property.name),
        _ => context.graph().child_path(&property.name),
    }
}
