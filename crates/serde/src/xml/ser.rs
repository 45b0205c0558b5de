//! Graph engine: writes [`Instance`]s as XML ITS 1.0.
//!
//! Traversal is driven by the resolved [`TypeDescriptor`] of each instance's
//! runtime type, consulting the adapter registry before every nested value.

use std::collections::{HashMap, HashSet};

use helios_hl7v3::{
    ChoiceCandidate, Conformance, Instance, NullFlavor, PropertyDescriptor, PropertyRole,
    PropertyType, Value,
};
use helios_its_support::to_wire_text;
use tracing::{trace, warn};

use super::sink::XmlSink;
use super::utils::{HL7_NAMESPACE, NULL_FLAVOR_ATTRIBUTE, XSI_NAMESPACE, XSI_NIL, XSI_TYPE};
use crate::context::GraphContext;
use crate::diagnostics::{DiagnosticDetail, DiagnosticList, IssueCode};
use crate::error::Result;
use crate::formatter::ItsFormatter;
use crate::metadata::TypeDescriptor;
use crate::validate::ValidationContext;

impl ItsFormatter {
    /// Writes `instance` as a complete document: the root element, its
    /// namespace declarations and everything below it.
    pub fn write_document(
        &self,
        sink: &mut dyn XmlSink,
        instance: &Instance,
    ) -> Result<DiagnosticList> {
        let type_name = instance.type_name();
        let descriptor = self.resolver.resolve(type_name)?;
        let wrapped = !descriptor.is_entry_point();
        let element_name = if wrapped {
            self.config.wrapper_element.as_str()
        } else {
            type_name
        };

        sink.start_element(element_name)?;
        sink.write_attribute("xmlns", HL7_NAMESPACE)?;
        sink.write_attribute("xmlns:xsi", XSI_NAMESPACE)?;
        if wrapped {
            sink.write_attribute(XSI_TYPE, type_name)?;
        }

        let context = GraphContext::root(element_name, type_name);
        let diagnostics = self.graph(sink, instance, &context)?;
        sink.end_element()?;
        Ok(diagnostics)
    }

    /// Writes the content of the element the caller has just opened for
    /// `instance`: through its adapter when one is registered, by metadata
    /// otherwise.
    pub fn graph(
        &self,
        sink: &mut dyn XmlSink,
        instance: &Instance,
        context: &GraphContext<'_>,
    ) -> Result<DiagnosticList> {
        if let Some(adapter) = self.adapters.get(instance.type_name()) {
            trace!(type_name = instance.type_name(), path = %context.path(), "Graphing through adapter");
            return adapter.graph(self, sink, instance, context);
        }
        self.graph_structure(sink, instance, context)
    }

    /// Metadata-driven graphing, bypassing the adapter registry for
    /// `instance` itself. Nested values still go through [`Self::graph`].
    pub fn graph_structure(
        &self,
        sink: &mut dyn XmlSink,
        instance: &Instance,
        context: &GraphContext<'_>,
    ) -> Result<DiagnosticList> {
        let mut diagnostics = DiagnosticList::new();
        let descriptor = self.resolver.resolve(instance.type_name())?;
        report_dropped_fields(&descriptor, context, &mut diagnostics);

        if self.config.validate_conformance {
            let validation =
                ValidationContext::new(context, self.config.auto_synthesize_nulls);
            diagnostics.merge(self.validator.validate(instance, &descriptor, &validation));
        }

        if let Some(null_flavor) = instance.null_flavor() {
            sink.write_attribute(NULL_FLAVOR_ATTRIBUTE, null_flavor.as_code())?;
            return Ok(diagnostics);
        }

        let mut wire_names = WireNames::default();
        for (index, property) in descriptor.properties().iter().enumerate() {
            if !wire_names.claim_property(property, index) {
                trace!(name = %property.name, "Skipping repeated wire name");
                continue;
            }
            trace!(name = %property.name, role = ?property.role, "Graphing property");
            if property.role == PropertyRole::Attribute {
                self.graph_attribute(sink, instance, property, context, &mut diagnostics)?;
            } else {
                self.graph_children(
                    sink,
                    instance,
                    property,
                    &mut wire_names,
                    context,
                    &mut diagnostics,
                )?;
            }
        }
        Ok(diagnostics)
    }

    fn graph_attribute(
        &self,
        sink: &mut dyn XmlSink,
        instance: &Instance,
        property: &PropertyDescriptor,
        context: &GraphContext<'_>,
        diagnostics: &mut DiagnosticList,
    ) -> Result<()> {
        let text = match instance.get(&property.field) {
            Some(value) => attribute_text(value, property, context, diagnostics),
            None => property
                .fixed_value
                .clone()
                .or_else(|| property.default_value.clone()),
        };
        let Some(text) = text else {
            return Ok(());
        };

        if let Some(fixed) = &property.fixed_value
            && text != *fixed
        {
            diagnostics.push(
                DiagnosticDetail::warning(
                    IssueCode::FixedValueMismatch,
                    format!(
                        "'{}' is fixed to '{}' but holds '{}'",
                        property.name, fixed, text
                    ),
                )
                .with_path(context.attribute_path(&property.name)),
            );
        }

        sink.write_attribute(&property.name, &text)
    }

    fn graph_children<'d>(
        &self,
        sink: &mut dyn XmlSink,
        instance: &Instance,
        property: &'d PropertyDescriptor,
        wire_names: &mut WireNames<'d>,
        context: &GraphContext<'_>,
        diagnostics: &mut DiagnosticList,
    ) -> Result<()> {
        let synthesized;
        let value = match instance.get(&property.field) {
            Some(value) if !value.is_empty() => value,
            _ => {
                let Some(placeholder) = self.synthesize_null(property, context, diagnostics) else {
                    return Ok(());
                };
                synthesized = Value::Instance(placeholder);
                &synthesized
            }
        };

        for member in value.members() {
            match member {
                Value::Instance(child) => {
                    self.graph_member(sink, child, property, wire_names, context, diagnostics)?
                }
                other => diagnostics.push(
                    DiagnosticDetail::warning(
                        IssueCode::TypeMismatch,
                        format!(
                            "'{}' expects a structure but holds {}",
                            property.name,
                            describe(other)
                        ),
                    )
                    .with_path(context.child_path(&property.name)),
                ),
            }
        }
        Ok(())
    }

    /// Builds the `nullFlavor="NI"` stand-in for a missing required value.
    fn synthesize_null(
        &self,
        property: &PropertyDescriptor,
        context: &GraphContext<'_>,
        diagnostics: &mut DiagnosticList,
    ) -> Option<Instance> {
        if !self.config.auto_synthesize_nulls
            || !matches!(
                property.conformance,
                Conformance::Required | Conformance::Mandatory
            )
        {
            return None;
        }
        let type_name = property.declared_type.structure_name()?;
        diagnostics.push(
            DiagnosticDetail::information(
                IssueCode::NullSynthesized,
                format!("sent {} '{}' as nullFlavor=NI", property.conformance.as_str(), property.name),
            )
            .with_path(context.child_path(&property.name)),
        );
        Some(Instance::null(type_name, NullFlavor::NI))
    }

    /// Writes one element for one member of an element or association
    /// property.
    fn graph_member<'d>(
        &self,
        sink: &mut dyn XmlSink,
        child: &Instance,
        property: &'d PropertyDescriptor,
        wire_names: &mut WireNames<'d>,
        context: &GraphContext<'_>,
        diagnostics: &mut DiagnosticList,
    ) -> Result<()> {
        let declared = match &property.declared_type {
            PropertyType::Structure(name) => name.as_str(),
            PropertyType::Primitive(_) => child.type_name(),
        };

        let (element_name, expected_type) =
            if !property.choices.is_empty() && child.type_name() != declared {
                match self.resolve_choice(property, child.type_name(), context) {
                    Some(candidate) => match &candidate.name {
                        Some(name) => (name.as_str(), candidate.type_name.as_str()),
                        None => (property.name.as_str(), declared),
                    },
                    None => {
                        warn!(
                            name = %property.name,
                            runtime_type = child.type_name(),
                            "Unresolved choice"
                        );
                        diagnostics.push(
                            DiagnosticDetail::warning(
                                IssueCode::UnresolvedChoice,
                                format!(
                                    "no candidate of '{}' accepts {}",
                                    property.name,
                                    child.type_name()
                                ),
                            )
                            .with_path(context.child_path(&property.name)),
                        );
                        return Ok(());
                    }
                }
            } else {
                (property.name.as_str(), declared)
            };

        if !wire_names.claim_element(element_name) {
            trace!(name = element_name, "Skipping wire name held by another property");
            return Ok(());
        }

        if !self.resolver.is_assignable(child.type_name(), expected_type) {
            diagnostics.push(
                DiagnosticDetail::warning(
                    IssueCode::TypeMismatch,
                    format!(
                        "{} is not assignable to {}",
                        child.type_name(),
                        expected_type
                    ),
                )
                .with_path(context.child_path(element_name)),
            );
        }

        sink.start_element(element_name)?;
        if child.type_name() != expected_type {
            sink.write_attribute(XSI_TYPE, child.type_name())?;
        }
        if child.is_null() && property.role == PropertyRole::Association {
            sink.write_attribute(XSI_NIL, "true")?;
        }
        let child_context = context.child(element_name, expected_type, property);
        diagnostics.merge(self.graph(sink, child, &child_context)?);
        sink.end_element()
    }

    /// Picks the candidate for `runtime_type`: an exact match (root-scoped
    /// candidates first), else the first assignable candidate in declaration
    /// order.
    fn resolve_choice<'p>(
        &self,
        property: &'p PropertyDescriptor,
        runtime_type: &str,
        context: &GraphContext<'_>,
    ) -> Option<&'p ChoiceCandidate> {
        let root = context.root_type();
        let in_scope = || {
            property
                .choices
                .iter()
                .filter(move |c| c.applies_to_root(root))
        };

        in_scope()
            .filter(|c| c.type_name == runtime_type)
            .min_by_key(|c| c.root.is_none())
            .or_else(|| in_scope().find(|c| self.resolver.is_assignable(runtime_type, &c.type_name)))
    }
}

/// Wire names written so far for one instance. Element names remember the
/// property that claimed them, so every member of a collection may reuse
/// its name while no other property can.
#[derive(Default)]
struct WireNames<'d> {
    attributes: HashSet<&'d str>,
    elements: HashMap<&'d str, usize>,
    /// Index of the property being written
    current: usize,
}

impl<'d> WireNames<'d> {
    fn claim_property(&mut self, property: &'d PropertyDescriptor, index: usize) -> bool {
        self.current = index;
        match property.role {
            PropertyRole::Attribute => self.attributes.insert(&property.name),
            _ => self.claim_element(&property.name),
        }
    }

    fn claim_element(&mut self, name: &'d str) -> bool {
        *self.elements.entry(name).or_insert(self.current) == self.current
    }
}

/// Renders an attribute value; lists become one space separated value.
fn attribute_text(
    value: &Value,
    property: &PropertyDescriptor,
    context: &GraphContext<'_>,
    diagnostics: &mut DiagnosticList,
) -> Option<String> {
    let mut parts = Vec::new();
    for member in value.members() {
        match member {
            Value::Primitive(primitive) => {
                if let PropertyType::Primitive(kind) = property.declared_type
                    && primitive.kind() != kind
                {
                    diagnostics.push(
                        DiagnosticDetail::warning(
                            IssueCode::TypeMismatch,
                            format!(
                                "'{}' is declared {} but holds {}",
                                property.name,
                                kind,
                                primitive.kind()
                            ),
                        )
                        .with_path(context.attribute_path(&property.name)),
                    );
                }
                parts.push(to_wire_text(primitive));
            }
            other => diagnostics.push(
                DiagnosticDetail::warning(
                    IssueCode::TypeMismatch,
                    format!(
                        "attribute '{}' cannot carry {}",
                        property.name,
                        describe(other)
                    ),
                )
                .with_path(context.attribute_path(&property.name)),
            ),
        }
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::Primitive(p) => format!("a {} primitive", p.kind()),
        Value::Instance(i) => format!("an instance of {}", i.type_name()),
        Value::List(_) => "a nested list".to_string(),
    }
}

/// Fields without metadata are never sent; say so each time the type is
/// processed.
pub(crate) fn report_dropped_fields(
    descriptor: &TypeDescriptor,
    context: &GraphContext<'_>,
    diagnostics: &mut DiagnosticList,
) {
    for field in descriptor.dropped_fields() {
        diagnostics.push(
            DiagnosticDetail::warning(
                IssueCode::MissingMetadata,
                format!(
                    "field '{}' of {} has no wire metadata and was dropped",
                    field,
                    descriptor.name()
                ),
            )
            .with_path(context.path()),
        );
    }
}
