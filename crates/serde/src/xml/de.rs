//! Parse engine: reads XML ITS 1.0 back into [`Instance`]s.

use helios_hl7v3::{Instance, NullFlavor, PrimitiveKind, PropertyDescriptor, PropertyType, Value};
use helios_its_support::from_wire_text;
use tracing::{trace, warn};

use super::cursor::{StartNode, XmlAttribute, XmlCursor, XmlNode};
use super::ser::report_dropped_fields;
use super::utils::{self, HL7_NAMESPACE, NULL_FLAVOR_ATTRIBUTE, XMLNS_NAMESPACE, XSI_NAMESPACE};
use crate::context::GraphContext;
use crate::diagnostics::{DiagnosticDetail, DiagnosticList, IssueCode};
use crate::error::{ItsError, Result};
use crate::formatter::ItsFormatter;
use crate::metadata::TypeDescriptor;
use crate::validate::ValidationContext;

impl ItsFormatter {
    /// Reads a complete document: finds the root element, works out the
    /// root type from its name or from `xsi:type` on the wrapper element,
    /// and parses it.
    pub fn read_document(
        &self,
        cursor: &mut dyn XmlCursor,
    ) -> Result<(Instance, DiagnosticList)> {
        let start = loop {
            match cursor.next_node()? {
                XmlNode::Start(start) => break start,
                XmlNode::Text(text) => {
                    return Err(ItsError::Malformed(format!(
                        "text '{}' outside the root element",
                        text.trim()
                    )));
                }
                XmlNode::End(name) => {
                    return Err(ItsError::Malformed(format!("unexpected </{}>", name)));
                }
                XmlNode::Eof => {
                    return Err(ItsError::UnexpectedEof("before the root element".to_string()));
                }
            }
        };

        let mut diagnostics = DiagnosticList::new();
        let root_path = format!("/{}", start.local_name());
        if start.namespace() != Some(HL7_NAMESPACE) {
            diagnostics.push(
                DiagnosticDetail::warning(
                    IssueCode::UnexpectedNamespace,
                    format!(
                        "root element is in namespace '{}'",
                        start.namespace().unwrap_or("")
                    ),
                )
                .with_path(root_path.clone()),
            );
        }

        let root_type = if start.local_name() == self.config.wrapper_element {
            let discriminator = start.xsi_attribute("type").ok_or_else(|| {
                ItsError::Malformed(format!(
                    "<{}> must name its content type with xsi:type",
                    start.local_name()
                ))
            })?;
            utils::local_part(discriminator).to_string()
        } else {
            start.local_name().to_string()
        };

        let descriptor = self.resolver.resolve(&root_type).map_err(|err| match err {
            ItsError::UnknownType { name, .. } => ItsError::UnknownType {
                name,
                path: root_path.clone(),
            },
            other => other,
        })?;
        if start.local_name() == root_type && !descriptor.is_entry_point() {
            diagnostics.push(
                DiagnosticDetail::warning(
                    IssueCode::NotEntryPoint,
                    format!("{} is not a document entry point", root_type),
                )
                .with_path(root_path),
            );
        }

        let context = GraphContext::root(start.local_name(), &root_type);
        let (instance, nested) = self.parse(cursor, &start, &context)?;
        diagnostics.merge(nested);

        if let XmlNode::Text(_) | XmlNode::Start(_) = cursor.peek_node()? {
            return Err(ItsError::Malformed(
                "content after the root element".to_string(),
            ));
        }
        Ok((instance, diagnostics))
    }

    /// Reads the element whose start node the caller has just consumed,
    /// through the adapter of its type when one is registered, by metadata
    /// otherwise. Consumes the element's end node.
    pub fn parse(
        &self,
        cursor: &mut dyn XmlCursor,
        start: &StartNode,
        context: &GraphContext<'_>,
    ) -> Result<(Instance, DiagnosticList)> {
        let mut diagnostics = DiagnosticList::new();
        let type_name = self.discriminated_type(start, context)?;
        self.check_assignable(&type_name, context, &mut diagnostics);

        if let Some(adapter) = self.adapters.get(&type_name) {
            trace!(type_name = %type_name, path = %context.path(), "Parsing through adapter");
            let (instance, nested) = adapter.parse(self, cursor, start, context)?;
            diagnostics.merge(nested);
            return Ok((instance, diagnostics));
        }
        self.parse_metadata(cursor, start, type_name, context, diagnostics)
    }

    /// Metadata-driven parsing, bypassing the adapter registry for this
    /// element. Nested elements still go through [`Self::parse`], which has
    /// already reported a discriminator that does not fit the expected type.
    pub fn parse_structure(
        &self,
        cursor: &mut dyn XmlCursor,
        start: &StartNode,
        context: &GraphContext<'_>,
    ) -> Result<(Instance, DiagnosticList)> {
        let type_name = self.discriminated_type(start, context)?;
        self.parse_metadata(cursor, start, type_name, context, DiagnosticList::new())
    }

    /// The type to instantiate for `start`: its `xsi:type` when present,
    /// the context's expected type otherwise.
    ///
    /// An unregistered discriminator is fatal, and so is an abstract type
    /// for an element that is not null-flavored.
    pub fn discriminated_type(
        &self,
        start: &StartNode,
        context: &GraphContext<'_>,
    ) -> Result<String> {
        let type_name = match start.xsi_attribute("type") {
            Some(discriminator) => {
                let type_name = utils::local_part(discriminator.trim());
                if !self.catalog().contains(type_name) {
                    return Err(ItsError::UnknownType {
                        name: type_name.to_string(),
                        path: context.path(),
                    });
                }
                type_name.to_string()
            }
            None => context.expected_type().to_string(),
        };

        let is_null = start.attribute(None, NULL_FLAVOR_ATTRIBUTE).is_some()
            || start.xsi_attribute("nil").is_some_and(utils::is_true);
        if !is_null && self.resolver.resolve(&type_name)?.is_abstract() {
            return Err(ItsError::AbstractType {
                name: type_name,
                path: context.path(),
            });
        }
        Ok(type_name)
    }

    fn check_assignable(
        &self,
        type_name: &str,
        context: &GraphContext<'_>,
        diagnostics: &mut DiagnosticList,
    ) {
        if !self.resolver.is_assignable(type_name, context.expected_type()) {
            diagnostics.push(
                DiagnosticDetail::warning(
                    IssueCode::TypeMismatch,
                    format!(
                        "xsi:type {} is not assignable to {}",
                        type_name,
                        context.expected_type()
                    ),
                )
                .with_path(context.path()),
            );
        }
    }

    fn parse_metadata(
        &self,
        cursor: &mut dyn XmlCursor,
        start: &StartNode,
        type_name: String,
        context: &GraphContext<'_>,
        mut diagnostics: DiagnosticList,
    ) -> Result<(Instance, DiagnosticList)> {
        trace!(type_name = %type_name, path = %context.path(), "Parsing element");
        let descriptor = self.resolver.resolve(&type_name)?;
        report_dropped_fields(&descriptor, context, &mut diagnostics);
        let mut instance = Instance::new(type_name);

        let mut nil = false;
        for attribute in start.attributes() {
            match attribute.namespace() {
                Some(XMLNS_NAMESPACE) => {}
                Some(XSI_NAMESPACE) => {
                    if attribute.local_name() == "nil" {
                        nil = utils::is_true(attribute.value());
                    }
                }
                Some(_) => unknown_attribute(attribute, context, &mut diagnostics),
                None if attribute.local_name() == NULL_FLAVOR_ATTRIBUTE => {
                    let code = attribute.value().trim();
                    let null_flavor = NullFlavor::from_code(code).ok_or_else(|| {
                        ItsError::InvalidNullFlavor {
                            path: context.attribute_path(NULL_FLAVOR_ATTRIBUTE),
                            code: code.to_string(),
                        }
                    })?;
                    instance.set_null_flavor(Some(null_flavor));
                }
                None => match descriptor.attribute(attribute.local_name()) {
                    Some(property) => {
                        let value = decode_attribute(attribute.value(), property, context)?;
                        check_fixed_value(attribute.value(), property, context, &mut diagnostics);
                        instance.set(property.field.clone(), value);
                    }
                    None => unknown_attribute(attribute, context, &mut diagnostics),
                },
            }
        }

        if nil {
            cursor.skip_to_end()?;
            return Ok((instance, diagnostics));
        }

        loop {
            match cursor.next_node()? {
                XmlNode::End(_) => break,
                XmlNode::Eof => {
                    return Err(ItsError::UnexpectedEof(format!("inside {}", context.path())));
                }
                XmlNode::Text(text) if text.trim().is_empty() => {}
                XmlNode::Text(text) => diagnostics.push(
                    DiagnosticDetail::warning(
                        IssueCode::UnexpectedText,
                        format!("ignored text '{}'", text.trim()),
                    )
                    .with_path(context.path()),
                ),
                XmlNode::Start(child) => self.parse_child(
                    cursor,
                    &child,
                    &descriptor,
                    &mut instance,
                    context,
                    &mut diagnostics,
                )?,
            }
        }

        if self.config.validate_conformance {
            let validation = ValidationContext::new(context, false);
            diagnostics.merge(self.validator.validate(&instance, &descriptor, &validation));
        }
        Ok((instance, diagnostics))
    }

    fn parse_child(
        &self,
        cursor: &mut dyn XmlCursor,
        child: &StartNode,
        descriptor: &TypeDescriptor,
        instance: &mut Instance,
        context: &GraphContext<'_>,
        diagnostics: &mut DiagnosticList,
    ) -> Result<()> {
        let in_hl7 = matches!(child.namespace(), None | Some(HL7_NAMESPACE));
        let property = if in_hl7 {
            descriptor.element(child.local_name())
        } else {
            None
        };
        let Some(property) = property else {
            warn!(element = child.local_name(), path = %context.path(), "Skipping unknown element");
            diagnostics.push(
                DiagnosticDetail::warning(
                    IssueCode::UnknownElement,
                    format!("unknown element '{}'", child.local_name()),
                )
                .with_path(context.child_path(child.local_name())),
            );
            return cursor.skip_to_end();
        };

        let expected_type = match property.candidate_named(child.local_name()) {
            Some(candidate) => candidate.type_name.as_str(),
            None => match &property.declared_type {
                PropertyType::Structure(name) => name.as_str(),
                PropertyType::Primitive(_) => descriptor.name(),
            },
        };
        let child_context = context.child(child.local_name(), expected_type, property);
        let (value, nested) = self.parse(cursor, child, &child_context)?;
        diagnostics.merge(nested);

        if property.is_collection() || instance.get(&property.field).is_some() {
            instance.push(property.field.clone(), value);
        } else {
            instance.set(property.field.clone(), value);
        }
        Ok(())
    }
}

/// Decodes attribute text with the codec of the property's primitive kind.
/// Collection-valued attributes are space separated lists.
fn decode_attribute(
    text: &str,
    property: &PropertyDescriptor,
    context: &GraphContext<'_>,
) -> Result<Value> {
    let kind = match property.declared_type {
        PropertyType::Primitive(kind) => kind,
        PropertyType::Structure(_) => PrimitiveKind::String,
    };
    let decode = |part: &str| {
        from_wire_text(part, kind)
            .map(Value::Primitive)
            .map_err(|source| ItsError::InvalidPrimitive {
                path: context.attribute_path(&property.name),
                source,
            })
    };

    if property.is_collection() {
        let members = text
            .split_whitespace()
            .map(decode)
            .collect::<Result<Vec<_>>>()?;
        Ok(Value::List(members))
    } else {
        decode(text)
    }
}

fn check_fixed_value(
    text: &str,
    property: &PropertyDescriptor,
    context: &GraphContext<'_>,
    diagnostics: &mut DiagnosticList,
) {
    if let Some(fixed) = &property.fixed_value
        && text.trim() != fixed
    {
        diagnostics.push(
            DiagnosticDetail::warning(
                IssueCode::FixedValueMismatch,
                format!(
                    "'{}' is fixed to '{}' but the document sends '{}'",
                    property.name, fixed, text
                ),
            )
            .with_path(context.attribute_path(&property.name)),
        );
    }
}

fn unknown_attribute(
    attribute: &XmlAttribute,
    context: &GraphContext<'_>,
    diagnostics: &mut DiagnosticList,
) {
    diagnostics.push(
        DiagnosticDetail::warning(
            IssueCode::UnknownAttribute,
            format!("unknown attribute '{}'", attribute.local_name()),
        )
        .with_path(context.attribute_path(attribute.local_name())),
    );
}
