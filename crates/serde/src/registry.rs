//! Per-type adapters.
//!
//! Some structures cannot be derived mechanically from property metadata,
//! for example types whose wire form is character data or a legacy layout
//! that renames and regroups fields. An [`Adapter`] takes over graphing and
//! parsing of one structural type. The formatter always consults the
//! [`AdapterRegistry`] before falling back to metadata-driven traversal.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use helios_hl7v3::datatypes::{ST, ST_VALUE_FIELD};
use helios_hl7v3::{Instance, NullFlavor, Primitive};

use crate::context::GraphContext;
use crate::diagnostics::{DiagnosticDetail, DiagnosticList, IssueCode};
use crate::error::{ItsError, Result};
use crate::formatter::ItsFormatter;
use crate::xml::utils::{self, NULL_FLAVOR_ATTRIBUTE};
use crate::xml::{StartNode, XmlCursor, XmlNode, XmlSink};

/// A drop-in replacement for the generic traversal of one structural type.
///
/// Both methods mirror the formatter's own [`ItsFormatter::graph`] and
/// [`ItsFormatter::parse`]: `graph` writes the content (attributes and
/// children) of an element the caller has already opened, `parse` reads the
/// content of an element whose start node the caller has already consumed,
/// up to and including its end node. Adapters may call back into `engine`
/// for nested values they do not special-case.
pub trait Adapter: Send + Sync {
    fn graph(
        &self,
        engine: &ItsFormatter,
        sink: &mut dyn XmlSink,
        instance: &Instance,
        context: &GraphContext<'_>,
    ) -> Result<DiagnosticList>;

    fn parse(
        &self,
        engine: &ItsFormatter,
        cursor: &mut dyn XmlCursor,
        start: &StartNode,
        context: &GraphContext<'_>,
    ) -> Result<(Instance, DiagnosticList)>;
}

/// Adapters keyed by structural type name, at most one per type.
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    adapters: HashMap<String, Arc<dyn Adapter>>,
}

impl AdapterRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the built-in adapters.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(ST, TextAdapter);
        registry
    }

    /// Registers `adapter` for `type_name`, returning the adapter it replaces.
    pub fn register(
        &mut self,
        type_name: impl Into<String>,
        adapter: impl Adapter + 'static,
    ) -> Option<Arc<dyn Adapter>> {
        self.adapters.insert(type_name.into(), Arc::new(adapter))
    }

    pub fn get(&self, type_name: &str) -> Option<&dyn Adapter> {
        self.adapters.get(type_name).map(|adapter| adapter.as_ref())
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.adapters.contains_key(type_name)
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

impl fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut types: Vec<&str> = self.adapters.keys().map(String::as_str).collect();
        types.sort_unstable();
        f.debug_struct("AdapterRegistry")
            .field("types", &types)
            .finish()
    }
}

/// Carries the `value` field of a string type as element character data,
/// e.g. `<title>Lab report</title>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextAdapter;

impl Adapter for TextAdapter {
    fn graph(
        &self,
        _engine: &ItsFormatter,
        sink: &mut dyn XmlSink,
        instance: &Instance,
        context: &GraphContext<'_>,
    ) -> Result<DiagnosticList> {
        let mut diagnostics = DiagnosticList::new();
        if let Some(null_flavor) = instance.null_flavor() {
            sink.write_attribute(NULL_FLAVOR_ATTRIBUTE, null_flavor.as_code())?;
            return Ok(diagnostics);
        }

        match instance.get(ST_VALUE_FIELD) {
            None => {}
            Some(value) => match value.as_primitive() {
                Some(primitive) => sink.write_characters(&primitive.to_string())?,
                None => diagnostics.push(
                    DiagnosticDetail::warning(
                        IssueCode::TypeMismatch,
                        format!("'{}' of {} is not text", ST_VALUE_FIELD, instance.type_name()),
                    )
                    .with_path(context.path()),
                ),
            },
        }
        Ok(diagnostics)
    }

    fn parse(
        &self,
        engine: &ItsFormatter,
        cursor: &mut dyn XmlCursor,
        start: &StartNode,
        context: &GraphContext<'_>,
    ) -> Result<(Instance, DiagnosticList)> {
        let mut diagnostics = DiagnosticList::new();
        let type_name = engine.discriminated_type(start, context)?;
        let mut instance = Instance::new(type_name);

        for attribute in start.attributes() {
            if utils::is_reserved(attribute) {
                continue;
            }
            if attribute.is_local(NULL_FLAVOR_ATTRIBUTE) {
                let null_flavor = NullFlavor::from_code(attribute.value().trim()).ok_or_else(
                    || ItsError::InvalidNullFlavor {
                        path: context.attribute_path(NULL_FLAVOR_ATTRIBUTE),
                        code: attribute.value().to_string(),
                    },
                )?;
                instance.set_null_flavor(Some(null_flavor));
                continue;
            }
            diagnostics.push(
                DiagnosticDetail::warning(
                    IssueCode::UnknownAttribute,
                    format!("unknown attribute '{}'", attribute.local_name()),
                )
                .with_path(context.attribute_path(attribute.local_name())),
            );
        }

        let mut text = String::new();
        loop {
            match cursor.next_node()? {
                XmlNode::Text(chunk) => text.push_str(&chunk),
                XmlNode::Start(child) => {
                    diagnostics.push(
                        DiagnosticDetail::warning(
                            IssueCode::UnknownElement,
                            format!("unexpected element '{}' in text", child.local_name()),
                        )
                        .with_path(context.child_path(child.local_name())),
                    );
                    cursor.skip_to_end()?;
                }
                XmlNode::End(_) => break,
                XmlNode::Eof => {
                    return Err(ItsError::UnexpectedEof(format!("inside {}", context.path())));
                }
            }
        }

        if !text.is_empty() {
            instance.set(ST_VALUE_FIELD, Primitive::String(text));
        }
        Ok((instance, diagnostics))
    }
}
