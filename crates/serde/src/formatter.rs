//! The formatter: configuration, shared state and document entry points.

use std::io::{BufRead, Write};
use std::sync::Arc;

use helios_hl7v3::{Instance, TypeCatalog};
use tracing::debug;

use crate::config::FormatterConfig;
use crate::diagnostics::{DiagnosticList, ResultOutcome};
use crate::error::{ItsError, Result};
use crate::metadata::{MetadataResolver, TypeDescriptor};
use crate::registry::{Adapter, AdapterRegistry};
use crate::validate::{CardinalityValidator, ConformanceValidator};
use crate::xml::{QuickXmlCursor, QuickXmlSink};

/// Output of a top-level graph or parse call.
#[derive(Debug, Clone)]
pub struct FormatterResult<T> {
    pub value: T,
    pub diagnostics: DiagnosticList,
    pub outcome: ResultOutcome,
}

impl<T> FormatterResult<T> {
    pub fn is_accepted(&self) -> bool {
        self.outcome.is_accepted()
    }

    pub fn into_value(self) -> T {
        self.value
    }
}

/// Graphs [`Instance`]s to XML ITS 1.0 and parses them back.
///
/// A formatter is built once with [`ItsFormatter::builder`] and is then
/// read-only: the catalog, adapters and validator never change, and the
/// metadata cache only ever gains entries. Clones share all of it.
///
/// ```
/// use helios_hl7v3::datatypes::{Ii, ItsStructure};
/// use helios_hl7v3::TypeCatalog;
/// use helios_its_serde::{FormatterConfig, ItsFormatter};
///
/// let formatter = ItsFormatter::builder(TypeCatalog::with_core_datatypes())
///     .config(FormatterConfig::for_testing())
///     .build()
///     .unwrap();
///
/// let id = Ii::new("2.16.840.1.113883.19", "12345").to_instance();
/// let graphed = formatter.to_xml_string(&id).unwrap();
/// assert!(graphed.value.contains(r#"xsi:type="II" root="2.16.840.1.113883.19""#));
///
/// let parsed = formatter.from_xml_str(&graphed.value).unwrap();
/// assert_eq!(parsed.value, id);
/// ```
#[derive(Clone)]
pub struct ItsFormatter {
    pub(crate) resolver: Arc<MetadataResolver>,
    pub(crate) adapters: Arc<AdapterRegistry>,
    pub(crate) validator: Arc<dyn ConformanceValidator>,
    pub(crate) config: FormatterConfig,
}

impl std::fmt::Debug for ItsFormatter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ItsFormatter")
            .field("resolver", &self.resolver)
            .field("adapters", &self.adapters)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ItsFormatter {
    /// Starts building a formatter over `catalog`, with the built-in
    /// adapters, the [`CardinalityValidator`] and default configuration.
    pub fn builder(catalog: TypeCatalog) -> ItsFormatterBuilder {
        ItsFormatterBuilder {
            catalog,
            adapters: AdapterRegistry::with_builtin(),
            validator: Arc::new(CardinalityValidator),
            config: FormatterConfig::default(),
        }
    }

    /// Builds a formatter with defaults and configuration from the
    /// environment.
    pub fn new(catalog: TypeCatalog) -> Result<Self> {
        Self::builder(catalog)
            .config(FormatterConfig::from_env())
            .build()
    }

    pub fn config(&self) -> &FormatterConfig {
        &self.config
    }

    pub fn catalog(&self) -> &TypeCatalog {
        self.resolver.catalog()
    }

    pub fn adapters(&self) -> &AdapterRegistry {
        &self.adapters
    }

    /// Resolves the ordered wire layout of `type_name`.
    pub fn resolve(&self, type_name: &str) -> Result<Arc<TypeDescriptor>> {
        self.resolver.resolve(type_name)
    }

    /// Returns true when `from` may stand where `to` is declared.
    pub fn is_assignable(&self, from: &str, to: &str) -> bool {
        self.resolver.is_assignable(from, to)
    }

    /// Graphs `instance` as a complete document into a string.
    pub fn to_xml_string(&self, instance: &Instance) -> Result<FormatterResult<String>> {
        let result = self.to_xml_vec(instance)?;
        let value =
            String::from_utf8(result.value).map_err(|e| ItsError::Custom(e.to_string()))?;
        Ok(FormatterResult {
            value,
            diagnostics: result.diagnostics,
            outcome: result.outcome,
        })
    }

    /// Graphs `instance` as a complete document into a byte vector.
    pub fn to_xml_vec(&self, instance: &Instance) -> Result<FormatterResult<Vec<u8>>> {
        self.to_xml_writer(instance, Vec::new())
    }

    /// Graphs `instance` as a complete document into `writer`, handing the
    /// writer back. Output written before a failure is left as is.
    pub fn to_xml_writer<W: Write>(
        &self,
        instance: &Instance,
        writer: W,
    ) -> Result<FormatterResult<W>> {
        let sink = if self.config.pretty_print {
            QuickXmlSink::pretty(writer)
        } else {
            QuickXmlSink::new(writer)
        };
        let mut sink = sink.with_declaration(self.config.write_declaration);
        let diagnostics = self.write_document(&mut sink, instance)?;
        let writer = sink.finish()?;
        Ok(self.conclude(writer, diagnostics))
    }

    /// Parses a complete document from a string.
    pub fn from_xml_str(&self, xml: &str) -> Result<FormatterResult<Instance>> {
        let mut cursor = QuickXmlCursor::from_str(xml);
        let (instance, diagnostics) = self.read_document(&mut cursor)?;
        Ok(self.conclude(instance, diagnostics))
    }

    /// Parses a complete document from bytes.
    pub fn from_xml_slice(&self, xml: &[u8]) -> Result<FormatterResult<Instance>> {
        let xml = std::str::from_utf8(xml)
            .map_err(|e| ItsError::Malformed(format!("invalid UTF-8: {}", e)))?;
        self.from_xml_str(xml)
    }

    /// Parses a complete document from a reader.
    pub fn from_xml_reader<R: BufRead>(&self, reader: R) -> Result<FormatterResult<Instance>> {
        let mut cursor = QuickXmlCursor::from_reader(reader);
        let (instance, diagnostics) = self.read_document(&mut cursor)?;
        Ok(self.conclude(instance, diagnostics))
    }

    fn conclude<T>(&self, value: T, diagnostics: DiagnosticList) -> FormatterResult<T> {
        let outcome = diagnostics.outcome(self.config.validate_conformance);
        debug!(
            outcome = outcome.as_str(),
            diagnostics = diagnostics.len(),
            "Formatter call finished"
        );
        FormatterResult {
            value,
            diagnostics,
            outcome,
        }
    }
}

/// Configures an [`ItsFormatter`].
pub struct ItsFormatterBuilder {
    catalog: TypeCatalog,
    adapters: AdapterRegistry,
    validator: Arc<dyn ConformanceValidator>,
    config: FormatterConfig,
}

impl ItsFormatterBuilder {
    pub fn config(mut self, config: FormatterConfig) -> Self {
        self.config = config;
        self
    }

    /// Registers an adapter, replacing any earlier one for the same type.
    pub fn adapter(mut self, type_name: impl Into<String>, adapter: impl Adapter + 'static) -> Self {
        self.adapters.register(type_name, adapter);
        self
    }

    /// Replaces the whole adapter registry, built-in adapters included.
    pub fn adapters(mut self, adapters: AdapterRegistry) -> Self {
        self.adapters = adapters;
        self
    }

    pub fn validator(mut self, validator: impl ConformanceValidator + 'static) -> Self {
        self.validator = Arc::new(validator);
        self
    }

    pub fn build(self) -> Result<ItsFormatter> {
        self.config
            .validate()
            .map_err(|errors| ItsError::Config(errors.join("; ")))?;

        debug!(
            types = self.catalog.len(),
            adapters = self.adapters.len(),
            "Built ITS formatter"
        );

        Ok(ItsFormatter {
            resolver: Arc::new(MetadataResolver::new(Arc::new(self.catalog))),
            adapters: Arc::new(self.adapters),
            validator: self.validator,
            config: self.config,
        })
    }
}
