mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use common::{HL7_NS, builder};
use helios_hl7v3::datatypes::{PQ, ST, TS, st};
use helios_hl7v3::{Instance, Primitive, PrimitiveKind};
use helios_its_serde::{
    Adapter, AdapterRegistry, ConformanceValidator, DiagnosticDetail, DiagnosticList,
    FormatterConfig, GraphContext, IssueCode, ItsError, ItsFormatter, Result, ResultOutcome,
    StartNode, TextAdapter, TypeDescriptor, ValidationContext, XmlCursor, XmlNode, XmlSink,
};
use helios_its_support::from_wire_text;

/// Legacy interval layout: `low` and `high` travel as `<start>` and `<end>`.
#[derive(Default)]
struct LegacyPeriodAdapter {
    calls: Arc<AtomicUsize>,
}

const BOUNDS: [(&str, &str); 2] = [("low", "start"), ("high", "end")];

impl Adapter for LegacyPeriodAdapter {
    fn graph(
        &self,
        engine: &ItsFormatter,
        sink: &mut dyn XmlSink,
        instance: &Instance,
        context: &GraphContext<'_>,
    ) -> Result<DiagnosticList> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut diagnostics = DiagnosticList::new();
        let descriptor = engine.resolve(instance.type_name())?;
        for (field, wire) in BOUNDS {
            let (Some(property), Some(bound)) =
                (descriptor.element(field), instance.get_instance(field))
            else {
                continue;
            };
            sink.start_element(wire)?;
            let child = context.child(wire, TS, property);
            diagnostics.merge(engine.graph(sink, bound, &child)?);
            sink.end_element()?;
        }
        Ok(diagnostics)
    }

    fn parse(
        &self,
        engine: &ItsFormatter,
        cursor: &mut dyn XmlCursor,
        _start: &StartNode,
        context: &GraphContext<'_>,
    ) -> Result<(Instance, DiagnosticList)> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut diagnostics = DiagnosticList::new();
        let descriptor = engine.resolve(context.expected_type())?;
        let mut instance = Instance::new(descriptor.name());
        loop {
            match cursor.next_node()? {
                XmlNode::Start(node) => {
                    let property = BOUNDS
                        .iter()
                        .find(|(_, wire)| *wire == node.local_name())
                        .and_then(|(field, _)| descriptor.element(field));
                    let Some(property) = property else {
                        cursor.skip_to_end()?;
                        continue;
                    };
                    let child = context.child(node.local_name(), TS, property);
                    let (bound, nested) = engine.parse(cursor, &node, &child)?;
                    diagnostics.merge(nested);
                    instance.set(property.field.clone(), bound);
                }
                XmlNode::End(_) => break,
                XmlNode::Text(_) => {}
                XmlNode::Eof => {
                    return Err(ItsError::UnexpectedEof(format!("inside {}", context.path())));
                }
            }
        }
        Ok((instance, diagnostics))
    }
}

/// Counts calls and hands the work back to the metadata traversal.
#[derive(Default)]
struct CountingAdapter {
    calls: Arc<AtomicUsize>,
}

impl Adapter for CountingAdapter {
    fn graph(
        &self,
        engine: &ItsFormatter,
        sink: &mut dyn XmlSink,
        instance: &Instance,
        context: &GraphContext<'_>,
    ) -> Result<DiagnosticList> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        engine.graph_structure(sink, instance, context)
    }

    fn parse(
        &self,
        engine: &ItsFormatter,
        cursor: &mut dyn XmlCursor,
        start: &StartNode,
        context: &GraphContext<'_>,
    ) -> Result<(Instance, DiagnosticList)> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        engine.parse_structure(cursor, start, context)
    }
}

/// Treats its element as opaque and never looks at `xsi:type`.
struct OpaqueAdapter;

impl Adapter for OpaqueAdapter {
    fn graph(
        &self,
        _engine: &ItsFormatter,
        _sink: &mut dyn XmlSink,
        _instance: &Instance,
        _context: &GraphContext<'_>,
    ) -> Result<DiagnosticList> {
        Ok(DiagnosticList::new())
    }

    fn parse(
        &self,
        _engine: &ItsFormatter,
        cursor: &mut dyn XmlCursor,
        _start: &StartNode,
        _context: &GraphContext<'_>,
    ) -> Result<(Instance, DiagnosticList)> {
        cursor.skip_to_end()?;
        Ok((Instance::new(PQ), DiagnosticList::new()))
    }
}

fn ts(text: &str) -> Result<Instance> {
    Ok(Instance::new(TS).with("value", from_wire_text(text, PrimitiveKind::Timestamp)?))
}

#[test]
fn test_adapter_replaces_generic_traversal() -> Result<()> {
    let calls = Arc::new(AtomicUsize::new(0));
    let formatter = builder()
        .adapter(
            "IVL_TS",
            LegacyPeriodAdapter {
                calls: Arc::clone(&calls),
            },
        )
        .build()?;
    let encounter = Instance::new("Encounter").with(
        "effectiveTime",
        Instance::new("IVL_TS")
            .with("low", ts("20240101")?)
            .with("high", ts("20240105")?),
    );

    let graphed = formatter.to_xml_string(&encounter)?;
    assert_eq!(
        graphed.value,
        format!(
            r#"<Encounter {}><effectiveTime><start value="20240101"/><end value="20240105"/></effectiveTime></Encounter>"#,
            HL7_NS
        )
    );

    let parsed = formatter.from_xml_str(&graphed.value)?;
    assert_eq!(parsed.value, encounter);
    assert_eq!(parsed.outcome, ResultOutcome::Accepted);
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    Ok(())
}

#[test]
fn test_adapter_diagnostics_are_merged() -> Result<()> {
    let formatter = builder()
        .adapter("IVL_TS", LegacyPeriodAdapter::default())
        .build()?;
    let xml = format!(
        r#"<Encounter {}><effectiveTime><start value="20240101" precision="day"/></effectiveTime></Encounter>"#,
        HL7_NS
    );

    let result = formatter.from_xml_str(&xml)?;
    let codes: Vec<IssueCode> = result.diagnostics.iter().map(|d| d.code).collect();
    assert_eq!(codes, vec![IssueCode::UnknownAttribute]);
    assert_eq!(
        result.diagnostics.iter().next().and_then(|d| d.path.as_deref()),
        Some("/Encounter/effectiveTime/start/@precision")
    );

    Ok(())
}

#[test]
fn test_adapter_can_delegate_back_to_metadata() -> Result<()> {
    let calls = Arc::new(AtomicUsize::new(0));
    let formatter = builder()
        .adapter(
            "CE",
            CountingAdapter {
                calls: Arc::clone(&calls),
            },
        )
        .build()?;
    let observation = Instance::new("Observation").with(
        "code",
        Instance::new("CE")
            .with("code", Primitive::Code("8480-6".into()))
            .with(
                "translation",
                vec![Instance::new("CE").with("code", Primitive::Code("271649006".into()))],
            ),
    );

    let graphed = formatter.to_xml_string(&observation)?;
    assert!(graphed.value.contains(
        r#"<code code="8480-6"><translation code="271649006"/></code>"#
    ));
    // The outer code and its nested translation.
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    let parsed = formatter.from_xml_str(&graphed.value)?;
    assert_eq!(calls.load(Ordering::SeqCst), 4);
    assert_eq!(
        parsed.value.get_instance("code").and_then(|c| c.get_str("code")),
        Some("8480-6")
    );

    Ok(())
}

#[test]
fn test_registering_replaces_previous_adapter() {
    let mut registry = AdapterRegistry::with_builtin();
    assert!(registry.contains(ST));
    assert_eq!(registry.len(), 1);

    let previous = registry.register(ST, CountingAdapter::default());
    assert!(previous.is_some());
    assert_eq!(registry.len(), 1);
    assert!(registry.register("IVL_TS", TextAdapter).is_none());
    assert_eq!(registry.len(), 2);
}

#[test]
fn test_without_text_adapter_character_data_is_lost() -> Result<()> {
    let formatter = builder().adapters(AdapterRegistry::new()).build()?;
    assert!(formatter.adapters().is_empty());

    let note = Instance::new("Note").with("text", st("Seen today"));
    let graphed = formatter.to_xml_string(&note)?;
    assert!(graphed.value.contains("<text/>"));

    let xml = format!(r#"<Note {}><text>Seen today</text></Note>"#, HL7_NS);
    let parsed = formatter.from_xml_str(&xml)?;
    assert!(
        parsed
            .diagnostics
            .with_code(IssueCode::UnexpectedText)
            .any(|d| d.path.as_deref() == Some("/Note/text"))
    );

    Ok(())
}

/// House rule: every observation states whether it is negated.
struct NegationRequired;

impl ConformanceValidator for NegationRequired {
    fn validate(
        &self,
        instance: &Instance,
        descriptor: &TypeDescriptor,
        context: &ValidationContext<'_>,
    ) -> DiagnosticList {
        let mut diagnostics = DiagnosticList::new();
        if descriptor.name() == "Observation" && instance.get("negationInd").is_none() {
            diagnostics.push(
                DiagnosticDetail::error(IssueCode::MissingValue, "negationInd must be sent")
                    .with_path(context.graph().attribute_path("negationInd")),
            );
        }
        diagnostics
    }
}

#[test]
fn test_custom_validator_replaces_default() -> Result<()> {
    let formatter = builder().validator(NegationRequired).build()?;

    // No code and no synthesis complaint: the default validator is gone.
    let result = formatter.to_xml_string(&Instance::new("Observation"))?;
    let errors: Vec<&str> = result
        .diagnostics
        .errors()
        .filter_map(|d| d.path.as_deref())
        .collect();
    assert_eq!(errors, vec!["/Observation/@negationInd"]);
    assert_eq!(result.outcome, ResultOutcome::Rejected);

    let negated = Instance::new("Observation").with("negationInd", Primitive::Boolean(true));
    let result = formatter.to_xml_string(&negated)?;
    assert!(result.is_accepted());

    Ok(())
}

#[test]
fn test_invalid_wrapper_config_is_rejected() {
    let config = FormatterConfig {
        wrapper_element: "not valid".to_string(),
        ..FormatterConfig::for_testing()
    };
    let result = ItsFormatter::builder(common::catalog()).config(config).build();
    assert!(matches!(result, Err(ItsError::Config(_))));
}

#[test]
fn test_discriminator_mismatch_survives_adapter() -> Result<()> {
    let formatter = builder().adapter(PQ, OpaqueAdapter).build()?;
    let xml = format!(
        r#"<Observation {}><code code="x"/><effectiveTime xsi:type="PQ" value="1" unit="mg"/></Observation>"#,
        HL7_NS
    );

    let result = formatter.from_xml_str(&xml)?;
    let codes: Vec<IssueCode> = result.diagnostics.iter().map(|d| d.code).collect();
    assert_eq!(codes, vec![IssueCode::TypeMismatch]);
    assert_eq!(
        result.diagnostics.iter().next().and_then(|d| d.path.as_deref()),
        Some("/Observation/effectiveTime")
    );
    assert_eq!(result.outcome, ResultOutcome::AcceptedNonConformant);

    Ok(())
}

#[test]
fn test_discriminator_mismatch_is_reported_once() -> Result<()> {
    let formatter = builder().build()?;
    let xml = format!(
        r#"<Observation {}><code xsi:type="ST">free text</code></Observation>"#,
        HL7_NS
    );

    let result = formatter.from_xml_str(&xml)?;
    let mismatches = result
        .diagnostics
        .iter()
        .filter(|d| d.code == IssueCode::TypeMismatch)
        .count();
    assert_eq!(mismatches, 1);
    let code = result.value.get_instance("code").expect("code parsed");
    assert_eq!(code.type_name(), ST);

    Ok(())
}
