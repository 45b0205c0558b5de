mod common;

use common::{formatter, formatter_with};
use helios_hl7v3::datatypes::{Ii, ItsStructure, Pq, st};
use helios_hl7v3::{Instance, NullFlavor, Primitive, PrimitiveKind, Value};
use helios_its_serde::{FormatterConfig, IssueCode, Result, ResultOutcome};
use helios_its_support::from_wire_text;
use rust_decimal_macros::dec;

fn code(text: &str) -> Primitive {
    Primitive::Code(text.to_string())
}

fn blood_pressure() -> Result<Instance> {
    let telecom = Instance::new("TEL")
        .with("value", Primitive::String("tel:+1-555-0100".into()))
        .with("use", Value::List(vec![code("H").into(), code("MC").into()]));
    let patient = Instance::new("Patient")
        .with("classCode", code("PAT"))
        .with("name", st("Ann Example"))
        .with("telecom", vec![telecom]);
    let systolic = Instance::new("CE")
        .with("code", code("8480-6"))
        .with("codeSystem", Primitive::Uid("2.16.840.1.113883.6.1".into()))
        .with("displayName", Primitive::String("Systolic blood pressure".into()))
        .with("originalText", st("BP sys"))
        .with(
            "translation",
            vec![Instance::new("CE").with("code", code("271649006"))],
        );

    let mut observation = Instance::new("Observation")
        .with("classCode", code("OBS"))
        .with("moodCode", code("EVN"))
        .with("negationInd", Primitive::Boolean(false))
        .with("code", systolic)
        .with(
            "effectiveTime",
            Instance::new("TS").with(
                "value",
                from_wire_text("20240131120000+0100", PrimitiveKind::Timestamp)?,
            ),
        )
        .with("value", Pq::new(dec!(120.0), "mm[Hg]").to_instance())
        .with("subject", patient);
    observation.push("id", Ii::new("2.16.840.1.113883.19.5", "bp-1").to_instance());
    Ok(observation)
}

#[test]
fn test_round_trip_is_lossless() -> Result<()> {
    let formatter = formatter();
    let original = blood_pressure()?;

    let graphed = formatter.to_xml_string(&original)?;
    assert_eq!(graphed.outcome, ResultOutcome::Accepted);
    assert!(graphed.diagnostics.is_empty());

    let parsed = formatter.from_xml_str(&graphed.value)?;
    assert_eq!(parsed.outcome, ResultOutcome::Accepted);
    assert_eq!(parsed.value, original);

    let regraphed = formatter.to_xml_string(&parsed.value)?;
    assert_eq!(regraphed.value, graphed.value);

    Ok(())
}

#[test]
fn test_round_trip_with_pretty_print_and_declaration() -> Result<()> {
    let formatter = formatter_with(FormatterConfig {
        pretty_print: true,
        write_declaration: true,
        ..FormatterConfig::for_testing()
    });
    let original = blood_pressure()?;

    let graphed = formatter.to_xml_vec(&original)?;
    let parsed = formatter.from_xml_slice(&graphed.value)?;
    assert_eq!(parsed.value, original);

    Ok(())
}

#[test]
fn test_round_trip_of_wrapped_root() -> Result<()> {
    let formatter = formatter();
    let device = Instance::new("Device")
        .with("classCode", code("DEV"))
        .with("manufacturerModelName", st("Acme 3000"));

    let graphed = formatter.to_xml_string(&device)?;
    assert!(graphed.value.starts_with(r#"<instance "#));
    let parsed = formatter.from_xml_str(&graphed.value)?;
    assert_eq!(parsed.value, device);
    assert!(parsed.diagnostics.is_empty());

    Ok(())
}

#[test]
fn test_round_trip_of_null_root() -> Result<()> {
    let formatter = formatter();
    let original = Instance::null("Observation", NullFlavor::ASKU);

    let graphed = formatter.to_xml_string(&original)?;
    let parsed = formatter.from_xml_str(&graphed.value)?;
    assert_eq!(parsed.value, original);

    Ok(())
}

#[test]
fn test_implied_values_are_materialized() -> Result<()> {
    let formatter = formatter();
    let sparse = Instance::new("Observation");

    let graphed = formatter.to_xml_string(&sparse)?;
    let parsed = formatter.from_xml_str(&graphed.value)?.value;

    // Fixed and default attribute text and the synthesized null come back
    // as ordinary values.
    assert_ne!(parsed, sparse);
    assert_eq!(parsed.get_str("classCode"), Some("OBS"));
    assert_eq!(parsed.get_str("moodCode"), Some("EVN"));
    assert_eq!(
        parsed.get_instance("code").and_then(Instance::null_flavor),
        Some(NullFlavor::NI)
    );

    // The wire form is stable from there on.
    assert_eq!(formatter.to_xml_string(&parsed)?.value, graphed.value);

    Ok(())
}

#[test]
fn test_empty_text_is_not_preserved() -> Result<()> {
    let formatter = formatter();
    let note = Instance::new("Note").with("text", st(""));

    let graphed = formatter.to_xml_string(&note)?;
    assert!(graphed.value.contains("<text/>"));

    let parsed = formatter.from_xml_str(&graphed.value)?.value;
    let text = parsed.get_instance("text").expect("text element parsed");
    assert_eq!(text.get("value"), None);

    Ok(())
}

#[test]
fn test_whitespace_text_is_preserved() -> Result<()> {
    let formatter = formatter();
    let note = Instance::new("Note").with("text", st("   "));

    let graphed = formatter.to_xml_string(&note)?;
    assert!(graphed.value.contains("<text>   </text>"));

    let parsed = formatter.from_xml_str(&graphed.value)?;
    assert_eq!(parsed.value, note);
    assert!(!parsed.diagnostics.iter().any(|d| d.code == IssueCode::UnexpectedText));

    Ok(())
}
