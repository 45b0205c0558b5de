#![allow(dead_code)]

use helios_hl7v3::{
    ChoiceCandidate, PrimitiveKind, PropertyDescriptor, TypeCatalog, TypeDefinition,
};
use helios_its_serde::{FormatterConfig, ItsFormatter, ItsFormatterBuilder};

pub const HL7_NS: &str = r#"xmlns="urn:hl7-org:v3" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance""#;

fn attribute(name: &str, kind: PrimitiveKind, sort_key: i32) -> PropertyDescriptor {
    PropertyDescriptor::attribute(name, kind).with_sort_key(sort_key)
}

fn element(name: &str, type_name: &str, sort_key: i32) -> PropertyDescriptor {
    PropertyDescriptor::element(name, type_name).with_sort_key(sort_key)
}

fn association(name: &str, type_name: &str, sort_key: i32) -> PropertyDescriptor {
    PropertyDescriptor::association(name, type_name).with_sort_key(sort_key)
}

/// A small clinical model on top of the core datatypes.
pub fn catalog() -> TypeCatalog {
    let definitions = vec![
        TypeDefinition::new("TEL")
            .extends("ANY")
            .property(attribute("value", PrimitiveKind::String, 1))
            .property(attribute("use", PrimitiveKind::Code, 2).repeating()),
        TypeDefinition::new("InfrastructureRoot")
            .abstract_type()
            .property(element("templateId", "II", 1).repeating()),
        TypeDefinition::new("Role")
            .extends("InfrastructureRoot")
            .abstract_type()
            .property(element("id", "II", 1).repeating()),
        TypeDefinition::new("Patient")
            .extends("Role")
            .property(attribute("classCode", PrimitiveKind::Code, 1).with_fixed_value("PAT"))
            .property(element("name", "ST", 2))
            .property(element("telecom", "TEL", 3).repeating()),
        TypeDefinition::new("Device")
            .extends("Role")
            .property(attribute("classCode", PrimitiveKind::Code, 1).with_fixed_value("DEV"))
            .property(element("manufacturerModelName", "ST", 2).mandatory()),
        TypeDefinition::new("Observation")
            .extends("InfrastructureRoot")
            .entry_point()
            .property(attribute("classCode", PrimitiveKind::Code, 1).with_fixed_value("OBS"))
            .property(attribute("moodCode", PrimitiveKind::Code, 2).with_default_value("EVN"))
            .property(attribute("negationInd", PrimitiveKind::Boolean, 3))
            .property(element("id", "II", 1).repeating())
            .property(element("code", "CE", 2).required())
            .property(element("effectiveTime", "TS", 3))
            .property(
                element("value", "ANY", 4)
                    .with_choice(ChoiceCandidate::new("PQ"))
                    .with_choice(ChoiceCandidate::new("CE"))
                    .with_choice(ChoiceCandidate::new("ST")),
            )
            .property(
                association("subject", "Role", 1)
                    .with_choice(
                        ChoiceCandidate::new("Patient")
                            .named("recordTarget")
                            .scoped_to("Observation"),
                    )
                    .with_choice(ChoiceCandidate::new("Patient").named("patient"))
                    .with_choice(ChoiceCandidate::new("Device").named("device")),
            ),
        TypeDefinition::new("Flags")
            .entry_point()
            .property(element("c", "ST", 0))
            .property(attribute("a", PrimitiveKind::Code, 2))
            .property(attribute("b", PrimitiveKind::Code, 1)),
        TypeDefinition::new("Ordered")
            .entry_point()
            .property(association("c", "Ordered", 0))
            .property(element("a", "ST", 2))
            .property(element("b", "ST", 1)),
        TypeDefinition::new("IVL_TS")
            .extends("ANY")
            .property(element("low", "TS", 1))
            .property(element("high", "TS", 2)),
        TypeDefinition::new("Encounter")
            .entry_point()
            .property(element("effectiveTime", "IVL_TS", 1)),
        TypeDefinition::new("Labelled")
            .entry_point()
            .property(element("label", "ST", 1))
            .property(
                element("value", "ANY", 2)
                    .with_choice(ChoiceCandidate::new("ST").named("label"))
                    .with_choice(ChoiceCandidate::new("PQ")),
            ),
        TypeDefinition::new("Measured")
            .entry_point()
            .property(
                element("value", "ANY", 1)
                    .with_choice(ChoiceCandidate::new("PQ").named("quantity")),
            ),
        TypeDefinition::new("Note")
            .entry_point()
            .property(element("text", "ST", 1))
            .unmapped_field("draftRevision"),
    ];

    let mut catalog = TypeCatalog::with_core_datatypes();
    for definition in definitions {
        catalog
            .register(definition)
            .expect("test catalog definitions are valid");
    }
    catalog
}

pub fn builder() -> ItsFormatterBuilder {
    ItsFormatter::builder(catalog()).config(FormatterConfig::for_testing())
}

pub fn formatter() -> ItsFormatter {
    builder().build().expect("test formatter builds")
}

pub fn formatter_with(config: FormatterConfig) -> ItsFormatter {
    ItsFormatter::builder(catalog())
        .config(config)
        .build()
        .expect("test formatter builds")
}
