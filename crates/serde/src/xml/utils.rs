//! Wire constants and small helpers shared by the graph and parse engines.

use super::cursor::XmlAttribute;

/// HL7 v3 namespace URI.
///
/// Declared as the default namespace on the root element of every document.
pub const HL7_NAMESPACE: &str = "urn:hl7-org:v3";

/// XML Schema instance namespace, home of `xsi:type` and `xsi:nil`.
pub const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// Namespace of `xmlns` declarations.
pub const XMLNS_NAMESPACE: &str = "http://www.w3.org/2000/xmlns/";

/// Namespace bound to the reserved `xml` prefix.
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

pub const NULL_FLAVOR_ATTRIBUTE: &str = "nullFlavor";

/// Qualified name of the type discriminator as written.
pub const XSI_TYPE: &str = "xsi:type";

/// Qualified name of the absence marker as written.
pub const XSI_NIL: &str = "xsi:nil";

/// Strips a namespace prefix: `hl7:PQ` becomes `PQ`.
pub fn local_part(qname: &str) -> &str {
    qname.rsplit_once(':').map_or(qname, |(_, local)| local)
}

/// Namespace declarations and `xsi:*` attributes belong to the engine, not
/// to any property.
pub fn is_reserved(attribute: &XmlAttribute) -> bool {
    matches!(
        attribute.namespace(),
        Some(XMLNS_NAMESPACE) | Some(XSI_NAMESPACE)
    )
}

/// XML Schema boolean truth.
pub fn is_true(text: &str) -> bool {
    matches!(text.trim(), "true" | "1")
}

/// True for a name usable as an unprefixed element name.
pub fn is_ncname(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_part() {
        assert_eq!(local_part("hl7:PQ"), "PQ");
        assert_eq!(local_part("PQ"), "PQ");
    }

    #[test]
    fn test_is_true() {
        assert!(is_true("true"));
        assert!(is_true(" 1 "));
        assert!(!is_true("false"));
        assert!(!is_true("yes"));
    }

    #[test]
    fn test_is_ncname() {
        assert!(is_ncname("instance"));
        assert!(is_ncname("_wrapper-1.0"));
        assert!(!is_ncname(""));
        assert!(!is_ncname("1abc"));
        assert!(!is_ncname("xsi:type"));
        assert!(!is_ncname("two words"));
    }

    #[test]
    fn test_reserved_attributes() {
        let xsi = XmlAttribute::new(Some(XSI_NAMESPACE), "type", "PQ");
        let decl = XmlAttribute::new(Some(XMLNS_NAMESPACE), "xsi", XSI_NAMESPACE);
        let plain = XmlAttribute::new(None, "value", "1");
        assert!(is_reserved(&xsi));
        assert!(is_reserved(&decl));
        assert!(!is_reserved(&plain));
    }
}
