//! Input side of the document boundary.

use std::borrow::Cow;
use std::collections::VecDeque;
use std::io::BufRead;

use quick_xml::Reader;
use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};

use super::utils::{XML_NAMESPACE, XMLNS_NAMESPACE, XSI_NAMESPACE};
use crate::error::{ItsError, Result};

/// An attribute with its namespace prefix resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlAttribute {
    namespace: Option<String>,
    local_name: String,
    value: String,
}

impl XmlAttribute {
    pub fn new(namespace: Option<&str>, local_name: &str, value: &str) -> Self {
        Self {
            namespace: namespace.map(str::to_string),
            local_name: local_name.to_string(),
            value: value.to_string(),
        }
    }

    /// Namespace URI; `None` for unprefixed attributes.
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn local_name(&self) -> &str {
        &self.local_name
    }

    /// Unescaped value.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// True for an unprefixed attribute called `name`.
    pub fn is_local(&self, name: &str) -> bool {
        self.namespace.is_none() && self.local_name == name
    }
}

/// A start tag with its attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartNode {
    namespace: Option<String>,
    local_name: String,
    attributes: Vec<XmlAttribute>,
}

impl StartNode {
    pub fn new(
        namespace: Option<&str>,
        local_name: &str,
        attributes: Vec<XmlAttribute>,
    ) -> Self {
        Self {
            namespace: namespace.map(str::to_string),
            local_name: local_name.to_string(),
            attributes,
        }
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn local_name(&self) -> &str {
        &self.local_name
    }

    pub fn attributes(&self) -> &[XmlAttribute] {
        &self.attributes
    }

    /// Value of the attribute `local_name` in `namespace`.
    pub fn attribute(&self, namespace: Option<&str>, local_name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.namespace() == namespace && a.local_name == local_name)
            .map(XmlAttribute::value)
    }

    /// Value of an `xsi:*` attribute, whatever prefix the document bound.
    pub fn xsi_attribute(&self, local_name: &str) -> Option<&str> {
        self.attribute(Some(XSI_NAMESPACE), local_name)
    }
}

/// One step of a pull parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlNode {
    Start(StartNode),
    /// End of the element with this local name. Empty elements are followed
    /// by a synthesized end node.
    End(String),
    /// Character data, entity references resolved and adjacent pieces
    /// joined. Whitespace-only runs are reported only when they are the
    /// whole content of an element.
    Text(String),
    Eof,
}

/// Pull-style reader the parse engine consumes.
pub trait XmlCursor {
    fn next_node(&mut self) -> Result<XmlNode>;

    fn peek_node(&mut self) -> Result<&XmlNode>;

    /// Consumes everything up to and including the end node of the element
    /// whose start node was just read.
    fn skip_to_end(&mut self) -> Result<()> {
        let mut depth = 1usize;
        loop {
            match self.next_node()? {
                XmlNode::Start(_) => depth += 1,
                XmlNode::End(_) => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(());
                    }
                }
                XmlNode::Text(_) => {}
                XmlNode::Eof => {
                    return Err(ItsError::UnexpectedEof(
                        "inside a skipped element".to_string(),
                    ));
                }
            }
        }
    }
}

/// (prefix, uri) declarations of one element; `""` is the default namespace.
type Scope = Vec<(String, String)>;

/// [`XmlCursor`] over a quick-xml [`Reader`].
///
/// Keeps its own stack of namespace scopes so element and attribute names
/// are reported with their namespace URI instead of the document's prefix.
pub struct QuickXmlCursor<R: BufRead> {
    reader: Reader<R>,
    /// Buffer for reading events
    buf: Vec<u8>,
    /// Nodes read ahead of the caller
    pending: VecDeque<XmlNode>,
    /// Namespace declarations per open element
    scopes: Vec<Scope>,
    /// The last event read was a non-empty start tag
    after_start: bool,
}

impl<'a> QuickXmlCursor<&'a [u8]> {
    /// Creates a cursor over an in-memory document.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(xml: &'a str) -> Self {
        Self::new(Reader::from_str(xml))
    }
}

impl<R: BufRead> QuickXmlCursor<R> {
    pub fn from_reader(reader: R) -> Self {
        Self::new(Reader::from_reader(reader))
    }

    pub fn new(reader: Reader<R>) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            pending: VecDeque::new(),
            scopes: Vec::new(),
            after_start: false,
        }
    }

    /// Reads the next logical node, joining adjacent character data.
    fn read_node(&mut self) -> Result<XmlNode> {
        let after_start = std::mem::take(&mut self.after_start);
        let mut text = String::new();
        loop {
            self.buf.clear();
            let event = self.reader.read_event_into(&mut self.buf)?;
            let mut nodes = match event {
                Event::Text(t) => {
                    text.push_str(&unescape_text(decode(&t)?)?);
                    continue;
                }
                Event::CData(c) => {
                    text.push_str(decode(&c)?);
                    continue;
                }
                Event::GeneralRef(r) => {
                    let reference = format!("&{};", decode(&r)?);
                    text.push_str(&unescape_text(&reference)?);
                    continue;
                }
                Event::Comment(_) | Event::PI(_) | Event::Decl(_) | Event::DocType(_) => continue,
                Event::Start(e) => {
                    let start = open_scope(&mut self.scopes, &e)?;
                    self.after_start = true;
                    vec![XmlNode::Start(start)]
                }
                Event::Empty(e) => {
                    let start = open_scope(&mut self.scopes, &e)?;
                    self.scopes.pop();
                    let end = XmlNode::End(start.local_name.clone());
                    vec![XmlNode::Start(start), end]
                }
                Event::End(e) => {
                    let qname = e.name();
                    let local = super::utils::local_part(decode(qname.as_ref())?).to_string();
                    self.scopes.pop();
                    vec![XmlNode::End(local)]
                }
                Event::Eof => vec![XmlNode::Eof],
            };

            let whole_content = after_start && matches!(nodes.first(), Some(XmlNode::End(_)));
            if !text.trim().is_empty() || (!text.is_empty() && whole_content) {
                self.pending.extend(nodes);
                return Ok(XmlNode::Text(text));
            }
            let first = nodes.remove(0);
            self.pending.extend(nodes);
            return Ok(first);
        }
    }
}

impl<R: BufRead> XmlCursor for QuickXmlCursor<R> {
    fn next_node(&mut self) -> Result<XmlNode> {
        if let Some(node) = self.pending.pop_front() {
            return Ok(node);
        }
        self.read_node()
    }

    fn peek_node(&mut self) -> Result<&XmlNode> {
        if self.pending.is_empty() {
            let node = self.read_node()?;
            self.pending.push_front(node);
        }
        self.pending
            .front()
            .ok_or_else(|| ItsError::UnexpectedEof("while peeking".to_string()))
    }
}

/// Pushes the namespace declarations of `e` and resolves its names.
fn open_scope(scopes: &mut Vec<Scope>, e: &BytesStart<'_>) -> Result<StartNode> {
    let mut declarations = Vec::new();
    let mut raw = Vec::new();
    for attribute in e.attributes() {
        let attribute = attribute
            .map_err(|err| ItsError::Malformed(format!("bad attribute: {}", err)))?;
        let key = decode(attribute.key.as_ref())?.to_string();
        let value = unescape_text(decode(&attribute.value)?)?.into_owned();
        if key == "xmlns" {
            declarations.push((String::new(), value.clone()));
        } else if let Some(prefix) = key.strip_prefix("xmlns:") {
            declarations.push((prefix.to_string(), value.clone()));
        }
        raw.push((key, value));
    }
    scopes.push(declarations);

    let raw_name = e.name();
    let qname = decode(raw_name.as_ref())?;
    let (prefix, local_name) = split_qname(qname);
    let namespace = namespace_for(scopes, prefix, qname)?;

    let mut attributes = Vec::with_capacity(raw.len());
    for (key, value) in raw {
        let attribute = if key == "xmlns" {
            XmlAttribute::new(Some(XMLNS_NAMESPACE), "", &value)
        } else {
            match split_qname(&key) {
                ("xmlns", prefix) => XmlAttribute::new(Some(XMLNS_NAMESPACE), prefix, &value),
                ("", local) => XmlAttribute::new(None, local, &value),
                (prefix, local) => {
                    XmlAttribute::new(namespace_for(scopes, prefix, &key)?, local, &value)
                }
            }
        };
        attributes.push(attribute);
    }

    Ok(StartNode {
        namespace: namespace.map(str::to_string),
        local_name: local_name.to_string(),
        attributes,
    })
}

/// Looks up the URI bound to `prefix`; the empty prefix yields the
/// default namespace, if any.
fn namespace_for<'s>(scopes: &'s [Scope], prefix: &str, qname: &str) -> Result<Option<&'s str>> {
    if prefix == "xml" {
        return Ok(Some(XML_NAMESPACE));
    }
    let bound = scopes
        .iter()
        .rev()
        .flat_map(|scope| scope.iter())
        .find(|(p, _)| p == prefix)
        .map(|(_, uri)| uri.as_str());
    match bound {
        Some("") => Ok(None),
        Some(uri) => Ok(Some(uri)),
        None if prefix.is_empty() => Ok(None),
        None => Err(ItsError::Malformed(format!(
            "unbound namespace prefix in '{}'",
            qname
        ))),
    }
}

fn decode(bytes: &[u8]) -> Result<&str> {
    std::str::from_utf8(bytes).map_err(|e| ItsError::Malformed(format!("invalid UTF-8: {}", e)))
}

fn unescape_text(text: &str) -> Result<Cow<'_, str>> {
    unescape(text).map_err(|e| ItsError::Malformed(format!("bad escape: {}", e)))
}

fn split_qname(qname: &str) -> (&str, &str) {
    qname.split_once(':').unwrap_or(("", qname))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::utils::HL7_NAMESPACE;

    fn nodes(xml: &str) -> Vec<XmlNode> {
        let mut cursor = QuickXmlCursor::from_str(xml);
        let mut nodes = Vec::new();
        loop {
            let node = cursor.next_node().unwrap();
            if node == XmlNode::Eof {
                return nodes;
            }
            nodes.push(node);
        }
    }

    #[test]
    fn test_empty_element_gets_end_node() {
        let nodes = nodes(r#"<a xmlns="urn:hl7-org:v3"><b/></a>"#);
        assert_eq!(nodes.len(), 4);
        assert!(matches!(&nodes[1], XmlNode::Start(s) if s.local_name() == "b"));
        assert_eq!(nodes[2], XmlNode::End("b".to_string()));
        assert_eq!(nodes[3], XmlNode::End("a".to_string()));
    }

    #[test]
    fn test_namespaces_are_resolved() {
        let xml = r#"<hl7:a xmlns:hl7="urn:hl7-org:v3" xmlns:x="http://www.w3.org/2001/XMLSchema-instance"><hl7:b x:type="PQ" value="1"/></hl7:a>"#;
        let nodes = nodes(xml);
        let XmlNode::Start(root) = &nodes[0] else {
            panic!("expected start node");
        };
        assert_eq!(root.namespace(), Some(HL7_NAMESPACE));
        assert_eq!(root.local_name(), "a");

        let XmlNode::Start(child) = &nodes[1] else {
            panic!("expected start node");
        };
        assert_eq!(child.namespace(), Some(HL7_NAMESPACE));
        assert_eq!(child.xsi_attribute("type"), Some("PQ"));
        assert_eq!(child.attribute(None, "value"), Some("1"));
        assert_eq!(nodes[3], XmlNode::End("a".to_string()));
    }

    #[test]
    fn test_text_is_joined_and_unescaped() {
        let nodes = nodes("<t>fish &amp; chips<![CDATA[ <raw> ]]></t>");
        assert_eq!(nodes[1], XmlNode::Text("fish & chips <raw> ".to_string()));
    }

    #[test]
    fn test_whitespace_is_not_reported() {
        let nodes = nodes("<a>\n  <b/>\n</a>");
        assert!(nodes.iter().all(|n| !matches!(n, XmlNode::Text(_))));
    }

    #[test]
    fn test_whitespace_content_is_reported() {
        let nodes = nodes("<a><t>  \n </t><u> </u><v/></a>");
        assert_eq!(nodes[2], XmlNode::Text("  \n ".to_string()));
        assert_eq!(nodes[5], XmlNode::Text(" ".to_string()));
        assert!(matches!(&nodes[7], XmlNode::Start(v) if v.local_name() == "v"));
    }

    #[test]
    fn test_unbound_prefix_is_malformed() {
        let mut cursor = QuickXmlCursor::from_str("<p:a/>");
        assert!(matches!(cursor.next_node(), Err(ItsError::Malformed(_))));
    }

    #[test]
    fn test_peek_then_next() {
        let mut cursor = QuickXmlCursor::from_str("<a/>");
        assert!(matches!(cursor.peek_node().unwrap(), XmlNode::Start(_)));
        assert!(matches!(cursor.next_node().unwrap(), XmlNode::Start(_)));
        assert!(matches!(cursor.next_node().unwrap(), XmlNode::End(_)));
        assert_eq!(cursor.next_node().unwrap(), XmlNode::Eof);
    }

    #[test]
    fn test_skip_to_end() {
        let mut cursor = QuickXmlCursor::from_str("<a><x><y/>text</x><b/></a>");
        cursor.next_node().unwrap();
        let XmlNode::Start(x) = cursor.next_node().unwrap() else {
            panic!("expected start node");
        };
        assert_eq!(x.local_name(), "x");
        cursor.skip_to_end().unwrap();
        assert!(matches!(cursor.next_node().unwrap(), XmlNode::Start(b) if b.local_name() == "b"));
    }
}
