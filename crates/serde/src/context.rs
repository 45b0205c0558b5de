//! Per-call traversal context.

use helios_hl7v3::PropertyDescriptor;

/// Where the engine currently is in a document.
///
/// Contexts form a chain through borrowed parent references; each nested
/// graph or parse call creates a child on its own stack frame, so the chain
/// never outlives the call that built it.
#[derive(Debug, Clone, Copy)]
pub struct GraphContext<'a> {
    element_name: &'a str,
    expected_type: &'a str,
    property: Option<&'a PropertyDescriptor>,
    parent: Option<&'a GraphContext<'a>>,
    root_type: &'a str,
}

impl<'a> GraphContext<'a> {
    /// Context of a document root element.
    pub fn root(element_name: &'a str, type_name: &'a str) -> Self {
        Self {
            element_name,
            expected_type: type_name,
            property: None,
            parent: None,
            root_type: type_name,
        }
    }

    /// Context of a child element bound to `property`.
    pub fn child<'b>(
        &'b self,
        element_name: &'b str,
        expected_type: &'b str,
        property: &'b PropertyDescriptor,
    ) -> GraphContext<'b>
    where
        'a: 'b,
    {
        GraphContext {
            element_name,
            expected_type,
            property: Some(property),
            parent: Some(self),
            root_type: self.root_type,
        }
    }

    pub fn element_name(&self) -> &'a str {
        self.element_name
    }

    /// The type the enclosing declaration expects at this position.
    pub fn expected_type(&self) -> &'a str {
        self.expected_type
    }

    pub fn property(&self) -> Option<&'a PropertyDescriptor> {
        self.property
    }

    pub fn parent(&self) -> Option<&'a GraphContext<'a>> {
        self.parent
    }

    /// Structural name of the document's root type.
    pub fn root_type(&self) -> &'a str {
        self.root_type
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn depth(&self) -> usize {
        self.ancestors().count() - 1
    }

    /// Iterates from this context up to the root.
    pub fn ancestors(&self) -> impl Iterator<Item = &GraphContext<'a>> {
        std::iter::successors(Some(self), |c| c.parent)
    }

    /// Slash separated element path from the root, e.g. `/Patient/name/given`.
    pub fn path(&self) -> String {
        let mut names: Vec<&str> = self.ancestors().map(|c| c.element_name).collect();
        names.reverse();
        let mut path = String::new();
        for name in names {
            path.push('/');
            path.push_str(name);
        }
        path
    }

    /// Path of an attribute on this element.
    pub fn attribute_path(&self, name: &str) -> String {
        format!("{}/@{}", self.path(), name)
    }

    /// Path of a child element of this element.
    pub fn child_path(&self, name: &str) -> String {
        format!("{}/{}", self.path(), name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_and_depth() {
        let name = PropertyDescriptor::element("name", "PN");
        let given = PropertyDescriptor::element("given", "ST");

        let root = GraphContext::root("Patient", "Patient");
        let child = root.child("name", "PN", &name);
        let grandchild = child.child("given", "ST", &given);

        assert_eq!(grandchild.path(), "/Patient/name/given");
        assert_eq!(grandchild.depth(), 2);
        assert_eq!(grandchild.root_type(), "Patient");
        assert_eq!(grandchild.attribute_path("value"), "/Patient/name/given/@value");
        assert!(root.is_root());
        assert!(!grandchild.is_root());
        assert_eq!(grandchild.parent().map(|p| p.element_name()), Some("name"));
    }
}
