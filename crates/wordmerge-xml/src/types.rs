//! Node payload types stored in the document arena.

/// The payload of a single node in an [`XmlDocument`](crate::XmlDocument).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlNode {
    /// An element with its qualified name and attributes.
    Element(XmlElement),

    /// Character data (after unescaping XML entities).
    Text(String),

    /// A CDATA section, kept verbatim.
    CData(String),
}

/// An XML element: qualified name plus attributes in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlElement {
    /// The qualified name as written in the source (e.g. `w:p`).
    pub name: String,

    /// Attributes of this element, in source order.
    pub attributes: Vec<XmlAttribute>,
}

/// A single attribute with its qualified name and unescaped value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlAttribute {
    /// The qualified name as written in the source (e.g. `w:instr`).
    pub name: String,

    /// The attribute value (after unescaping XML entities).
    pub value: String,
}

impl XmlNode {
    /// Returns the element payload, if this node is an element.
    pub fn as_element(&self) -> Option<&XmlElement> {
        match self {
            XmlNode::Element(element) => Some(element),
            _ => None,
        }
    }

    /// Returns the mutable element payload, if this node is an element.
    pub fn as_element_mut(&mut self) -> Option<&mut XmlElement> {
        match self {
            XmlNode::Element(element) => Some(element),
            _ => None,
        }
    }

    /// Check if this node is an element.
    pub fn is_element(&self) -> bool {
        matches!(self, XmlNode::Element(_))
    }
}

impl XmlElement {
    /// Create an element without attributes.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
        }
    }

    /// The namespace prefix, if any (`w` in `w:p`).
    pub fn prefix(&self) -> Option<&str> {
        self.name.split_once(':').map(|(prefix, _)| prefix)
    }

    /// The local name without prefix (`p` in `w:p`).
    pub fn local_name(&self) -> &str {
        self.name
            .split_once(':')
            .map_or(self.name.as_str(), |(_, local)| local)
    }

    /// Get an attribute value by qualified name.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Set an attribute, replacing an existing value or appending a new one.
    pub fn set_attribute(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attributes.iter_mut().find(|a| a.name == name) {
            Some(attribute) => attribute.value = value,
            None => self.attributes.push(XmlAttribute {
                name: name.to_string(),
                value,
            }),
        }
    }

    /// Remove an attribute, returning its previous value.
    pub fn remove_attribute(&mut self, name: &str) -> Option<String> {
        let index = self.attributes.iter().position(|a| a.name == name)?;
        Some(self.attributes.remove(index).value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_and_local_name() {
        let element = XmlElement::new("w:fldSimple");
        assert_eq!(element.prefix(), Some("w"));
        assert_eq!(element.local_name(), "fldSimple");

        let plain = XmlElement::new("tmp");
        assert_eq!(plain.prefix(), None);
        assert_eq!(plain.local_name(), "tmp");
    }

    #[test]
    fn test_set_attribute_replaces_existing() {
        let mut element = XmlElement::new("a:blip");
        element.set_attribute("r:embed", "rId1");
        element.set_attribute("r:embed", "rId7");

        assert_eq!(element.attributes.len(), 1);
        assert_eq!(element.attribute("r:embed"), Some("rId7"));
        assert_eq!(element.remove_attribute("r:embed"), Some("rId7".to_string()));
        assert_eq!(element.attribute("r:embed"), None);
    }
}
