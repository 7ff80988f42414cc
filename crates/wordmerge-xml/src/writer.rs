//! Serialization of arena nodes back to markup.
//!
//! Output carries no indentation: office viewers treat whitespace between
//! runs as content.

use crate::XmlNode;
use indextree::{Arena, NodeId};
use quick_xml::escape::{escape, partial_escape};

pub(crate) fn write_node(arena: &Arena<XmlNode>, id: NodeId, out: &mut String) {
    match arena[id].get() {
        XmlNode::Element(element) => {
            out.push('<');
            out.push_str(&element.name);
            for attribute in &element.attributes {
                out.push(' ');
                out.push_str(&attribute.name);
                out.push_str("=\"");
                out.push_str(&escape(attribute.value.as_str()));
                out.push('"');
            }

            if arena[id].first_child().is_none() {
                out.push_str("/>");
                return;
            }

            out.push('>');
            for child in id.children(arena) {
                write_node(arena, child, out);
            }
            out.push_str("</");
            out.push_str(&element.name);
            out.push('>');
        }
        XmlNode::Text(text) => out.push_str(&partial_escape(text.as_str())),
        XmlNode::CData(text) => {
            out.push_str("<![CDATA[");
            out.push_str(text);
            out.push_str("]]>");
        }
    }
}
