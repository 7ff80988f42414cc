/*
 * discovery.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Field discovery: locate every directive marker below a node.

use tracing::debug;
use wordmerge_xml::{NodeId, XmlDocument};

use crate::field::{Field, has_fld_char};

/// Find the valid fields below `root` (inclusive), in document order.
///
/// Fields whose instruction is not a directive are dropped here, so callers
/// only ever see directives.
pub fn discover(doc: &XmlDocument, root: NodeId) -> Vec<Field> {
    let mut fields = Vec::new();

    for node in doc.descendants(root) {
        let Some(name) = doc.name(node) else {
            continue;
        };

        let field = match name {
            "w:fldSimple" => Some(Field::simple(doc, node)),
            "w:fldChar" if doc.attribute(node, "w:fldCharType") == Some("begin") => {
                complex_field_nodes(doc, node).map(|nodes| Field::complex(doc, nodes))
            }
            "w:drawing" if Field::is_image_candidate(doc, node) => Some(Field::image(doc, node)),
            _ => None,
        };

        if let Some(field) = field.filter(Field::is_valid) {
            fields.push(field);
        }
    }

    debug!(count = fields.len(), "Discovered fields");
    fields
}

/// The run holding `begin` and the sibling elements after it, up to and
/// including the one holding the `end` marker.
fn complex_field_nodes(doc: &XmlDocument, begin: NodeId) -> Option<Vec<NodeId>> {
    let mut current = doc.parent(begin)?;
    let mut nodes = vec![current];

    while !has_fld_char(doc, current, "end") {
        match doc.next_element(current) {
            Some(next) => {
                nodes.push(next);
                current = next;
            }
            None => break,
        }
    }

    Some(nodes)
}
