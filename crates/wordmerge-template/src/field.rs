/*
 * field.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Merge fields: the markers that carry directives inside a document part.
//!
//! WordprocessingML encodes a merge field in one of two shapes:
//!
//! ```text
//! simple:   <w:fldSimple w:instr=" MERGEFIELD =name \* MERGEFORMAT ">
//!             <w:r><w:t>«=name»</w:t></w:r>
//!           </w:fldSimple>
//!
//! complex:  <w:r><w:fldChar w:fldCharType="begin"/></w:r>
//!           <w:r><w:instrText> MERGEFIELD =name \* MERGEFORMAT </w:instrText></w:r>
//!           <w:r><w:fldChar w:fldCharType="separate"/></w:r>
//!           <w:r><w:t>«=name»</w:t></w:r>
//!           <w:r><w:fldChar w:fldCharType="end"/></w:r>
//! ```
//!
//! A third shape marks picture placeholders: a `w:drawing` whose picture is
//! named `=expression`.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};
use wordmerge_xml::{NodeId, XmlDocument};

use crate::content::Content;
use crate::env::RenderEnv;
use crate::error::TemplateResult;
use crate::geometry;

static MERGEFIELD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*MERGEFIELD\s+([^ ]+)\s+\\\*\s+MERGEFORMAT\s*$").unwrap());

static PICTURE_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(=[^ ]+)").unwrap());

/// The physical shape of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Simple,
    Complex,
    Image,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Shape {
    Simple(NodeId),
    Complex {
        nodes: Vec<NodeId>,
        /// The node right after the separator; it holds the display text.
        pattern: Option<NodeId>,
    },
    Image(NodeId),
}

/// One directive marker in a document part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    shape: Shape,
    raw_text: String,
    expression: String,
}

impl Field {
    /// A `w:fldSimple` field.
    pub fn simple(doc: &XmlDocument, node: NodeId) -> Self {
        let raw_text = doc.attribute(node, "w:instr").unwrap_or_default().to_string();
        let expression = merge_expression(&raw_text);
        Self {
            shape: Shape::Simple(node),
            raw_text,
            expression,
        }
    }

    /// A field spanning the runs from its `begin` to its `end` marker.
    pub fn complex(doc: &XmlDocument, nodes: Vec<NodeId>) -> Self {
        let raw_text: String = nodes
            .iter()
            .flat_map(|&node| doc.find_all(node, "w:instrText"))
            .map(|instr| doc.text_content(instr))
            .collect();

        let pattern = nodes
            .iter()
            .copied()
            .find(|&node| has_fld_char(doc, node, "separate"))
            .and_then(|separate| doc.next_element(separate));

        let expression = match pattern.and_then(|p| display_node(doc, p)) {
            Some(_) => merge_expression(&raw_text),
            None => String::new(),
        };

        Self {
            shape: Shape::Complex { nodes, pattern },
            raw_text,
            expression,
        }
    }

    /// A picture placeholder.
    pub fn image(doc: &XmlDocument, drawing: NodeId) -> Self {
        let raw_text = picture_name(doc, drawing).unwrap_or_default().trim().to_string();
        let expression = PICTURE_NAME
            .captures(&raw_text)
            .map(|caps| caps[1].to_string())
            .unwrap_or_default();
        Self {
            shape: Shape::Image(drawing),
            raw_text,
            expression,
        }
    }

    /// Check if `node` is a drawing whose picture name starts with `=`.
    pub fn is_image_candidate(doc: &XmlDocument, node: NodeId) -> bool {
        doc.is_element(node, "w:drawing")
            && picture_name(doc, node).is_some_and(|name| name.trim().starts_with('='))
    }

    /// Rebuild a field of `kind` over already-located nodes.
    pub fn from_nodes(doc: &XmlDocument, kind: FieldKind, nodes: Vec<NodeId>) -> Option<Self> {
        match kind {
            FieldKind::Simple => nodes.first().map(|&node| Self::simple(doc, node)),
            FieldKind::Complex => (!nodes.is_empty()).then(|| Self::complex(doc, nodes)),
            FieldKind::Image => nodes.first().map(|&node| Self::image(doc, node)),
        }
    }

    pub fn kind(&self) -> FieldKind {
        match self.shape {
            Shape::Simple(_) => FieldKind::Simple,
            Shape::Complex { .. } => FieldKind::Complex,
            Shape::Image(_) => FieldKind::Image,
        }
    }

    /// The directive text, e.g. `=person.name` or `people:each(person)`.
    /// Empty when the marker is not a directive.
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// The instruction text as found in the markup.
    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    pub fn is_valid(&self) -> bool {
        !self.expression.is_empty()
    }

    pub fn start_node(&self) -> NodeId {
        match &self.shape {
            Shape::Simple(node) | Shape::Image(node) => *node,
            Shape::Complex { nodes, .. } => nodes[0],
        }
    }

    pub fn end_node(&self) -> NodeId {
        match &self.shape {
            Shape::Simple(node) | Shape::Image(node) => *node,
            Shape::Complex { nodes, .. } => nodes[nodes.len() - 1],
        }
    }

    /// Every node that makes up the field, in document order.
    pub fn nodes(&self) -> Vec<NodeId> {
        match &self.shape {
            Shape::Simple(node) | Shape::Image(node) => vec![*node],
            Shape::Complex { nodes, .. } => nodes.clone(),
        }
    }

    /// The nearest element named `name` enclosing the field.
    pub fn ancestor(&self, doc: &XmlDocument, name: &str) -> Option<NodeId> {
        doc.ancestor(self.start_node(), name)
    }

    /// Render `content` in place of the field's display text and remove the
    /// field scaffolding.
    pub fn replace(
        &self,
        doc: &mut XmlDocument,
        content: &Content,
        env: &mut RenderEnv,
    ) -> TemplateResult<()> {
        match &self.shape {
            Shape::Simple(node) => {
                if display_node(doc, *node).is_none() {
                    debug!(
                        expression = %self.expression,
                        "Adding a display run to an empty field"
                    );
                    let run = doc.create_element("w:r");
                    let text = doc.create_element("w:t");
                    doc.append_child(run, text);
                    doc.append_child(*node, run);
                }
                replace_display(doc, *node, content, env)?;
                doc.unwrap(*node);
            }
            Shape::Complex { nodes, pattern } => {
                if let Some(pattern) = *pattern {
                    replace_display(doc, pattern, content, env)?;
                }
                for &node in nodes {
                    if Some(node) != *pattern {
                        doc.detach(node);
                    }
                }
            }
            Shape::Image(drawing) => {
                if let Content::Image(image) = content {
                    let spec = image.spec()?;
                    let id = env.resources.insert_image(image.clone());
                    if let Some(blip) = doc.find(*drawing, "a:blip") {
                        doc.set_attribute(blip, "r:embed", id.as_str());
                    }
                    geometry::apply(doc, *drawing, &spec);
                    trace!(expression = %self.expression, %id, "Embedded image");
                }
            }
        }
        Ok(())
    }

    /// Remove the field without rendering anything. Picture placeholders
    /// stay in place.
    pub fn remove(&self, doc: &mut XmlDocument) {
        match &self.shape {
            Shape::Simple(node) => doc.detach(*node),
            Shape::Complex { nodes, .. } => {
                for &node in nodes {
                    doc.detach(node);
                }
            }
            Shape::Image(_) => {}
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "«{}»", self.expression)
    }
}

fn merge_expression(raw_text: &str) -> String {
    MERGEFIELD
        .captures(raw_text)
        .map(|caps| caps[1].to_string())
        .unwrap_or_default()
}

fn picture_name(doc: &XmlDocument, drawing: NodeId) -> Option<&str> {
    doc.find(drawing, "pic:cNvPr")
        .and_then(|node| doc.attribute(node, "name"))
}

/// Check if `node` contains a `w:fldChar` of the given type.
pub(crate) fn has_fld_char(doc: &XmlDocument, node: NodeId, kind: &str) -> bool {
    doc.descendants(node)
        .any(|n| doc.is_element(n, "w:fldChar") && doc.attribute(n, "w:fldCharType") == Some(kind))
}

/// The text node a field displays: its first `w:t`, else its `w:instrText`.
fn display_node(doc: &XmlDocument, node: NodeId) -> Option<NodeId> {
    doc.find(node, "w:t")
        .or_else(|| doc.find(node, "w:instrText"))
}

fn replace_display(
    doc: &mut XmlDocument,
    node: NodeId,
    content: &Content,
    env: &mut RenderEnv,
) -> TemplateResult<()> {
    let Some(display) = display_node(doc, node) else {
        return Ok(());
    };
    let paragraph = doc.ancestor(node, "w:p");
    content.append_to(doc, paragraph, display, env)?;
    doc.detach(display);
    Ok(())
}
