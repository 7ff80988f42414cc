//! The arena-backed document and its navigation and editing operations.

use crate::writer::write_node;
use crate::{Result, XmlElement, XmlNode, parser};
use indextree::{Arena, NodeId};

/// A parsed XML document part.
///
/// All nodes, including detached ones created by edits or clones, live in a
/// single arena owned by the document. A [`NodeId`] is only meaningful for the
/// document that created it.
#[derive(Debug, Clone)]
pub struct XmlDocument {
    arena: Arena<XmlNode>,
    root: NodeId,
    declaration: Option<String>,
}

impl XmlDocument {
    /// Parse a complete document.
    ///
    /// # Errors
    ///
    /// Returns an error if the XML is malformed or has no single root element.
    pub fn parse(content: &str) -> Result<Self> {
        parser::parse(content)
    }

    pub(crate) fn from_parts(
        arena: Arena<XmlNode>,
        root: NodeId,
        declaration: Option<String>,
    ) -> Self {
        Self {
            arena,
            root,
            declaration,
        }
    }

    /// The root element.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// The XML declaration body (`xml version="1.0" ...`), if the source had one.
    pub fn declaration(&self) -> Option<&str> {
        self.declaration.as_deref()
    }

    // ---- payload access -------------------------------------------------

    pub fn node(&self, id: NodeId) -> &XmlNode {
        self.arena[id].get()
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut XmlNode {
        self.arena[id].get_mut()
    }

    pub fn element(&self, id: NodeId) -> Option<&XmlElement> {
        self.node(id).as_element()
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut XmlElement> {
        self.node_mut(id).as_element_mut()
    }

    /// The qualified element name, or `None` for text nodes.
    pub fn name(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|e| e.name.as_str())
    }

    /// Check if `id` is an element with the given qualified name.
    pub fn is_element(&self, id: NodeId, name: &str) -> bool {
        self.name(id) == Some(name)
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id).and_then(|e| e.attribute(name))
    }

    /// Set an attribute on an element. Text nodes are left untouched.
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: impl Into<String>) {
        if let Some(element) = self.element_mut(id) {
            element.set_attribute(name, value);
        }
    }

    // ---- navigation -----------------------------------------------------

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.arena[id].parent()
    }

    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        id.children(&self.arena)
    }

    pub fn element_children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        id.children(&self.arena)
            .filter(|&child| self.node(child).is_element())
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.arena[id].first_child()
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.arena[id].next_sibling()
    }

    /// The next sibling that is an element, skipping text.
    pub fn next_element(&self, id: NodeId) -> Option<NodeId> {
        id.following_siblings(&self.arena)
            .skip(1)
            .find(|&sibling| self.node(sibling).is_element())
    }

    /// Enclosing nodes from the parent up to the detached or document root.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        id.ancestors(&self.arena).skip(1)
    }

    /// The nearest enclosing element with the given name (never `id` itself).
    pub fn ancestor(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.ancestors(id).find(|&a| self.is_element(a, name))
    }

    /// Pre-order enumeration of `id` and everything below it.
    ///
    /// The order depends only on the tree shape, so two documents parsed from
    /// identical content enumerate identically.
    pub fn descendants(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        id.descendants(&self.arena)
    }

    /// The first element below `id` (excluding `id`) with the given name.
    pub fn find(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.descendants(id)
            .skip(1)
            .find(|&n| self.is_element(n, name))
    }

    /// All elements below `id` (excluding `id`) with the given name, in
    /// document order.
    pub fn find_all(&self, id: NodeId, name: &str) -> Vec<NodeId> {
        self.descendants(id)
            .skip(1)
            .filter(|&n| self.is_element(n, name))
            .collect()
    }

    /// Concatenated text of all text and CDATA nodes below `id`.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut text = String::new();
        for node in self.descendants(id) {
            match self.node(node) {
                XmlNode::Text(content) | XmlNode::CData(content) => text.push_str(content),
                XmlNode::Element(_) => {}
            }
        }
        text
    }

    /// Check if `id` is still reachable from the document root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        id.ancestors(&self.arena).any(|a| a == self.root)
    }

    // ---- editing --------------------------------------------------------

    /// Create a detached element without attributes.
    pub fn create_element(&mut self, name: &str) -> NodeId {
        self.arena.new_node(XmlNode::Element(XmlElement::new(name)))
    }

    /// Create a detached text node.
    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.arena.new_node(XmlNode::Text(text.into()))
    }

    /// Move `child` to the end of `parent`'s children.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        child.detach(&mut self.arena);
        parent.append(child, &mut self.arena);
    }

    /// Move `node` to directly after `anchor`.
    pub fn insert_after(&mut self, anchor: NodeId, node: NodeId) {
        node.detach(&mut self.arena);
        anchor.insert_after(node, &mut self.arena);
    }

    /// Move `node` to directly before `anchor`.
    pub fn insert_before(&mut self, anchor: NodeId, node: NodeId) {
        node.detach(&mut self.arena);
        anchor.insert_before(node, &mut self.arena);
    }

    /// Remove `id` (and its subtree) from its parent.
    pub fn detach(&mut self, id: NodeId) {
        id.detach(&mut self.arena);
    }

    /// Replace `id` by its own children, in order.
    pub fn unwrap(&mut self, id: NodeId) {
        let children: Vec<NodeId> = self.children(id).collect();
        if self.parent(id).is_some() {
            for child in children {
                self.insert_before(id, child);
            }
        }
        self.detach(id);
    }

    /// Remove all children of `id`.
    pub fn clear_children(&mut self, id: NodeId) {
        let children: Vec<NodeId> = self.children(id).collect();
        for child in children {
            self.detach(child);
        }
    }

    /// Replace the content of `id` by a single text node.
    pub fn set_text_content(&mut self, id: NodeId, text: impl Into<String>) {
        self.clear_children(id);
        let text = self.create_text(text);
        self.append_child(id, text);
    }

    /// Copy `id` and its whole subtree into new detached nodes.
    pub fn deep_clone(&mut self, id: NodeId) -> NodeId {
        let copy = self.arena.new_node(self.arena[id].get().clone());
        let children: Vec<NodeId> = self.children(id).collect();
        for child in children {
            let child_copy = self.deep_clone(child);
            copy.append(child_copy, &mut self.arena);
        }
        copy
    }

    /// Parse a markup fragment into detached nodes owned by this document.
    ///
    /// # Errors
    ///
    /// Returns an error if the fragment is not well-formed.
    pub fn parse_fragment(&mut self, markup: &str) -> Result<Vec<NodeId>> {
        parser::parse_fragment(markup, &mut self.arena)
    }

    // ---- serialization --------------------------------------------------

    /// Serialize the whole document, including its declaration.
    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        if let Some(declaration) = &self.declaration {
            out.push_str("<?");
            out.push_str(declaration);
            out.push_str("?>\n");
        }
        write_node(&self.arena, self.root, &mut out);
        out
    }

    /// Serialize a single node and its subtree.
    pub fn node_to_xml(&self, id: NodeId) -> String {
        let mut out = String::new();
        write_node(&self.arena, id, &mut out);
        out
    }
}
