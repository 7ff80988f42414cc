//! XML parser that builds arena-backed document trees.

use crate::{Error, Result, XmlAttribute, XmlDocument, XmlElement, XmlNode};
use indextree::{Arena, NodeId};
use quick_xml::Reader;
use quick_xml::events::{BytesDecl, BytesStart, Event};

/// Parse a complete document: an optional declaration and exactly one root
/// element.
///
/// # Errors
///
/// Returns an error if the XML is malformed, empty, or has several roots.
pub fn parse(content: &str) -> Result<XmlDocument> {
    let mut arena = Arena::new();
    let built = TreeBuilder::new(content, &mut arena, Mode::Document).build()?;

    let mut roots = built.top.into_iter();
    let root = roots.next().ok_or(Error::EmptyDocument)?;
    if roots.next().is_some() {
        return Err(Error::MultipleRoots { position: None });
    }

    Ok(XmlDocument::from_parts(arena, root, built.declaration))
}

/// Parse a markup fragment into detached nodes allocated in `arena`.
///
/// The fragment may contain several top-level elements and text. Namespace
/// prefixes do not need to be declared.
pub(crate) fn parse_fragment(content: &str, arena: &mut Arena<XmlNode>) -> Result<Vec<NodeId>> {
    let built = TreeBuilder::new(content, arena, Mode::Fragment).build()?;
    Ok(built.top)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Top level accepts only elements; whitespace and prolog nodes are dropped.
    Document,
    /// Top level keeps elements and non-blank text.
    Fragment,
}

struct Built {
    top: Vec<NodeId>,
    declaration: Option<String>,
}

/// Internal parser state.
struct TreeBuilder<'a, 's> {
    /// The quick-xml reader.
    reader: Reader<&'s [u8]>,

    /// Arena receiving the nodes.
    arena: &'a mut Arena<XmlNode>,

    mode: Mode,

    /// Open elements, innermost last.
    stack: Vec<NodeId>,

    /// Completed top-level nodes.
    top: Vec<NodeId>,

    declaration: Option<String>,
}

impl<'a, 's> TreeBuilder<'a, 's> {
    fn new(source: &'s str, arena: &'a mut Arena<XmlNode>, mode: Mode) -> Self {
        let mut reader = Reader::from_str(source);
        reader.config_mut().trim_text_start = false;
        reader.config_mut().trim_text_end = false;

        Self {
            reader,
            arena,
            mode,
            stack: Vec::new(),
            top: Vec::new(),
            declaration: None,
        }
    }

    fn build(mut self) -> Result<Built> {
        loop {
            let event_start = self.reader.buffer_position() as u64;

            match self.reader.read_event() {
                Ok(Event::Start(e)) => {
                    let element = self.parse_element(&e, event_start)?;
                    let node = self.arena.new_node(XmlNode::Element(element));
                    self.attach(node, event_start)?;
                    self.stack.push(node);
                }
                Ok(Event::End(e)) => {
                    let end_name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                    let node = self.stack.pop().ok_or_else(|| Error::InvalidStructure {
                        message: format!("Unexpected closing tag </{}>", end_name),
                        position: Some(event_start),
                    })?;

                    let open_name = match self.arena[node].get() {
                        XmlNode::Element(element) => element.name.clone(),
                        _ => String::new(),
                    };
                    if open_name != end_name {
                        return Err(Error::MismatchedEndTag {
                            expected: open_name,
                            found: end_name,
                            position: Some(event_start),
                        });
                    }
                }
                Ok(Event::Empty(e)) => {
                    let element = self.parse_element(&e, event_start)?;
                    let node = self.arena.new_node(XmlNode::Element(element));
                    self.attach(node, event_start)?;
                }
                Ok(Event::Text(e)) => {
                    let text = e.unescape().map_err(|err| Error::XmlSyntax {
                        message: format!("Invalid text content: {}", err),
                        position: Some(event_start),
                    })?;
                    self.push_text(XmlNode::Text(text.into_owned()), event_start)?;
                }
                Ok(Event::CData(e)) => {
                    let text = String::from_utf8_lossy(e.as_ref()).to_string();
                    self.push_text(XmlNode::CData(text), event_start)?;
                }
                Ok(Event::Decl(e)) => {
                    self.declaration = Some(declaration_text(&e)?);
                }
                Ok(Event::Comment(_) | Event::PI(_) | Event::DocType(_)) => {
                    // Skip comments, processing instructions and DOCTYPE declarations
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(Error::XmlSyntax {
                        message: e.to_string(),
                        position: Some(self.reader.error_position()),
                    });
                }
            }
        }

        if let Some(&open) = self.stack.last() {
            let name = match self.arena[open].get() {
                XmlNode::Element(element) => element.name.clone(),
                _ => String::new(),
            };
            return Err(Error::UnexpectedEof {
                expected: format!("closing tag </{}>", name),
            });
        }

        Ok(Built {
            top: self.top,
            declaration: self.declaration,
        })
    }

    /// Attach a freshly created element to the open parent, or record it as a
    /// top-level node.
    fn attach(&mut self, node: NodeId, position: u64) -> Result<()> {
        match self.stack.last() {
            Some(&parent) => {
                parent.append(node, self.arena);
                Ok(())
            }
            None => {
                if self.mode == Mode::Document && !self.top.is_empty() {
                    return Err(Error::MultipleRoots {
                        position: Some(position),
                    });
                }
                self.top.push(node);
                Ok(())
            }
        }
    }

    fn push_text(&mut self, text: XmlNode, position: u64) -> Result<()> {
        match self.stack.last() {
            Some(&parent) => {
                let node = self.arena.new_node(text);
                parent.append(node, self.arena);
                Ok(())
            }
            None => {
                let blank = match &text {
                    XmlNode::Text(content) | XmlNode::CData(content) => content.trim().is_empty(),
                    XmlNode::Element(_) => false,
                };
                match (self.mode, blank) {
                    (_, true) => Ok(()),
                    (Mode::Fragment, false) => {
                        let node = self.arena.new_node(text);
                        self.top.push(node);
                        Ok(())
                    }
                    (Mode::Document, false) => Err(Error::InvalidStructure {
                        message: "Text content outside of the root element".to_string(),
                        position: Some(position),
                    }),
                }
            }
        }
    }

    fn parse_element(&self, e: &BytesStart<'_>, tag_start: u64) -> Result<XmlElement> {
        let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
        let mut attributes = Vec::new();

        for attr_result in e.attributes() {
            let attr = attr_result?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
            let value = attr.unescape_value().map_err(|err| Error::XmlSyntax {
                message: format!("Invalid attribute value: {}", err),
                position: Some(tag_start),
            })?;

            attributes.push(XmlAttribute {
                name: key,
                value: value.into_owned(),
            });
        }

        Ok(XmlElement { name, attributes })
    }
}

/// Rebuild the declaration body (`xml version="1.0" ...`) from its parts.
fn declaration_text(decl: &BytesDecl<'_>) -> Result<String> {
    let version = decl.version()?;
    let mut text = format!(r#"xml version="{}""#, String::from_utf8_lossy(&version));

    if let Some(encoding) = decl.encoding() {
        let encoding = encoding?;
        text.push_str(&format!(r#" encoding="{}""#, String::from_utf8_lossy(&encoding)));
    }
    if let Some(standalone) = decl.standalone() {
        let standalone = standalone?;
        text.push_str(&format!(
            r#" standalone="{}""#,
            String::from_utf8_lossy(&standalone)
        ));
    }

    Ok(text)
}
