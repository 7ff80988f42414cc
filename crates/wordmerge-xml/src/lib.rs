//! Mutable XML document model for wordmerge.
//!
//! Document parts of an office container (the main document, headers,
//! footers, relationship parts) are parsed into an [`XmlDocument`]: an arena of
//! [`XmlNode`]s addressed by [`NodeId`]. Unlike a read-only tree, the arena
//! supports the edits the directive engine performs: inserting siblings,
//! detaching subtrees, unwrapping elements and deep-cloning bodies into
//! detached containers.
//!
//! # Example
//!
//! ```rust
//! use wordmerge_xml::XmlDocument;
//!
//! let mut doc = XmlDocument::parse(r#"<w:p><w:r><w:t>Hello</w:t></w:r></w:p>"#).unwrap();
//! let text = doc.find(doc.root(), "w:t").unwrap();
//! doc.set_text_content(text, "Goodbye");
//!
//! assert_eq!(doc.to_xml(), "<w:p><w:r><w:t>Goodbye</w:t></w:r></w:p>");
//! ```
//!
//! # Names
//!
//! Elements and attributes are matched by their qualified name as written in
//! the source (`w:p`, `r:embed`). Namespace URIs are not resolved; office
//! documents use fixed prefixes for the vocabularies the engine inspects.
//!
//! # Node handles
//!
//! Removing a node only detaches it from its parent. Its [`NodeId`] stays valid
//! and is never reused, so handles collected before an edit can still be
//! inspected (and re-inserted) afterwards.

pub mod document;
pub mod error;
pub mod parser;
pub mod types;
mod writer;

pub use document::XmlDocument;
pub use error::{Error, Result};
pub use indextree::NodeId;
pub use types::{XmlAttribute, XmlElement, XmlNode};
