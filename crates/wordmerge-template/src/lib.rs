/*
 * lib.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Mail-merge style directive engine for WordprocessingML document parts.
//!
//! Templates are ordinary office documents whose merge fields carry
//! directives:
//!
//! - Insertion: `=person.name`
//! - Loops: `people:each(person)` ... `people:endEach`
//! - Conditions: `person.admin:if` ... `person.admin:endIf`, or with a
//!   predicate: `people:if(any?)` ... `people:endIf`
//! - Call blocks: `render:call(1,=person)` ... `render:endCall`
//! - Comments: `comment` ... `endComment`
//! - Pictures: a drawing whose picture is named `=person.photo`
//!
//! Blocks repeat or remove whole table rows, whole paragraphs, or the runs
//! between two fields of the same paragraph, depending on where their start
//! and end fields sit.
//!
//! # Architecture
//!
//! The engine works on one parsed part at a time and never touches the
//! surrounding package. [`discovery`] finds the [`Field`]s of a part,
//! [`parser`] turns them into [`Statement`]s and each statement mutates the
//! tree when evaluated. Block bodies are rendered by running the same pipeline
//! on a detached copy. The [`RenderEnv`] holding the resource map and the
//! numbering registry is shared by every nested render so allocated IDs stay
//! unique within the part.
//!
//! # Example
//!
//! ```rust
//! use wordmerge_template::{Context, DocumentPart, PartKind, RenderEnv, RenderOptions};
//!
//! let xml = r#"<w:document><w:body><w:p><w:fldSimple w:instr=" MERGEFIELD =name \* MERGEFORMAT "><w:r><w:t>«=name»</w:t></w:r></w:fldSimple></w:p></w:body></w:document>"#;
//!
//! let mut part = DocumentPart::parse(xml, PartKind::Document)?;
//! let context = Context::from_json(serde_json::json!({"name": "Ada"}))?;
//! part.render(&context, &mut RenderEnv::new(), &RenderOptions::default())?;
//!
//! assert_eq!(
//!     part.to_xml(),
//!     "<w:document><w:body><w:p><w:r><w:t>Ada</w:t></w:r></w:p></w:body></w:document>"
//! );
//! # Ok::<(), wordmerge_template::TemplateError>(())
//! ```

pub mod block;
pub mod cache;
pub mod content;
pub mod context;
pub mod discovery;
pub mod env;
pub mod error;
pub mod expression;
pub mod field;
pub mod geometry;
pub mod numbering;
pub mod options;
pub mod parser;
pub mod processor;
pub mod resources;
pub mod statement;
pub mod version;

// Re-export main types at crate root
pub use block::{Block, BlockKind};
pub use cache::FieldCache;
pub use content::{Content, HtmlConverter, ImageData, ImageSpec};
pub use context::{Callable, Context, MemberLookup, Value};
pub use env::RenderEnv;
pub use error::{TemplateError, TemplateResult};
pub use expression::Expression;
pub use field::{Field, FieldKind};
pub use numbering::{Definition, Numbering};
pub use options::RenderOptions;
pub use processor::{DocumentPart, PartKind, process_node};
pub use resources::{Resource, Resources, ensure_image_content_types};
pub use statement::{CallScope, Statement};
pub use version::ENGINE_VERSION;
pub use wordmerge_xml::{NodeId, XmlDocument};
