/*
 * processor.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Rendering of document parts.
//!
//! A part is rendered in four steps: discover the fields, build statements
//! from them, evaluate the statements in order, then clean up the part. Block
//! bodies and call blocks run the first three steps again on their own
//! subtree through [`process_node`].

use tracing::debug;
use wordmerge_xml::{NodeId, XmlDocument};

use crate::cache::FieldCache;
use crate::context::Context;
use crate::discovery::discover;
use crate::env::RenderEnv;
use crate::error::TemplateResult;
use crate::field::Field;
use crate::options::RenderOptions;
use crate::parser::build_statements;

/// Elements that follow `w:pgNumType` inside `w:sectPr`.
const AFTER_PG_NUM_TYPE: [&str; 11] = [
    "w:cols",
    "w:formProt",
    "w:vAlign",
    "w:noEndnote",
    "w:titlePg",
    "w:textDirection",
    "w:bidi",
    "w:rtlGutter",
    "w:docGrid",
    "w:printerSettings",
    "w:sectPrChange",
];

/// Render every directive below `node` (inclusive) with `context`.
pub fn process_node(
    doc: &mut XmlDocument,
    node: NodeId,
    context: &Context,
    env: &mut RenderEnv,
) -> TemplateResult<()> {
    let fields = discover(doc, node);
    evaluate(doc, fields, context, env)
}

fn evaluate(
    doc: &mut XmlDocument,
    fields: Vec<Field>,
    context: &Context,
    env: &mut RenderEnv,
) -> TemplateResult<()> {
    let statements = build_statements(doc, fields)?;
    debug!(count = statements.len(), "Evaluating statements");
    for statement in &statements {
        statement.evaluate(doc, context, env)?;
    }
    Ok(())
}

/// Which kind of part is rendered; only the main document gets document
/// level post-processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartKind {
    /// `word/document.xml`
    Document,
    /// `word/headerN.xml` / `word/footerN.xml`
    HeaderFooter,
}

/// A parsed document part.
#[derive(Debug, Clone)]
pub struct DocumentPart {
    kind: PartKind,
    document: XmlDocument,
    /// The source text while it still matches `document`.
    source: Option<String>,
}

impl DocumentPart {
    pub fn parse(xml: &str, kind: PartKind) -> TemplateResult<Self> {
        Ok(Self {
            kind,
            document: XmlDocument::parse(xml)?,
            source: Some(xml.to_string()),
        })
    }

    pub fn kind(&self) -> PartKind {
        self.kind
    }

    pub fn document(&self) -> &XmlDocument {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut XmlDocument {
        self.source = None;
        &mut self.document
    }

    /// The fields of the part, in document order.
    pub fn fields(&self, cache: Option<&FieldCache>) -> Vec<Field> {
        match (cache, &self.source) {
            (Some(cache), Some(source)) => cache.discover(source, &self.document),
            _ => discover(&self.document, self.document.root()),
        }
    }

    /// Render the part in place.
    ///
    /// # Errors
    ///
    /// Fails on unmatched blocks, non-enumerable loop sources, non-callable
    /// call targets, invalid call arguments and unsupported content. The part
    /// is left partially rendered in that case.
    pub fn render(
        &mut self,
        context: &Context,
        env: &mut RenderEnv,
        options: &RenderOptions,
    ) -> TemplateResult<()> {
        let cache = options.cache_dir.as_ref().map(FieldCache::new);
        let fields = self.fields(cache.as_ref());
        self.source = None;

        evaluate(&mut self.document, fields, context, env)?;

        if self.kind == PartKind::Document {
            fill_empty_table_cells(&mut self.document);
            if let Some(start) = options.start_page_number {
                set_start_page_number(&mut self.document, start);
            }
        }
        Ok(())
    }

    pub fn to_xml(&self) -> String {
        self.document.to_xml()
    }
}

/// Give every table cell without a paragraph an empty one.
pub fn fill_empty_table_cells(doc: &mut XmlDocument) {
    let cells = doc.find_all(doc.root(), "w:tc");
    for cell in cells {
        let has_paragraph = doc.element_children(cell).any(|c| doc.is_element(c, "w:p"));
        if !has_paragraph {
            let paragraph = doc.create_element("w:p");
            doc.append_child(cell, paragraph);
        }
    }
}

/// Set the first page number of the body's section properties.
pub fn set_start_page_number(doc: &mut XmlDocument, start: u32) {
    let root = doc.root();
    let Some(body) = doc.element_children(root).find(|&n| doc.is_element(n, "w:body")) else {
        return;
    };

    let existing = doc
        .element_children(body)
        .filter(|&n| doc.is_element(n, "w:sectPr"))
        .last();
    let section = match existing {
        Some(section) => section,
        None => {
            let section = doc.create_element("w:sectPr");
            doc.append_child(body, section);
            section
        }
    };

    let existing = doc
        .element_children(section)
        .find(|&n| doc.is_element(n, "w:pgNumType"));
    let pg_num_type = match existing {
        Some(existing) => existing,
        None => {
            let follower = doc
                .element_children(section)
                .find(|&n| AFTER_PG_NUM_TYPE.iter().any(|name| doc.is_element(n, name)));
            let created = doc.create_element("w:pgNumType");
            match follower {
                Some(follower) => doc.insert_before(follower, created),
                None => doc.append_child(section, created),
            }
            created
        }
    };

    doc.set_attribute(pg_num_type, "w:start", start.to_string());
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_fill_empty_table_cells() {
        let mut doc = XmlDocument::parse(
            "<w:tbl><w:tr><w:tc/><w:tc><w:tcPr/></w:tc><w:tc><w:p/></w:tc></w:tr></w:tbl>",
        )
        .unwrap();
        fill_empty_table_cells(&mut doc);
        assert_eq!(
            doc.to_xml(),
            "<w:tbl><w:tr><w:tc><w:p/></w:tc><w:tc><w:tcPr/><w:p/></w:tc><w:tc><w:p/></w:tc></w:tr></w:tbl>"
        );
    }

    #[test]
    fn test_start_page_number_inserted_at_schema_position() {
        let mut doc = XmlDocument::parse(
            r#"<w:document><w:body><w:p/><w:sectPr><w:pgSz w:w="12240"/><w:cols w:space="720"/><w:docGrid/></w:sectPr></w:body></w:document>"#,
        )
        .unwrap();
        set_start_page_number(&mut doc, 5);
        assert_eq!(
            doc.to_xml(),
            r#"<w:document><w:body><w:p/><w:sectPr><w:pgSz w:w="12240"/><w:pgNumType w:start="5"/><w:cols w:space="720"/><w:docGrid/></w:sectPr></w:body></w:document>"#
        );
    }

    #[test]
    fn test_start_page_number_updates_existing() {
        let mut doc = XmlDocument::parse(
            r#"<w:document><w:body><w:sectPr><w:pgNumType w:fmt="lowerRoman" w:start="1"/></w:sectPr></w:body></w:document>"#,
        )
        .unwrap();
        set_start_page_number(&mut doc, 9);
        assert_eq!(
            doc.to_xml(),
            r#"<w:document><w:body><w:sectPr><w:pgNumType w:fmt="lowerRoman" w:start="9"/></w:sectPr></w:body></w:document>"#
        );
    }

    #[test]
    fn test_start_page_number_creates_section() {
        let mut doc = XmlDocument::parse("<w:document><w:body><w:p/></w:body></w:document>").unwrap();
        set_start_page_number(&mut doc, 2);
        assert_eq!(
            doc.to_xml(),
            r#"<w:document><w:body><w:p/><w:sectPr><w:pgNumType w:start="2"/></w:sectPr></w:body></w:document>"#
        );
    }

    #[test]
    fn test_header_parts_skip_document_cleanup() {
        let xml = "<w:hdr><w:tbl><w:tr><w:tc/></w:tr></w:tbl></w:hdr>";
        let mut part = DocumentPart::parse(xml, PartKind::HeaderFooter).unwrap();
        part.render(&Context::new(), &mut RenderEnv::new(), &RenderOptions::default())
            .unwrap();
        assert_eq!(part.to_xml(), xml);
    }
}
