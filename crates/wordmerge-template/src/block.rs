/*
 * block.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Blocks: the content between a directive's start and end field.
//!
//! The granularity of a block follows from where its two fields sit:
//!
//! - in different table rows: whole rows are repeated or removed
//! - in different paragraphs: whole paragraphs are repeated or removed
//! - otherwise: only the runs between the two fields, inside one paragraph

use once_cell::unsync::OnceCell;
use wordmerge_xml::{NodeId, XmlDocument};

use crate::context::Context;
use crate::env::RenderEnv;
use crate::error::TemplateResult;
use crate::field::Field;
use crate::processor::process_node;

/// Name of the detached element block bodies are rendered in.
const CONTAINER: &str = "tmp";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Row,
    Paragraph,
    Inline,
}

#[derive(Debug, Clone)]
pub struct Block {
    kind: BlockKind,
    start_field: Field,
    end_field: Field,
    start_node: NodeId,
    end_node: NodeId,
    body: OnceCell<Vec<NodeId>>,
}

impl Block {
    /// Classify the span between `start_field` and `end_field`.
    pub fn enclosed_by(doc: &XmlDocument, start_field: Field, end_field: Field) -> Self {
        let kind = classify(doc, &start_field, &end_field);

        let (start_node, end_node) = match kind {
            BlockKind::Row => anchors(doc, &start_field, &end_field, "w:tr"),
            BlockKind::Paragraph => anchors(doc, &start_field, &end_field, "w:p"),
            BlockKind::Inline => None,
        }
        .unwrap_or((start_field.end_node(), end_field.start_node()));

        Self {
            kind,
            start_field,
            end_field,
            start_node,
            end_node,
            body: OnceCell::new(),
        }
    }

    pub fn kind(&self) -> BlockKind {
        self.kind
    }

    pub fn start_field(&self) -> &Field {
        &self.start_field
    }

    pub fn end_field(&self) -> &Field {
        &self.end_field
    }

    /// The element siblings strictly between the two anchors. Computed on
    /// first access and fixed for the life of the block.
    pub fn body(&self, doc: &XmlDocument) -> &[NodeId] {
        self.body.get_or_init(|| {
            let mut body = Vec::new();
            let mut node = self.start_node;
            while let Some(next) = doc.next_element(node) {
                if next == self.end_node {
                    break;
                }
                body.push(next);
                node = next;
            }
            body
        })
    }

    /// Render a copy of the body with `context`.
    ///
    /// The copy lives in a detached container; the returned nodes are its
    /// children after rendering, ready to be passed to [`Block::replace`].
    pub fn process(
        &self,
        doc: &mut XmlDocument,
        context: &Context,
        env: &mut RenderEnv,
    ) -> TemplateResult<Vec<NodeId>> {
        let body = self.body(doc).to_vec();
        let container = doc.create_element(CONTAINER);
        for node in body {
            let copy = doc.deep_clone(node);
            doc.append_child(container, copy);
        }

        process_node(doc, container, context, env)?;
        Ok(doc.children(container).collect())
    }

    /// Put `sequences` (in document order) where the block was and remove the
    /// block: its body and its directive scaffolding.
    pub fn replace(&self, doc: &mut XmlDocument, sequences: Vec<Vec<NodeId>>) {
        let body = self.body(doc).to_vec();

        for node in sequences.into_iter().flatten().rev() {
            doc.insert_after(self.start_node, node);
        }

        for node in body {
            doc.detach(node);
        }
        match self.kind {
            BlockKind::Row | BlockKind::Paragraph => {
                doc.detach(self.start_node);
                doc.detach(self.end_node);
            }
            BlockKind::Inline => {
                self.start_field.remove(doc);
                self.end_field.remove(doc);
            }
        }
    }
}

fn classify(doc: &XmlDocument, start: &Field, end: &Field) -> BlockKind {
    let differ = |name: &str| match (start.ancestor(doc, name), end.ancestor(doc, name)) {
        (Some(a), Some(b)) => a != b,
        _ => false,
    };

    if differ("w:tr") {
        BlockKind::Row
    } else if differ("w:p") {
        BlockKind::Paragraph
    } else {
        BlockKind::Inline
    }
}

fn anchors(doc: &XmlDocument, start: &Field, end: &Field, name: &str) -> Option<(NodeId, NodeId)> {
    Some((start.ancestor(doc, name)?, end.ancestor(doc, name)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::discover;
    use pretty_assertions::assert_eq;

    fn field(expr: &str) -> String {
        format!(
            r#"<w:fldSimple w:instr=" MERGEFIELD {} \* MERGEFORMAT "><w:r><w:t>«{}»</w:t></w:r></w:fldSimple>"#,
            expr, expr
        )
    }

    fn block(xml: &str) -> (XmlDocument, Block) {
        let doc = XmlDocument::parse(xml).unwrap();
        let mut fields = discover(&doc, doc.root()).into_iter();
        let start = fields.next().unwrap();
        let end = fields.next().unwrap();
        let block = Block::enclosed_by(&doc, start, end);
        (doc, block)
    }

    fn rows() -> String {
        format!(
            "<w:tbl><w:tr><w:tc><w:p>{}</w:p></w:tc></w:tr><w:tr><w:tc><w:p><w:r><w:t>body</w:t></w:r></w:p></w:tc></w:tr><w:tr><w:tc><w:p>{}</w:p></w:tc></w:tr></w:tbl>",
            field("items:each(i)"),
            field("items:endEach")
        )
    }

    fn paragraphs() -> String {
        format!(
            "<w:body><w:p>{}</w:p><w:p><w:r><w:t>one</w:t></w:r></w:p><w:p><w:r><w:t>two</w:t></w:r></w:p><w:p>{}</w:p><w:p><w:r><w:t>after</w:t></w:r></w:p></w:body>",
            field("x:if"),
            field("x:endIf")
        )
    }

    fn inline() -> String {
        format!(
            "<w:p><w:r><w:t>a</w:t></w:r>{}<w:r><w:t>b</w:t></w:r>{}<w:r><w:t>c</w:t></w:r></w:p>",
            field("x:if"),
            field("x:endIf")
        )
    }

    #[test]
    fn test_classification() {
        assert_eq!(block(&rows()).1.kind(), BlockKind::Row);
        assert_eq!(block(&paragraphs()).1.kind(), BlockKind::Paragraph);
        assert_eq!(block(&inline()).1.kind(), BlockKind::Inline);
    }

    #[test]
    fn test_classification_is_symmetric() {
        for xml in [rows(), paragraphs(), inline()] {
            let doc = XmlDocument::parse(&xml).unwrap();
            let fields = discover(&doc, doc.root());
            let forward = Block::enclosed_by(&doc, fields[0].clone(), fields[1].clone());
            let backward = Block::enclosed_by(&doc, fields[1].clone(), fields[0].clone());
            assert_eq!(forward.kind(), backward.kind());
        }
    }

    #[test]
    fn test_body_between_anchors() {
        let (doc, block) = block(&paragraphs());
        let texts: Vec<String> = block
            .body(&doc)
            .iter()
            .map(|&n| doc.text_content(n))
            .collect();
        assert_eq!(texts, vec!["one", "two"]);
    }

    #[test]
    fn test_replace_with_nothing_removes_paragraph_block() {
        let (mut doc, block) = block(&paragraphs());
        block.replace(&mut doc, vec![]);
        assert_eq!(
            doc.to_xml(),
            "<w:body><w:p><w:r><w:t>after</w:t></w:r></w:p></w:body>"
        );
    }

    #[test]
    fn test_replace_with_nothing_keeps_inline_paragraph() {
        let (mut doc, block) = block(&inline());
        block.replace(&mut doc, vec![]);
        assert_eq!(
            doc.to_xml(),
            "<w:p><w:r><w:t>a</w:t></w:r><w:r><w:t>c</w:t></w:r></w:p>"
        );
    }

    #[test]
    fn test_process_and_replace_repeats_rows_in_order() {
        let (mut doc, block) = block(&rows());
        let context = Context::new();
        let mut env = RenderEnv::new();

        let first = block.process(&mut doc, &context, &mut env).unwrap();
        let second = block.process(&mut doc, &context, &mut env).unwrap();
        let text = doc.find(second[0], "w:t").unwrap();
        doc.set_text_content(text, "second");

        block.replace(&mut doc, vec![first, second]);
        assert_eq!(
            doc.to_xml(),
            "<w:tbl><w:tr><w:tc><w:p><w:r><w:t>body</w:t></w:r></w:p></w:tc></w:tr><w:tr><w:tc><w:p><w:r><w:t>second</w:t></w:r></w:p></w:tc></w:tr></w:tbl>"
        );
    }
}
