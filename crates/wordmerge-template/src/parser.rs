/*
 * parser.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Statement construction from a list of fields.
//!
//! Directive syntax, by field expression:
//!
//! | expression            | statement                                    |
//! |-----------------------|----------------------------------------------|
//! | `=expr`               | insertion                                    |
//! | `expr:each(var)`      | loop, closed by `expr:endEach`               |
//! | `expr:if` / `expr:if(pred)` | condition, closed by `expr:endIf`      |
//! | `expr:call` / `expr:call(args)` | call block, closed by `expr:endCall` |
//! | `comment`             | comment, closed by `endComment`              |
//!
//! Fields inside a block are consumed (and nested blocks matched) only to find
//! the block's end. Their statements are built again when the block body is
//! rendered.

use std::collections::VecDeque;

use once_cell::sync::Lazy;
use regex::Regex;
use wordmerge_xml::XmlDocument;

use crate::block::Block;
use crate::error::{TemplateError, TemplateResult};
use crate::expression::Expression;
use crate::field::Field;
use crate::statement::Statement;

static EACH: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([^ ]+):each\(([^ )]+)\)$").unwrap());
static IF_PREDICATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([^ ]+):if\(([^)]+)\)$").unwrap());
static IF: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([^ ]+):if$").unwrap());
static CALL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([^ ]+):call(?:\(([^)]*)\))?$").unwrap());

const COMMENT: &str = "comment";
const END_COMMENT: &str = "endComment";

/// Build the top-level statements for `fields`, in document order.
///
/// # Errors
///
/// Returns [`TemplateError::UnmatchedBlock`] if a block is never closed.
pub fn build_statements(doc: &XmlDocument, fields: Vec<Field>) -> TemplateResult<Vec<Statement>> {
    OperationConstruction::new(doc, fields).statements()
}

/// Single-pass scanner over the field list with one field of lookahead.
struct OperationConstruction<'a> {
    doc: &'a XmlDocument,
    fields: VecDeque<Field>,
    /// The field consumed last; `None` once the list is exhausted.
    current: Option<Field>,
}

impl<'a> OperationConstruction<'a> {
    fn new(doc: &'a XmlDocument, fields: Vec<Field>) -> Self {
        Self {
            doc,
            fields: fields.into(),
            current: None,
        }
    }

    fn statements(mut self) -> TemplateResult<Vec<Statement>> {
        let mut statements = Vec::new();
        while !self.fields.is_empty() {
            if let Some(statement) = self.consume(true)? {
                statements.push(statement);
            }
        }
        Ok(statements)
    }

    fn consume(&mut self, allow_insertion: bool) -> TemplateResult<Option<Statement>> {
        self.current = self.fields.pop_front();
        let Some(field) = self.current.clone() else {
            return Ok(None);
        };
        let expression = field.expression();

        if let Some(expr) = expression.strip_prefix('=') {
            if !allow_insertion {
                return Ok(None);
            }
            let expression = Expression::parse(expr);
            return Ok(Some(Statement::Insertion { expression, field }));
        }

        if let Some(caps) = EACH.captures(expression) {
            let block = self.consume_block(&format!("{}:endEach", &caps[1]))?;
            return Ok(Some(Statement::Loop {
                list: Expression::parse(&caps[1]),
                iterator: caps[2].to_string(),
                block,
            }));
        }

        if let Some(caps) = IF_PREDICATE.captures(expression) {
            let block = self.consume_block(&format!("{}:endIf", &caps[1]))?;
            return Ok(Some(Statement::Condition {
                condition: Expression::parse(&caps[1]),
                block,
                predicate: Some(caps[2].to_string()),
            }));
        }

        if let Some(caps) = IF.captures(expression) {
            let block = self.consume_block(&format!("{}:endIf", &caps[1]))?;
            return Ok(Some(Statement::Condition {
                condition: Expression::parse(&caps[1]),
                block,
                predicate: None,
            }));
        }

        if expression == COMMENT {
            let block = self.consume_block(END_COMMENT)?;
            return Ok(Some(Statement::Comment { block }));
        }

        if let Some(caps) = CALL.captures(expression) {
            let block = self.consume_block(&format!("{}:endCall", &caps[1]))?;
            return Ok(Some(Statement::Call {
                callable: Expression::parse(&caps[1]),
                block,
                arguments: caps.get(2).map(|m| m.as_str().to_string()),
            }));
        }

        Ok(None)
    }

    /// Consume fields up to the one whose expression is `end_expression`.
    /// The current field is the block's start. A nested block's end field
    /// never closes the enclosing block, even with the same expression.
    fn consume_block(&mut self, end_expression: &str) -> TemplateResult<Block> {
        let Some(start_field) = self.current.clone() else {
            return Err(TemplateError::UnmatchedBlock {
                start: String::new(),
                expected_end: end_expression.to_string(),
            });
        };

        loop {
            let nested = self.consume(false)?;
            match &self.current {
                Some(_) if nested.is_some() => {}
                Some(end_field) if end_field.expression() == end_expression => {
                    return Ok(Block::enclosed_by(self.doc, start_field, end_field.clone()));
                }
                Some(_) => {}
                None => {
                    return Err(TemplateError::UnmatchedBlock {
                        start: start_field.expression().to_string(),
                        expected_end: end_expression.to_string(),
                    });
                }
            }
        }
    }
}
