/*
 * statement.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Statements and their evaluation.

use tracing::trace;
use wordmerge_xml::{NodeId, XmlDocument};

use crate::block::Block;
use crate::content::Content;
use crate::context::{Context, Value};
use crate::env::RenderEnv;
use crate::error::{TemplateError, TemplateResult};
use crate::expression::Expression;
use crate::field::Field;
use crate::processor::process_node;

/// Context variable holding the auxiliary value passed to [`CallScope::render`].
pub const CALL_CONTEXT: &str = "call_context";

#[derive(Debug, Clone)]
pub enum Statement {
    /// `=expr`: replace the field with the value of `expression`.
    Insertion { expression: Expression, field: Field },

    /// `list:each(iterator)`: render the block once per item of `list`.
    Loop {
        list: Expression,
        iterator: String,
        block: Block,
    },

    /// `expr:if` / `expr:if(predicate)`: keep the block only when truthy.
    Condition {
        condition: Expression,
        block: Block,
        predicate: Option<String>,
    },

    /// `expr:call(args)`: hand the block to a callable.
    Call {
        callable: Expression,
        block: Block,
        arguments: Option<String>,
    },

    /// `comment`: drop the block.
    Comment { block: Block },
}

impl Statement {
    pub fn evaluate(
        &self,
        doc: &mut XmlDocument,
        context: &Context,
        env: &mut RenderEnv,
    ) -> TemplateResult<()> {
        match self {
            Statement::Insertion { expression, field } => {
                trace!(%expression, "Evaluating insertion");
                // Absent and false both drop the field.
                match expression.evaluate(context) {
                    None | Some(Value::Bool(false)) => field.remove(doc),
                    Some(value) => {
                        let content = Content::wrap(value)?;
                        field.replace(doc, &content, env)?;
                    }
                }
            }

            Statement::Loop {
                list,
                iterator,
                block,
            } => {
                let items = match list.evaluate(context) {
                    Some(Value::List(items)) => items,
                    other => {
                        return Err(TemplateError::NotEnumerable {
                            expression: list.to_string(),
                            value: other.unwrap_or_default().describe(),
                        });
                    }
                };
                trace!(%list, count = items.len(), "Evaluating loop");

                let mut sequences = Vec::with_capacity(items.len());
                for item in items {
                    let scope = context.merge(iterator.as_str(), item);
                    sequences.push(block.process(doc, &scope, env)?);
                }
                block.replace(doc, sequences);
            }

            Statement::Condition {
                condition,
                block,
                predicate,
            } => {
                let value = condition.evaluate(context);
                let value = match predicate {
                    Some(predicate) => value.unwrap_or_default().dispatch(predicate),
                    None => value,
                };
                let truthy = value.is_some_and(|v| v.is_truthy());
                trace!(%condition, ?predicate, truthy, "Evaluating condition");

                if truthy {
                    let nodes = block.process(doc, context, env)?;
                    block.replace(doc, vec![nodes]);
                } else {
                    block.replace(doc, Vec::new());
                }
            }

            Statement::Call {
                callable,
                block,
                arguments,
            } => {
                let function = match callable.evaluate(context) {
                    Some(Value::Callable(function)) => function,
                    other => {
                        return Err(TemplateError::NotCallable {
                            expression: callable.to_string(),
                            value: other.unwrap_or_default().describe(),
                        });
                    }
                };
                let args = parse_arguments(arguments.as_deref(), context)?;
                trace!(%callable, args = args.len(), "Evaluating call");

                let body = block.body(doc).to_vec();
                let nodes = {
                    let mut scope = CallScope {
                        document: &mut *doc,
                        env: &mut *env,
                        context,
                    };
                    function.call(&mut scope, &body, &args)?
                };
                block.replace(doc, vec![nodes]);
            }

            Statement::Comment { block } => {
                trace!("Evaluating comment");
                block.replace(doc, Vec::new());
            }
        }
        Ok(())
    }
}

/// What a callable sees while it handles a call block.
pub struct CallScope<'a> {
    document: &'a mut XmlDocument,
    env: &'a mut RenderEnv,
    context: &'a Context,
}

impl CallScope<'_> {
    /// The document part being rendered. Nodes the callable returns must be
    /// created in this document.
    pub fn document(&mut self) -> &mut XmlDocument {
        &mut *self.document
    }

    pub fn env(&mut self) -> &mut RenderEnv {
        &mut *self.env
    }

    /// The context of the call block.
    pub fn context(&self) -> &Context {
        self.context
    }

    /// Render the directives below `node` (typically a copy of the block
    /// body) with the call block's context plus `call_context`.
    pub fn render(&mut self, node: NodeId, call_context: impl Into<Value>) -> TemplateResult<()> {
        let context = self.context.merge(CALL_CONTEXT, call_context);
        process_node(&mut *self.document, node, &context, &mut *self.env)
    }
}

/// Parse a call block's argument list.
///
/// Arguments are separated by commas outside quotes. Each one is an integer,
/// a float, `true`/`false`, `nil`/`null`, a single- or double-quoted string,
/// or `=expr` evaluated against `context` (absent values become null).
pub fn parse_arguments(arguments: Option<&str>, context: &Context) -> TemplateResult<Vec<Value>> {
    let Some(arguments) = arguments.filter(|a| !a.trim().is_empty()) else {
        return Ok(Vec::new());
    };

    split_arguments(arguments)
        .into_iter()
        .map(|arg| parse_argument(arg.trim(), context))
        .collect()
}

fn split_arguments(arguments: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (index, c) in arguments.char_indices() {
        match (quote, c) {
            (None, '"' | '\'') => quote = Some(c),
            (Some(open), _) if c == open => quote = None,
            (None, ',') => {
                parts.push(&arguments[start..index]);
                start = index + 1;
            }
            _ => {}
        }
    }
    parts.push(&arguments[start..]);
    parts
}

fn parse_argument(arg: &str, context: &Context) -> TemplateResult<Value> {
    if let Some(expr) = arg.strip_prefix('=') {
        return Ok(Expression::parse(expr.trim())
            .evaluate(context)
            .unwrap_or_default());
    }

    match arg {
        "true" => return Ok(Value::Bool(true)),
        "false" => return Ok(Value::Bool(false)),
        "nil" | "null" => return Ok(Value::Null),
        _ => {}
    }

    for quote in ['"', '\''] {
        if let Some(inner) = arg
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return Ok(Value::String(inner.to_string()));
        }
    }

    let numeric = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E' | '_'));
    if numeric {
        let digits = arg.replace('_', "");
        if let Ok(integer) = digits.parse::<i64>() {
            return Ok(Value::Integer(integer));
        }
        if let Ok(float) = digits.parse::<f64>() {
            return Ok(Value::Float(float));
        }
    }

    Err(TemplateError::InvalidCallArgument {
        argument: arg.to_string(),
    })
}
