/*
 * expression.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Dotted-path expressions.
//!
//! The directive language has no operators or literals: an expression is a
//! variable name, optionally followed by `.member` segments.

use std::fmt;

use crate::context::{Context, Value};

/// A parsed directive expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expression {
    /// A bare variable: `name`
    Variable(String),

    /// A variable followed by member segments: `person.address.city`
    Lookup { receiver: String, path: Vec<String> },
}

impl Expression {
    /// Parse expression text. Anything before the first `.` is the variable.
    pub fn parse(text: &str) -> Self {
        let mut parts = text.split('.');
        let receiver = parts.next().unwrap_or_default().to_string();
        let path: Vec<String> = parts.map(str::to_string).collect();

        if path.is_empty() {
            Expression::Variable(receiver)
        } else {
            Expression::Lookup { receiver, path }
        }
    }

    /// Evaluate against `context`.
    ///
    /// Unbound names, unsupported members and null values all yield `None`.
    pub fn evaluate(&self, context: &Context) -> Option<Value> {
        match self {
            Expression::Variable(name) => present(context.get(name)?.clone()),
            Expression::Lookup { receiver, path } => {
                let mut value = present(context.get(receiver)?.clone())?;
                for segment in path {
                    value = present(value.member(segment)?)?;
                }
                Some(value)
            }
        }
    }
}

fn present(value: Value) -> Option<Value> {
    match value {
        Value::Null => None,
        other => Some(other),
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Variable(name) => write!(f, "{}", name),
            Expression::Lookup { receiver, path } => write!(f, "{}.{}", receiver, path.join(".")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn context() -> Context {
        Context::from_json(json!({
            "greeting": "hello",
            "nothing": null,
            "person": {"first": "Ada", "address": {"city": "London"}, "tags": ["a", "b"]},
        }))
        .unwrap()
    }

    #[test]
    fn test_parse_shapes() {
        assert_eq!(
            Expression::parse("name"),
            Expression::Variable("name".to_string())
        );
        assert_eq!(
            Expression::parse("person.address.city"),
            Expression::Lookup {
                receiver: "person".to_string(),
                path: vec!["address".to_string(), "city".to_string()],
            }
        );
    }

    #[test]
    fn test_display_matches_source() {
        assert_eq!(Expression::parse("a.b.c").to_string(), "a.b.c");
        assert_eq!(Expression::parse("a").to_string(), "a");
    }

    #[test]
    fn test_variable_lookup() {
        let ctx = context();
        assert_eq!(
            Expression::parse("greeting").evaluate(&ctx),
            Some(Value::from("hello"))
        );
        assert_eq!(Expression::parse("missing").evaluate(&ctx), None);
        assert_eq!(Expression::parse("nothing").evaluate(&ctx), None);
    }

    #[test]
    fn test_path_lookup_through_maps_and_members() {
        let ctx = context();
        assert_eq!(
            Expression::parse("person.address.city").evaluate(&ctx),
            Some(Value::from("London"))
        );
        assert_eq!(
            Expression::parse("person.first.upcase").evaluate(&ctx),
            Some(Value::from("ADA"))
        );
        assert_eq!(
            Expression::parse("person.tags.count").evaluate(&ctx),
            Some(Value::Integer(2))
        );
    }

    #[test]
    fn test_path_lookup_miss_is_absent() {
        let ctx = context();
        assert_eq!(Expression::parse("person.age").evaluate(&ctx), None);
        assert_eq!(Expression::parse("missing.first").evaluate(&ctx), None);
        assert_eq!(Expression::parse("greeting.frobnicate").evaluate(&ctx), None);
        assert_eq!(Expression::parse("nothing.first").evaluate(&ctx), None);
    }
}
