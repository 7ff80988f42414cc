/*
 * context.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Render values and the scoped context they are looked up in.
//!
//! A [`Context`] is immutable once rendering starts: loops and call blocks
//! derive child scopes with [`Context::merge`] instead of mutating the
//! caller's bindings, so sibling iterations never observe each other.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use wordmerge_xml::NodeId;

use crate::content::Content;
use crate::error::{TemplateError, TemplateResult};
use crate::statement::CallScope;

/// Host values that answer member lookups (`record.field` in a directive).
///
/// Implement this for application types that should be reachable from
/// templates without first being converted into a [`Value::Map`].
pub trait MemberLookup: fmt::Debug + Send + Sync {
    /// Resolve `name` on this value, or `None` if it has no such member.
    fn member(&self, name: &str) -> Option<Value>;
}

/// Signature of the functions behind [`Callable`] values.
///
/// Arguments: the call scope (document access and sub-rendering), the raw body
/// nodes of the call block, and the parsed call arguments. Returns the nodes
/// that replace the block, in document order.
pub type CallFn =
    dyn Fn(&mut CallScope<'_>, &[NodeId], &[Value]) -> TemplateResult<Vec<NodeId>> + Send + Sync;

/// A function value invoked by `expr:call(...)` blocks.
#[derive(Clone)]
pub struct Callable(Arc<CallFn>);

impl Callable {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&mut CallScope<'_>, &[NodeId], &[Value]) -> TemplateResult<Vec<NodeId>>
            + Send
            + Sync
            + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn call(
        &self,
        scope: &mut CallScope<'_>,
        body: &[NodeId],
        args: &[Value],
    ) -> TemplateResult<Vec<NodeId>> {
        (self.0)(scope, body, args)
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Callable(..)")
    }
}

/// A value bound in a [`Context`].
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// Absent value. Lookups treat it exactly like an unbound name.
    #[default]
    Null,

    Bool(bool),

    Integer(i64),

    Float(f64),

    String(String),

    List(Vec<Value>),

    /// A string-keyed record; dotted paths perform key lookups on it.
    Map(HashMap<String, Value>),

    /// Raw binary data, e.g. an image to place into a picture placeholder.
    Bytes(Arc<[u8]>),

    /// A host value with custom member dispatch.
    Object(Arc<dyn MemberLookup>),

    Callable(Callable),

    /// Pre-built content that is inserted as-is.
    Content(Content),
}

impl Value {
    /// Truthiness used by condition blocks: a list is truthy iff it is
    /// non-empty, any other value iff it is neither `false` nor null.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::List(items) => !items.is_empty(),
            Value::Bool(b) => *b,
            Value::Null => false,
            _ => true,
        }
    }

    /// Blankness as used by the `blank?` and `present?` members.
    pub fn is_blank(&self) -> bool {
        match self {
            Value::Null | Value::Bool(false) => true,
            Value::String(s) => s.trim().is_empty(),
            Value::List(items) => items.is_empty(),
            Value::Map(map) => map.is_empty(),
            Value::Bytes(bytes) => bytes.is_empty(),
            _ => false,
        }
    }

    /// Resolve one segment of a dotted path.
    ///
    /// Maps perform a key lookup; every other value dispatches the segment as
    /// a member (see [`Value::dispatch`]).
    pub fn member(&self, name: &str) -> Option<Value> {
        match self {
            Value::Map(map) => map.get(name).cloned(),
            other => other.dispatch(name),
        }
    }

    /// Dispatch `name` as a method-like member, never as a map key.
    ///
    /// Used directly for condition predicates (`list:if(any?)`).
    pub fn dispatch(&self, name: &str) -> Option<Value> {
        match self {
            Value::Object(object) => object.member(name),
            other => other.builtin(name),
        }
    }

    fn builtin(&self, name: &str) -> Option<Value> {
        let value = match (self, name) {
            (_, "nil?") => Value::Bool(matches!(self, Value::Null)),
            (_, "blank?") => Value::Bool(self.is_blank()),
            (_, "present?") => Value::Bool(!self.is_blank()),

            (Value::String(s), "length" | "size") => Value::Integer(s.chars().count() as i64),
            (Value::String(s), "upcase") => Value::String(s.to_uppercase()),
            (Value::String(s), "downcase") => Value::String(s.to_lowercase()),
            (Value::String(s), "strip") => Value::String(s.trim().to_string()),
            (Value::String(s), "empty?") => Value::Bool(s.is_empty()),

            (Value::List(items), "length" | "size" | "count") => {
                Value::Integer(items.len() as i64)
            }
            (Value::List(items), "first") => items.first()?.clone(),
            (Value::List(items), "last") => items.last()?.clone(),
            (Value::List(items), "empty?") => Value::Bool(items.is_empty()),
            (Value::List(items), "any?") => Value::Bool(items.iter().any(Value::is_truthy)),

            (Value::Map(map), "length" | "size" | "count") => Value::Integer(map.len() as i64),
            (Value::Map(map), "empty?") => Value::Bool(map.is_empty()),
            (Value::Map(map), "any?") => Value::Bool(!map.is_empty()),

            (Value::Integer(i), "abs") => Value::Integer(i.abs()),
            (Value::Integer(i), "zero?") => Value::Bool(*i == 0),
            (Value::Integer(i), "positive?") => Value::Bool(*i > 0),
            (Value::Integer(i), "negative?") => Value::Bool(*i < 0),
            (Value::Float(x), "abs") => Value::Float(x.abs()),
            (Value::Float(x), "zero?") => Value::Bool(*x == 0.0),
            (Value::Float(x), "positive?") => Value::Bool(*x > 0.0),
            (Value::Float(x), "negative?") => Value::Bool(*x < 0.0),

            (_, "to_s") => Value::String(self.to_text()?),
            _ => return None,
        };
        Some(value)
    }

    /// The plain-text rendering of scalar values.
    pub fn to_text(&self) -> Option<String> {
        match self {
            Value::String(s) => Some(s.clone()),
            Value::Integer(i) => Some(i.to_string()),
            Value::Float(x) => Some(x.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// A short, human-readable description for error messages.
    pub fn describe(&self) -> String {
        match self {
            Value::Null => "nil".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Integer(i) => i.to_string(),
            Value::Float(x) => x.to_string(),
            Value::String(s) => format!("{:?}", s),
            Value::List(items) => {
                let items: Vec<String> = items.iter().map(Value::describe).collect();
                format!("[{}]", items.join(", "))
            }
            Value::Map(map) => {
                let mut entries: Vec<(&String, &Value)> = map.iter().collect();
                entries.sort_by(|a, b| a.0.cmp(b.0));
                let entries: Vec<String> = entries
                    .into_iter()
                    .map(|(k, v)| format!("{}: {}", k, v.describe()))
                    .collect();
                format!("{{{}}}", entries.join(", "))
            }
            Value::Bytes(bytes) => format!("<{} bytes>", bytes.len()),
            Value::Object(object) => format!("{:?}", object),
            Value::Callable(_) => "<callable>".to_string(),
            Value::Content(content) => format!("<{} content>", content.kind_name()),
        }
    }

    /// Convert a JSON value. Integers that fit `i64` stay integral.
    pub fn from_json(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Integer(i),
                None => Value::Float(n.as_f64().unwrap_or_default()),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(map) => Value::Map(
                map.into_iter()
                    .map(|(k, v)| (k, Value::from_json(v)))
                    .collect(),
            ),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
            (Value::Callable(a), Value::Callable(b)) => Arc::ptr_eq(&a.0, &b.0),
            (Value::Content(a), Value::Content(b)) => a == b,
            _ => false,
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::List(value)
    }
}

impl From<HashMap<String, Value>> for Value {
    fn from(value: HashMap<String, Value>) -> Self {
        Value::Map(value)
    }
}

impl From<Content> for Value {
    fn from(value: Content) -> Self {
        Value::Content(value)
    }
}

impl From<Callable> for Value {
    fn from(value: Callable) -> Self {
        Value::Callable(value)
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        Value::from_json(value)
    }
}

#[derive(Debug, Clone, Default)]
struct Frame {
    variables: HashMap<String, Value>,
    parent: Option<Arc<Frame>>,
}

/// Variable bindings for one render scope.
///
/// Cloning is cheap: scopes share their parents.
#[derive(Debug, Clone, Default)]
pub struct Context {
    frame: Arc<Frame>,
}

impl Context {
    /// Create a new empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a top-level context from a JSON object.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::InvalidContext`] if `data` is not an object.
    pub fn from_json(data: serde_json::Value) -> TemplateResult<Self> {
        match data {
            serde_json::Value::Object(map) => {
                let mut context = Context::new();
                for (key, value) in map {
                    context.insert(key, Value::from_json(value));
                }
                Ok(context)
            }
            other => Err(TemplateError::InvalidContext {
                message: format!("expected a JSON object, found {}", json_kind(&other)),
            }),
        }
    }

    /// Bind a variable while building a context.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        Arc::make_mut(&mut self.frame)
            .variables
            .insert(key.into(), value.into());
    }

    /// Look a variable up, checking enclosing scopes.
    pub fn get(&self, key: &str) -> Option<&Value> {
        let mut frame = Some(self.frame.as_ref());
        while let Some(current) = frame {
            if let Some(value) = current.variables.get(key) {
                return Some(value);
            }
            frame = current.parent.as_deref();
        }
        None
    }

    /// A child scope identical to this one except for one added or
    /// overridden binding. `self` is left unchanged.
    pub fn merge(&self, key: impl Into<String>, value: impl Into<Value>) -> Context {
        let mut variables = HashMap::new();
        variables.insert(key.into(), value.into());
        Context {
            frame: Arc::new(Frame {
                variables,
                parent: Some(Arc::clone(&self.frame)),
            }),
        }
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_truthiness() {
        assert!(Value::Bool(true).is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(!Value::Null.is_truthy());

        assert!(Value::List(vec![Value::Bool(false)]).is_truthy());
        assert!(!Value::List(vec![]).is_truthy());

        // Only lists, false and null are falsy
        assert!(Value::String(String::new()).is_truthy());
        assert!(Value::Integer(0).is_truthy());
        assert!(Value::Map(HashMap::new()).is_truthy());
    }

    #[test]
    fn test_builtin_members() {
        let name = Value::from("Ada");
        assert_eq!(name.member("upcase"), Some(Value::from("ADA")));
        assert_eq!(name.member("length"), Some(Value::Integer(3)));
        assert_eq!(name.member("no_such_member"), None);

        let list = Value::from(vec![Value::from("a"), Value::from("b")]);
        assert_eq!(list.member("first"), Some(Value::from("a")));
        assert_eq!(list.member("count"), Some(Value::Integer(2)));
        assert_eq!(Value::List(vec![]).member("first"), None);

        assert_eq!(Value::Null.dispatch("blank?"), Some(Value::Bool(true)));
        assert_eq!(Value::from("  ").dispatch("present?"), Some(Value::Bool(false)));
        assert_eq!(Value::Integer(-4).member("abs"), Some(Value::Integer(4)));
    }

    #[test]
    fn test_map_member_is_key_lookup_only() {
        let value = Value::from_json(json!({"size": "large"}));
        assert_eq!(value.member("size"), Some(Value::from("large")));
        assert_eq!(value.member("empty?"), None);
        // Predicate dispatch goes to the builtin instead
        assert_eq!(value.dispatch("empty?"), Some(Value::Bool(false)));
    }

    #[derive(Debug)]
    struct Point {
        x: i64,
    }

    impl MemberLookup for Point {
        fn member(&self, name: &str) -> Option<Value> {
            match name {
                "x" => Some(Value::Integer(self.x)),
                "origin?" => Some(Value::Bool(self.x == 0)),
                _ => None,
            }
        }
    }

    #[test]
    fn test_object_member_dispatch() {
        let point = Value::Object(Arc::new(Point { x: 3 }));
        assert_eq!(point.member("x"), Some(Value::Integer(3)));
        assert_eq!(point.dispatch("origin?"), Some(Value::Bool(false)));
        assert_eq!(point.member("y"), None);
    }

    #[test]
    fn test_from_json() {
        let value = Value::from_json(json!({"n": 2, "f": 1.5, "items": [true, null]}));
        assert_eq!(value.member("n"), Some(Value::Integer(2)));
        assert_eq!(value.member("f"), Some(Value::Float(1.5)));
        assert_eq!(
            value.member("items"),
            Some(Value::List(vec![Value::Bool(true), Value::Null]))
        );
    }

    #[test]
    fn test_describe() {
        let value = Value::from_json(json!({"b": [1, "x"], "a": null}));
        assert_eq!(value.describe(), r#"{a: nil, b: [1, "x"]}"#);
    }

    #[test]
    fn test_context_merge_does_not_touch_parent() {
        let mut parent = Context::new();
        parent.insert("x", "parent_x");
        parent.insert("y", "parent_y");

        let child = parent.merge("x", "child_x");

        assert_eq!(child.get("x"), Some(&Value::from("child_x")));
        assert_eq!(child.get("y"), Some(&Value::from("parent_y")));
        assert_eq!(parent.get("x"), Some(&Value::from("parent_x")));
        assert_eq!(child.get("z"), None);
    }

    #[test]
    fn test_context_from_json_requires_object() {
        let context = Context::from_json(json!({"greeting": "hi"})).unwrap();
        assert_eq!(context.get("greeting"), Some(&Value::from("hi")));

        let err = Context::from_json(json!([1, 2])).unwrap_err();
        assert!(err.to_string().contains("an array"));
    }
}
