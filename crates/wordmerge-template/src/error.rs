/*
 * error.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Error types for directive parsing and evaluation.

use thiserror::Error;

/// Errors that can occur while rendering a document part.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// The document part is not well-formed XML.
    #[error("XML error: {0}")]
    Xml(#[from] wordmerge_xml::Error),

    /// The render context could not be built from the supplied data.
    #[error("Invalid context: {message}")]
    InvalidContext { message: String },

    /// A block was opened but its end marker never appeared.
    #[error("Could not find end field for «{start}». Was looking for «{expected_end}»")]
    UnmatchedBlock { start: String, expected_end: String },

    /// A loop source did not evaluate to a list.
    #[error("The expression «{expression}» should evaluate to an enumerable but was: {value}")]
    NotEnumerable { expression: String, value: String },

    /// A call block's expression did not evaluate to a callable.
    #[error("The expression «{expression}» should evaluate to a callable but was: {value}")]
    NotCallable { expression: String, value: String },

    /// A call argument is neither a literal nor a `=expression`.
    #[error("Invalid call argument: {argument}")]
    InvalidCallArgument { argument: String },

    /// No content type accepts the value.
    #[error("Could not find content type to wrap {value}")]
    UnsupportedContent { value: String },

    /// Image data could not be recognised or decoded.
    #[error("Image error: {message}")]
    Image { message: String },

    /// Error reported by a user-supplied callable or converter.
    #[error("{message}")]
    Callback { message: String },

    /// I/O error (e.g., reading an image file).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for template operations.
pub type TemplateResult<T> = Result<T, TemplateError>;
