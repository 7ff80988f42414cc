/*
 * content.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Content inserted in place of a field's display text.
//!
//! [`Content::wrap`] turns an evaluated [`Value`] into content. Values that
//! are already [`Content`] pass through untouched; this is how callers insert
//! WordprocessingML, HTML or images into a plain text field.

use std::fmt;
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use wordmerge_xml::{NodeId, XmlDocument};

use crate::context::Value;
use crate::env::RenderEnv;
use crate::error::{TemplateError, TemplateResult};
use crate::numbering::Numbering;

/// Runs of line-break characters and the text between them.
static TEXT_PARTS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\n\r]+|[\n\r]+").unwrap());

/// Converts HTML markup into WordprocessingML.
///
/// Conversion itself is not part of this crate. A converter must register a
/// numbering definition for every list it emits.
pub trait HtmlConverter {
    /// Convert `html` into block-level WordprocessingML (a sequence of
    /// `w:p`/`w:tbl` elements). `styles` is an optional style mapping in a
    /// converter-defined format.
    fn convert(
        &self,
        html: &str,
        styles: Option<&str>,
        numbering: &mut Numbering,
    ) -> TemplateResult<String>;
}

/// Renderable content.
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    /// Plain text. Line breaks become `w:br` elements.
    Text(String),

    /// Block-level WordprocessingML that replaces the field's paragraph.
    WordMl(String),

    /// Run-level WordprocessingML inserted next to the display text, or in
    /// place of the enclosing run when `replace_run` is set.
    InlineWordMl { xml: String, replace_run: bool },

    /// HTML converted with the render call's [`HtmlConverter`].
    Html { html: String, styles: Option<String> },

    /// An image for a picture placeholder.
    Image(ImageData),
}

impl Content {
    /// Wrap an evaluated value.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::UnsupportedContent`] for lists, maps, host
    /// objects, callables and non-image binary data.
    pub fn wrap(value: Value) -> TemplateResult<Content> {
        match value {
            Value::Content(content) => Ok(content),
            Value::Bytes(bytes) if ImageData::is_image(&bytes) => {
                Ok(Content::Image(ImageData { bytes }))
            }
            Value::String(text) => Ok(Content::Text(text)),
            scalar @ (Value::Integer(_) | Value::Float(_) | Value::Bool(_)) => {
                Ok(Content::Text(scalar.to_text().unwrap_or_default()))
            }
            other => Err(TemplateError::UnsupportedContent {
                value: other.describe(),
            }),
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Content::Text(text.into())
    }

    pub fn word_ml(xml: impl Into<String>) -> Self {
        Content::WordMl(xml.into())
    }

    pub fn inline_word_ml(xml: impl Into<String>, replace_run: bool) -> Self {
        Content::InlineWordMl {
            xml: xml.into(),
            replace_run,
        }
    }

    pub fn html(html: impl Into<String>, styles: Option<String>) -> Self {
        Content::Html {
            html: html.into(),
            styles,
        }
    }

    /// Short name used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Content::Text(_) => "text",
            Content::WordMl(_) => "word_ml",
            Content::InlineWordMl { .. } => "inline_word_ml",
            Content::Html { .. } => "html",
            Content::Image(_) => "image",
        }
    }

    /// Insert this content's markup next to `display`.
    ///
    /// Never removes `display` itself; the caller does that afterwards.
    /// Block-level content is inserted after `paragraph` and removes it.
    pub fn append_to(
        &self,
        doc: &mut XmlDocument,
        paragraph: Option<NodeId>,
        display: NodeId,
        env: &mut RenderEnv,
    ) -> TemplateResult<()> {
        match self {
            Content::Text(text) => {
                append_text(doc, display, text);
                Ok(())
            }
            Content::WordMl(xml) => append_block(doc, paragraph, display, xml),
            Content::InlineWordMl { xml, replace_run } => {
                let anchor = if *replace_run {
                    doc.ancestor(display, "w:r").unwrap_or(display)
                } else {
                    display
                };
                insert_fragment_after(doc, anchor, xml)?;
                if *replace_run {
                    doc.detach(anchor);
                }
                Ok(())
            }
            Content::Html { html, styles } => {
                let (converter, numbering) = env.converter_and_numbering();
                let converter = converter.ok_or_else(|| TemplateError::UnsupportedContent {
                    value: "HTML content (no HTML converter configured)".to_string(),
                })?;
                let xml = converter.convert(html, styles.as_deref(), numbering)?;
                append_block(doc, paragraph, display, &xml)
            }
            // Images only render through picture placeholders.
            Content::Image(_) => Ok(()),
        }
    }
}

fn append_text(doc: &mut XmlDocument, display: NodeId, text: &str) {
    let parts: Vec<&str> = TEXT_PARTS.find_iter(text).map(|m| m.as_str()).collect();

    for part in parts.into_iter().rev() {
        if part.starts_with(['\n', '\r']) {
            let br = doc.create_element("w:br");
            doc.insert_after(display, br);
        } else {
            let copy = doc.deep_clone(display);
            doc.set_text_content(copy, part);
            if part.starts_with(char::is_whitespace) || part.ends_with(char::is_whitespace) {
                doc.set_attribute(copy, "xml:space", "preserve");
            }
            doc.insert_after(display, copy);
        }
    }
}

fn append_block(
    doc: &mut XmlDocument,
    paragraph: Option<NodeId>,
    display: NodeId,
    xml: &str,
) -> TemplateResult<()> {
    match paragraph {
        Some(paragraph) => {
            insert_fragment_after(doc, paragraph, xml)?;
            doc.detach(paragraph);
        }
        None => insert_fragment_after(doc, display, xml)?,
    }
    Ok(())
}

fn insert_fragment_after(doc: &mut XmlDocument, anchor: NodeId, xml: &str) -> TemplateResult<()> {
    let nodes = doc.parse_fragment(xml)?;
    for node in nodes.into_iter().rev() {
        doc.insert_after(anchor, node);
    }
    Ok(())
}

/// Raw image bytes, recognised by their magic number.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageData {
    bytes: Arc<[u8]>,
}

/// Dimensions and media type of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageSpec {
    pub width: u32,
    pub height: u32,
    pub content_type: &'static str,
}

/// Image formats whose headers can be decoded for placement.
const DECODABLE_IMAGE_TYPES: [&str; 4] = ["image/png", "image/jpeg", "image/bmp", "image/gif"];

impl ImageData {
    /// Check whether `bytes` start with the signature of a decodable image
    /// format (PNG, JPEG, BMP or GIF).
    pub fn is_image(bytes: &[u8]) -> bool {
        infer::get(bytes).is_some_and(|kind| DECODABLE_IMAGE_TYPES.contains(&kind.mime_type()))
    }

    /// # Errors
    ///
    /// Returns [`TemplateError::Image`] if the bytes are not a known image
    /// format.
    pub fn from_bytes(bytes: impl Into<Arc<[u8]>>) -> TemplateResult<Self> {
        let bytes = bytes.into();
        if !Self::is_image(&bytes) {
            return Err(TemplateError::Image {
                message: "data is not a recognised image format".to_string(),
            });
        }
        Ok(Self { bytes })
    }

    /// Read an image file.
    pub fn from_path(path: impl AsRef<Path>) -> TemplateResult<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        Self::from_bytes(bytes).map_err(|_| TemplateError::Image {
            message: format!("{} is not a recognised image", path.display()),
        })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn shared_bytes(&self) -> Arc<[u8]> {
        Arc::clone(&self.bytes)
    }

    /// MIME type sniffed from the magic number, e.g. `image/png`.
    pub fn content_type(&self) -> &'static str {
        infer::get(&self.bytes)
            .map(|kind| kind.mime_type())
            .unwrap_or("application/octet-stream")
    }

    /// File extension derived from the MIME subtype (`png`, `jpeg`, ...).
    pub fn extension(&self) -> &'static str {
        let content_type = self.content_type();
        content_type
            .strip_prefix("image/")
            .unwrap_or(content_type)
    }

    /// Decode the header to obtain pixel dimensions.
    pub fn spec(&self) -> TemplateResult<ImageSpec> {
        let reader = image::ImageReader::new(Cursor::new(self.bytes()))
            .with_guessed_format()?;
        let (width, height) = reader.into_dimensions().map_err(|e| TemplateError::Image {
            message: e.to_string(),
        })?;

        Ok(ImageSpec {
            width,
            height,
            content_type: self.content_type(),
        })
    }
}

impl fmt::Debug for ImageData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageData")
            .field("content_type", &self.content_type())
            .field("len", &self.bytes.len())
            .finish()
    }
}
