/*
 * env.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Shared state of one render call.

use std::fmt;

use crate::content::HtmlConverter;
use crate::numbering::Numbering;
use crate::resources::Resources;

/// The registries a render call threads through every nested block.
///
/// There is exactly one `RenderEnv` per render call. Block bodies and call
/// blocks are re-rendered with the same `&mut RenderEnv`, so image
/// relationship IDs and numbering IDs stay unique across the whole part.
#[derive(Default)]
pub struct RenderEnv {
    /// Embedded resources: the template's relationships plus new images.
    pub resources: Resources,

    /// List numbering definitions allocated by HTML content.
    pub numbering: Numbering,

    html_converter: Option<Box<dyn HtmlConverter>>,
}

impl RenderEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_resources(mut self, resources: Resources) -> Self {
        self.resources = resources;
        self
    }

    pub fn with_numbering(mut self, numbering: Numbering) -> Self {
        self.numbering = numbering;
        self
    }

    /// Install the converter used by HTML content.
    pub fn with_html_converter(mut self, converter: impl HtmlConverter + 'static) -> Self {
        self.html_converter = Some(Box::new(converter));
        self
    }

    /// Split borrow of the converter and the numbering registry it writes to.
    pub(crate) fn converter_and_numbering(
        &mut self,
    ) -> (Option<&dyn HtmlConverter>, &mut Numbering) {
        (self.html_converter.as_deref(), &mut self.numbering)
    }
}

impl fmt::Debug for RenderEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderEnv")
            .field("resources", &self.resources)
            .field("numbering", &self.numbering)
            .field("html_converter", &self.html_converter.is_some())
            .finish()
    }
}
