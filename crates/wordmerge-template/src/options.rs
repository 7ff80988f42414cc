/*
 * options.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Render options.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Options for rendering a document part.
///
/// Deserializes from kebab-case keys:
///
/// ```toml
/// cache-dir = ".wordmerge-cache"
/// start-page-number = 3
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct RenderOptions {
    /// Directory for the field cache. Discovery is not cached when unset.
    pub cache_dir: Option<PathBuf>,

    /// First page number of the document's body section.
    pub start_page_number: Option<u32>,
}
