/*
 * render.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Render command implementation
 */

//! Render command implementation.
//!
//! Renders a single, already extracted document part. Reading and writing
//! the surrounding package is left to the caller, so values that only
//! exist in-process (images, callables, pre-rendered markup) are not
//! reachable from here: the context is plain JSON.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use tracing::{debug, info};

use wordmerge_template::{Context, DocumentPart, PartKind, RenderEnv, RenderOptions};

/// Arguments for the render command
#[derive(Debug)]
pub struct RenderArgs {
    /// Document part to render
    pub input: PathBuf,
    /// JSON context file
    pub context: Option<PathBuf>,
    /// Output file; stdout when `None`
    pub output: Option<PathBuf>,
    /// TOML options file
    pub config: Option<PathBuf>,
    pub cache_dir: Option<PathBuf>,
    pub start_page_number: Option<u32>,
    pub header_footer: bool,
}

/// Execute the render command
pub fn execute(args: RenderArgs) -> Result<()> {
    let rendered = render(&args)?;

    match &args.output {
        Some(path) => {
            fs::write(path, rendered)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Rendered {} to {}", args.input.display(), path.display());
        }
        None => print!("{}", rendered),
    }
    Ok(())
}

fn render(args: &RenderArgs) -> Result<String> {
    let options = load_options(args)?;
    debug!(?options, "Render options");

    let context = match &args.context {
        Some(path) => load_context(path)?,
        None => Context::new(),
    };

    let xml = fs::read_to_string(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;
    let kind = if args.header_footer {
        PartKind::HeaderFooter
    } else {
        PartKind::Document
    };

    let mut part = DocumentPart::parse(&xml, kind)
        .with_context(|| format!("Failed to parse {}", args.input.display()))?;
    part.render(&context, &mut RenderEnv::new(), &options)
        .with_context(|| format!("Failed to render {}", args.input.display()))?;

    Ok(part.to_xml())
}

/// Options from the config file, with command-line flags taking precedence.
fn load_options(args: &RenderArgs) -> Result<RenderOptions> {
    let mut options = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            toml::from_str(&text)
                .with_context(|| format!("Invalid config file {}", path.display()))?
        }
        None => RenderOptions::default(),
    };

    if let Some(dir) = &args.cache_dir {
        options.cache_dir = Some(dir.clone());
    }
    if let Some(start) = args.start_page_number {
        options.start_page_number = Some(start);
    }
    Ok(options)
}

fn load_context(path: &Path) -> Result<Context> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read context file {}", path.display()))?;
    let data: serde_json::Value = serde_json::from_str(&text)
        .with_context(|| format!("Invalid JSON in {}", path.display()))?;
    Context::from_json(data).with_context(|| format!("Invalid context in {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    const PART: &str = r#"<w:document><w:body><w:p><w:fldSimple w:instr=" MERGEFIELD =name \* MERGEFORMAT "><w:r><w:t>«=name»</w:t></w:r></w:fldSimple></w:p><w:sectPr/></w:body></w:document>"#;

    fn args(temp: &TempDir) -> RenderArgs {
        let input = temp.path().join("document.xml");
        let context = temp.path().join("context.json");
        fs::write(&input, PART).unwrap();
        fs::write(&context, r#"{"name": "Ada"}"#).unwrap();
        RenderArgs {
            input,
            context: Some(context),
            output: Some(temp.path().join("out.xml")),
            config: None,
            cache_dir: None,
            start_page_number: None,
            header_footer: false,
        }
    }

    #[test]
    fn test_render_to_file() {
        let temp = TempDir::new().unwrap();
        let args = args(&temp);
        execute(args).unwrap();

        let output = fs::read_to_string(temp.path().join("out.xml")).unwrap();
        assert_eq!(
            output,
            "<w:document><w:body><w:p><w:r><w:t>Ada</w:t></w:r></w:p><w:sectPr/></w:body></w:document>"
        );
    }

    #[test]
    fn test_flags_override_config_file() {
        let temp = TempDir::new().unwrap();
        let config = temp.path().join("wordmerge.toml");
        fs::write(&config, "start-page-number = 4\ncache-dir = \"cache\"\n").unwrap();

        let mut args = args(&temp);
        args.config = Some(config);
        args.start_page_number = Some(7);

        let options = load_options(&args).unwrap();
        assert_eq!(options.start_page_number, Some(7));
        assert_eq!(options.cache_dir, Some(PathBuf::from("cache")));

        args.cache_dir = Some(temp.path().join("cache"));
        let rendered = render(&args).unwrap();
        assert!(rendered.contains(r#"<w:pgNumType w:start="7"/>"#), "{}", rendered);
    }

    #[test]
    fn test_unknown_config_key_is_an_error() {
        let temp = TempDir::new().unwrap();
        let config = temp.path().join("wordmerge.toml");
        fs::write(&config, "start_page = 4\n").unwrap();

        let mut args = args(&temp);
        args.config = Some(config);
        assert!(load_options(&args).is_err());
    }

    #[test]
    fn test_context_must_be_an_object() {
        let temp = TempDir::new().unwrap();
        let args = args(&temp);
        fs::write(args.context.as_ref().unwrap(), "[1, 2]").unwrap();

        let err = render(&args).unwrap_err();
        assert!(
            format!("{:#}", err).contains("expected a JSON object"),
            "{:#}",
            err
        );
    }
}
