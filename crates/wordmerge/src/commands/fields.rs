/*
 * fields.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Fields command implementation
 */

//! Lists the merge fields found in a document part.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context as _, Result};
use serde::Serialize;

use wordmerge_template::{DocumentPart, Field, FieldCache, FieldKind, PartKind};

/// Arguments for the fields command
#[derive(Debug)]
pub struct FieldsArgs {
    pub input: PathBuf,
    pub json: bool,
    pub cache_dir: Option<PathBuf>,
}

#[derive(Serialize)]
struct FieldEntry<'a> {
    kind: FieldKind,
    expression: &'a str,
}

/// Execute the fields command
pub fn execute(args: FieldsArgs) -> Result<()> {
    let xml = fs::read_to_string(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;
    let part = DocumentPart::parse(&xml, PartKind::Document)
        .with_context(|| format!("Failed to parse {}", args.input.display()))?;

    let cache = args.cache_dir.as_ref().map(FieldCache::new);
    let fields = part.fields(cache.as_ref());

    print!("{}", format_fields(&fields, args.json)?);
    Ok(())
}

fn format_fields(fields: &[Field], json: bool) -> Result<String> {
    if json {
        let entries: Vec<FieldEntry<'_>> = fields
            .iter()
            .map(|field| FieldEntry {
                kind: field.kind(),
                expression: field.expression(),
            })
            .collect();
        let mut out = serde_json::to_string_pretty(&entries)?;
        out.push('\n');
        return Ok(out);
    }

    Ok(fields
        .iter()
        .map(|field| format!("{:<8} {}\n", kind_label(field.kind()), field.expression()))
        .collect())
}

fn kind_label(kind: FieldKind) -> &'static str {
    match kind {
        FieldKind::Simple => "simple",
        FieldKind::Complex => "complex",
        FieldKind::Image => "image",
    }
}
