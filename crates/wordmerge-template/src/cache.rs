/*
 * cache.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Persistent cache of discovered fields.
//!
//! Entries are keyed by a fingerprint of the engine version and the exact part
//! content. An entry records each field's kind and the positions of its nodes
//! in the pre-order enumeration of the part, so rehydrating needs a single
//! walk over a freshly parsed tree.
//!
//! Layout of the cache directory:
//!
//! ```text
//! <dir>/<fingerprint>.json   cache entry
//! <dir>/<fingerprint>.lock   advisory lock (shared for reads, exclusive for writes)
//! ```
//!
//! Any failure to read or write an entry is reported at debug/warn level and
//! treated as a cache miss.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};
use wordmerge_xml::{NodeId, XmlDocument};

use crate::discovery::discover;
use crate::field::{Field, FieldKind};
use crate::version::ENGINE_VERSION;

#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    engine_version: String,
    fields: Vec<CachedField>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CachedField {
    kind: FieldKind,
    positions: Vec<usize>,
}

/// A directory of field cache entries.
#[derive(Debug, Clone)]
pub struct FieldCache {
    dir: PathBuf,
}

impl FieldCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Hex SHA-256 of the engine version and `content`.
    pub fn fingerprint(content: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(ENGINE_VERSION.as_bytes());
        hasher.update([0u8]);
        hasher.update(content.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Discover the fields of `doc`, which must have been parsed from
    /// `source`, reusing a cached result when one exists.
    pub fn discover(&self, source: &str, doc: &XmlDocument) -> Vec<Field> {
        let key = Self::fingerprint(source);

        if let Some(fields) = self.load(&key, doc) {
            debug!(%key, count = fields.len(), "Field cache hit");
            return fields;
        }

        debug!(%key, "Field cache miss");
        let fields = discover(doc, doc.root());
        if let Err(e) = self.store(&key, doc, &fields) {
            warn!(%key, error = %e, "Failed to write field cache entry");
        }
        fields
    }

    /// Rehydrate the entry `key` against `doc`.
    pub fn load(&self, key: &str, doc: &XmlDocument) -> Option<Vec<Field>> {
        let entry_path = self.entry_path(key);
        if !entry_path.exists() {
            return None;
        }

        let content = match self.read_locked(key, &entry_path) {
            Ok(content) => content,
            Err(e) => {
                debug!(path = %entry_path.display(), error = %e, "Unreadable field cache entry");
                return None;
            }
        };

        let entry: CacheEntry = match serde_json::from_str(&content) {
            Ok(entry) => entry,
            Err(e) => {
                debug!(path = %entry_path.display(), error = %e, "Corrupt field cache entry");
                return None;
            }
        };

        if entry.engine_version != ENGINE_VERSION {
            return None;
        }
        rehydrate(doc, &entry)
    }

    /// Write the entry `key` for `fields` discovered in `doc`.
    pub fn store(&self, key: &str, doc: &XmlDocument, fields: &[Field]) -> io::Result<()> {
        let positions = positions_of(doc);
        let fields = fields
            .iter()
            .map(|field| {
                let positions = field
                    .nodes()
                    .iter()
                    .map(|node| positions.get(node).copied())
                    .collect::<Option<Vec<usize>>>()?;
                Some(CachedField {
                    kind: field.kind(),
                    positions,
                })
            })
            .collect::<Option<Vec<CachedField>>>()
            .ok_or_else(|| {
                io::Error::new(io::ErrorKind::InvalidInput, "field outside of the document")
            })?;

        let entry = CacheEntry {
            engine_version: ENGINE_VERSION.to_string(),
            fields,
        };
        let json = serde_json::to_string(&entry)?;

        fs::create_dir_all(&self.dir)?;
        let lock = self.lock_file(key)?;
        FileExt::lock_exclusive(&lock)?;

        // Write to a temp file then rename so readers never see partial entries
        let entry_path = self.entry_path(key);
        let temp_path = entry_path.with_extension(format!("json.{}.tmp", std::process::id()));
        fs::write(&temp_path, json)?;
        let result = fs::rename(&temp_path, &entry_path);

        FileExt::unlock(&lock)?;
        result
    }

    fn read_locked(&self, key: &str, entry_path: &Path) -> io::Result<String> {
        let lock = self.lock_file(key)?;
        FileExt::lock_shared(&lock)?;
        let content = fs::read_to_string(entry_path);
        FileExt::unlock(&lock)?;
        content
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    fn lock_file(&self, key: &str) -> io::Result<File> {
        OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.dir.join(format!("{}.lock", key)))
    }
}

fn positions_of(doc: &XmlDocument) -> HashMap<NodeId, usize> {
    doc.descendants(doc.root())
        .enumerate()
        .map(|(index, node)| (node, index))
        .collect()
}

fn rehydrate(doc: &XmlDocument, entry: &CacheEntry) -> Option<Vec<Field>> {
    let nodes: Vec<NodeId> = doc.descendants(doc.root()).collect();

    let mut fields = Vec::with_capacity(entry.fields.len());
    for cached in &entry.fields {
        let field_nodes = cached
            .positions
            .iter()
            .map(|&position| nodes.get(position).copied())
            .collect::<Option<Vec<NodeId>>>()?;
        let field = Field::from_nodes(doc, cached.kind, field_nodes)?;
        if !field.is_valid() {
            return None;
        }
        fields.push(field);
    }
    Some(fields)
}
