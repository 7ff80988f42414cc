/*
 * resources.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! The resource map: relationship IDs of a document part and the images
//! registered for them during a render.

use std::collections::BTreeMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use wordmerge_xml::XmlDocument;

use crate::content::ImageData;

static RELATIONSHIP_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^rId(\d+)$").unwrap());

const IMAGE_RELATIONSHIP_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";

/// Image extensions declared in `[Content_Types].xml` so rendered images open.
const IMAGE_TYPES: [&str; 4] = ["jpeg", "png", "bmp", "gif"];

/// One entry of the resource map.
#[derive(Debug, Clone, PartialEq)]
pub enum Resource {
    /// A relationship the template already declares.
    Relationship { kind: String, target: String },

    /// An image registered during rendering.
    Image(ImageData),
}

#[derive(Debug, Clone, Default)]
pub struct Resources {
    entries: BTreeMap<String, Resource>,
}

impl Resources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the map from a relationships part (`word/_rels/document.xml.rels`).
    pub fn from_relationships(rels: &XmlDocument) -> Self {
        let mut resources = Self::new();
        for node in rels.find_all(rels.root(), "Relationship") {
            let Some(id) = rels.attribute(node, "Id") else {
                continue;
            };
            resources.insert(
                id,
                Resource::Relationship {
                    kind: rels.attribute(node, "Type").unwrap_or_default().to_string(),
                    target: rels.attribute(node, "Target").unwrap_or_default().to_string(),
                },
            );
        }
        resources
    }

    pub fn insert(&mut self, id: impl Into<String>, resource: Resource) {
        self.entries.insert(id.into(), resource);
    }

    pub fn get(&self, id: &str) -> Option<&Resource> {
        self.entries.get(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The next free `rIdN`: one past the highest numbered ID in the map.
    pub fn next_image_id(&self) -> String {
        let max = self
            .entries
            .keys()
            .filter_map(|id| relationship_number(id))
            .max()
            .unwrap_or(0);
        format!("rId{}", max + 1)
    }

    /// Register `image` under a fresh ID and return that ID.
    pub fn insert_image(&mut self, image: ImageData) -> String {
        let id = self.next_image_id();
        self.entries.insert(id.clone(), Resource::Image(image));
        id
    }

    /// Images registered during rendering, by increasing ID.
    pub fn images(&self) -> Vec<(&str, &ImageData)> {
        let mut images: Vec<(&str, &ImageData)> = self
            .entries
            .iter()
            .filter_map(|(id, resource)| match resource {
                Resource::Image(image) => Some((id.as_str(), image)),
                Resource::Relationship { .. } => None,
            })
            .collect();
        images.sort_by_key(|(id, _)| relationship_number(id));
        images
    }

    /// Archive paths (relative to the container root) and bytes of every
    /// rendered image.
    pub fn media_entries(&self) -> Vec<(String, Arc<[u8]>)> {
        self.images()
            .into_iter()
            .map(|(id, image)| (format!("word/{}", media_target(id, image)), image.shared_bytes()))
            .collect()
    }

    /// Append a `Relationship` for each rendered image that `rels` does not
    /// declare yet.
    pub fn write_relationships(&self, rels: &mut XmlDocument) {
        let root = rels.root();
        let declared: Vec<String> = rels
            .find_all(root, "Relationship")
            .into_iter()
            .filter_map(|node| rels.attribute(node, "Id").map(str::to_string))
            .collect();

        for (id, image) in self.images() {
            if declared.iter().any(|d| d == id) {
                continue;
            }
            let node = rels.create_element("Relationship");
            rels.set_attribute(node, "Id", id);
            rels.set_attribute(node, "Type", IMAGE_RELATIONSHIP_TYPE);
            rels.set_attribute(node, "Target", media_target(id, image));
            rels.append_child(root, node);
        }
    }
}

/// Add a `Default` content type for every image extension the package does
/// not declare yet.
pub fn ensure_image_content_types(types: &mut XmlDocument) {
    let root = types.root();
    for extension in IMAGE_TYPES {
        let content_type = format!("image/{}", extension);
        let declared = types
            .element_children(root)
            .any(|node| types.attribute(node, "ContentType") == Some(content_type.as_str()));
        if declared {
            continue;
        }

        let node = types.create_element("Default");
        types.set_attribute(node, "Extension", extension);
        types.set_attribute(node, "ContentType", content_type);
        types.append_child(root, node);
    }
}

fn relationship_number(id: &str) -> Option<u64> {
    RELATIONSHIP_ID
        .captures(id)
        .and_then(|caps| caps[1].parse().ok())
}

fn media_target(id: &str, image: &ImageData) -> String {
    format!("media/auto{}.{}", id.to_lowercase(), image.extension())
}
