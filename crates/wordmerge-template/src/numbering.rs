/*
 * numbering.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Registry of list numbering definitions allocated during a render.
//!
//! HTML conversion registers one definition per list root it emits; nested
//! list levels reuse that definition with a deeper indent level. IDs are
//! allocated as `max existing + 1` so lists produced in different loop
//! iterations or call blocks never share a definition.

use serde::Serialize;

/// A numbering definition allocated for one list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Definition {
    pub num_id: u32,
    pub style: String,
}

#[derive(Debug, Clone, Default)]
pub struct Numbering {
    /// Highest ID already used by the template's own numbering part.
    reserved: u32,
    definitions: Vec<Definition>,
}

impl Numbering {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry whose allocations start after the template's existing IDs.
    pub fn with_existing_ids(ids: impl IntoIterator<Item = u32>) -> Self {
        Self {
            reserved: ids.into_iter().max().unwrap_or(0),
            definitions: Vec::new(),
        }
    }

    /// Allocate a definition for a new list rendered with `style`.
    pub fn register(&mut self, style: &str) -> Definition {
        let num_id = self
            .definitions
            .iter()
            .map(|d| d.num_id)
            .max()
            .unwrap_or(self.reserved)
            .max(self.reserved)
            + 1;

        let definition = Definition {
            num_id,
            style: style.to_string(),
        };
        self.definitions.push(definition.clone());
        definition
    }

    /// Forget every definition allocated so far. Reserved template IDs stay
    /// reserved.
    pub fn reset(&mut self) {
        self.definitions.clear();
    }

    /// Definitions in allocation order.
    pub fn definitions(&self) -> &[Definition] {
        &self.definitions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_allocates_increasing_ids() {
        let mut numbering = Numbering::new();
        let a = numbering.register("ListBullet");
        let b = numbering.register("ListNumber");
        let c = numbering.register("ListBullet");

        assert_eq!((a.num_id, b.num_id, c.num_id), (1, 2, 3));
        assert_eq!(b.style, "ListNumber");
        assert_eq!(numbering.definitions().len(), 3);
    }

    #[test]
    fn test_existing_ids_are_skipped() {
        let mut numbering = Numbering::with_existing_ids([4, 12, 7]);
        assert_eq!(numbering.register("ListBullet").num_id, 13);
    }

    #[test]
    fn test_reset() {
        let mut numbering = Numbering::with_existing_ids([2]);
        numbering.register("ListBullet");
        numbering.reset();

        assert!(numbering.definitions().is_empty());
        assert_eq!(numbering.register("ListBullet").num_id, 3);
    }
}
