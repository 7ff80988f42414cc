//! Command implementations for the wordmerge CLI
//!
//! Each command module handles the CLI interface and delegates to
//! wordmerge-template for the actual work.

pub mod fields;
pub mod render;
