/*
 * version.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Engine version.
//!
//! The version is part of every field cache key: entries written by one
//! release are never rehydrated by another.

/// Version of the directive engine.
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
