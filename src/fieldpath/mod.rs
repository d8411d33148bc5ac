//! Field path module - Locates nodes inside objects for diagnostics.
//!
//! Paths never take part in merge decisions; they only name where something
//! happened so that errors can point at it.

mod path;

pub use path::*;
