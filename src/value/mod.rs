//! Value module - In-memory representation of YAML/JSON objects.
//!
//! This module provides type-aware operations on values.

mod value;

pub use value::*;
