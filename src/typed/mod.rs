//! Typed module - Values paired with the merge semantics of their schema.
//!
//! This module adapts generic values into typed trees, detects atomic
//! violations in patches and merges patches into live objects.

mod adapter;
mod atomic;
mod merge;
mod typed_value;
mod validation;

#[cfg(test)]
mod merge_test;

pub use adapter::*;
pub use atomic::*;
pub use merge::*;
pub use typed_value::*;
pub use validation::*;
