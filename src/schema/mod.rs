//! Schema module defines a targeted schema language for structured merges.
//!
//! Every container type states how its elements relate: atomic containers are
//! replaced as a whole, separable maps merge field by field, and associative
//! lists match their elements by key.

mod decl;
mod elements;
mod kind;
mod kind_schema;

pub use decl::*;
pub use elements::*;
pub use kind::*;
pub use kind_schema::*;
