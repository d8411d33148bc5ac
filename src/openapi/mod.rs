//! OpenAPI module - Parse OpenAPI v3 documents and convert them to schemas.
//!
//! Kubernetes publishes one OpenAPI v3 document per group-version. Each
//! converts to a `Schema` plus an index from kind to root type name.

mod converter;
mod schema;

pub use converter::*;
pub use schema::*;
