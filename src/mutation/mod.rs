//! Mutation module - Apply configurations merged into admitted objects.
//!
//! A patch flows through the typed adapter, the atomicity check and the
//! merge engine, in that order, and the first failure ends the request.

mod applier;
mod engine;
mod error;
mod request;

pub use applier::*;
pub use engine::*;
pub use error::*;
pub use request::*;
