//! Resolver module - Schemas per resource kind, fetched once and shared.

mod client;
mod resolver;

pub use client::*;
pub use resolver::*;
