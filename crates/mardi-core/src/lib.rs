//! Core types and collaborator traits for the MaRDI knowledge-graph client.
//!
//! This crate is free of HTTP dependencies. `mardi-client` builds the
//! resolution, claim and merge logic on top of it; `mardi-wikibase` provides
//! the HTTP implementations of the traits in [`store`].

pub mod claim;
pub mod entity;
pub mod error;
pub mod store;

pub use error::{Error, Result};
