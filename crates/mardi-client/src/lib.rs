//! Resolution, claim and merge logic for the MaRDI knowledge graph.
//!
//! Everything here is generic over the collaborator traits in
//! [`mardi_core::store`], so the same code runs against the live portal
//! (`mardi-wikibase`) and against in-memory fakes in tests.

pub mod claims;
pub mod lookup;
pub mod merge;
pub mod resolve;
pub mod search;

pub use claims::ClaimBuilder;
pub use lookup::EntityQueries;
pub use merge::{MergeConfig, MergeCoordinator};
pub use resolve::{IdentifierResolver, Persisted, Resolution, create_entity};
pub use search::{SearchValue, ValueSearch};

#[cfg(test)]
mod tests;
