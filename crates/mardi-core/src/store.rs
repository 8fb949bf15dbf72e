//! Collaborator traits.
//!
//! The resolution, claim and merge logic in `mardi-client` talks to the
//! knowledge graph exclusively through these traits. `mardi-wikibase`
//! implements them over HTTP; tests implement them in memory.

use serde::{Deserialize, Serialize};

use crate::entity::{Entity, EntityKind, ForeignRef, LocalId};

// ─── Result types ────────────────────────────────────────────────────────────

/// Outcome of [`EntityStore::write_entity`].
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOutcome {
  /// The entity was persisted; the snapshot carries its assigned id.
  Written(Entity),
  /// The store refused the write because another entity already has the same
  /// label and description.
  Conflict { existing: LocalId },
}

/// The `{from, to}` pair reported by the merge primitive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeResult {
  pub from: LocalId,
  pub to:   LocalId,
}

/// One term of a SPARQL binding row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SparqlTerm {
  #[serde(rename = "type", default)]
  pub term_type: String,
  pub value:     String,
}

/// A row of variable bindings.
pub type SparqlBinding = std::collections::HashMap<String, SparqlTerm>;

/// `{"results": {"bindings": [...]}}`, the SPARQL JSON results format.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SparqlResults {
  pub results: SparqlRows,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SparqlRows {
  #[serde(default)]
  pub bindings: Vec<SparqlBinding>,
}

// ─── Traits ──────────────────────────────────────────────────────────────────
//
// Every method returns a `Send` future so the traits can be driven from a
// multi-threaded tokio runtime.

/// Entity persistence (`wbgetentities` / `wbeditentity`).
pub trait EntityStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Fetch a snapshot of the entity with the given id.
  fn get_entity(
    &self,
    id: LocalId,
  ) -> impl Future<Output = Result<Entity, Self::Error>> + Send + '_;

  /// Persist `entity`. Unsaved entities (`id == None`) are created.
  ///
  /// A label+description uniqueness violation is reported as
  /// [`WriteOutcome::Conflict`] rather than as an error.
  fn write_entity<'a>(
    &'a self,
    entity: &'a Entity,
  ) -> impl Future<Output = Result<WriteOutcome, Self::Error>> + Send + 'a;
}

/// Label search over existing entities.
pub trait EntityDirectory: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Ids of entities of `kind` whose label matches `label`. Empty when
  /// nothing matches.
  fn search<'a>(
    &'a self,
    kind: EntityKind,
    label: &'a str,
  ) -> impl Future<Output = Result<Vec<LocalId>, Self::Error>> + Send + 'a;
}

/// Mapping from foreign (Wikidata) references to local ids.
pub trait ForeignMapping: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// The local id mapped to `foreign`, or `None` when there is no mapping.
  fn local_id<'a>(
    &'a self,
    foreign: &'a ForeignRef,
  ) -> impl Future<Output = Result<Option<LocalId>, Self::Error>> + Send + 'a;
}

/// SPARQL query execution.
pub trait SparqlExecutor: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn execute<'a>(
    &'a self,
    query: &'a str,
  ) -> impl Future<Output = Result<SparqlResults, Self::Error>> + Send + 'a;
}

/// Wiki page primitives. Pages are addressed as `<namespace>:<key>`.
pub trait PageStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn page_exists<'a>(
    &'a self,
    key: &'a str,
    namespace: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  fn delete_page<'a>(
    &'a self,
    key: &'a str,
    namespace: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  fn move_page<'a>(
    &'a self,
    from: &'a str,
    to: &'a str,
    namespace: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}

/// The store's item-merge primitive.
pub trait MergePrimitive: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Merge `source` into `target`; `target` survives.
  fn merge_items(
    &self,
    source: LocalId,
    target: LocalId,
  ) -> impl Future<Output = Result<MergeResult, Self::Error>> + Send + '_;
}
