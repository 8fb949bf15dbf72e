//! Identifier resolution.
//!
//! Turns a caller-supplied identifier (local id, `wd:`/`wdt:` reference or
//! free-text English label) into local ids. Resolving an unknown label
//! creates a draft entity, so resolution is not idempotent for labels the
//! store has never seen.

use mardi_core::{
  Error, Result,
  entity::{Entity, EntityKind, EntityRef, ForeignRef, LocalId},
  store::{EntityDirectory, EntityStore, ForeignMapping, WriteOutcome},
};
use serde::Serialize;
use tracing::{debug, info, warn};

// ─── Results ─────────────────────────────────────────────────────────────────

/// The outcome of [`IdentifierResolver::resolve`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "ids", rename_all = "lowercase")]
pub enum Resolution {
  /// Exactly one local id.
  Local(LocalId),
  /// Existing entities whose label matched; never empty.
  Candidates(Vec<LocalId>),
  /// No local id could be determined.
  Unresolved,
}

impl Resolution {
  /// The single id, or the first candidate.
  pub fn first(&self) -> Option<LocalId> {
    match self {
      Self::Local(id) => Some(id.clone()),
      Self::Candidates(ids) => ids.first().cloned(),
      Self::Unresolved => None,
    }
  }

  pub fn is_resolved(&self) -> bool { !matches!(self, Self::Unresolved) }

  pub fn into_vec(self) -> Vec<LocalId> {
    match self {
      Self::Local(id) => vec![id],
      Self::Candidates(ids) => ids,
      Self::Unresolved => Vec::new(),
    }
  }
}

/// Outcome of [`create_entity`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Persisted {
  Created(LocalId),
  /// The store already held an entity with the same label and description.
  AlreadyExists(LocalId),
}

impl Persisted {
  pub fn id(&self) -> &LocalId {
    match self {
      Self::Created(id) | Self::AlreadyExists(id) => id,
    }
  }
}

/// Persist a new entity. A label+description conflict is not an error: the
/// conflicting entity is fetched and its id returned as
/// [`Persisted::AlreadyExists`].
pub async fn create_entity<S: EntityStore>(
  store: &S,
  entity: &Entity,
) -> Result<Persisted> {
  match store.write_entity(entity).await.map_err(Error::backend)? {
    WriteOutcome::Written(written) => {
      written.id.map(Persisted::Created).ok_or(Error::MissingId)
    }
    WriteOutcome::Conflict { existing } => {
      info!(%existing, "entity already exists; reusing it");
      let found = store.get_entity(existing.clone()).await.map_err(Error::backend)?;
      Ok(Persisted::AlreadyExists(found.id.unwrap_or(existing)))
    }
  }
}

// ─── Resolver ────────────────────────────────────────────────────────────────

/// Resolves identifier expressions against the store, the label directory
/// and the foreign-id mapping service.
pub struct IdentifierResolver<'a, S, D, M> {
  store:     &'a S,
  directory: &'a D,
  mapping:   &'a M,
}

impl<S, D, M> Clone for IdentifierResolver<'_, S, D, M> {
  fn clone(&self) -> Self { *self }
}

impl<S, D, M> Copy for IdentifierResolver<'_, S, D, M> {}

impl<'a, S, D, M> IdentifierResolver<'a, S, D, M>
where
  S: EntityStore,
  D: EntityDirectory,
  M: ForeignMapping,
{
  pub fn new(store: &'a S, directory: &'a D, mapping: &'a M) -> Self {
    Self { store, directory, mapping }
  }

  pub fn store(&self) -> &'a S { self.store }

  pub fn directory(&self) -> &'a D { self.directory }

  /// Resolve `identifier` to entities of `kind`.
  ///
  /// - local ids are returned unchanged without touching the store;
  /// - labels return the matching entities, or a freshly created draft when
  ///   nothing matches;
  /// - foreign references are looked up in the mapping service, whose
  ///   failures yield [`Resolution::Unresolved`];
  /// - anything else is [`Resolution::Unresolved`].
  ///
  /// Errors are returned only when the directory search or the draft write
  /// fails.
  pub async fn resolve(&self, identifier: &str, kind: EntityKind) -> Result<Resolution> {
    match identifier.parse::<EntityRef>() {
      Ok(EntityRef::Local(id)) => Ok(Resolution::Local(id)),
      Ok(EntityRef::Label(label)) => self.resolve_label(&label, kind).await,
      Ok(EntityRef::Foreign(foreign)) => Ok(self.map_foreign(&foreign).await),
      Err(err) => {
        debug!(identifier, %err, "malformed identifier");
        Ok(Resolution::Unresolved)
      }
    }
  }

  /// Existing entities of `kind` labelled `label`; never creates anything.
  pub async fn search(&self, kind: EntityKind, label: &str) -> Result<Vec<LocalId>> {
    if label.is_empty() {
      return Ok(Vec::new());
    }
    self.directory.search(kind, label).await.map_err(Error::backend)
  }

  async fn resolve_label(&self, label: &str, kind: EntityKind) -> Result<Resolution> {
    let candidates = self.search(kind, label).await?;
    if !candidates.is_empty() {
      debug!(label, count = candidates.len(), "label matched existing entities");
      return Ok(Resolution::Candidates(candidates));
    }

    let draft = Entity::draft(kind, label);
    let persisted = create_entity(self.store, &draft).await?;
    info!(label, %kind, id = %persisted.id(), "created draft entity");
    Ok(Resolution::Local(persisted.id().clone()))
  }

  async fn map_foreign(&self, foreign: &ForeignRef) -> Resolution {
    match self.mapping.local_id(foreign).await {
      Ok(Some(id)) => Resolution::Local(id),
      Ok(None) => {
        debug!(%foreign, "no local mapping");
        Resolution::Unresolved
      }
      Err(err) => {
        warn!(%foreign, %err, "foreign mapping lookup failed");
        Resolution::Unresolved
      }
    }
  }
}
