//! Read-only entity queries.
//!
//! Unlike [`IdentifierResolver::resolve`], nothing here creates draft
//! entities: unknown labels simply match nothing.

use mardi_core::{
  Error, Result,
  entity::{DEFAULT_LANGUAGE, Entity, EntityKind, EntityRef, LocalId},
  store::{EntityDirectory, EntityStore, ForeignMapping},
};
use tracing::debug;

use crate::resolve::IdentifierResolver;

/// Label of the property linking an item to its class.
pub const INSTANCE_OF: &str = "instance of";

pub struct EntityQueries<'a, S, D, M> {
  resolver: IdentifierResolver<'a, S, D, M>,
}

impl<'a, S, D, M> EntityQueries<'a, S, D, M>
where
  S: EntityStore,
  D: EntityDirectory,
  M: ForeignMapping,
{
  pub fn new(resolver: IdentifierResolver<'a, S, D, M>) -> Self { Self { resolver } }

  /// The item whose English label is `label` and whose English description
  /// equals `description`. A missing description matches only an empty one.
  ///
  /// The directory also matches aliases, so every hit's label is checked.
  pub async fn exists(&self, label: &str, description: &str) -> Result<Option<LocalId>> {
    for id in self.resolver.search(EntityKind::Item, label).await? {
      let entity = self.fetch(&id).await?;
      if entity.label(DEFAULT_LANGUAGE) == Some(label)
        && entity.description(DEFAULT_LANGUAGE).unwrap_or("") == description
      {
        return Ok(Some(id));
      }
    }
    Ok(None)
  }

  /// Items labelled `label` whose first `instance of` statement points at
  /// `instance`.
  pub async fn instances_of(&self, label: &str, instance: &str) -> Result<Vec<LocalId>> {
    let Some(class) = self.lookup(instance, EntityKind::Item).await? else {
      debug!(instance, "instance class not found");
      return Ok(Vec::new());
    };
    let Some(instance_of) = self.lookup(INSTANCE_OF, EntityKind::Property).await? else {
      debug!("no `instance of` property found");
      return Ok(Vec::new());
    };

    let mut found = Vec::new();
    for id in self.resolver.search(EntityKind::Item, label).await? {
      let entity = self.fetch(&id).await?;
      let first = entity.statements(&instance_of).first().and_then(|s| s.item_value());
      if first.as_ref() == Some(&class) {
        found.push(id);
      }
    }
    Ok(found)
  }

  /// The first of [`Self::instances_of`].
  pub async fn is_instance_of(&self, label: &str, instance: &str) -> Result<Option<LocalId>> {
    Ok(self.instances_of(label, instance).await?.into_iter().next())
  }

  /// The first instance of `instance` labelled `label` that also has `value`
  /// among its `property` values.
  pub async fn is_instance_of_with_property(
    &self,
    label: &str,
    instance: &str,
    property: &str,
    value: &str,
  ) -> Result<Option<LocalId>> {
    for id in self.instances_of(label, instance).await? {
      if self.values_of(&id, property).await?.iter().any(|v| v == value) {
        return Ok(Some(id));
      }
    }
    Ok(None)
  }

  /// The simple values of every `property` statement on `id`: strings and
  /// external ids as is, items as their id, times as the time string.
  pub async fn values_of(&self, id: &LocalId, property: &str) -> Result<Vec<String>> {
    let Some(prop) = self.lookup(property, EntityKind::Property).await? else {
      return Ok(Vec::new());
    };
    let entity = self.fetch(id).await?;
    Ok(entity.statements(&prop).iter().filter_map(|s| s.simple_value()).collect())
  }

  /// A single existing id for `identifier`; labels take the first match.
  async fn lookup(&self, identifier: &str, kind: EntityKind) -> Result<Option<LocalId>> {
    match identifier.parse::<EntityRef>() {
      Ok(EntityRef::Label(label)) => {
        Ok(self.resolver.search(kind, &label).await?.into_iter().next())
      }
      Ok(_) => Ok(self.resolver.resolve(identifier, kind).await?.first()),
      Err(_) => Ok(None),
    }
  }

  async fn fetch(&self, id: &LocalId) -> Result<Entity> {
    self.resolver.store().get_entity(id.clone()).await.map_err(Error::backend)
  }
}
