//! Claim construction.
//!
//! [`ClaimBuilder::build`] resolves a property, looks up its declared
//! datatype and shapes the raw value accordingly. Properties whose datatype
//! cannot be determined fall back to a MathML markup claim.

use mardi_core::{
  Error, Result,
  claim::{Claim, Payload, ValueKind},
  entity::{ClaimAction, DEFAULT_LANGUAGE, Entity, EntityKind, EntityRef, LocalId},
  store::{EntityDirectory, EntityStore, ForeignMapping},
};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::resolve::{IdentifierResolver, Resolution};

/// Profile items every community portal page hangs off. These labels must
/// name existing items; when several match, the first is used.
pub const PROFILE_LABELS: [&str; 6] = [
  "MaRDI person profile",
  "MaRDI publication profile",
  "MaRDI software profile",
  "MaRDI formula profile",
  "MaRDI dataset profile",
  "MaRDI community profile",
];

pub fn is_profile_label(label: &str) -> bool { PROFILE_LABELS.contains(&label) }

pub struct ClaimBuilder<'a, S, D, M> {
  resolver: IdentifierResolver<'a, S, D, M>,
}

impl<'a, S, D, M> ClaimBuilder<'a, S, D, M>
where
  S: EntityStore,
  D: EntityDirectory,
  M: ForeignMapping,
{
  pub fn new(resolver: IdentifierResolver<'a, S, D, M>) -> Self { Self { resolver } }

  /// Build the claim for `property` carrying `value`.
  ///
  /// `extra` holds additional fields such as `language` (monolingual text),
  /// `unit` (quantities) or `precision` (times). A property that cannot be
  /// resolved, including one whose draft the store refuses, yields the
  /// markup fallback.
  pub async fn build(
    &self,
    property: &str,
    value: &str,
    extra: Map<String, Value>,
  ) -> Result<Claim> {
    let resolution = match self.resolver.resolve(property, EntityKind::Property).await {
      Ok(resolution) => resolution,
      Err(err) => {
        warn!(property, %err, "property resolution failed");
        Resolution::Unresolved
      }
    };
    let Some(prop) = resolution.first() else {
      warn!(property, "property unresolved; falling back to mathml");
      return Ok(Claim::markup_fallback(None, value, extra));
    };
    if prop.kind() != EntityKind::Property {
      return Err(Error::InvalidIdentifier(prop.to_string()));
    }

    match self.value_kind(&prop).await? {
      Some(kind) => self.claim_for_kind(prop, kind, value, extra).await,
      None => Ok(Claim::markup_fallback(Some(prop), value, extra)),
    }
  }

  /// Build a claim and attach it to `entity`.
  pub async fn add_claim(
    &self,
    entity: &mut Entity,
    property: &str,
    value: &str,
    extra: Map<String, Value>,
    action: ClaimAction,
  ) -> Result<()> {
    let claim = self.build(property, value, extra).await?;
    entity.add_statement(claim.to_statement()?, action);
    Ok(())
  }

  /// The declared datatype of `prop`, or `None` when the property metadata
  /// cannot be fetched. An unknown datatype name is an error.
  async fn value_kind(&self, prop: &LocalId) -> Result<Option<ValueKind>> {
    let entity = match self.resolver.store().get_entity(prop.clone()).await {
      Ok(entity) => entity,
      Err(err) => {
        warn!(%prop, %err, "property metadata unavailable; falling back to mathml");
        return Ok(None);
      }
    };
    match entity.datatype.as_deref() {
      Some(datatype) => ValueKind::parse(datatype).map(Some),
      None => {
        warn!(%prop, "property has no datatype; falling back to mathml");
        Ok(None)
      }
    }
  }

  /// Shape `value` for a property of known `kind`.
  pub async fn claim_for_kind(
    &self,
    prop: LocalId,
    kind: ValueKind,
    value: &str,
    mut extra: Map<String, Value>,
  ) -> Result<Claim> {
    let payload = match kind {
      ValueKind::Item => Payload::Entity { id: self.item_value(value).await? },
      ValueKind::Property => Payload::Entity { id: self.property_value(value).await? },
      ValueKind::MonolingualText => {
        let language = match extra.remove("language") {
          Some(Value::String(language)) => language,
          _ => DEFAULT_LANGUAGE.to_string(),
        };
        Payload::MonolingualText { text: value.to_string(), language }
      }
      ValueKind::CommonsMedia
      | ValueKind::ExternalId
      | ValueKind::Form
      | ValueKind::GeoShape
      | ValueKind::GlobeCoordinate
      | ValueKind::Lexeme
      | ValueKind::Math
      | ValueKind::MusicalNotation
      | ValueKind::Quantity
      | ValueKind::Sense
      | ValueKind::StringValue
      | ValueKind::TabularData
      | ValueKind::Time
      | ValueKind::Url
      | ValueKind::MathMl => Payload::for_kind(kind, value.to_string(), DEFAULT_LANGUAGE)?,
    };
    debug!(%prop, %kind, "built claim");
    Claim::new(prop, kind, payload, extra)
  }

  /// The item an item-valued claim points at.
  async fn item_value(&self, value: &str) -> Result<LocalId> {
    let not_found = || Error::EntityNotFound(value.to_string());
    match value.parse::<EntityRef>() {
      Ok(EntityRef::Local(id)) if id.kind() == EntityKind::Item => Ok(id),
      Ok(EntityRef::Local(id)) => Err(Error::InvalidIdentifier(id.to_string())),
      Ok(EntityRef::Label(label)) if is_profile_label(&label) => {
        let candidates = self.resolver.search(EntityKind::Item, &label).await?;
        candidates.into_iter().next().ok_or_else(not_found)
      }
      Ok(EntityRef::Label(_) | EntityRef::Foreign(_)) => {
        match self.resolver.resolve(value, EntityKind::Item).await? {
          Resolution::Local(id) => Ok(id),
          Resolution::Candidates(mut ids) if ids.len() == 1 => Ok(ids.remove(0)),
          Resolution::Candidates(candidates) => Err(Error::AmbiguousValue {
            label: value.to_string(),
            candidates,
          }),
          Resolution::Unresolved => Err(not_found()),
        }
      }
      Err(_) => Err(not_found()),
    }
  }

  /// The property a property-valued claim points at. Only local ids and
  /// foreign references are accepted here.
  async fn property_value(&self, value: &str) -> Result<LocalId> {
    match value.parse::<EntityRef>() {
      Ok(EntityRef::Local(id)) if id.kind() == EntityKind::Property => Ok(id),
      Ok(EntityRef::Foreign(_)) => self
        .resolver
        .resolve(value, EntityKind::Property)
        .await?
        .first()
        .ok_or_else(|| Error::EntityNotFound(value.to_string())),
      _ => Err(Error::InvalidIdentifier(value.to_string())),
    }
  }
}
