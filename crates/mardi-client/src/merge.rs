//! Duplicate reconciliation.
//!
//! Independent ingestion pipelines regularly create the same author or
//! publication twice. [`MergeCoordinator`] decides which of the two entities
//! survives, reconciles the portal pages attached to them and finally asks the
//! store to merge the items.
//!
//! None of this is transactional. A failure after a page has been deleted or
//! moved leaves the store half-merged; such failures are returned to the
//! caller untouched and nothing is rolled back.

use mardi_core::{
  Error, Result,
  entity::{DEFAULT_LANGUAGE, Entity, LocalId},
  store::{EntityStore, MergePrimitive, MergeResult, PageStore, WriteOutcome},
};
use serde::Deserialize;
use tracing::{info, warn};

// ─── Configuration ───────────────────────────────────────────────────────────

/// Namespaces and properties the merge protocol depends on.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
  /// Page namespace of author profiles.
  pub person_namespace:      String,
  /// Page namespace of publication profiles.
  pub publication_namespace: String,
  /// The zbMATH Open document id property.
  pub catalog_property:      LocalId,
}

impl Default for MergeConfig {
  fn default() -> Self {
    Self {
      person_namespace:      "Person".to_string(),
      publication_namespace: "Publication".to_string(),
      catalog_property:      LocalId::ZBMATH_DE_NUMBER,
    }
  }
}

/// The description given to a publication identified by its catalog number.
pub fn catalog_description(number: &str) -> String {
  format!("scientific article; zbMATH DE number {number}")
}

// ─── Ordering ────────────────────────────────────────────────────────────────

/// One side of a merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeCandidate {
  pub id:    LocalId,
  pub label: Option<String>,
}

impl MergeCandidate {
  pub fn new(id: LocalId, label: Option<&str>) -> Self {
    Self { id, label: label.map(str::to_string) }
  }

  /// English label of `entity`, addressed as `id`.
  pub fn from_entity(id: LocalId, entity: &Entity) -> Self {
    Self { id, label: entity.label(DEFAULT_LANGUAGE).map(str::to_string) }
  }

  pub fn page_key(&self) -> String { self.id.page_key() }

  fn label_str(&self) -> &str { self.label.as_deref().unwrap_or("") }

  fn has_label(&self) -> bool { !self.label_str().is_empty() }

  fn label_len(&self) -> usize { self.label_str().chars().count() }

  fn is_comma_formatted(&self) -> bool { self.label_str().contains(',') }
}

/// A `(source, target)` pair; the target survives the merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOrder {
  pub source: MergeCandidate,
  pub target: MergeCandidate,
}

impl MergeOrder {
  pub fn swapped(self) -> Self { Self { source: self.target, target: self.source } }
}

/// Order two author candidates by their labels.
///
/// The longer label survives. A comma-formatted label ("Last, First") then
/// takes precedence over a non-empty label without a comma.
pub fn decide_ordering(source: MergeCandidate, target: MergeCandidate) -> MergeOrder {
  let order = MergeOrder { source, target };
  let order = if order.target.label_len() < order.source.label_len() {
    order.swapped()
  } else {
    order
  };
  if order.source.is_comma_formatted()
    && order.target.has_label()
    && !order.target.is_comma_formatted()
  {
    order.swapped()
  } else {
    order
  }
}

/// Which pages exist before reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PageState {
  pub source: bool,
  pub target: bool,
}

/// Page operations to run before merging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PagePlan {
  /// Delete the target's page.
  pub delete_target: bool,
  /// Move the source's page into the target's slot.
  pub move_source:   bool,
}

impl PagePlan {
  const UNTOUCHED: Self = Self { delete_target: false, move_source: false };

  fn replace(target_exists: bool) -> Self {
    Self { delete_target: target_exists, move_source: true }
  }
}

/// Settle author pages for an already label-ordered pair.
///
/// With a labelled source, the source's page replaces the target's. With no
/// labels on either side the page decides: a lone source page makes the
/// source the survivor, two pages are handled as above.
pub fn plan_pages(order: MergeOrder, pages: PageState) -> (MergeOrder, PagePlan) {
  if order.source.has_label() {
    // Without a source page there is nothing to move into the target's slot,
    // so the target keeps its page.
    let plan = if pages.source {
      PagePlan::replace(pages.target)
    } else {
      PagePlan::UNTOUCHED
    };
    return (order, plan);
  }
  if order.target.has_label() {
    return (order, PagePlan::UNTOUCHED);
  }
  match (pages.source, pages.target) {
    (true, false) => (order.swapped(), PagePlan::UNTOUCHED),
    (true, true) => (order, PagePlan::replace(true)),
    _ => (order, PagePlan::UNTOUCHED),
  }
}

// ─── Coordinator ─────────────────────────────────────────────────────────────

pub struct MergeCoordinator<'a, S, P, G> {
  store:  &'a S,
  pages:  &'a P,
  merger: &'a G,
  config: MergeConfig,
}

impl<'a, S, P, G> MergeCoordinator<'a, S, P, G>
where
  S: EntityStore,
  P: PageStore,
  G: MergePrimitive,
{
  pub fn new(store: &'a S, pages: &'a P, merger: &'a G, config: MergeConfig) -> Self {
    Self { store, pages, merger, config }
  }

  /// Merge two author items, choosing the survivor by label and page.
  pub async fn merge_authors(&self, source: LocalId, target: LocalId) -> Result<MergeResult> {
    let namespace = self.config.person_namespace.as_str();
    let source_entity = self.fetch(&source).await?;
    let target_entity = self.fetch(&target).await?;
    let source = MergeCandidate::from_entity(source, &source_entity);
    let target = MergeCandidate::from_entity(target, &target_entity);

    let order = decide_ordering(source, target);
    let needs_pages = order.source.has_label() || !order.target.has_label();
    let (order, plan) = if needs_pages {
      let pages = PageState {
        source: self.page_exists(&order.source, namespace).await?,
        target: self.page_exists(&order.target, namespace).await?,
      };
      plan_pages(order, pages)
    } else {
      (order, PagePlan::UNTOUCHED)
    };

    self.apply_pages(&order, plan, namespace).await?;
    self.merge(&order).await
  }

  /// Merge two publication items. The side carrying the catalog id gets the
  /// canonical description; the source's page replaces the target's.
  pub async fn merge_publications(
    &self,
    source: LocalId,
    target: LocalId,
  ) -> Result<MergeResult> {
    let namespace = self.config.publication_namespace.as_str();
    let catalog = &self.config.catalog_property;
    let mut source_entity = self.fetch(&source).await?;
    let mut target_entity = self.fetch(&target).await?;

    match (source_entity.has_claim(catalog), target_entity.has_claim(catalog)) {
      (true, false) => {
        self
          .harmonize_descriptions(&source, &mut source_entity, &target, &mut target_entity)
          .await?
      }
      (false, true) => {
        self
          .harmonize_descriptions(&target, &mut target_entity, &source, &mut source_entity)
          .await?
      }
      (true, true) => {
        warn!(%source, %target, "both publications carry a catalog id; descriptions left as is")
      }
      (false, false) => {}
    }

    let order = MergeOrder {
      source: MergeCandidate::from_entity(source, &source_entity),
      target: MergeCandidate::from_entity(target, &target_entity),
    };
    self.apply_pages(&order, PagePlan::replace(true), namespace).await?;
    self.merge(&order).await
  }

  /// Give the catalog-bearing entity the canonical description and clear the
  /// other one. The other side is cleared first so the two never share a
  /// label and description.
  async fn harmonize_descriptions(
    &self,
    catalog_id: &LocalId,
    catalog_entity: &mut Entity,
    other_id: &LocalId,
    other_entity: &mut Entity,
  ) -> Result<()> {
    let property = &self.config.catalog_property;
    let number = catalog_entity
      .statements(property)
      .first()
      .and_then(|s| s.string_value())
      .map(str::to_string)
      .ok_or_else(|| Error::MissingCatalogValue {
        entity:   catalog_id.clone(),
        property: property.clone(),
      })?;

    other_entity.clear_description(DEFAULT_LANGUAGE);
    self.update(other_id, other_entity).await?;

    catalog_entity.set_description(DEFAULT_LANGUAGE, catalog_description(&number));
    self.update(catalog_id, catalog_entity).await?;
    info!(%catalog_id, %other_id, %number, "harmonized publication descriptions");
    Ok(())
  }

  async fn fetch(&self, id: &LocalId) -> Result<Entity> {
    self.store.get_entity(id.clone()).await.map_err(Error::backend)
  }

  async fn update(&self, id: &LocalId, entity: &Entity) -> Result<()> {
    match self.store.write_entity(entity).await.map_err(Error::backend)? {
      WriteOutcome::Written(_) => Ok(()),
      WriteOutcome::Conflict { existing } => {
        Err(Error::WriteConflict { entity: id.clone(), existing })
      }
    }
  }

  async fn page_exists(&self, candidate: &MergeCandidate, namespace: &str) -> Result<bool> {
    self
      .pages
      .page_exists(&candidate.page_key(), namespace)
      .await
      .map_err(Error::backend)
  }

  async fn apply_pages(&self, order: &MergeOrder, plan: PagePlan, namespace: &str) -> Result<()> {
    let source_key = order.source.page_key();
    let target_key = order.target.page_key();
    if plan.delete_target {
      info!(namespace, page = %target_key, "deleting target page");
      self
        .pages
        .delete_page(&target_key, namespace)
        .await
        .map_err(Error::backend)?;
    }
    if plan.move_source {
      info!(namespace, from = %source_key, to = %target_key, "moving source page");
      self
        .pages
        .move_page(&source_key, &target_key, namespace)
        .await
        .map_err(Error::backend)?;
    }
    Ok(())
  }

  /// Invoke the merge primitive and check it kept the requested ordering.
  async fn merge(&self, order: &MergeOrder) -> Result<MergeResult> {
    let (source, target) = (&order.source.id, &order.target.id);
    info!(%source, %target, "merging items");
    let result = self
      .merger
      .merge_items(source.clone(), target.clone())
      .await
      .map_err(Error::backend)?;
    if result.from != *source || result.to != *target {
      return Err(Error::MergeMismatch {
        expected_from: source.clone(),
        expected_to:   target.clone(),
        from:          result.from,
        to:            result.to,
      });
    }
    Ok(result)
  }
}
