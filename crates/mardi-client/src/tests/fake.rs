//! An in-memory knowledge graph implementing every collaborator trait.

use std::{
  collections::{BTreeMap, BTreeSet, HashMap},
  sync::{Mutex, MutexGuard},
};

use mardi_core::{
  entity::{
    DEFAULT_LANGUAGE, DataValue, Entity, EntityKind, ForeignRef, LocalId, Snak, Statement,
  },
  store::{
    EntityDirectory, EntityStore, ForeignMapping, MergePrimitive, MergeResult,
    PageStore, SparqlExecutor, SparqlResults, WriteOutcome,
  },
};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
#[error("fake backend: {0}")]
pub struct FakeError(pub String);

/// Every call the fake receives, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
  Get(LocalId),
  Write(Option<LocalId>),
  Search(EntityKind, String),
  Map(String),
  Sparql(String),
  PageExists(String, String),
  DeletePage(String, String),
  MovePage(String, String, String),
  Merge(LocalId, LocalId),
}

#[derive(Default)]
struct State {
  entities:      BTreeMap<LocalId, Entity>,
  next_number:   u64,
  aliases:       Vec<(String, LocalId)>,
  write_fails:   bool,
  mappings:      HashMap<String, LocalId>,
  mapping_fails: bool,
  pages:         BTreeSet<(String, String)>,
  page_fails:    bool,
  sparql:        Option<SparqlResults>,
  merge_reply:   Option<MergeResult>,
  ops:           Vec<Op>,
}

#[derive(Default)]
pub struct FakeGraph {
  state: Mutex<State>,
}

impl FakeGraph {
  pub fn new() -> Self {
    let graph = Self::default();
    graph.state().next_number = 1000;
    graph
  }

  fn state(&self) -> MutexGuard<'_, State> { self.state.lock().expect("fake state") }

  /// Insert an entity under a fixed id.
  pub fn insert(&self, id: &str, mut entity: Entity) -> LocalId {
    let id: LocalId = id.parse().expect("valid id");
    entity.id = Some(id.clone());
    self.state().entities.insert(id.clone(), entity);
    id
  }

  pub fn item(&self, id: &str, label: &str) -> LocalId {
    self.insert(id, Entity::draft(EntityKind::Item, label))
  }

  pub fn property(&self, id: &str, label: &str, datatype: &str) -> LocalId {
    let mut entity = Entity::draft(EntityKind::Property, label);
    entity.datatype = Some(datatype.to_string());
    self.insert(id, entity)
  }

  pub fn entity(&self, id: &LocalId) -> Entity { self.state().entities[id].clone() }

  pub fn update(&self, id: &LocalId, f: impl FnOnce(&mut Entity)) {
    let mut state = self.state();
    f(state.entities.get_mut(id).expect("known entity"));
  }

  /// Make directory searches for `label` also return `id`, as an alias
  /// match would.
  pub fn alias(&self, label: &str, id: &LocalId) {
    self.state().aliases.push((label.to_string(), id.clone()));
  }

  pub fn fail_writes(&self) { self.state().write_fails = true; }

  pub fn map(&self, foreign: &str, local: LocalId) {
    self.state().mappings.insert(foreign.to_string(), local);
  }

  pub fn fail_mapping(&self) { self.state().mapping_fails = true; }

  pub fn add_page(&self, namespace: &str, key: &str) {
    self.state().pages.insert((namespace.to_string(), key.to_string()));
  }

  pub fn has_page(&self, namespace: &str, key: &str) -> bool {
    self.state().pages.contains(&(namespace.to_string(), key.to_string()))
  }

  pub fn fail_pages(&self) { self.state().page_fails = true; }

  pub fn set_sparql(&self, results: SparqlResults) { self.state().sparql = Some(results); }

  pub fn set_merge_reply(&self, reply: MergeResult) {
    self.state().merge_reply = Some(reply);
  }

  pub fn ops(&self) -> Vec<Op> { self.state().ops.clone() }

  fn record(&self, op: Op) { self.state().ops.push(op); }

  fn page_guard(&self) -> Result<(), FakeError> {
    if self.state().page_fails {
      return Err(FakeError("page service unavailable".into()));
    }
    Ok(())
  }
}

/// A string-valued statement, as the store would return it.
pub fn string_statement(property: &LocalId, datatype: &str, value: &str) -> Statement {
  Statement::new(Snak {
    snaktype:  "value".into(),
    property:  property.to_string(),
    datatype:  Some(datatype.into()),
    datavalue: Some(DataValue {
      value_type: "string".into(),
      value:      json!(value),
    }),
  })
}

/// An item-valued statement.
pub fn item_statement(property: &LocalId, item: &LocalId) -> Statement {
  Statement::new(Snak {
    snaktype:  "value".into(),
    property:  property.to_string(),
    datatype:  Some("wikibase-item".into()),
    datavalue: Some(DataValue {
      value_type: "wikibase-entityid".into(),
      value:      json!({
        "entity-type": "item",
        "numeric-id": item.number(),
        "id": item.to_string(),
      }),
    }),
  })
}

impl EntityStore for FakeGraph {
  type Error = FakeError;

  async fn get_entity(&self, id: LocalId) -> Result<Entity, FakeError> {
    self.record(Op::Get(id.clone()));
    self
      .state()
      .entities
      .get(&id)
      .cloned()
      .ok_or_else(|| FakeError(format!("no entity {id}")))
  }

  async fn write_entity(&self, entity: &Entity) -> Result<WriteOutcome, FakeError> {
    self.record(Op::Write(entity.id.clone()));
    let mut state = self.state();
    if state.write_fails {
      return Err(FakeError("store rejected the write".into()));
    }

    let label = entity.label(DEFAULT_LANGUAGE);
    let description = entity.description(DEFAULT_LANGUAGE);
    let clash = state.entities.iter().find(|(id, other)| {
      Some(*id) != entity.id.as_ref()
        && label.is_some()
        && other.label(DEFAULT_LANGUAGE) == label
        && other.description(DEFAULT_LANGUAGE) == description
    });
    if let Some((existing, _)) = clash {
      return Ok(WriteOutcome::Conflict { existing: existing.clone() });
    }

    let id = match &entity.id {
      Some(id) => id.clone(),
      None => {
        state.next_number += 1;
        LocalId::new(entity.kind, state.next_number)
          .map_err(|e| FakeError(e.to_string()))?
      }
    };
    let mut stored = entity.clone();
    stored.id = Some(id.clone());
    stored.descriptions.retain(|_, v| !v.is_empty());
    state.entities.insert(id, stored.clone());
    Ok(WriteOutcome::Written(stored))
  }
}

impl EntityDirectory for FakeGraph {
  type Error = FakeError;

  async fn search(&self, kind: EntityKind, label: &str) -> Result<Vec<LocalId>, FakeError> {
    self.record(Op::Search(kind, label.to_string()));
    let state = self.state();
    let mut found: Vec<LocalId> = state
      .entities
      .iter()
      .filter(|(_, e)| e.kind == kind && e.label(DEFAULT_LANGUAGE) == Some(label))
      .map(|(id, _)| id.clone())
      .collect();
    found.extend(
      state
        .aliases
        .iter()
        .filter(|(alias, id)| alias == label && id.kind() == kind)
        .map(|(_, id)| id.clone()),
    );
    Ok(found)
  }
}

impl ForeignMapping for FakeGraph {
  type Error = FakeError;

  async fn local_id(&self, foreign: &ForeignRef) -> Result<Option<LocalId>, FakeError> {
    self.record(Op::Map(foreign.to_string()));
    let state = self.state();
    if state.mapping_fails {
      return Err(FakeError("mapping service unavailable".into()));
    }
    Ok(state.mappings.get(&foreign.to_string()).cloned())
  }
}

impl SparqlExecutor for FakeGraph {
  type Error = FakeError;

  async fn execute(&self, query: &str) -> Result<SparqlResults, FakeError> {
    self.record(Op::Sparql(query.to_string()));
    self
      .state()
      .sparql
      .clone()
      .ok_or_else(|| FakeError("sparql endpoint unavailable".into()))
  }
}

impl PageStore for FakeGraph {
  type Error = FakeError;

  async fn page_exists(&self, key: &str, namespace: &str) -> Result<bool, FakeError> {
    self.record(Op::PageExists(key.to_string(), namespace.to_string()));
    self.page_guard()?;
    Ok(self.has_page(namespace, key))
  }

  async fn delete_page(&self, key: &str, namespace: &str) -> Result<(), FakeError> {
    self.record(Op::DeletePage(key.to_string(), namespace.to_string()));
    self.page_guard()?;
    let removed = self.state().pages.remove(&(namespace.to_string(), key.to_string()));
    if !removed {
      return Err(FakeError(format!("no page {namespace}:{key}")));
    }
    Ok(())
  }

  async fn move_page(&self, from: &str, to: &str, namespace: &str) -> Result<(), FakeError> {
    self.record(Op::MovePage(from.to_string(), to.to_string(), namespace.to_string()));
    self.page_guard()?;
    let mut state = self.state();
    if !state.pages.remove(&(namespace.to_string(), from.to_string())) {
      return Err(FakeError(format!("no page {namespace}:{from}")));
    }
    state.pages.insert((namespace.to_string(), to.to_string()));
    Ok(())
  }
}

impl MergePrimitive for FakeGraph {
  type Error = FakeError;

  async fn merge_items(&self, source: LocalId, target: LocalId) -> Result<MergeResult, FakeError> {
    self.record(Op::Merge(source.clone(), target.clone()));
    let mut state = self.state();
    if let Some(reply) = state.merge_reply.clone() {
      return Ok(reply);
    }
    // Like the real primitive, the target keeps its own terms and gains the
    // source's where it has none.
    if let Some(from) = state.entities.remove(&source)
      && let Some(to) = state.entities.get_mut(&target)
    {
      for (language, description) in from.descriptions {
        to.descriptions.entry(language).or_insert(description);
      }
      for (property, statements) in from.claims {
        to.claims.entry(property).or_default().extend(statements);
      }
    }
    Ok(MergeResult { from: source, to: target })
  }
}
