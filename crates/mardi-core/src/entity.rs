//! Identifiers and entity snapshots.
//!
//! Every entity in the store is addressed by a [`LocalId`] (`Q42`, `P31`).
//! Callers may also name entities by a prefixed foreign reference
//! (`wd:Q42`, `wdt:P31`) or by a free-text English label; [`EntityRef`]
//! captures which of the three forms a string is.

use std::{borrow::Cow, collections::BTreeMap, fmt, str::FromStr, sync::LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

static LOCAL_ID: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"^([PQ])(\d+)$").expect("valid regex"));

static FOREIGN_REF: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"^(wdt?):([PQ])(\d+)$").expect("valid regex"));

/// The language every label and description is read from and written to.
pub const DEFAULT_LANGUAGE: &str = "en";

// ─── Kinds ───────────────────────────────────────────────────────────────────

/// Whether an identifier names an item or a property.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
  Item,
  Property,
}

impl EntityKind {
  fn letter(self) -> char {
    match self {
      Self::Item => 'Q',
      Self::Property => 'P',
    }
  }

  fn from_letter(letter: &str) -> Self {
    if letter == "P" { Self::Property } else { Self::Item }
  }

  /// Path segment used by the importer service (`items` / `properties`).
  pub fn plural(self) -> &'static str {
    match self {
      Self::Item => "items",
      Self::Property => "properties",
    }
  }
}

impl fmt::Display for EntityKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Self::Item => "item",
      Self::Property => "property",
    })
  }
}

// ─── LocalId ─────────────────────────────────────────────────────────────────

/// Canonical identifier of an entity in the local store.
///
/// The digits are kept exactly as written: `Q007` stays `Q007` and is a
/// different id from `Q7`. Ids minted from a number are always positive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LocalId {
  kind:   EntityKind,
  digits: Cow<'static, str>,
}

impl LocalId {
  /// The portal's zbMATH Open document-number property.
  pub const ZBMATH_DE_NUMBER: Self = Self {
    kind:   EntityKind::Property,
    digits: Cow::Borrowed("1451"),
  };

  pub fn new(kind: EntityKind, number: u64) -> Result<Self> {
    if number == 0 {
      return Err(Error::InvalidIdentifier(format!("{}0", kind.letter())));
    }
    Ok(Self { kind, digits: Cow::Owned(number.to_string()) })
  }

  pub fn item(number: u64) -> Result<Self> { Self::new(EntityKind::Item, number) }

  pub fn property(number: u64) -> Result<Self> {
    Self::new(EntityKind::Property, number)
  }

  pub fn kind(&self) -> EntityKind { self.kind }

  /// The numeric value of the digits, when it fits a `u64`.
  pub fn number(&self) -> Option<u64> { self.digits.parse().ok() }

  /// Key of the wiki page that accompanies this entity, e.g. `Person:123`
  /// is addressed by page key `123`.
  pub fn page_key(&self) -> String { self.digits.to_string() }

  /// True when `s` has the shape of a local id (`P`/`Q` followed by digits).
  pub fn matches(s: &str) -> bool { LOCAL_ID.is_match(s) }

  /// Find the first `Q<digits>` token inside a longer string such as a wiki
  /// link (`[[Item:Q12|Q12]]`).
  pub fn find_item_in(s: &str) -> Option<Self> {
    static ITEM_TOKEN: LazyLock<Regex> =
      LazyLock::new(|| Regex::new(r"Q\d+").expect("valid regex"));
    ITEM_TOKEN.find(s)?.as_str().parse().ok()
  }
}

impl fmt::Display for LocalId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}{}", self.kind.letter(), self.digits)
  }
}

impl FromStr for LocalId {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    let caps = LOCAL_ID
      .captures(s)
      .ok_or_else(|| Error::InvalidIdentifier(s.to_string()))?;
    Ok(Self {
      kind:   EntityKind::from_letter(&caps[1]),
      digits: Cow::Owned(caps[2].to_string()),
    })
  }
}

impl TryFrom<String> for LocalId {
  type Error = Error;

  fn try_from(s: String) -> Result<Self> { s.parse() }
}

impl From<LocalId> for String {
  fn from(id: LocalId) -> Self { id.to_string() }
}

// ─── Foreign references ──────────────────────────────────────────────────────

/// The prefix used to mark an identifier as borrowed from Wikidata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ForeignPrefix {
  /// `wd:`, the entity namespace.
  Wd,
  /// `wdt:`, the direct-property namespace.
  Wdt,
}

impl ForeignPrefix {
  fn as_str(self) -> &'static str {
    match self {
      Self::Wd => "wd",
      Self::Wdt => "wdt",
    }
  }

  /// True when `s` carries one of the foreign prefixes, well-formed or not.
  pub fn is_prefixed(s: &str) -> bool {
    s.starts_with("wd:") || s.starts_with("wdt:")
  }
}

/// An identifier in the foreign knowledge base, e.g. `wd:Q42`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ForeignRef {
  pub prefix: ForeignPrefix,
  pub kind:   EntityKind,
  pub number: u64,
}

impl fmt::Display for ForeignRef {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}:{}{}", self.prefix.as_str(), self.kind.letter(), self.number)
  }
}

impl FromStr for ForeignRef {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    let caps = FOREIGN_REF
      .captures(s)
      .ok_or_else(|| Error::InvalidIdentifier(s.to_string()))?;
    let prefix = if &caps[1] == "wd" { ForeignPrefix::Wd } else { ForeignPrefix::Wdt };
    let number = caps[3]
      .parse()
      .map_err(|_| Error::InvalidIdentifier(s.to_string()))?;
    Ok(Self { prefix, kind: EntityKind::from_letter(&caps[2]), number })
  }
}

// ─── EntityRef ───────────────────────────────────────────────────────────────

/// An identifier expression supplied by a caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityRef {
  Local(LocalId),
  Foreign(ForeignRef),
  Label(String),
}

impl FromStr for EntityRef {
  type Err = Error;

  /// Classify `s`. A string carrying a foreign prefix must be a well-formed
  /// foreign reference; it is never treated as a label.
  fn from_str(s: &str) -> Result<Self> {
    if LocalId::matches(s) {
      return s.parse().map(Self::Local);
    }
    if ForeignPrefix::is_prefixed(s) {
      return s.parse().map(Self::Foreign);
    }
    if s.is_empty() {
      return Err(Error::InvalidIdentifier(String::new()));
    }
    Ok(Self::Label(s.to_string()))
  }
}

// ─── Statements ──────────────────────────────────────────────────────────────

/// The typed value inside a snak: `{"type": "...", "value": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataValue {
  #[serde(rename = "type")]
  pub value_type: String,
  pub value:      serde_json::Value,
}

/// A property-value cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snak {
  pub snaktype:  String,
  pub property:  String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub datatype:  Option<String>,
  /// Absent for `novalue` / `somevalue` snaks.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub datavalue: Option<DataValue>,
}

fn statement_type() -> String { "statement".to_string() }

fn normal_rank() -> String { "normal".to_string() }

/// A statement as found under `claims` in the entity JSON. Qualifiers and
/// references are carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
  pub mainsnak:       Snak,
  #[serde(rename = "type", default = "statement_type")]
  pub statement_type: String,
  #[serde(default = "normal_rank")]
  pub rank:           String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub id:             Option<String>,
  #[serde(flatten)]
  pub rest:           serde_json::Map<String, serde_json::Value>,
}

impl Statement {
  pub fn new(mainsnak: Snak) -> Self {
    Self {
      mainsnak,
      statement_type: statement_type(),
      rank: normal_rank(),
      id: None,
      rest: serde_json::Map::new(),
    }
  }

  /// The comparable value of the statement for the datatypes that have one:
  /// strings and external ids yield the string, items their id, times the
  /// time string. Everything else yields `None`.
  pub fn simple_value(&self) -> Option<String> {
    let datavalue = self.mainsnak.datavalue.as_ref()?;
    let value = &datavalue.value;
    match self.mainsnak.datatype.as_deref()? {
      "string" | "external-id" => value.as_str().map(str::to_string),
      "wikibase-item" => value.get("id")?.as_str().map(str::to_string),
      "time" => value.get("time")?.as_str().map(str::to_string),
      _ => None,
    }
  }

  /// The item this statement points at, if it is item-valued.
  pub fn item_value(&self) -> Option<LocalId> {
    self
      .mainsnak
      .datavalue
      .as_ref()?
      .value
      .get("id")?
      .as_str()?
      .parse()
      .ok()
  }

  /// The raw string datavalue (string-like datatypes only).
  pub fn string_value(&self) -> Option<&str> {
    self.mainsnak.datavalue.as_ref()?.value.as_str()
  }
}

/// How [`Entity::add_statement`] treats existing statements of a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClaimAction {
  /// Replace a statement with an equal value, otherwise append.
  #[default]
  AppendOrReplace,
  /// Drop every existing statement for the property.
  ReplaceAll,
}

// ─── Entity ──────────────────────────────────────────────────────────────────

/// A snapshot of an item or property.
///
/// Descriptions set to the empty string mean "cleared": writing the entity
/// removes the description from the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "wire::Entity", into = "wire::Entity")]
pub struct Entity {
  /// `None` until the entity has been persisted.
  pub id:           Option<LocalId>,
  pub kind:         EntityKind,
  pub labels:       BTreeMap<String, String>,
  pub descriptions: BTreeMap<String, String>,
  pub claims:       BTreeMap<String, Vec<Statement>>,
  /// Declared datatype; properties only.
  pub datatype:     Option<String>,
}

impl Entity {
  /// An unsaved entity with no content.
  pub fn new(kind: EntityKind) -> Self {
    Self {
      id: None,
      kind,
      labels: BTreeMap::new(),
      descriptions: BTreeMap::new(),
      claims: BTreeMap::new(),
      datatype: None,
    }
  }

  /// An unsaved entity carrying only an English label.
  pub fn draft(kind: EntityKind, label: impl Into<String>) -> Self {
    let mut entity = Self::new(kind);
    entity.set_label(DEFAULT_LANGUAGE, label);
    entity
  }

  pub fn label(&self, language: &str) -> Option<&str> {
    self.labels.get(language).map(String::as_str).filter(|s| !s.is_empty())
  }

  pub fn description(&self, language: &str) -> Option<&str> {
    self
      .descriptions
      .get(language)
      .map(String::as_str)
      .filter(|s| !s.is_empty())
  }

  pub fn set_label(&mut self, language: &str, value: impl Into<String>) {
    self.labels.insert(language.to_string(), value.into());
  }

  pub fn set_description(&mut self, language: &str, value: impl Into<String>) {
    self.descriptions.insert(language.to_string(), value.into());
  }

  /// Mark the description as removed; the next write clears it.
  pub fn clear_description(&mut self, language: &str) {
    self.descriptions.insert(language.to_string(), String::new());
  }

  /// Statements recorded for `property`, in store order.
  pub fn statements(&self, property: &LocalId) -> &[Statement] {
    self
      .claims
      .get(&property.to_string())
      .map(Vec::as_slice)
      .unwrap_or(&[])
  }

  pub fn has_claim(&self, property: &LocalId) -> bool {
    !self.statements(property).is_empty()
  }

  pub fn add_statement(&mut self, statement: Statement, action: ClaimAction) {
    let slot = self
      .claims
      .entry(statement.mainsnak.property.clone())
      .or_default();
    match action {
      ClaimAction::ReplaceAll => {
        slot.clear();
        slot.push(statement);
      }
      ClaimAction::AppendOrReplace => {
        let existing = slot
          .iter_mut()
          .find(|s| s.mainsnak.datavalue == statement.mainsnak.datavalue);
        match existing {
          Some(old) => {
            let id = old.id.take();
            *old = Statement { id, ..statement };
          }
          None => slot.push(statement),
        }
      }
    }
  }
}

// ─── Wire format ─────────────────────────────────────────────────────────────

/// The Wikibase JSON shape of an entity (`wbgetentities` / `wbeditentity`).
mod wire {
  use std::collections::BTreeMap;

  use serde::{Deserialize, Serialize};

  use super::{EntityKind, Statement};

  #[derive(Serialize, Deserialize)]
  pub struct Term {
    pub language: String,
    pub value:    String,
  }

  #[derive(Serialize, Deserialize)]
  pub struct Entity {
    #[serde(rename = "type")]
    pub kind:         EntityKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id:           Option<String>,
    #[serde(default)]
    pub labels:       BTreeMap<String, Term>,
    #[serde(default)]
    pub descriptions: BTreeMap<String, Term>,
    #[serde(default)]
    pub claims:       BTreeMap<String, Vec<Statement>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datatype:     Option<String>,
  }

  fn terms(map: BTreeMap<String, String>) -> BTreeMap<String, Term> {
    map
      .into_iter()
      .map(|(language, value)| (language.clone(), Term { language, value }))
      .collect()
  }

  impl TryFrom<Entity> for super::Entity {
    type Error = crate::Error;

    fn try_from(w: Entity) -> crate::Result<Self> {
      Ok(Self {
        id:           w.id.map(|id| id.parse()).transpose()?,
        kind:         w.kind,
        labels:       w.labels.into_iter().map(|(k, t)| (k, t.value)).collect(),
        descriptions: w
          .descriptions
          .into_iter()
          .map(|(k, t)| (k, t.value))
          .collect(),
        claims:       w.claims,
        datatype:     w.datatype,
      })
    }
  }

  impl From<super::Entity> for Entity {
    fn from(e: super::Entity) -> Self {
      Self {
        kind:         e.kind,
        id:           e.id.map(|id| id.to_string()),
        labels:       terms(e.labels),
        descriptions: terms(e.descriptions),
        claims:       e.claims,
        datatype:     e.datatype,
      }
    }
  }
}
