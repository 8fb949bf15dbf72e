//! Typed claims.
//!
//! A property's declared datatype fixes the shape of every value stored under
//! it. [`ValueKind`] is the closed set of datatypes this client understands;
//! [`Claim`] pairs a property with a payload whose shape is checked against
//! the kind when the claim is constructed.

use serde_json::{Map, Value, json};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::{
  Error, Result,
  entity::{DataValue, EntityKind, LocalId, Snak, Statement},
};

const GREGORIAN: &str = "http://www.wikidata.org/entity/Q1985727";
const EARTH: &str = "http://www.wikidata.org/entity/Q2";
const DAY_PRECISION: u64 = 11;

// ─── ValueKind ───────────────────────────────────────────────────────────────

/// A property datatype. The strum names are the datatype strings the store
/// reports, so [`ValueKind::parse`] is the only place unknown names surface.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter,
  IntoStaticStr,
)]
pub enum ValueKind {
  #[strum(serialize = "wikibase-item")]
  Item,
  #[strum(serialize = "commonsMedia")]
  CommonsMedia,
  #[strum(serialize = "external-id")]
  ExternalId,
  #[strum(serialize = "wikibase-form")]
  Form,
  #[strum(serialize = "geo-shape")]
  GeoShape,
  #[strum(serialize = "globe-coordinate")]
  GlobeCoordinate,
  #[strum(serialize = "wikibase-lexeme")]
  Lexeme,
  #[strum(serialize = "math")]
  Math,
  #[strum(serialize = "monolingualtext")]
  MonolingualText,
  #[strum(serialize = "musical-notation")]
  MusicalNotation,
  #[strum(serialize = "wikibase-property")]
  Property,
  #[strum(serialize = "quantity")]
  Quantity,
  #[strum(serialize = "wikibase-sense")]
  Sense,
  #[strum(serialize = "string")]
  StringValue,
  #[strum(serialize = "tabular-data")]
  TabularData,
  #[strum(serialize = "time")]
  Time,
  #[strum(serialize = "url")]
  Url,
  #[strum(serialize = "mathml")]
  MathMl,
}

impl ValueKind {
  /// Parse a datatype name reported by the store.
  pub fn parse(datatype: &str) -> Result<Self> {
    datatype
      .parse()
      .map_err(|_| Error::UnsupportedDatatype(datatype.to_string()))
  }

  pub fn as_str(self) -> &'static str { self.into() }
}

// ─── Payload ─────────────────────────────────────────────────────────────────

/// The value of a claim, shaped by its [`ValueKind`].
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
  /// A plain scalar (strings, urls, external ids, media names, coordinates).
  Value(String),
  /// A reference to another entity (item- and property-valued claims).
  Entity { id: LocalId },
  MonolingualText { text: String, language: String },
  Quantity { amount: String },
  Time { time: String },
  /// Raw markup for the math fallback.
  Markup(String),
}

impl Payload {
  /// Wrap a raw value in the shape `kind` requires. Monolingual text takes
  /// its language from `language`.
  pub fn for_kind(kind: ValueKind, value: String, language: &str) -> Result<Self> {
    Ok(match kind {
      ValueKind::Item | ValueKind::Property => Self::Entity { id: value.parse()? },
      ValueKind::MonolingualText => Self::MonolingualText {
        text:     value,
        language: language.to_string(),
      },
      ValueKind::Quantity => Self::Quantity { amount: value },
      ValueKind::Time => Self::Time { time: value },
      ValueKind::MathMl => Self::Markup(value),
      ValueKind::CommonsMedia
      | ValueKind::ExternalId
      | ValueKind::Form
      | ValueKind::GeoShape
      | ValueKind::GlobeCoordinate
      | ValueKind::Lexeme
      | ValueKind::Math
      | ValueKind::MusicalNotation
      | ValueKind::Sense
      | ValueKind::StringValue
      | ValueKind::TabularData
      | ValueKind::Url => Self::Value(value),
    })
  }

  fn fits(&self, kind: ValueKind) -> bool {
    match (kind, self) {
      (ValueKind::Item, Self::Entity { id }) => id.kind() == EntityKind::Item,
      (ValueKind::Property, Self::Entity { id }) => {
        id.kind() == EntityKind::Property
      }
      (ValueKind::MonolingualText, Self::MonolingualText { language, .. }) => {
        !language.is_empty()
      }
      (ValueKind::Quantity, Self::Quantity { amount }) => {
        amount.trim_start_matches('+').parse::<f64>().is_ok()
      }
      (ValueKind::Time, Self::Time { time }) => !time.is_empty(),
      (ValueKind::MathMl, Self::Markup(_)) => true,
      (ValueKind::GlobeCoordinate, Self::Value(v)) => parse_coordinate(v).is_some(),
      (
        ValueKind::CommonsMedia
        | ValueKind::ExternalId
        | ValueKind::Form
        | ValueKind::GeoShape
        | ValueKind::Lexeme
        | ValueKind::Math
        | ValueKind::MusicalNotation
        | ValueKind::Sense
        | ValueKind::StringValue
        | ValueKind::TabularData
        | ValueKind::Url,
        Self::Value(_),
      ) => true,
      _ => false,
    }
  }

  fn write_fields(&self, fields: &mut Map<String, Value>) {
    match self {
      Self::Value(v) | Self::Markup(v) => {
        fields.insert("value".into(), json!(v));
      }
      Self::Entity { id } => {
        fields.insert("id".into(), json!(id.to_string()));
      }
      Self::MonolingualText { text, language } => {
        fields.insert("text".into(), json!(text));
        fields.insert("language".into(), json!(language));
      }
      Self::Quantity { amount } => {
        fields.insert("amount".into(), json!(amount));
      }
      Self::Time { time } => {
        fields.insert("time".into(), json!(time));
      }
    }
  }
}

/// `"lat,lon"` → `(lat, lon)`.
fn parse_coordinate(s: &str) -> Option<(f64, f64)> {
  let (lat, lon) = s.split_once(',')?;
  Some((lat.trim().parse().ok()?, lon.trim().parse().ok()?))
}

// ─── Claim ───────────────────────────────────────────────────────────────────

/// A property-value assertion ready to be attached to an entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Claim {
  /// `None` only for the math-markup fallback of an unresolvable property.
  property: Option<LocalId>,
  kind:     ValueKind,
  payload:  Payload,
  /// Additional caller-supplied fields (unit, precision, ...).
  extra:    Map<String, Value>,
}

impl Claim {
  /// Build a claim, rejecting payloads whose shape does not match `kind`.
  pub fn new(
    property: LocalId,
    kind: ValueKind,
    payload: Payload,
    extra: Map<String, Value>,
  ) -> Result<Self> {
    if property.kind() != EntityKind::Property {
      return Err(Error::InvalidIdentifier(property.to_string()));
    }
    if !payload.fits(kind) {
      return Err(Error::PayloadMismatch(kind));
    }
    Ok(Self { property: Some(property), kind, payload, extra })
  }

  /// The math-markup claim used when a property's datatype is unknown.
  pub fn markup_fallback(
    property: Option<LocalId>,
    markup: impl Into<String>,
    extra: Map<String, Value>,
  ) -> Self {
    Self {
      property,
      kind: ValueKind::MathMl,
      payload: Payload::Markup(markup.into()),
      extra,
    }
  }

  pub fn property(&self) -> Option<&LocalId> { self.property.as_ref() }

  pub fn kind(&self) -> ValueKind { self.kind }

  pub fn payload(&self) -> &Payload { &self.payload }

  /// The flat field map of the claim: `prop`, the caller's extra fields and
  /// the payload fields under their kind-specific names.
  pub fn fields(&self) -> Map<String, Value> {
    let mut fields = Map::new();
    if let Some(property) = &self.property {
      fields.insert("prop".into(), json!(property.to_string()));
    }
    for (k, v) in &self.extra {
      fields.insert(k.clone(), v.clone());
    }
    self.payload.write_fields(&mut fields);
    fields
  }

  fn extra_str(&self, key: &str) -> Option<&str> {
    self.extra.get(key).and_then(Value::as_str)
  }

  fn extra_u64(&self, key: &str) -> Option<u64> {
    self.extra.get(key).and_then(Value::as_u64)
  }

  fn datavalue(&self) -> Result<DataValue> {
    let (value_type, value) = match (&self.payload, self.kind) {
      (Payload::Entity { id }, _) => (
        "wikibase-entityid",
        json!({
          "entity-type": id.kind().to_string(),
          "numeric-id": id.number(),
          "id": id.to_string(),
        }),
      ),
      (Payload::MonolingualText { text, language }, _) => (
        "monolingualtext",
        json!({ "text": text, "language": language }),
      ),
      (Payload::Quantity { amount }, _) => {
        let amount = if amount.starts_with(['+', '-']) {
          amount.clone()
        } else {
          format!("+{amount}")
        };
        (
          "quantity",
          json!({ "amount": amount, "unit": self.extra_str("unit").unwrap_or("1") }),
        )
      }
      (Payload::Time { time }, _) => (
        "time",
        json!({
          "time": time,
          "timezone": 0,
          "before": 0,
          "after": 0,
          "precision": self.extra_u64("precision").unwrap_or(DAY_PRECISION),
          "calendarmodel": self.extra_str("calendarmodel").unwrap_or(GREGORIAN),
        }),
      ),
      (Payload::Value(v), ValueKind::GlobeCoordinate) => {
        let (latitude, longitude) = parse_coordinate(v)
          .ok_or(Error::PayloadMismatch(ValueKind::GlobeCoordinate))?;
        (
          "globecoordinate",
          json!({
            "latitude": latitude,
            "longitude": longitude,
            "precision": self.extra.get("precision").cloned().unwrap_or(json!(0.0001)),
            "globe": self.extra_str("globe").unwrap_or(EARTH),
          }),
        )
      }
      (Payload::Value(v), ValueKind::Form | ValueKind::Lexeme | ValueKind::Sense) => {
        let entity_type = match self.kind {
          ValueKind::Form => "form",
          ValueKind::Lexeme => "lexeme",
          _ => "sense",
        };
        ("wikibase-entityid", json!({ "entity-type": entity_type, "id": v }))
      }
      (Payload::Value(v) | Payload::Markup(v), _) => ("string", json!(v)),
    };
    Ok(DataValue { value_type: value_type.to_string(), value })
  }

  /// Render the claim as a Wikibase statement.
  pub fn to_statement(&self) -> Result<Statement> {
    let property = self.property.as_ref().ok_or(Error::UnresolvedProperty(self.kind))?;
    Ok(Statement::new(Snak {
      snaktype:  "value".to_string(),
      property:  property.to_string(),
      datatype:  Some(self.kind.as_str().to_string()),
      datavalue: Some(self.datavalue()?),
    }))
  }
}
