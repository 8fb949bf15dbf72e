//! Value search over the SPARQL endpoint.

use std::fmt;

use mardi_core::{
  Result,
  entity::{EntityKind, LocalId},
  store::{EntityDirectory, EntityStore, ForeignMapping, SparqlExecutor, SparqlResults},
};
use tracing::{debug, warn};

use crate::resolve::{IdentifierResolver, Resolution};

/// A literal to match in a SPARQL triple pattern.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchValue {
  /// Rendered as a double-quoted string literal.
  Text(String),
  /// Rendered as a bare numeric literal.
  Number(i64),
}

impl From<&str> for SearchValue {
  fn from(s: &str) -> Self { Self::Text(s.to_string()) }
}

impl From<String> for SearchValue {
  fn from(s: String) -> Self { Self::Text(s) }
}

impl From<i64> for SearchValue {
  fn from(n: i64) -> Self { Self::Number(n) }
}

impl fmt::Display for SearchValue {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Text(s) => {
        write!(f, "\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
      }
      Self::Number(n) => write!(f, "{n}"),
    }
  }
}

/// `SELECT ?item WHERE {?item wdt:<prop> <value>}`.
pub fn value_query(property: &LocalId, value: &SearchValue) -> String {
  format!("SELECT ?item WHERE {{?item wdt:{property} {value}}}")
}

/// Item ids bound to `?item`, taken from the trailing `/Q<digits>` of each
/// IRI. Rows without such a suffix are skipped.
pub fn items_from_bindings(results: &SparqlResults) -> Vec<LocalId> {
  results
    .results
    .bindings
    .iter()
    .filter_map(|row| row.get("item"))
    .filter_map(|term| term.value.rsplit_once('/'))
    .filter_map(|(_, tail)| tail.parse::<LocalId>().ok())
    .filter(|id| id.kind() == EntityKind::Item)
    .collect()
}

/// Finds items by the value of one of their properties.
pub struct ValueSearch<'a, S, D, M, Q> {
  resolver: IdentifierResolver<'a, S, D, M>,
  sparql:   &'a Q,
}

impl<'a, S, D, M, Q> ValueSearch<'a, S, D, M, Q>
where
  S: EntityStore,
  D: EntityDirectory,
  M: ForeignMapping,
  Q: SparqlExecutor,
{
  pub fn new(resolver: IdentifierResolver<'a, S, D, M>, sparql: &'a Q) -> Self {
    Self { resolver, sparql }
  }

  /// Items whose `property` equals `value`.
  ///
  /// An ambiguous or unresolved property and a failing endpoint all yield an
  /// empty list.
  pub async fn search_entity_by_value(
    &self,
    property: &str,
    value: impl Into<SearchValue>,
  ) -> Result<Vec<LocalId>> {
    let prop = match self.resolver.resolve(property, EntityKind::Property).await? {
      Resolution::Local(id) => id,
      other => {
        debug!(property, ?other, "property not uniquely resolved");
        return Ok(Vec::new());
      }
    };

    let query = value_query(&prop, &value.into());
    match self.sparql.execute(&query).await {
      Ok(results) => Ok(items_from_bindings(&results)),
      Err(err) => {
        warn!(%query, %err, "sparql query failed");
        Ok(Vec::new())
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use mardi_core::store::{SparqlRows, SparqlTerm};

  use super::*;

  #[test]
  fn strings_are_quoted_and_numbers_are_not() {
    let prop = LocalId::property(789).unwrap();
    assert_eq!(
      value_query(&prop, &"value".into()),
      r#"SELECT ?item WHERE {?item wdt:P789 "value"}"#
    );
    assert_eq!(
      value_query(&prop, &SearchValue::Number(42)),
      "SELECT ?item WHERE {?item wdt:P789 42}"
    );
  }

  #[test]
  fn embedded_quotes_are_escaped() {
    let prop = LocalId::property(1).unwrap();
    assert_eq!(
      value_query(&prop, &r#"say "hi""#.into()),
      r#"SELECT ?item WHERE {?item wdt:P1 "say \"hi\""}"#
    );
  }

  #[test]
  fn extracts_trailing_item_ids() {
    let row = |iri: &str| {
      let mut row = std::collections::HashMap::new();
      row.insert("item".to_string(), SparqlTerm {
        term_type: "uri".into(),
        value:     iri.into(),
      });
      row
    };
    let results = SparqlResults {
      results: SparqlRows {
        bindings: vec![
          row("https://portal.example/entity/Q901"),
          row("https://portal.example/entity/P5"),
          row("https://portal.example/entity/Q12/extra"),
          row("https://portal.example/entity/Q7"),
        ],
      },
    };
    let ids: Vec<String> =
      items_from_bindings(&results).iter().map(ToString::to_string).collect();
    assert_eq!(ids, ["Q901", "Q7"]);
  }
}
