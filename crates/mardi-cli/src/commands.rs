//! Subcommand execution against a connected [`Portal`].

use anyhow::{Context as _, Result, anyhow};
use mardi_client::{
  ClaimBuilder, IdentifierResolver, MergeConfig, MergeCoordinator, SearchValue, ValueSearch,
};
use mardi_core::entity::{EntityKind, LocalId};
use mardi_wikibase::{MediaWikiClient, Portal};
use serde_json::{Map, Value, json};

use crate::Command;

pub async fn run(portal: &Portal, merge: MergeConfig, command: Command) -> Result<Value> {
  let resolver = IdentifierResolver::new(&portal.wiki, &portal.importer, &portal.importer);

  match command {
    Command::Resolve { identifier, property } => {
      let kind = if property { EntityKind::Property } else { EntityKind::Item };
      let resolution = resolver.resolve(&identifier, kind).await?;
      Ok(json!({ "identifier": identifier, "resolution": resolution }))
    }

    Command::Claim { property, value, language, extra } => {
      let mut fields = parse_extra(&extra)?;
      if let Some(language) = language {
        fields.insert("language".into(), Value::String(language));
      }
      let claim = ClaimBuilder::new(resolver).build(&property, &value, fields).await?;
      Ok(json!({ "kind": claim.kind().as_str(), "fields": claim.fields() }))
    }

    Command::Search { property, value, number } => {
      let value = if number {
        SearchValue::Number(value.parse().context("value is not an integer")?)
      } else {
        SearchValue::Text(value)
      };
      let items = ValueSearch::new(resolver, &portal.sparql)
        .search_entity_by_value(&property, value)
        .await?;
      Ok(json!({ "property": property, "items": items }))
    }

    Command::MergeAuthors { source, target } => {
      let result = coordinator(portal, merge)
        .merge_authors(local_item(&source)?, local_item(&target)?)
        .await?;
      Ok(serde_json::to_value(result)?)
    }

    Command::MergePublications { source, target } => {
      let result = coordinator(portal, merge)
        .merge_publications(local_item(&source)?, local_item(&target)?)
        .await?;
      Ok(serde_json::to_value(result)?)
    }
  }
}

type WikiCoordinator<'a> = MergeCoordinator<'a, MediaWikiClient, MediaWikiClient, MediaWikiClient>;

fn coordinator(portal: &Portal, config: MergeConfig) -> WikiCoordinator<'_> {
  MergeCoordinator::new(&portal.wiki, &portal.wiki, &portal.wiki, config)
}

fn local_item(s: &str) -> Result<LocalId> {
  let id: LocalId = s.parse()?;
  if id.kind() != EntityKind::Item {
    return Err(anyhow!("{id} is not an item"));
  }
  Ok(id)
}

/// `key=value` pairs. Values that parse as JSON keep their type, anything
/// else is a string.
fn parse_extra(pairs: &[String]) -> Result<Map<String, Value>> {
  pairs
    .iter()
    .map(|pair| {
      let (key, raw) = pair
        .split_once('=')
        .ok_or_else(|| anyhow!("expected KEY=VALUE, got {pair:?}"))?;
      let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
      Ok((key.to_string(), value))
    })
    .collect()
}
