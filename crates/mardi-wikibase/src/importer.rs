//! The importer service: label search and Wikidata id mapping.

use mardi_core::{
  entity::{EntityKind, ForeignRef, LocalId},
  store::{EntityDirectory, ForeignMapping},
};
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use tracing::debug;

use crate::{Error, Result};

/// `GET /search/items/{label}` answers `{"QID": [...]}`, the property route
/// answers `{"PID": [...]}`. Either key may be absent or null.
#[derive(Debug, Default, Deserialize)]
struct SearchResponse {
  #[serde(rename = "QID", default)]
  items:      Option<Vec<LocalId>>,
  #[serde(rename = "PID", default)]
  properties: Option<Vec<LocalId>>,
}

#[derive(Debug, Deserialize)]
struct MappingResponse {
  #[serde(default)]
  local_id: Option<LocalId>,
}

#[derive(Clone)]
pub struct ImporterClient {
  http: Client,
  base: Url,
}

impl ImporterClient {
  pub fn with_client(http: Client, base_url: &str) -> Result<Self> {
    let base = Url::parse(base_url.trim_end_matches('/'))
      .map_err(|_| Error::InvalidUrl(base_url.to_string()))?;
    if base.cannot_be_a_base() {
      return Err(Error::InvalidUrl(base_url.to_string()));
    }
    Ok(Self { http, base })
  }

  /// `base` extended by `segments`, each percent-encoded.
  fn url(&self, segments: &[&str]) -> Url {
    let mut url = self.base.clone();
    if let Ok(mut path) = url.path_segments_mut() {
      path.pop_if_empty().extend(segments);
    }
    url
  }
}

impl EntityDirectory for ImporterClient {
  type Error = Error;

  async fn search(&self, kind: EntityKind, label: &str) -> Result<Vec<LocalId>> {
    let url = self.url(&["search", kind.plural(), label]);
    let resp = self.http.get(url).send().await?.error_for_status()?;
    let body: SearchResponse = resp.json().await?;
    let ids = match kind {
      EntityKind::Item => body.items,
      EntityKind::Property => body.properties,
    }
    .unwrap_or_default();
    debug!(label, %kind, count = ids.len(), "importer search");
    Ok(ids)
  }
}

impl ForeignMapping for ImporterClient {
  type Error = Error;

  async fn local_id(&self, foreign: &ForeignRef) -> Result<Option<LocalId>> {
    let reference = foreign.to_string();
    let url = self.url(&[foreign.kind.plural(), &reference, "mapping"]);
    let resp = self.http.get(url).send().await?;
    if resp.status() == StatusCode::NOT_FOUND {
      return Ok(None);
    }
    let body: MappingResponse = resp.error_for_status()?.json().await?;
    Ok(body.local_id)
  }
}
