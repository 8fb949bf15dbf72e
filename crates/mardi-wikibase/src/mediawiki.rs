//! The MediaWiki action API: entities, pages and merges.
//!
//! Reads work anonymously. Writes need a session from [`MediaWikiClient::login`]
//! (a bot password); every write fetches a fresh CSRF token first.

use mardi_core::{
  entity::{Entity, LocalId},
  store::{EntityStore, MergePrimitive, MergeResult, PageStore, WriteOutcome},
};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::{Error, Result, error::ApiError};

/// Wikibase's message name for a label+description uniqueness violation.
pub const LABEL_DESCRIPTION_CONFLICT: &str =
  "wikibase-validator-label-with-description-conflict";

/// Edit summary used for page deletes and moves.
const DUPLICATE_REASON: &str = "Duplicate";

#[derive(Clone)]
pub struct MediaWikiClient {
  http:    Client,
  api_url: String,
}

impl MediaWikiClient {
  pub fn with_client(http: Client, api_url: &str) -> Self {
    Self { http, api_url: api_url.to_string() }
  }

  // ── Requests ──────────────────────────────────────────────────────────────

  async fn get(&self, params: &[(&str, &str)]) -> Result<Value> {
    let resp = self
      .http
      .get(&self.api_url)
      .query(&[("format", "json")])
      .query(params)
      .send()
      .await?
      .error_for_status()?;
    Ok(resp.json().await?)
  }

  async fn post(&self, params: &[(&str, &str)]) -> Result<Value> {
    let mut form = vec![("format", "json")];
    form.extend_from_slice(params);
    let resp = self
      .http
      .post(&self.api_url)
      .form(&form)
      .send()
      .await?
      .error_for_status()?;
    Ok(resp.json().await?)
  }

  async fn token(&self, kind: &str) -> Result<String> {
    let body = self
      .get(&[("action", "query"), ("meta", "tokens"), ("type", kind)])
      .await?;
    let field = format!("{kind}token");
    body["query"]["tokens"][field.as_str()]
      .as_str()
      .map(str::to_string)
      .ok_or_else(|| Error::UnexpectedResponse(format!("no {field} in response")))
  }

  /// Post a CSRF-protected action and fail on an API `error`.
  async fn post_with_token(&self, params: &[(&str, &str)]) -> Result<Value> {
    let token = self.token("csrf").await?;
    let mut form = params.to_vec();
    form.push(("token", token.as_str()));
    check(self.post(&form).await?)
  }

  // ── Session ───────────────────────────────────────────────────────────────

  /// Log in with a bot password.
  pub async fn login(&self, user: &str, password: &str) -> Result<()> {
    let token = self.token("login").await?;
    let body = self
      .post(&[
        ("action", "login"),
        ("lgname", user),
        ("lgpassword", password),
        ("lgtoken", token.as_str()),
      ])
      .await?;
    match body["login"]["result"].as_str() {
      Some("Success") => {
        info!(user, "logged in");
        Ok(())
      }
      _ => Err(Error::Login(body["login"].to_string())),
    }
  }

  // ── Pages ─────────────────────────────────────────────────────────────────

  /// Whether `<namespace>:<key>` exists; a missing page parses to an error.
  pub async fn page_exists(&self, key: &str, namespace: &str) -> Result<bool> {
    let title = page_title(namespace, key);
    let body = self
      .get(&[("action", "parse"), ("page", title.as_str()), ("prop", "wikitext")])
      .await?;
    Ok(body.get("error").is_none())
  }

  pub async fn delete_page(&self, key: &str, namespace: &str) -> Result<()> {
    let title = page_title(namespace, key);
    info!(%title, "deleting page");
    self
      .post_with_token(&[
        ("action", "delete"),
        ("title", title.as_str()),
        ("reason", DUPLICATE_REASON),
      ])
      .await?;
    Ok(())
  }

  pub async fn move_page(&self, from: &str, to: &str, namespace: &str) -> Result<()> {
    let (from, to) = (page_title(namespace, from), page_title(namespace, to));
    info!(%from, %to, "moving page");
    self
      .post_with_token(&[
        ("action", "move"),
        ("from", from.as_str()),
        ("to", to.as_str()),
        ("reason", DUPLICATE_REASON),
      ])
      .await?;
    Ok(())
  }

  // ── Entities ──────────────────────────────────────────────────────────────

  pub async fn get_entity(&self, id: LocalId) -> Result<Entity> {
    let key = id.to_string();
    let body = check(self.get(&[("action", "wbgetentities"), ("ids", key.as_str())]).await?)?;
    let raw = body
      .get("entities")
      .and_then(|entities| entities.get(&key))
      .ok_or_else(|| Error::NotFound(id.clone()))?;
    if raw.get("missing").is_some() {
      return Err(Error::NotFound(id));
    }
    Ok(serde_json::from_value(normalize_entity(raw.clone()))?)
  }

  /// Create or update an entity via `wbeditentity`.
  pub async fn write_entity(&self, entity: &Entity) -> Result<WriteOutcome> {
    let data = serde_json::to_string(entity)?;
    let id = entity.id.as_ref().map(|id| id.to_string());
    let kind = entity.kind.to_string();
    let mut params = vec![("action", "wbeditentity"), ("data", data.as_str()), ("bot", "1")];
    match &id {
      Some(id) => params.push(("id", id.as_str())),
      None => params.push(("new", kind.as_str())),
    }

    match self.post_with_token(&params).await {
      Ok(body) => {
        let written: Entity = serde_json::from_value(normalize_entity(body["entity"].clone()))?;
        debug!(id = ?written.id, "entity written");
        Ok(WriteOutcome::Written(written))
      }
      Err(Error::Api(err)) if err.has_message(LABEL_DESCRIPTION_CONFLICT) => {
        let existing = conflicting_id(&err)
          .ok_or_else(|| Error::UnexpectedResponse(format!("conflict without entity: {err}")))?;
        warn!(%existing, "label and description already taken");
        Ok(WriteOutcome::Conflict { existing })
      }
      Err(err) => Err(err),
    }
  }

  /// Merge `source` into `target` via `wbmergeitems`.
  pub async fn merge_items(&self, source: LocalId, target: LocalId) -> Result<MergeResult> {
    let (from, to) = (source.to_string(), target.to_string());
    let body = self
      .post_with_token(&[
        ("action", "wbmergeitems"),
        ("fromid", from.as_str()),
        ("toid", to.as_str()),
        ("bot", "1"),
      ])
      .await?;
    let ids = MergeIds::deserialize(&body)?;
    Ok(MergeResult { from: ids.from.id, to: ids.to.id })
  }
}

#[derive(Deserialize)]
struct MergeIds {
  from: Id,
  to:   Id,
}

#[derive(Deserialize)]
struct Id {
  id: LocalId,
}

fn page_title(namespace: &str, key: &str) -> String { format!("{namespace}:{key}") }

/// Turn a response carrying an `error` member into [`Error::Api`].
fn check(body: Value) -> Result<Value> {
  match body.get("error") {
    Some(err) => Err(Error::Api(ApiError::deserialize(err)?)),
    None => Ok(body),
  }
}

/// The entity named in a label+description conflict; its link is the third
/// message parameter, e.g. `[[Item:Q123|Q123]]`.
fn conflicting_id(err: &ApiError) -> Option<LocalId> {
  let message = err
    .messages
    .iter()
    .find(|m| m.name == LABEL_DESCRIPTION_CONFLICT)?;
  LocalId::find_item_in(message.parameters.get(2)?.as_str()?)
}

/// Wikibase renders empty term and claim maps as `[]`.
fn normalize_entity(mut raw: Value) -> Value {
  if let Some(object) = raw.as_object_mut() {
    for key in ["labels", "descriptions", "aliases", "claims"] {
      if object.get(key).is_some_and(|v| v.as_array().is_some_and(Vec::is_empty)) {
        object.insert(key.to_string(), Value::Object(Default::default()));
      }
    }
  }
  raw
}

// ─── Trait implementations ───────────────────────────────────────────────────

impl EntityStore for MediaWikiClient {
  type Error = Error;

  async fn get_entity(&self, id: LocalId) -> Result<Entity> {
    MediaWikiClient::get_entity(self, id).await
  }

  async fn write_entity(&self, entity: &Entity) -> Result<WriteOutcome> {
    MediaWikiClient::write_entity(self, entity).await
  }
}

impl PageStore for MediaWikiClient {
  type Error = Error;

  async fn page_exists(&self, key: &str, namespace: &str) -> Result<bool> {
    MediaWikiClient::page_exists(self, key, namespace).await
  }

  async fn delete_page(&self, key: &str, namespace: &str) -> Result<()> {
    MediaWikiClient::delete_page(self, key, namespace).await
  }

  async fn move_page(&self, from: &str, to: &str, namespace: &str) -> Result<()> {
    MediaWikiClient::move_page(self, from, to, namespace).await
  }
}

impl MergePrimitive for MediaWikiClient {
  type Error = Error;

  async fn merge_items(&self, source: LocalId, target: LocalId) -> Result<MergeResult> {
    MediaWikiClient::merge_items(self, source, target).await
  }
}
