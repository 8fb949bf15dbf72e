//! Error type for `mardi-wikibase`.

use std::fmt;

use mardi_core::entity::LocalId;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("core error: {0}")]
  Core(#[from] mardi_core::Error),

  #[error("invalid url {0:?}")]
  InvalidUrl(String),

  /// The MediaWiki API answered with an `error` object.
  #[error("mediawiki api error: {0}")]
  Api(ApiError),

  #[error("login failed: {0}")]
  Login(String),

  #[error("entity not found: {0}")]
  NotFound(LocalId),

  #[error("unexpected response: {0}")]
  UnexpectedResponse(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The `error` member of a MediaWiki API response.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiError {
  pub code:     String,
  #[serde(default)]
  pub info:     String,
  #[serde(default)]
  pub messages: Vec<ApiMessage>,
}

/// One entry of `error.messages`, as Wikibase reports validation failures.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiMessage {
  pub name:       String,
  #[serde(default)]
  pub parameters: Vec<serde_json::Value>,
}

impl ApiError {
  pub fn has_message(&self, name: &str) -> bool {
    self.messages.iter().any(|m| m.name == name)
  }
}

impl fmt::Display for ApiError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}: {}", self.code, self.info)
  }
}
