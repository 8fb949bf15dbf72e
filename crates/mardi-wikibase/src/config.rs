//! Endpoint configuration for the MaRDI portal.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;

use crate::Result;

/// Where the portal's services live and how to talk to them.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
  pub mediawiki_api_url:   String,
  pub sparql_endpoint_url: String,
  pub importer_api_url:    String,
  pub user_agent:          String,
  pub timeout_secs:        u64,
  /// Bot-password credentials. Writes require a login.
  pub user:                Option<String>,
  pub password:            Option<String>,
}

impl Default for ClientConfig {
  fn default() -> Self {
    Self {
      mediawiki_api_url:   "https://portal.mardi4nfdi.de/w/api.php".to_string(),
      sparql_endpoint_url: "https://query.portal.mardi4nfdi.de/sparql".to_string(),
      importer_api_url:    "https://importer.portal.mardi4nfdi.de".to_string(),
      user_agent:          "MaRDI client agent".to_string(),
      timeout_secs:        30,
      user:                None,
      password:            None,
    }
  }
}

impl ClientConfig {
  /// Point every service at `base`, as a test server does.
  pub fn local(base: &str) -> Self {
    let base = base.trim_end_matches('/');
    Self {
      mediawiki_api_url: format!("{base}/w/api.php"),
      sparql_endpoint_url: format!("{base}/sparql"),
      importer_api_url: format!("{base}/importer"),
      ..Self::default()
    }
  }

  pub fn credentials(&self) -> Option<(&str, &str)> {
    Some((self.user.as_deref()?, self.password.as_deref()?))
  }

  /// A client with the configured user agent and timeout. Cookies are kept
  /// so a MediaWiki login survives across requests.
  pub fn http_client(&self) -> Result<Client> {
    Ok(
      Client::builder()
        .user_agent(&self.user_agent)
        .timeout(Duration::from_secs(self.timeout_secs))
        .cookie_store(true)
        .build()?,
    )
  }
}
