//! SPARQL endpoint client.

use mardi_core::store::{SparqlExecutor, SparqlResults};
use reqwest::{Client, header::ACCEPT};

use crate::{Error, Result};

#[derive(Clone)]
pub struct SparqlClient {
  http:     Client,
  endpoint: String,
}

impl SparqlClient {
  pub fn with_client(http: Client, endpoint: &str) -> Self {
    Self { http, endpoint: endpoint.to_string() }
  }
}

impl SparqlExecutor for SparqlClient {
  type Error = Error;

  async fn execute(&self, query: &str) -> Result<SparqlResults> {
    let resp = self
      .http
      .get(&self.endpoint)
      .header(ACCEPT, "application/sparql-results+json")
      .query(&[("query", query), ("format", "json")])
      .send()
      .await?
      .error_for_status()?;
    Ok(resp.json().await?)
  }
}
