//! HTTP implementations of the `mardi-core` collaborator traits for the MaRDI
//! portal: the importer service, the MediaWiki action API and the SPARQL
//! endpoint.

pub mod config;
pub mod error;
pub mod importer;
pub mod mediawiki;
pub mod sparql;

pub use config::ClientConfig;
pub use error::{Error, Result};
pub use importer::ImporterClient;
pub use mediawiki::MediaWikiClient;
pub use sparql::SparqlClient;

/// The three portal services, sharing one HTTP client and its cookie jar.
#[derive(Clone)]
pub struct Portal {
  pub importer: ImporterClient,
  pub wiki:     MediaWikiClient,
  pub sparql:   SparqlClient,
}

impl Portal {
  /// Build the clients and log in when credentials are configured.
  pub async fn connect(config: &ClientConfig) -> Result<Self> {
    let http = config.http_client()?;
    let wiki = MediaWikiClient::with_client(http.clone(), &config.mediawiki_api_url);
    if let Some((user, password)) = config.credentials() {
      wiki.login(user, password).await?;
    }
    Ok(Self {
      importer: ImporterClient::with_client(http.clone(), &config.importer_api_url)?,
      sparql: SparqlClient::with_client(http, &config.sparql_endpoint_url),
      wiki,
    })
  }
}

#[cfg(test)]
mod tests;
