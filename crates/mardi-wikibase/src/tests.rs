//! HTTP-level tests against a local mock server.

use mardi_core::{
  entity::{Entity, EntityKind, LocalId},
  store::{
    EntityDirectory, EntityStore, ForeignMapping, MergePrimitive, PageStore, SparqlExecutor,
    WriteOutcome,
  },
};
use serde_json::json;
use wiremock::{
  Mock, MockServer, ResponseTemplate,
  matchers::{body_string_contains, method, path, query_param},
};

use crate::{ClientConfig, Error, Portal};

const API: &str = "/w/api.php";

fn id(s: &str) -> LocalId { s.parse().unwrap() }

async fn portal(server: &MockServer) -> Portal {
  Portal::connect(&ClientConfig::local(&server.uri())).await.unwrap()
}

async fn mount_csrf(server: &MockServer) {
  Mock::given(method("GET"))
    .and(path(API))
    .and(query_param("type", "csrf"))
    .respond_with(
      ResponseTemplate::new(200)
        .set_body_json(json!({ "query": { "tokens": { "csrftoken": "abc+\\" } } })),
    )
    .mount(server)
    .await;
}

// ─── Importer ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn importer_search_reads_qid_list() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/importer/search/items/Euler"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "QID": ["Q7", "Q9"] })))
    .mount(&server)
    .await;
  Mock::given(method("GET"))
    .and(path("/importer/search/properties/author"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "PID": ["P16"] })))
    .mount(&server)
    .await;

  let p = portal(&server).await;
  assert_eq!(p.importer.search(EntityKind::Item, "Euler").await.unwrap(), vec![
    id("Q7"),
    id("Q9")
  ]);
  assert_eq!(p.importer.search(EntityKind::Property, "author").await.unwrap(), vec![
    id("P16")
  ]);
}

#[tokio::test]
async fn importer_search_without_matches_is_empty() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/importer/search/items/Nobody"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "QID": null })))
    .mount(&server)
    .await;

  let p = portal(&server).await;
  assert!(p.importer.search(EntityKind::Item, "Nobody").await.unwrap().is_empty());
}

#[tokio::test]
async fn importer_maps_foreign_references() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/importer/items/wd:Q5/mapping"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "local_id": "Q8" })))
    .mount(&server)
    .await;
  Mock::given(method("GET"))
    .and(path("/importer/properties/wdt:P31/mapping"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
    .mount(&server)
    .await;

  let p = portal(&server).await;
  let mapped = p.importer.local_id(&"wd:Q5".parse().unwrap()).await.unwrap();
  assert_eq!(mapped, Some(id("Q8")));
  let unmapped = p.importer.local_id(&"wdt:P31".parse().unwrap()).await.unwrap();
  assert_eq!(unmapped, None);
  // No mock for this one: the server answers 404.
  let missing = p.importer.local_id(&"wd:Q1".parse().unwrap()).await.unwrap();
  assert_eq!(missing, None);
}

// ─── SPARQL ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn sparql_results_are_parsed() {
  let server = MockServer::start().await;
  let query = r#"SELECT ?item WHERE {?item wdt:P9 "978-3"}"#;
  Mock::given(method("GET"))
    .and(path("/sparql"))
    .and(query_param("query", query))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({
      "head": { "vars": ["item"] },
      "results": { "bindings": [
        { "item": { "type": "uri", "value": "https://portal.mardi4nfdi.de/entity/Q3" } }
      ] }
    })))
    .mount(&server)
    .await;

  let p = portal(&server).await;
  let results = p.sparql.execute(query).await.unwrap();
  assert_eq!(results.results.bindings.len(), 1);
  assert_eq!(
    results.results.bindings[0]["item"].value,
    "https://portal.mardi4nfdi.de/entity/Q3"
  );
}

#[tokio::test]
async fn sparql_server_error_is_reported() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/sparql"))
    .respond_with(ResponseTemplate::new(500))
    .mount(&server)
    .await;

  let p = portal(&server).await;
  assert!(matches!(p.sparql.execute("ASK {}").await, Err(Error::Http(_))));
}

// ─── Entities ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn get_entity_reads_wikibase_json() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path(API))
    .and(query_param("action", "wbgetentities"))
    .and(query_param("ids", "P16"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({
      "entities": { "P16": {
        "type": "property",
        "id": "P16",
        "datatype": "wikibase-item",
        "labels": { "en": { "language": "en", "value": "author" } },
        "descriptions": [],
        "aliases": [],
        "claims": [],
        "lastrevid": 42
      } },
      "success": 1
    })))
    .mount(&server)
    .await;

  let p = portal(&server).await;
  let entity = p.wiki.get_entity(id("P16")).await.unwrap();
  assert_eq!(entity.id, Some(id("P16")));
  assert_eq!(entity.kind, EntityKind::Property);
  assert_eq!(entity.datatype.as_deref(), Some("wikibase-item"));
  assert_eq!(entity.label("en"), Some("author"));
  assert!(entity.claims.is_empty());
}

#[tokio::test]
async fn missing_entity_is_not_found() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path(API))
    .and(query_param("action", "wbgetentities"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({
      "entities": { "Q404": { "id": "Q404", "missing": "" } }
    })))
    .mount(&server)
    .await;

  let p = portal(&server).await;
  let err = EntityStore::get_entity(&p.wiki, id("Q404")).await.unwrap_err();
  assert!(matches!(err, Error::NotFound(missing) if missing == id("Q404")));
}

#[tokio::test]
async fn new_entity_is_created() {
  let server = MockServer::start().await;
  mount_csrf(&server).await;
  Mock::given(method("POST"))
    .and(path(API))
    .and(body_string_contains("action=wbeditentity"))
    .and(body_string_contains("new=item"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({
      "entity": {
        "type": "item",
        "id": "Q1001",
        "labels": { "en": { "language": "en", "value": "Emmy Noether" } },
        "descriptions": {},
        "claims": {}
      },
      "success": 1
    })))
    .expect(1)
    .mount(&server)
    .await;

  let p = portal(&server).await;
  let draft = Entity::draft(EntityKind::Item, "Emmy Noether");
  match p.wiki.write_entity(&draft).await.unwrap() {
    WriteOutcome::Written(entity) => assert_eq!(entity.id, Some(id("Q1001"))),
    other => panic!("expected a written entity, got {other:?}"),
  }
}

#[tokio::test]
async fn label_description_conflict_names_existing_entity() {
  let server = MockServer::start().await;
  mount_csrf(&server).await;
  Mock::given(method("POST"))
    .and(path(API))
    .and(body_string_contains("action=wbeditentity"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({
      "error": {
        "code": "modification-failed",
        "info": "Item [[Item:Q123|Q123]] already has label \"Gauss\" associated with language code en, using the same description text.",
        "messages": [{
          "name": "wikibase-validator-label-with-description-conflict",
          "parameters": ["Gauss", "en", "[[Item:Q123|Q123]]"]
        }]
      }
    })))
    .mount(&server)
    .await;

  let p = portal(&server).await;
  let outcome = p
    .wiki
    .write_entity(&Entity::draft(EntityKind::Item, "Gauss"))
    .await
    .unwrap();
  assert_eq!(outcome, WriteOutcome::Conflict { existing: id("Q123") });
}

#[tokio::test]
async fn other_write_errors_propagate() {
  let server = MockServer::start().await;
  mount_csrf(&server).await;
  Mock::given(method("POST"))
    .and(path(API))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({
      "error": { "code": "permissiondenied", "info": "You are not allowed to edit." }
    })))
    .mount(&server)
    .await;

  let p = portal(&server).await;
  let err = p
    .wiki
    .write_entity(&Entity::draft(EntityKind::Item, "Gauss"))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Api(api) if api.code == "permissiondenied"));
}

// ─── Pages and merges ────────────────────────────────────────────────────────

#[tokio::test]
async fn page_existence_follows_parse_errors() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path(API))
    .and(query_param("action", "parse"))
    .and(query_param("page", "Person:12"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({
      "parse": { "title": "Person:12", "wikitext": { "*": "{{Person}}" } }
    })))
    .mount(&server)
    .await;
  Mock::given(method("GET"))
    .and(path(API))
    .and(query_param("action", "parse"))
    .and(query_param("page", "Person:13"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({
      "error": { "code": "missingtitle", "info": "The page you specified doesn't exist." }
    })))
    .mount(&server)
    .await;

  let p = portal(&server).await;
  assert!(p.wiki.page_exists("12", "Person").await.unwrap());
  assert!(!p.wiki.page_exists("13", "Person").await.unwrap());
}

#[tokio::test]
async fn page_delete_and_move_send_token_and_reason() {
  let server = MockServer::start().await;
  mount_csrf(&server).await;
  Mock::given(method("POST"))
    .and(path(API))
    .and(body_string_contains("action=delete"))
    .and(body_string_contains("title=Person%3A2"))
    .and(body_string_contains("reason=Duplicate"))
    .and(body_string_contains("token=abc%2B%5C"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "delete": {} })))
    .expect(1)
    .mount(&server)
    .await;
  Mock::given(method("POST"))
    .and(path(API))
    .and(body_string_contains("action=move"))
    .and(body_string_contains("from=Person%3A1"))
    .and(body_string_contains("to=Person%3A2"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "move": {} })))
    .expect(1)
    .mount(&server)
    .await;

  let p = portal(&server).await;
  PageStore::delete_page(&p.wiki, "2", "Person").await.unwrap();
  PageStore::move_page(&p.wiki, "1", "2", "Person").await.unwrap();
}

#[tokio::test]
async fn page_api_error_is_returned() {
  let server = MockServer::start().await;
  mount_csrf(&server).await;
  Mock::given(method("POST"))
    .and(path(API))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({
      "error": { "code": "cantdelete", "info": "Could not delete the page." }
    })))
    .mount(&server)
    .await;

  let p = portal(&server).await;
  assert!(matches!(p.wiki.delete_page("2", "Person").await, Err(Error::Api(_))));
}

#[tokio::test]
async fn merge_reports_from_and_to() {
  let server = MockServer::start().await;
  mount_csrf(&server).await;
  Mock::given(method("POST"))
    .and(path(API))
    .and(body_string_contains("action=wbmergeitems"))
    .and(body_string_contains("fromid=Q1"))
    .and(body_string_contains("toid=Q2"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({
      "success": 1,
      "from": { "id": "Q1", "lastrevid": 10 },
      "to": { "id": "Q2", "lastrevid": 11 },
      "redirected": 1
    })))
    .mount(&server)
    .await;

  let p = portal(&server).await;
  let result = MergePrimitive::merge_items(&p.wiki, id("Q1"), id("Q2")).await.unwrap();
  assert_eq!((result.from, result.to), (id("Q1"), id("Q2")));
}

// ─── Login ───────────────────────────────────────────────────────────────────

async fn mount_login(server: &MockServer, result: &str) {
  Mock::given(method("GET"))
    .and(path(API))
    .and(query_param("type", "login"))
    .respond_with(
      ResponseTemplate::new(200)
        .set_body_json(json!({ "query": { "tokens": { "logintoken": "tok+\\" } } })),
    )
    .mount(server)
    .await;
  Mock::given(method("POST"))
    .and(path(API))
    .and(body_string_contains("action=login"))
    .and(body_string_contains("lgname=bot%40importer"))
    .and(body_string_contains("lgtoken=tok%2B%5C"))
    .respond_with(
      ResponseTemplate::new(200).set_body_json(json!({ "login": { "result": result } })),
    )
    .expect(1)
    .mount(server)
    .await;
}

fn credentials(server: &MockServer) -> ClientConfig {
  ClientConfig {
    user: Some("bot@importer".into()),
    password: Some("secret".into()),
    ..ClientConfig::local(&server.uri())
  }
}

#[tokio::test]
async fn connect_logs_in_with_bot_password() {
  let server = MockServer::start().await;
  mount_login(&server, "Success").await;
  Portal::connect(&credentials(&server)).await.unwrap();
}

#[tokio::test]
async fn rejected_login_is_an_error() {
  let server = MockServer::start().await;
  mount_login(&server, "Failed").await;
  let err = Portal::connect(&credentials(&server)).await.err().unwrap();
  assert!(matches!(err, Error::Login(_)));
}
