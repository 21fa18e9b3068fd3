#![cfg(feature = "web")]

use std::sync::Arc;

use axum::{Json, Router, routing::get};
use pathform::{
    ConfigManager,
    data::{FieldError, FieldKind, FlatEdit, PayloadTree, Row, group},
    sync::{self, HttpSyncClient, SAVE_OK_MSG, http::FIELDS_PATH},
    web,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
struct ServiceConf {
    name: String,
    server: Server,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
struct Server {
    port: u16,
    debug: bool,
}

fn initial() -> ServiceConf {
    ServiceConf {
        name: "svc".into(),
        server: Server {
            port: 8080,
            debug: false,
        },
    }
}

async fn spawn_server(manager: Arc<ConfigManager>) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, web::router(manager)).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn test_fetch_edit_and_submit() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("service.json");
    let manager = Arc::new(ConfigManager::open_or_init(&path, &initial()).unwrap());
    let client = HttpSyncClient::new(spawn_server(Arc::clone(&manager)).await).unwrap();

    let catalog = sync::load_catalog(&client).await;
    assert!(catalog.diagnostics.is_empty());
    let rows = group(&catalog.fields);
    let headings: Vec<_> = rows.iter().filter_map(Row::heading).collect();
    assert_eq!(headings, ["/server"]);
    let port = catalog.get("server.port").unwrap();
    assert_eq!(port.kind, FieldKind::Uint16);
    assert_eq!(port.value, json!(8080));

    let edit: FlatEdit = [
        ("server.port", json!(9090)),
        ("server.debug", json!(true)),
    ]
    .into_iter()
    .collect();
    let resp = sync::submit(&client, &PayloadTree::from_flat(&edit)).await;
    assert!(resp.success, "{}", resp.msg);
    assert_eq!(resp.msg, SAVE_OK_MSG);

    let updated: ServiceConf = manager.get().unwrap();
    assert_eq!(updated.name, "svc");
    assert_eq!(updated.server, Server { port: 9090, debug: true });

    let on_disk: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(on_disk["server"]["port"], json!(9090));

    let refetched = sync::load_catalog(&client).await;
    assert_eq!(refetched.get("server.debug").unwrap().value, json!(true));
}

#[tokio::test]
async fn test_rejected_payload_keeps_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("service.json");
    let manager = Arc::new(ConfigManager::open_or_init(&path, &initial()).unwrap());
    let client = HttpSyncClient::new(spawn_server(Arc::clone(&manager)).await).unwrap();

    let edit: FlatEdit = [("server.port", json!("not a port"))].into_iter().collect();
    let resp = sync::submit(&client, &PayloadTree::from_flat(&edit)).await;
    assert!(!resp.success);
    assert!(resp.msg.starts_with("Failed to update config"), "{}", resp.msg);

    assert_eq!(manager.get::<ServiceConf>().unwrap(), initial());
    let on_disk: ServiceConf =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(on_disk, initial());
}

#[tokio::test]
async fn test_malformed_entries_keep_valid_fields() {
    let body = json!([
        {"path": "server.port", "kind": "uint16", "name": "Port", "value": 8080},
        {"path": "server.mode", "kind": 5, "name": "Mode", "value": "fast"},
        {"path": "server.host", "kind": "string", "value": "localhost"},
        "not an entry",
        {"path": "server.debug", "kind": "bool", "name": "Debug", "value": false},
    ]);
    let app = Router::new().route(FIELDS_PATH, get(move || async move { Json(body) }));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    let client = HttpSyncClient::new(format!("http://{addr}")).unwrap();

    let catalog = sync::load_catalog(&client).await;
    let paths: Vec<_> = catalog.fields.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(paths, ["server.port", "server.debug"]);
    assert_eq!(catalog.diagnostics.len(), 3);
    assert_eq!(
        catalog.diagnostics[0],
        FieldError::UnknownKind {
            path: "server.mode".into(),
            kind: "5".into(),
        }
    );
    assert!(matches!(
        catalog.diagnostics[1],
        FieldError::Malformed { index: 2, .. }
    ));
    assert!(matches!(
        catalog.diagnostics[2],
        FieldError::Malformed { index: 3, .. }
    ));
}

#[tokio::test]
async fn test_unreachable_server_reports_failure() {
    let client = HttpSyncClient::new("http://127.0.0.1:9").unwrap();

    let catalog = sync::load_catalog(&client).await;
    assert!(catalog.is_empty());

    let edit: FlatEdit = [("name", json!("x"))].into_iter().collect();
    let resp = sync::submit(&client, &PayloadTree::from_flat(&edit)).await;
    assert!(!resp.success);
    assert_eq!(resp.msg, sync::SAVE_FAILED_MSG);
}
