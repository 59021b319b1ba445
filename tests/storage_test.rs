//! Key/value store integration tests.

use cookieguard::base::policyerror::PolicyError;
use cookieguard::cookies::MemoryCookieJar;
use cookieguard::engine::{EngineConfig, PolicyEngine, Request, Response};
use cookieguard::host::TracingNotifier;
use cookieguard::policy::{ListKind, Rule};
use cookieguard::storage::{JsonFileStore, KeyValueStore};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;

async fn engine_on(store: JsonFileStore) -> PolicyEngine {
    PolicyEngine::new(
        EngineConfig::default(),
        Arc::new(MemoryCookieJar::new()),
        Arc::new(store),
        Arc::new(TracingNotifier),
    )
    .await
}

#[tokio::test]
async fn test_change_stream_reports_old_and_new_values() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::open(dir.path().join("kv.json")).await.unwrap();
    let mut changes = store.subscribe();

    store
        .set(HashMap::from([("whitelist".to_string(), json!(["a.com"]))]))
        .await
        .unwrap();
    store
        .set(HashMap::from([("whitelist".to_string(), json!(["b.com"]))]))
        .await
        .unwrap();
    store.remove(&["whitelist"]).await.unwrap();

    let first = changes.recv().await.unwrap();
    assert_eq!(first.key, "whitelist");
    assert_eq!(first.old_value, None);
    let second = changes.recv().await.unwrap();
    assert_eq!(second.old_value, Some(json!(["a.com"])));
    assert_eq!(second.new_value, Some(json!(["b.com"])));
    let third = changes.recv().await.unwrap();
    assert_eq!(third.new_value, None);
}

#[tokio::test]
async fn test_non_object_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("kv.json");
    std::fs::write(&path, "[1, 2, 3]").unwrap();

    assert!(matches!(
        JsonFileStore::open(&path).await,
        Err(PolicyError::HostIo { op: "open", .. })
    ));
}

#[tokio::test]
async fn test_policy_state_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cookieguard.json");

    {
        let engine = engine_on(JsonFileStore::open(&path).await.unwrap()).await;
        let responses = [
            engine
                .handle_request(Request::SaveRule { key: "bank".into(), rule: Rule::new(15).encrypted() })
                .await,
            engine
                .handle_request(Request::AddToList { list: ListKind::Blacklist, pattern: "tracker.net".into() })
                .await,
        ];
        assert!(responses.iter().all(|r| !r.is_error()));
    }

    let engine = engine_on(JsonFileStore::open(&path).await.unwrap()).await;
    let state = engine.state().await;
    assert!(state.rules.get("bank").unwrap().encrypt);
    assert_eq!(state.blacklist(), ["tracker.net".to_string()]);
    assert_eq!(engine.audit().len().await, 2);

    match engine.handle_request(Request::GetAuditLog { limit: None }).await {
        Response::AuditLog { entries } => assert_eq!(entries[0].get("list"), Some(&json!("blacklist"))),
        other => panic!("unexpected {:?}", other),
    }
}

#[tokio::test]
async fn test_malformed_state_part_falls_back_to_default() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cookieguard.json");
    std::fs::write(
        &path,
        json!({
            "rules": "not a rule list",
            "whitelist": ["kept.com"],
        })
        .to_string(),
    )
    .unwrap();

    let engine = engine_on(JsonFileStore::open(&path).await.unwrap()).await;
    let state = engine.state().await;
    assert_eq!(state.rules.len(), 1);
    assert_eq!(state.whitelist(), ["kept.com".to_string()]);
}
