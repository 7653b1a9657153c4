//! To run this tests you need Couchbase Lite with REST API (or sync_gateway)
//! listening on COUCHBASE_LITE_URL, so ignored by default

use couchbase_lite_rest::{
    serde_json::json, ChangeNotification, Database, DatabaseConfig, ViewQuery,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(tag = "type")]
struct MyDocument {
    text: String,
    numbers: Vec<i32>,
}

#[tokio::test]
#[ignore]
async fn test_document_life_cycle() {
    let db = init_env("life_cycle");
    db.create_database().await.unwrap();
    let info = db.get_database().await.unwrap();
    println!("database info: {info}");

    let data = MyDocument {
        text: "hello".into(),
        numbers: vec![1, 2, 3],
    };
    let ack = db.create_document(&data).await.unwrap();
    let id = ack["id"].as_str().unwrap().to_string();
    let rev = ack["rev"].as_str().unwrap().to_string();

    let doc = db.get_document(&id).await.unwrap();
    assert_eq!("hello", doc["text"]);

    let edited = MyDocument {
        text: "edited".into(),
        ..data
    };
    let ack = db.update_document(&id, &rev, &edited).await.unwrap();
    let new_rev = ack["rev"].as_str().unwrap().to_string();

    let err = db.update_document(&id, &rev, &edited).await.unwrap_err();
    assert!(err.is_conflict(), "stale revision should conflict: {err}");

    db.delete_document(&id, &new_rev).await.unwrap();
    assert!(db.get_document(&id).await.unwrap_err().is_not_found());

    db.create_local_document("checkpoint", &json!({"seq": 1}))
        .await
        .unwrap();
    let local = db.get_local_document("checkpoint").await.unwrap();
    assert_eq!(1, local["seq"]);
}

#[tokio::test]
#[ignore]
async fn test_view_query() {
    let db = init_env("views");
    db.create_database().await.unwrap();
    db.create_design_document(
        "chat",
        &json!({"by_type": {"map": "function(doc) { emit(doc.type, null); }"}}),
    )
    .await
    .unwrap();
    for i in 0..3 {
        let data = MyDocument {
            text: format!("{i}"),
            numbers: (0..i).collect(),
        };
        db.create_document(&data).await.unwrap();
    }
    let rows = db
        .query_view("_design/chat", "by_type", &ViewQuery::new().key("MyDocument"))
        .await
        .unwrap();
    assert_eq!(3, rows["rows"].as_array().unwrap().len());
    let all = db.get_all_documents().await.unwrap();
    println!("all docs: {all}");
}

#[tokio::test]
#[ignore]
async fn test_listen_sees_new_documents() {
    let db = init_env("listen");
    db.create_database().await.unwrap();
    let mut listener = db.listen().unwrap();
    let mut rx = listener.subscribe();
    db.create_document(&json!({"text": "ping"})).await.unwrap();

    let mut seen = 0;
    while seen == 0 {
        let notification = tokio::time::timeout(Duration::from_secs(10), rx.recv())
            .await
            .unwrap()
            .unwrap();
        match notification {
            ChangeNotification::Changes(event) => seen += event.results().len(),
            other => panic!("unexpected notification {other:?}"),
        }
    }
    listener.stop().await;
    println!("active tasks: {}", db.get_active_tasks().await.unwrap());
}

fn init_env(name: &str) -> Database {
    let _ = env_logger::try_init();
    let url =
        std::env::var("COUCHBASE_LITE_URL").unwrap_or_else(|_| "http://127.0.0.1:5984/".into());
    let name = format!("{}_{}", name, uuid::Uuid::new_v4().simple());
    println!("we use database {name} at {url}");
    Database::new(DatabaseConfig::new(url, name)).unwrap()
}
