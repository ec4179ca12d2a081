use std::sync::Arc;

use chrono::{Datelike, Utc};
use http_body_util::{BodyExt, Empty};
use hyper::body::Bytes;
use hyper::{Method, Request, StatusCode};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use uuid::Uuid;

use billcycle::core::{Contact, ContactKind, Frequency};
use billcycle::server;
use billcycle::storage::{LedgerStore, MemoryStore};

async fn spawn_server(store: Arc<dyn LedgerStore>) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, server::router(store)).await.unwrap();
    });
    format!("http://{addr}")
}

async fn request(
    client: &Client<HttpConnector, Empty<Bytes>>,
    method: Method,
    url: String,
) -> (StatusCode, serde_json::Value) {
    let req = Request::builder()
        .method(method)
        .uri(url)
        .body(Empty::new())
        .unwrap();
    let res = client.request(req).await.unwrap();
    let status = res.status();
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn trigger_generates_due_installments() {
    let store = Arc::new(MemoryStore::new());
    // Due today from the handler's point of view: it reads the wall clock.
    let today = Utc::now().date_naive();
    let mut contact = Contact::new(
        Uuid::new_v4(),
        ContactKind::Client,
        "Acme",
        "ACME",
        120.0,
        today.day().min(28),
        Frequency::Monthly,
    )
    .unwrap();
    contact.next_due_date = Some(today);
    store.upsert_contact(contact);

    let base = spawn_server(store.clone()).await;
    let client = Client::builder(TokioExecutor::new()).build_http::<Empty<Bytes>>();

    let (status, body) = request(&client, Method::POST, format!("{base}/run")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["report"]["receivables"]["generated"], 1);
    assert_eq!(body["report"]["payables"]["generated"], 0);
    assert_eq!(store.installments(ContactKind::Client).len(), 1);

    // A second trigger on the same day adds nothing.
    let (status, body) = request(&client, Method::POST, format!("{base}/run")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["report"]["receivables"]["generated"], 0);
    assert_eq!(store.installments(ContactKind::Client).len(), 1);
}

#[tokio::test]
async fn healthz_answers_probes() {
    let base = spawn_server(Arc::new(MemoryStore::new())).await;
    let client = Client::builder(TokioExecutor::new()).build_http::<Empty<Bytes>>();

    let (status, body) = request(&client, Method::GET, format!("{base}/healthz")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}
