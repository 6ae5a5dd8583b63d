mod common;

use async_trait::async_trait;
use axum::{Json, Router, http::StatusCode, routing::post};
use common::next_entry;
use eventhub::{
    AuditEmitter, AuditTaxonomy,
    audit::{
        AuditAction, AuditEntry, AuditListener, AuditModel, ChannelAuditListener, ListenerError,
        PersistAuditListener, WebhookAuditListener,
    },
    context::{PrincipalId, RequestContext},
    repository::AuditStore,
};
use serde_json::{Value, json};
use std::{
    sync::{Arc, Mutex},
    time::Duration,
};
use tokio::{
    net::TcpListener,
    sync::mpsc::{self, UnboundedReceiver},
};

/// In-memory audit store. `fail` rejects every append.
#[derive(Default)]
struct MockAuditStore {
    appended: Mutex<Vec<AuditEntry>>,
    fail: bool,
}

#[async_trait]
impl AuditStore for MockAuditStore {
    async fn append(&self, entry: &AuditEntry) -> Result<(), sqlx::Error> {
        if self.fail {
            return Err(sqlx::Error::PoolTimedOut);
        }
        self.appended.lock().unwrap().push(entry.clone());
        Ok(())
    }
}

fn sample_entry() -> AuditEntry {
    let ctx = RequestContext::new("trace-listener").with_principal(PrincipalId(3));
    AuditEntry::new(
        AuditModel::Evento.event(AuditAction::Create),
        &json!({ "id": 1, "nombre": "Feria" }),
        &ctx,
    )
    .unwrap()
}

/// Starts a local endpoint answering every POST with `status` and forwarding
/// the received JSON body.
async fn spawn_webhook(status: StatusCode) -> (String, UnboundedReceiver<Value>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let app = Router::new().route(
        "/audit",
        post(move |Json(body): Json<Value>| {
            let tx = tx.clone();
            async move {
                let _ = tx.send(body);
                status
            }
        }),
    );

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}/audit"), rx)
}

// --- PersistAuditListener ---

#[tokio::test]
async fn test_persist_listener_appends_entry() {
    let store = Arc::new(MockAuditStore::default());
    let listener = PersistAuditListener::new(store.clone());

    listener.handle(&sample_entry()).await.unwrap();

    let appended = store.appended.lock().unwrap();
    assert_eq!(appended.len(), 1);
    assert_eq!(appended[0].event().as_str(), "evento:create");
    assert_eq!(appended[0].trace_id(), "trace-listener");
}

#[tokio::test]
async fn test_persist_listener_reports_store_failure() {
    let store = Arc::new(MockAuditStore {
        fail: true,
        ..MockAuditStore::default()
    });
    let listener = PersistAuditListener::new(store);

    let result = listener.handle(&sample_entry()).await;

    assert!(matches!(result, Err(ListenerError::Store(_))));
}

#[tokio::test]
async fn test_store_failure_is_contained_by_the_emitter() {
    let store = Arc::new(MockAuditStore {
        fail: true,
        ..MockAuditStore::default()
    });
    let (channel, mut rx) = ChannelAuditListener::channel();
    let emitter = AuditEmitter::builder(AuditTaxonomy::standard())
        .subscribe(PersistAuditListener::new(store))
        .subscribe(channel)
        .build();

    assert!(emitter.emit(sample_entry()).is_ok());

    let delivered = next_entry(&mut rx).await.expect("other listener still served");
    assert_eq!(delivered.trace_id(), "trace-listener");
}

// --- WebhookAuditListener ---

#[tokio::test]
async fn test_webhook_listener_posts_wire_shape() {
    let (url, mut received) = spawn_webhook(StatusCode::OK).await;
    let listener = WebhookAuditListener::new(url);

    listener.handle(&sample_entry()).await.unwrap();

    let body = tokio::time::timeout(Duration::from_secs(2), received.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(body["tipoEvento"], "evento:create");
    assert_eq!(body["valor"]["nombre"], "Feria");
    assert_eq!(body["actorId"], 3);
    assert_eq!(body["traceId"], "trace-listener");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_webhook_listener_treats_non_2xx_as_failure() {
    let (url, _received) = spawn_webhook(StatusCode::INTERNAL_SERVER_ERROR).await;
    let listener = WebhookAuditListener::new(url);

    let result = listener.handle(&sample_entry()).await;

    match result {
        Err(ListenerError::Delivery(e)) => {
            assert_eq!(e.status(), Some(reqwest::StatusCode::INTERNAL_SERVER_ERROR));
        }
        other => panic!("expected a delivery failure, got {other:?}"),
    }
}
