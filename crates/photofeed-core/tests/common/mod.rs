//! Test doubles and common utilities for store contract tests
//!
//! The scripted transport parks every request until the test answers it,
//! which lets tests hold an operation in flight for as long as they need.

#![allow(dead_code)]

use photofeed_core::error::TransportError;
use photofeed_core::request::ApiRequest;
use photofeed_core::traits::Transport;
use photofeed_core::{
    ChangeNotifier, ChangeObserver, PhotoStore, PhotoStoreHandle, StoreConfig, StoreEvent,
};
use serde_json::{Value, json};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_stream::{Stream, StreamExt};

pub const BASE_URL: &str = "https://api.example.com";

type Reply = Result<Vec<u8>, TransportError>;

/// A transport whose responses are supplied by the test, one request at a time
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    inner: Arc<Mutex<ScriptedInner>>,
}

#[derive(Default)]
struct ScriptedInner {
    requests: Vec<ApiRequest>,
    pending: Vec<Option<oneshot::Sender<Reply>>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of requests received so far
    pub fn request_count(&self) -> usize {
        self.inner.lock().unwrap().requests.len()
    }

    /// Copy of the `index`-th request
    pub fn request(&self, index: usize) -> ApiRequest {
        self.inner.lock().unwrap().requests[index].clone()
    }

    /// Wait until at least `count` requests have arrived
    pub async fn wait_for_requests(&self, count: usize) {
        let waited = tokio::time::timeout(Duration::from_secs(2), async {
            while self.request_count() < count {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await;

        assert!(
            waited.is_ok(),
            "expected {} request(s), saw {}",
            count,
            self.request_count()
        );
    }

    /// Whether the caller of the `index`-th request stopped waiting for it
    pub fn is_cancelled(&self, index: usize) -> bool {
        match &self.inner.lock().unwrap().pending[index] {
            Some(sender) => sender.is_closed(),
            None => false,
        }
    }

    /// Wait until the caller of the `index`-th request has dropped it
    pub async fn wait_for_cancel(&self, index: usize) {
        let waited = tokio::time::timeout(Duration::from_secs(2), async {
            while !self.is_cancelled(index) {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await;

        assert!(waited.is_ok(), "request {} was never cancelled", index);
    }

    /// Answer the `index`-th request
    ///
    /// Returns false when the request was cancelled before the answer landed.
    pub fn respond(&self, index: usize, reply: Reply) -> bool {
        let sender = self.inner.lock().unwrap().pending[index]
            .take()
            .expect("request already answered");
        sender.send(reply).is_ok()
    }

    /// Answer the `index`-th request with a JSON body
    pub fn respond_json(&self, index: usize, body: Value) -> bool {
        self.respond(index, Ok(serde_json::to_vec(&body).unwrap()))
    }

    /// Fail the `index`-th request
    pub fn fail(&self, index: usize, error: TransportError) -> bool {
        self.respond(index, Err(error))
    }
}

#[async_trait::async_trait]
impl Transport for ScriptedTransport {
    async fn execute(&self, request: ApiRequest) -> Result<Vec<u8>, TransportError> {
        let (tx, rx) = oneshot::channel();
        {
            let mut inner = self.inner.lock().unwrap();
            inner.requests.push(request);
            inner.pending.push(Some(tx));
        }

        rx.await
            .unwrap_or_else(|_| Err(TransportError::Request("reply dropped".to_string())))
    }

    fn transport_name(&self) -> &'static str {
        "scripted"
    }
}

/// Observer that counts notifications
#[derive(Default)]
pub struct CountingObserver {
    count: AtomicUsize,
}

impl CountingObserver {
    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

impl ChangeObserver for CountingObserver {
    fn on_change(&self, _event: &str) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }
}

/// A running store wired to a scripted transport
pub struct Harness {
    pub transport: ScriptedTransport,
    pub handle: PhotoStoreHandle,
    pub events: mpsc::Receiver<StoreEvent>,
    pub join: JoinHandle<()>,
    pub observer: Arc<CountingObserver>,
    observer_ref: Arc<dyn ChangeObserver>,
}

impl Harness {
    pub fn start() -> Self {
        Self::with_config(StoreConfig::new(BASE_URL))
    }

    pub fn with_config(config: StoreConfig) -> Self {
        let transport = ScriptedTransport::new();
        let notifier = ChangeNotifier::new();

        let observer = Arc::new(CountingObserver::default());
        let observer_ref: Arc<dyn ChangeObserver> = observer.clone();
        notifier.subscribe(&observer_ref);

        let (store, events) = PhotoStore::new(Arc::new(transport.clone()), notifier, config)
            .expect("store construction succeeds");
        let (handle, join) = store.spawn();

        Self {
            transport,
            handle,
            events,
            join,
            observer,
            observer_ref,
        }
    }

    /// Stream of change notifications
    pub fn changes(&self) -> std::pin::Pin<Box<dyn Stream<Item = ()> + Send>> {
        Box::pin(self.handle.notifier().watch())
    }

    /// Drain every event emitted so far
    ///
    /// Round-trips through the store first so that events for all commands
    /// sent before this call are in the channel.
    pub async fn drain_events(&mut self) -> Vec<StoreEvent> {
        self.handle.snapshot().await.expect("store is running");

        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }

    /// Load one page of photos through the store and wait for it to land
    pub async fn load_page(&self, photos: Vec<Value>) {
        let mut changes = self.changes();
        let before = self.transport.request_count();

        self.handle.fetch_next_page().await.unwrap();
        self.transport.wait_for_requests(before + 1).await;
        assert!(self.transport.respond_json(before, Value::Array(photos)));

        next_change(&mut changes).await;
    }
}

/// Wait for the next change notification
pub async fn next_change(changes: &mut (impl Stream<Item = ()> + Unpin)) {
    let next = tokio::time::timeout(Duration::from_secs(2), changes.next()).await;
    assert!(matches!(next, Ok(Some(()))), "expected a change notification");
}

/// Assert no change notification arrives within a short window
pub async fn assert_no_change(changes: &mut (impl Stream<Item = ()> + Unpin)) {
    let next = tokio::time::timeout(Duration::from_millis(50), changes.next()).await;
    assert!(next.is_err(), "unexpected change notification");
}

/// JSON for one photo as the API sends it
pub fn photo_json(id: &str, liked: bool) -> Value {
    json!({
        "id": id,
        "width": 4000,
        "height": 3000,
        "created_at": "2016-05-03T11:00:28-04:00",
        "description": format!("Photo {}", id),
        "urls": {
            "raw": format!("https://images.example.com/{}/raw", id),
            "full": format!("https://images.example.com/{}/full", id),
            "regular": format!("https://images.example.com/{}/regular", id),
            "small": format!("https://images.example.com/{}/small", id),
            "thumb": format!("https://images.example.com/{}/thumb", id),
        },
        "liked_by_user": liked,
    })
}

/// JSON body of a like/unlike confirmation
pub fn like_json(id: &str, liked: bool) -> Value {
    json!({ "photo": photo_json(id, liked) })
}
