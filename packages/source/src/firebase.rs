//! Firebase Realtime Database client over the REST streaming API.
//!
//! Subscribing issues `GET <node>.json` with `Accept: text/event-stream`.
//! The server sends the whole node as an initial `put` at path `/`, then
//! `put`/`patch` events for every change. The client keeps a local copy of
//! the node and emits the full content after each change, so subscribers
//! never have to deal with deltas. Dropped connections are re-opened by
//! [`crate::stream::run_stream`].
//!
//! Write-back uses plain REST: `POST` to push a new child (the server
//! returns the generated key), `PATCH` a child to update it, `DELETE` to
//! remove it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use city_pulse_incident_models::{FeedRecord, RawEvent};
use serde::Deserialize;
use serde_json::{Map, Value};
use tokio::task::JoinHandle;

use crate::config::FeedConfig;
use crate::feed::{EventFeed, Subscription, subscription_channel};
use crate::sse::SseEvent;
use crate::stream::{Backoff, HttpTransport, StreamTransport as _, run_stream};
use crate::store::{EventStore, validate_key};
use crate::{FeedError, StoreError};

/// A connected Firebase client for one feed node.
///
/// Created with [`FirebaseFeed::open`] and shut down with
/// [`FirebaseFeed::close`] (or by dropping it). Closing stops every
/// streaming task the client started.
pub struct FirebaseFeed {
    client: reqwest::Client,
    config: FeedConfig,
    closed: AtomicBool,
    streams: Mutex<Vec<JoinHandle<()>>>,
}

impl FirebaseFeed {
    /// Builds the HTTP client for `config`.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::Http`] if the HTTP client cannot be built.
    pub fn open(config: FeedConfig) -> Result<Self, FeedError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("city_pulse/", env!("CARGO_PKG_VERSION")))
            .build()?;

        log::info!("Opened event feed client for node {}", config.node());

        Ok(Self {
            client,
            config,
            closed: AtomicBool::new(false),
            streams: Mutex::new(Vec::new()),
        })
    }

    /// Stops all streaming tasks. Further subscribes and writes fail with a
    /// `Closed` error. Calling this more than once has no effect.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        let streams = std::mem::take(
            &mut *self
                .streams
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        log::info!("Closing event feed client ({} streams)", streams.len());
        for handle in streams {
            handle.abort();
        }
    }

    /// Whether [`Self::close`] has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn ensure_writable(&self) -> Result<(), StoreError> {
        if self.is_closed() {
            return Err(StoreError::Closed);
        }
        Ok(())
    }
}

impl Drop for FirebaseFeed {
    fn drop(&mut self) {
        self.close();
    }
}

#[async_trait]
impl EventFeed for FirebaseFeed {
    fn name(&self) -> &str {
        "firebase"
    }

    async fn subscribe(&self) -> Result<Subscription, FeedError> {
        if self.is_closed() {
            return Err(FeedError::Closed);
        }

        log::debug!("Opening event stream for node {}", self.config.node());
        let transport = Arc::new(HttpTransport::new(
            self.client.clone(),
            self.config.node_url(None),
        ));
        let first = transport.connect().await?;

        let (sink, subscription) = subscription_channel();
        let handle = tokio::spawn(run_stream(transport, first, sink, Backoff::default()));

        let mut streams = self
            .streams
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        streams.retain(|h| !h.is_finished());
        streams.push(handle);

        Ok(subscription)
    }
}

/// What a stream event means for subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamAction {
    /// The node changed; publish a new snapshot.
    Publish,
    /// Nothing to deliver.
    Ignore,
    /// Deliver an error to subscribers.
    Fail(String),
}

#[derive(Deserialize)]
struct StreamPayload {
    path: String,
    #[serde(default)]
    data: Value,
}

/// Local mirror of the feed node, maintained from stream events.
#[derive(Debug, Default)]
pub struct NodeTree {
    root: Value,
}

impl NodeTree {
    /// Applies one server-sent event to the mirror.
    pub fn apply(&mut self, event: &SseEvent) -> StreamAction {
        match event.event.as_str() {
            "put" | "patch" => match serde_json::from_str::<StreamPayload>(&event.data) {
                Ok(payload) => {
                    if event.event == "put" {
                        self.put(&payload.path, payload.data);
                    } else {
                        self.patch(&payload.path, payload.data);
                    }
                    StreamAction::Publish
                }
                Err(e) => {
                    log::warn!("Ignoring malformed {} event: {e}", event.event);
                    StreamAction::Ignore
                }
            },
            "keep-alive" => StreamAction::Ignore,
            "cancel" => StreamAction::Fail(format!(
                "subscription cancelled by server: {}",
                cancel_reason(&event.data)
            )),
            "auth_revoked" => StreamAction::Fail("auth credential revoked".to_string()),
            other => {
                log::debug!("Ignoring unknown stream event {other:?}");
                StreamAction::Ignore
            }
        }
    }

    /// Replaces the value at `path`. `null` removes it.
    pub fn put(&mut self, path: &str, data: Value) {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        set_path(&mut self.root, &segments, data);
    }

    /// Replaces each child of `data` under `path`.
    pub fn patch(&mut self, path: &str, data: Value) {
        let Value::Object(children) = data else {
            log::warn!("Ignoring non-object patch at {path}");
            return;
        };

        let base = path.trim_end_matches('/');
        for (key, value) in children {
            self.put(&format!("{base}/{key}"), value);
        }
    }

    /// The node's children as feed records.
    #[must_use]
    pub fn records(&self) -> Vec<FeedRecord> {
        FeedRecord::from_node(&self.root)
    }
}

fn cancel_reason(data: &str) -> String {
    match serde_json::from_str::<Value>(data) {
        Ok(Value::String(reason)) => reason,
        Ok(Value::Null) | Err(_) => "permission denied".to_string(),
        Ok(other) => other.to_string(),
    }
}

fn set_path(node: &mut Value, segments: &[&str], data: Value) {
    let Some((head, rest)) = segments.split_first() else {
        *node = data;
        return;
    };

    if data.is_null() {
        if node.is_array() {
            objectify(node);
        }
        if let Value::Object(map) = node
            && let Some(child) = map.get_mut(*head)
        {
            set_path(child, rest, Value::Null);
            if child.is_null() || child.as_object().is_some_and(Map::is_empty) {
                map.remove(*head);
            }
        }
        return;
    }

    objectify(node);
    if let Value::Object(map) = node {
        let child = map.entry((*head).to_string()).or_insert(Value::Null);
        set_path(child, rest, data);
    }
}

/// Turns `node` into an object. Arrays keep their non-null entries keyed by
/// index; any other scalar is dropped.
fn objectify(node: &mut Value) {
    match node {
        Value::Object(_) => {}
        Value::Array(items) => {
            let map = std::mem::take(items)
                .into_iter()
                .enumerate()
                .filter(|(_, item)| !item.is_null())
                .map(|(index, item)| (index.to_string(), item))
                .collect();
            *node = Value::Object(map);
        }
        _ => *node = Value::Object(Map::new()),
    }
}

#[derive(Deserialize)]
struct PushResponse {
    name: String,
}

fn check_status(response: reqwest::Response) -> Result<reqwest::Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(StoreError::Status {
            status: status.as_u16(),
        })
    }
}

#[async_trait]
impl EventStore for FirebaseFeed {
    async fn create(&self, event: RawEvent) -> Result<String, StoreError> {
        self.ensure_writable()?;

        let response = self
            .client
            .post(self.config.node_url(None))
            .json(&event)
            .send()
            .await?;
        let pushed: PushResponse = check_status(response)?.json().await?;

        log::info!("Created event {}", pushed.name);
        Ok(pushed.name)
    }

    async fn update(&self, key: &str, patch: RawEvent) -> Result<(), StoreError> {
        self.ensure_writable()?;
        validate_key(key)?;

        let response = self
            .client
            .patch(self.config.node_url(Some(key)))
            .json(&patch)
            .send()
            .await?;
        check_status(response)?;

        log::info!("Updated event {key}");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.ensure_writable()?;
        validate_key(key)?;

        let response = self
            .client
            .delete(self.config.node_url(Some(key)))
            .send()
            .await?;
        check_status(response)?;

        log::info!("Deleted event {key}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sse(event: &str, data: &Value) -> SseEvent {
        SseEvent {
            event: event.to_string(),
            data: data.to_string(),
        }
    }

    fn keys(tree: &NodeTree) -> Vec<String> {
        tree.records().into_iter().map(|r| r.key).collect()
    }

    #[test]
    fn initial_put_replaces_whole_node() {
        let mut tree = NodeTree::default();
        let action = tree.apply(&sse(
            "put",
            &json!({ "path": "/", "data": { "-a": { "category": "Public Safety" } } }),
        ));

        assert_eq!(action, StreamAction::Publish);
        assert_eq!(keys(&tree), vec!["-a"]);
        assert_eq!(
            tree.records()[0].event.category.as_deref(),
            Some("Public Safety")
        );
    }

    #[test]
    fn child_put_and_delete() {
        let mut tree = NodeTree::default();
        tree.put("/", json!({ "-a": { "impact": 1 } }));
        tree.put("/-b", json!({ "impact": 3 }));
        assert_eq!(keys(&tree), vec!["-a", "-b"]);

        tree.put("/-a", Value::Null);
        assert_eq!(keys(&tree), vec!["-b"]);
    }

    #[test]
    fn field_put_updates_one_record() {
        let mut tree = NodeTree::default();
        tree.put("/", json!({ "-a": { "impact": 1, "context": "x" } }));
        tree.put("/-a/impact", json!(3));

        let records = tree.records();
        assert_eq!(records[0].event.impact, Some(3.0));
        assert_eq!(records[0].event.context.as_deref(), Some("x"));
    }

    #[test]
    fn deleting_last_field_removes_record() {
        let mut tree = NodeTree::default();
        tree.put("/", json!({ "-a": { "impact": 1 } }));
        tree.put("/-a/impact", Value::Null);
        assert!(tree.records().is_empty());
    }

    #[test]
    fn patch_merges_children() {
        let mut tree = NodeTree::default();
        tree.put("/", json!({ "-a": { "impact": 1, "context": "x" } }));
        let action = tree.apply(&sse(
            "patch",
            &json!({ "path": "/-a", "data": { "impact": 2, "headline": "h" } }),
        ));

        assert_eq!(action, StreamAction::Publish);
        let event = &tree.records()[0].event;
        assert_eq!(event.impact, Some(2.0));
        assert_eq!(event.context.as_deref(), Some("x"));
        assert_eq!(event.headline.as_deref(), Some("h"));
    }

    #[test]
    fn array_root_is_keyed_by_index() {
        let mut tree = NodeTree::default();
        tree.put("/", json!([null, { "impact": 1 }, { "impact": 2 }]));
        assert_eq!(keys(&tree), vec!["1", "2"]);
    }

    #[test]
    fn child_put_on_array_root_keeps_existing_records() {
        let mut tree = NodeTree::default();
        tree.put("/", json!([{ "impact": 1 }, null, { "impact": 2 }]));

        tree.put("/-x", json!({ "impact": 3 }));
        assert_eq!(keys(&tree), vec!["-x", "0", "2"]);

        tree.put("/0", Value::Null);
        assert_eq!(keys(&tree), vec!["-x", "2"]);
        assert_eq!(tree.records()[1].event.impact, Some(2.0));
    }

    #[test]
    fn delete_on_array_root_keeps_siblings() {
        let mut tree = NodeTree::default();
        tree.put("/", json!([{ "impact": 1 }, { "impact": 2 }]));
        tree.put("/1", Value::Null);
        assert_eq!(keys(&tree), vec!["0"]);
    }

    #[test]
    fn null_root_put_empties_node() {
        let mut tree = NodeTree::default();
        tree.put("/", json!({ "-a": {} }));
        tree.apply(&sse("put", &json!({ "path": "/", "data": null })));
        assert!(tree.records().is_empty());
    }

    #[test]
    fn control_events() {
        let mut tree = NodeTree::default();
        assert_eq!(
            tree.apply(&sse("keep-alive", &Value::Null)),
            StreamAction::Ignore
        );
        assert_eq!(
            tree.apply(&sse("cancel", &Value::Null)),
            StreamAction::Fail("subscription cancelled by server: permission denied".to_string())
        );
        assert!(matches!(
            tree.apply(&sse("auth_revoked", &json!("token expired"))),
            StreamAction::Fail(_)
        ));
    }

    #[test]
    fn malformed_payload_is_ignored() {
        let mut tree = NodeTree::default();
        let event = SseEvent {
            event: "put".to_string(),
            data: "{not json".to_string(),
        };
        assert_eq!(tree.apply(&event), StreamAction::Ignore);
    }

    #[tokio::test]
    async fn closed_client_refuses_work() {
        let feed = FirebaseFeed::open(FeedConfig::new("https://db.example.com").unwrap()).unwrap();
        feed.close();
        feed.close();

        assert!(matches!(feed.subscribe().await, Err(FeedError::Closed)));
        assert!(matches!(
            feed.create(RawEvent::default()).await,
            Err(StoreError::Closed)
        ));
    }
}
