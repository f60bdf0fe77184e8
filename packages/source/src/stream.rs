//! Reconnecting event stream for the Firebase feed.
//!
//! The streaming connection is opened through a [`StreamTransport`]. When a
//! connection drops (transport error or server close) subscribers get one
//! [`FeedEvent::Error`] and the stream is re-opened with exponential backoff
//! for as long as the subscription is alive. Each new connection starts
//! from a fresh [`NodeTree`], so the server's initial `put` fully replaces
//! whatever the previous connection had mirrored. `cancel` and
//! `auth_revoked` end the stream for good, as does a permission failure
//! while reconnecting.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt as _;
use futures::stream::BoxStream;
use reqwest::{StatusCode, Url, header};

use crate::FeedError;
use crate::feed::{FeedEvent, FeedSink};
use crate::firebase::{NodeTree, StreamAction};
use crate::sse::SseParser;

/// Raw body chunks of one streaming connection.
pub type ByteStream = BoxStream<'static, Result<Vec<u8>, String>>;

/// Opens streaming connections to the feed node.
#[async_trait]
pub trait StreamTransport: Send + Sync {
    /// Opens a new connection.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError`] if the connection cannot be established or
    /// the server refuses it.
    async fn connect(&self) -> Result<ByteStream, FeedError>;
}

/// `GET <node>.json` with `Accept: text/event-stream`.
pub struct HttpTransport {
    client: reqwest::Client,
    url: Url,
}

impl HttpTransport {
    /// Creates a transport streaming from `url`.
    #[must_use]
    pub const fn new(client: reqwest::Client, url: Url) -> Self {
        Self { client, url }
    }
}

#[async_trait]
impl StreamTransport for HttpTransport {
    async fn connect(&self) -> Result<ByteStream, FeedError> {
        let response = self
            .client
            .get(self.url.clone())
            .header(header::ACCEPT, "text/event-stream")
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(FeedError::PermissionDenied {
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            return Err(FeedError::Status {
                status: status.as_u16(),
            });
        }

        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map(|b| b.to_vec()).map_err(|e| e.to_string()))
            .boxed())
    }
}

/// Delay between reconnect attempts: doubles from `initial` up to `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    /// Delay before the first reconnect attempt.
    pub initial: Duration,
    /// Upper bound for any single delay.
    pub max: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            initial: Duration::from_secs(1),
            max: Duration::from_secs(30),
        }
    }
}

impl Backoff {
    /// Delay before reconnect attempt `attempt` (0-based).
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        self.initial
            .checked_mul(1u32 << attempt.min(16))
            .map_or(self.max, |d| d.min(self.max))
    }
}

/// How a single connection ended.
enum StreamEnd {
    /// The subscriber is gone; stop without reconnecting.
    Unsubscribed,
    /// The server ended the subscription; stop without reconnecting.
    Terminated,
    /// The connection dropped. `delivered` tells whether it published
    /// anything before dropping.
    Interrupted { message: String, delivered: bool },
}

/// Pumps `first` into `sink`, reconnecting through `transport` whenever the
/// connection drops, until the subscriber goes away or the server ends the
/// subscription.
pub async fn run_stream<T: StreamTransport + ?Sized>(
    transport: Arc<T>,
    first: ByteStream,
    sink: FeedSink,
    backoff: Backoff,
) {
    let mut body = first;
    let mut attempt = 0;

    loop {
        match pump(body, &sink).await {
            StreamEnd::Unsubscribed | StreamEnd::Terminated => return,
            StreamEnd::Interrupted { message, delivered } => {
                log::warn!("Event stream interrupted: {message}");
                if !sink.send(FeedEvent::Error(message)) {
                    return;
                }
                if delivered {
                    attempt = 0;
                }
            }
        }

        body = loop {
            let delay = backoff.delay(attempt);
            attempt = attempt.saturating_add(1);
            log::debug!("Reconnecting event stream in {delay:?} (attempt {attempt})");

            tokio::select! {
                () = sink.closed() => return,
                () = tokio::time::sleep(delay) => {}
            }

            match transport.connect().await {
                Ok(body) => {
                    log::info!("Event stream reconnected");
                    break body;
                }
                Err(e @ FeedError::PermissionDenied { .. }) => {
                    log::error!("Event stream reconnect refused: {e}");
                    sink.send(FeedEvent::Error(e.to_string()));
                    return;
                }
                Err(e) => log::warn!("Event stream reconnect failed: {e}"),
            }
        };
    }
}

async fn pump(mut body: ByteStream, sink: &FeedSink) -> StreamEnd {
    let mut parser = SseParser::new();
    let mut tree = NodeTree::default();
    let mut delivered = false;

    loop {
        tokio::select! {
            () = sink.closed() => {
                log::debug!("Event stream subscriber went away");
                return StreamEnd::Unsubscribed;
            }
            chunk = body.next() => match chunk {
                Some(Ok(bytes)) => {
                    for event in parser.push(&bytes) {
                        match tree.apply(&event) {
                            StreamAction::Publish => {
                                if !sink.send(FeedEvent::Snapshot(tree.records())) {
                                    return StreamEnd::Unsubscribed;
                                }
                                delivered = true;
                            }
                            StreamAction::Fail(message) => {
                                log::warn!("Event stream reported: {message}");
                                sink.send(FeedEvent::Error(message));
                                return StreamEnd::Terminated;
                            }
                            StreamAction::Ignore => {}
                        }
                    }
                }
                Some(Err(message)) => {
                    return StreamEnd::Interrupted { message, delivered };
                }
                None => {
                    return StreamEnd::Interrupted {
                        message: "event stream closed by server".to_string(),
                        delivered,
                    };
                }
            }
        }
    }
}
