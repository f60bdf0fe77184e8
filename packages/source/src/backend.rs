//! The configured feed client, shared by the read pipeline and write-back.

use std::sync::Arc;

use crate::FeedError;
use crate::config::FeedConfig;
use crate::feed::EventFeed;
use crate::firebase::FirebaseFeed;
use crate::memory::MemoryFeed;
use crate::store::EventStore;

/// One feed client seen through both of its roles.
#[derive(Clone)]
pub struct Backend {
    /// Read side, handed to the synchronizer.
    pub feed: Arc<dyn EventFeed>,
    /// Write side, used by report and alert forms.
    pub store: Arc<dyn EventStore>,
}

impl Backend {
    /// Wraps a client implementing both roles.
    #[must_use]
    pub fn new<T: EventFeed + EventStore + 'static>(client: Arc<T>) -> Self {
        Self {
            feed: client.clone(),
            store: client,
        }
    }

    /// An empty in-process feed.
    #[must_use]
    pub fn memory() -> Self {
        Self::new(Arc::new(MemoryFeed::new()))
    }

    /// Opens a Firebase client for `config`.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError`] if the HTTP client cannot be built.
    pub fn firebase(config: FeedConfig) -> Result<Self, FeedError> {
        Ok(Self::new(Arc::new(FirebaseFeed::open(config)?)))
    }

    /// Opens the backend configured in the environment. `Ok(None)` means no
    /// database URL is set.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError`] if the configuration is invalid or the client
    /// cannot be built.
    pub fn from_env() -> Result<Option<Self>, FeedError> {
        FeedConfig::from_env()?.map(Self::firebase).transpose()
    }

    /// Short name of the client for logs.
    #[must_use]
    pub fn name(&self) -> &str {
        self.feed.name()
    }
}
