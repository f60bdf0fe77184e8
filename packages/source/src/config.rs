//! Feed client configuration from the environment.

use reqwest::Url;
use thiserror::Error;

/// Environment variable holding the database URL. Unset means no backend.
pub const DATABASE_URL_ENV: &str = "CITY_PULSE_DATABASE_URL";

/// Environment variable overriding the feed node name.
pub const FEED_NODE_ENV: &str = "CITY_PULSE_FEED_NODE";

/// Environment variable holding an optional auth token.
pub const AUTH_TOKEN_ENV: &str = "CITY_PULSE_AUTH_TOKEN";

/// Node read when no override is configured.
pub const DEFAULT_FEED_NODE: &str = "events-citypulse";

/// Invalid feed configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The database URL did not parse.
    #[error("invalid database URL {url:?}: {message}")]
    InvalidUrl {
        /// The rejected URL.
        url: String,
        /// Parse failure.
        message: String,
    },

    /// The database URL is not HTTP(S).
    #[error("unsupported URL scheme {scheme:?} (expected http or https)")]
    UnsupportedScheme {
        /// The rejected scheme.
        scheme: String,
    },

    /// The node name is empty or contains path characters.
    #[error("invalid feed node {node:?}")]
    InvalidNode {
        /// The rejected node name.
        node: String,
    },
}

/// Where the event feed lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedConfig {
    database_url: Url,
    node: String,
    auth_token: Option<String>,
}

impl FeedConfig {
    /// Creates a config for the default node.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the URL is invalid or not HTTP(S).
    pub fn new(database_url: &str) -> Result<Self, ConfigError> {
        let url = Url::parse(database_url).map_err(|e| ConfigError::InvalidUrl {
            url: database_url.to_string(),
            message: e.to_string(),
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::UnsupportedScheme {
                scheme: url.scheme().to_string(),
            });
        }

        Ok(Self {
            database_url: url,
            node: DEFAULT_FEED_NODE.to_string(),
            auth_token: None,
        })
    }

    /// Overrides the node name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidNode`] if the name is empty or contains
    /// characters the feed does not allow in keys.
    pub fn with_node(mut self, node: &str) -> Result<Self, ConfigError> {
        let node = node.trim_matches('/');
        let invalid = node.is_empty()
            || node
                .chars()
                .any(|c| matches!(c, '.' | '$' | '#' | '[' | ']' | '/') || c.is_control());
        if invalid {
            return Err(ConfigError::InvalidNode {
                node: node.to_string(),
            });
        }
        self.node = node.to_string();
        Ok(self)
    }

    /// Sets the auth token sent as the `auth` query parameter.
    #[must_use]
    pub fn with_auth_token(mut self, token: Option<String>) -> Self {
        self.auth_token = token.filter(|t| !t.is_empty());
        self
    }

    /// Reads the configuration from the environment.
    ///
    /// Returns `Ok(None)` when no database URL is configured, which callers
    /// treat as "no backend".
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a configured value is invalid.
    pub fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(url) = std::env::var(DATABASE_URL_ENV)
            .ok()
            .filter(|u| !u.trim().is_empty())
        else {
            return Ok(None);
        };

        let mut config = Self::new(url.trim())?;
        if let Ok(node) = std::env::var(FEED_NODE_ENV) {
            config = config.with_node(&node)?;
        }
        Ok(Some(config.with_auth_token(std::env::var(AUTH_TOKEN_ENV).ok())))
    }

    /// The configured node name.
    #[must_use]
    pub fn node(&self) -> &str {
        &self.node
    }

    /// REST URL of the node, or of one child when `key` is given.
    ///
    /// Path segments are percent-encoded and any query already on the
    /// database URL (e.g. the emulator's `ns`) is kept.
    #[must_use]
    pub fn node_url(&self, key: Option<&str>) -> Url {
        let mut url = self.database_url.clone();

        // Only http(s) URLs are accepted, and those always have a path.
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty();
            match key {
                None => {
                    segments.push(&format!("{}.json", self.node));
                }
                Some(key) => {
                    segments.push(&self.node).push(&format!("{key}.json"));
                }
            }
        }

        if let Some(token) = &self.auth_token {
            url.query_pairs_mut().append_pair("auth", token);
        }
        url
    }
}
