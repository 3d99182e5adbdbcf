//! Configuration types for the photo feed
//!
//! This module defines the configuration used to spawn a [`PhotoStore`](crate::PhotoStore).

use serde::{Deserialize, Serialize};

/// Photo store configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Base URL of the photo API (e.g. `https://api.unsplash.com`)
    ///
    /// Only checked for emptiness here. Scheme and host are checked each
    /// time a request is built, and a malformed URL surfaces as a request
    /// construction failure.
    pub base_url: String,

    /// Items requested per page
    #[serde(default = "default_per_page")]
    pub per_page: u32,

    /// Capacity of the command channel feeding the store task
    #[serde(default = "default_command_channel_capacity")]
    pub command_channel_capacity: usize,

    /// Capacity of the [`StoreEvent`](crate::StoreEvent) channel
    ///
    /// When full, new events are dropped (with a warning log).
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl StoreConfig {
    /// Create a configuration with defaults for everything but the base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            per_page: default_per_page(),
            command_channel_capacity: default_command_channel_capacity(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }

    /// Set the page size
    pub fn with_per_page(mut self, per_page: u32) -> Self {
        self.per_page = per_page;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.base_url.trim().is_empty() {
            return Err(crate::Error::config("Base URL cannot be empty"));
        }

        if self.per_page == 0 {
            return Err(crate::Error::config("per_page must be > 0"));
        }

        if self.command_channel_capacity == 0 {
            return Err(crate::Error::config("command_channel_capacity must be > 0"));
        }

        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("event_channel_capacity must be > 0"));
        }

        Ok(())
    }
}

fn default_per_page() -> u32 {
    10
}

fn default_command_channel_capacity() -> usize {
    64
}

fn default_event_channel_capacity() -> usize {
    256
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_defaults() {
        let config = StoreConfig::new("https://api.example.com");
        assert_eq!(config.per_page, 10);
        assert_ok!(config.validate());
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: StoreConfig =
            serde_json::from_str(r#"{"base_url": "https://api.example.com"}"#).unwrap();
        assert_eq!(config, StoreConfig::new("https://api.example.com"));
    }

    #[test]
    fn test_validation_failures() {
        assert_err!(StoreConfig::new("").validate());
        assert_err!(StoreConfig::new("   ").validate());
        assert_err!(StoreConfig::new("https://a").with_per_page(0).validate());

        let mut config = StoreConfig::new("https://a");
        config.event_channel_capacity = 0;
        assert_err!(config.validate());

        let mut config = StoreConfig::new("https://a");
        config.command_channel_capacity = 0;
        assert_err!(config.validate());
    }

    #[test]
    fn test_malformed_base_url_passes_validation() {
        // Checked when a request is built, not here
        assert_ok!(StoreConfig::new("ftp://api.example.com").validate());
    }
}
