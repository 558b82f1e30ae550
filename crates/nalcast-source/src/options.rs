//! Tunables for a byte-source session.

use std::time::Duration;

#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

/// What to do with a queue item larger than the decoder's read buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serialize", serde(rename_all = "lowercase"))]
pub enum OversizePolicy {
    /// Keep the unread tail and serve it before polling again.
    #[default]
    Retain,
    /// Discard the unread tail.
    Truncate,
}

/// Session configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct SourceOptions {
    /// Upper bound on a single queue wait, in milliseconds.
    #[cfg_attr(feature = "serialize", serde(default = "default_poll_timeout_ms"))]
    pub poll_timeout_ms: u64,

    #[cfg_attr(feature = "serialize", serde(default))]
    pub oversize: OversizePolicy,

    /// Items longer than this fail the read.
    #[cfg_attr(feature = "serialize", serde(default = "default_max_item_len"))]
    pub max_item_len: usize,
}

fn default_poll_timeout_ms() -> u64 {
    100
}

fn default_max_item_len() -> usize {
    8 * 1024 * 1024
}

impl SourceOptions {
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }

    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_oversize(mut self, policy: OversizePolicy) -> Self {
        self.oversize = policy;
        self
    }

    pub fn with_max_item_len(mut self, max: usize) -> Self {
        self.max_item_len = max;
        self
    }
}

impl Default for SourceOptions {
    fn default() -> Self {
        Self {
            poll_timeout_ms: default_poll_timeout_ms(),
            oversize: OversizePolicy::default(),
            max_item_len: default_max_item_len(),
        }
    }
}
