use serde::{Deserialize, Serialize};

use crate::ledger::DEFAULT_MAX_UPDATE_ATTEMPTS;

pub const DEFAULT_CHANNEL: &str = "bedrock";

/// Settings for a [`crate::service::BedrockService`] session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BedrockConfig {
    /// Channel every write is published on, and the one the
    /// sub-identity gets authorized for
    pub channel: String,
    /// Attempts for an aggregate update before it fails as a stale write
    pub max_update_attempts: usize,
}

impl Default for BedrockConfig {
    fn default() -> Self {
        Self {
            channel: DEFAULT_CHANNEL.to_string(),
            max_update_attempts: DEFAULT_MAX_UPDATE_ATTEMPTS,
        }
    }
}
