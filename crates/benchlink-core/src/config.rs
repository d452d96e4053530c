//! Engine configuration
//!
//! Settings are owned by the hosting application and injected at engine
//! construction; the engine never reads configuration files itself.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::protocol::{DEFAULT_IDLE_TIMEOUT_MS, DEFAULT_TIMEOUT_MS};

/// Serial exchange settings injected into the protocol engine
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialSettings {
    /// When true, every exchange is forced to fire-and-forget: response
    /// waiting is skipped and no validator runs. Used during bench testing
    /// without a full hardware loop-back.
    pub debug_mode: bool,

    /// Total time to wait for a response when the caller gives no timeout
    pub default_timeout_ms: u64,

    /// Maximum pause between byte arrivals before a response frame is
    /// considered complete
    pub idle_timeout_ms: u64,
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            debug_mode: false,
            default_timeout_ms: DEFAULT_TIMEOUT_MS,
            idle_timeout_ms: DEFAULT_IDLE_TIMEOUT_MS,
        }
    }
}

impl SerialSettings {
    /// Default response timeout as a [`Duration`]
    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }

    /// Idle timeout as a [`Duration`]
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }
}
