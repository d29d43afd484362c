//! Relay lifecycle states.
//!
//! # State Transitions
//! ```text
//! Stopped → Starting: start()
//! Starting → Running: subscriptions and drain loop up
//! Starting → Stopped: start failed (e.g. no chain connection)
//! Running → Stopping: stop()
//! Stopping → Stopped: drain loop joined, subscriptions cancelled
//! ```

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RelayState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

impl RelayState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelayState::Stopped => "stopped",
            RelayState::Starting => "starting",
            RelayState::Running => "running",
            RelayState::Stopping => "stopping",
        }
    }
}

impl fmt::Display for RelayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
