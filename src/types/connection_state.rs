//! Connection state of a streaming session

use serde::{Deserialize, Serialize};

/// Whether a session still has a live socket
///
/// A session starts `Connected` and moves to `Disconnected` exactly once,
/// either on explicit close or when the server goes away. Reconnecting
/// always means starting a new session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connected,
}

impl ConnectionState {
    pub fn is_connected(self) -> bool {
        self == ConnectionState::Connected
    }
}
