use serde::{Deserialize, Serialize};

pub const DEFAULT_SERVER_URL: &str = "ws://localhost:8765";

/// How the second click of a move is turned into a request.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MovePolicy {
    /// Check adjacency locally and send at once; non-adjacent pairs are dropped.
    Eager,
    /// Send any pair after a short delay and animate the swap only once the
    /// server confirms it.
    Confirm,
    /// Like `Confirm`, but swap the tiles on screen before sending and undo
    /// the swap if the server rejects the move.
    Optimistic,
}

impl Default for MovePolicy {
    fn default() -> Self {
        MovePolicy::Confirm
    }
}

impl std::str::FromStr for MovePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "eager" => Ok(MovePolicy::Eager),
            "confirm" => Ok(MovePolicy::Confirm),
            "optimistic" => Ok(MovePolicy::Optimistic),
            other => Err(format!(
                "unknown move policy {:?} (expected eager, confirm or optimistic)",
                other
            )),
        }
    }
}

#[derive(Clone, Serialize, Deserialize, Debug)]
#[serde(default)]
pub struct ClientConfig {
    pub server_url: String,
    pub policy: MovePolicy,
    pub send_delay_ms: u32,
    pub confirm_delay_ms: u32,
    pub flash_ms: u32,
    /// Wait window after `turn_complete` before a local result is shown.
    /// `None` waits for the server forever.
    pub result_timeout_ms: Option<u32>,
    pub lock_while_waiting: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            policy: MovePolicy::default(),
            send_delay_ms: 300,
            confirm_delay_ms: 1000,
            flash_ms: 500,
            result_timeout_ms: Some(10_000),
            lock_while_waiting: true,
        }
    }
}
