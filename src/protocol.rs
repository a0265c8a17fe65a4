use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::board::Board;
use crate::error::ClientError;

/// Payload shared by `board_update` and `turn_complete`.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct BoardUpdate {
    pub board: Board,
    pub score: i64,
    pub moves_left: i64,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub total_moves: Option<u32>,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Init {
        player_id: String,
        board: Board,
        max_moves: u32,
        #[serde(default)]
        waiting: bool,
    },
    GameStart,
    BoardUpdate(BoardUpdate),
    TurnComplete(BoardUpdate),
    GameOver {
        winner: String,
        scores: BTreeMap<String, i64>,
    },
    MoveError {
        #[serde(default)]
        message: String,
    },
    Waiting {
        #[serde(default)]
        message: String,
    },
    PlayerLeft {
        #[serde(default)]
        message: String,
    },
    #[serde(other)]
    Unknown,
}

impl ServerMessage {
    pub fn decode(text: &str) -> Result<ServerMessage, ClientError> {
        Ok(serde_json::from_str(text)?)
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Move {
        #[serde(rename = "move")]
        mv: String,
    },
    Quit,
}

impl ClientMessage {
    pub fn encode(&self) -> String {
        // Both variants are plain strings; serialization cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}
