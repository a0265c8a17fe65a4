//! Client for the two-player Block Shuffle tile-swap game.
//!
//! The game logic lives on the server. This crate keeps the local view of a
//! session (`session`), turns it into something drawable (`view`) and speaks
//! the JSON message protocol (`protocol`). The browser front end in `dom` and
//! the terminal binary both drive the same `Session`.

pub mod board;
pub mod config;
pub mod error;
pub mod protocol;
pub mod session;
pub mod view;

#[cfg(target_arch = "wasm32")]
mod dom;

pub use board::{encode_cell, encode_move, is_adjacent, Board, Cell, BOARD_SIZE};
pub use config::{ClientConfig, MovePolicy, DEFAULT_SERVER_URL};
pub use error::ClientError;
pub use protocol::{BoardUpdate, ClientMessage, ServerMessage};
pub use session::{ConnectionPhase, Effect, Highlight, Input, PendingMove, Phase, Session, Status, Timer};
pub use view::{render, CellView, ScoreRow, View};

#[cfg(target_arch = "wasm32")]
pub use dom::BrowserClient;
