use std::collections::BTreeMap;

use serde::Serialize;

use crate::board::{encode_move, Board, Cell, BOARD_SIZE};
use crate::config::{ClientConfig, MovePolicy};
use crate::protocol::{BoardUpdate, ClientMessage, ServerMessage};

#[derive(Clone, Copy, Serialize, Debug, PartialEq, Eq)]
pub enum Phase {
    Waiting,
    Playing,
    GameOver,
}

impl Phase {
    pub fn class_name(self) -> &'static str {
        match self {
            Phase::Waiting => "waiting",
            Phase::Playing => "playing",
            Phase::GameOver => "game-over",
        }
    }
}

#[derive(Clone, Copy, Serialize, Debug, PartialEq, Eq)]
pub enum ConnectionPhase {
    Connecting,
    Open,
    Closed,
}

#[derive(Clone, Copy, Serialize, Debug, PartialEq, Eq)]
pub enum Highlight {
    Selected,
    Processing,
    Valid,
    Invalid,
}

impl Highlight {
    pub fn class_name(self) -> &'static str {
        match self {
            Highlight::Selected => "selected",
            Highlight::Processing => "processing",
            Highlight::Valid => "valid",
            Highlight::Invalid => "invalid",
        }
    }
}

#[derive(Clone, Serialize, Debug, PartialEq, Eq)]
pub struct Status {
    pub text: String,
    pub phase: Phase,
}

impl Status {
    fn new(text: impl Into<String>, phase: Phase) -> Self {
        Self {
            text: text.into(),
            phase,
        }
    }
}

/// A move that was handed to the server and has not been answered yet.
#[derive(Clone, Serialize, Debug, PartialEq, Eq)]
pub struct PendingMove {
    pub from: Cell,
    pub to: Cell,
    pub mv: String,
    /// The tiles were already swapped on screen before sending.
    pub swapped: bool,
    /// The server accepted it and the board update is being held back until
    /// the swap animation finishes.
    pub confirmed: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Timer {
    SendMove(String),
    ClearFlash(Cell),
    ApplyUpdate(BoardUpdate),
    /// Fires after `turn_complete` if the server never reports a result.
    /// Stale once the generation it captured has moved on.
    ResultFallback { generation: u64 },
}

#[derive(Clone, Debug, PartialEq)]
pub enum Input {
    Opened,
    Closed,
    Failed(String),
    Frame(String),
    Click(Cell),
    Quit,
    Timer(Timer),
}

#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    Send(ClientMessage),
    Schedule { delay_ms: u32, timer: Timer },
    Reload,
}

pub struct Session {
    config: ClientConfig,
    connection: ConnectionPhase,
    player_id: Option<String>,
    board: Option<Board>,
    selection: Option<Cell>,
    pending: Option<PendingMove>,
    flashes: BTreeMap<Cell, Highlight>,
    scores: BTreeMap<String, i64>,
    winner: Option<String>,
    max_moves: u32,
    moves_left: u32,
    status: Status,
    locked: bool,
    generation: u64,
}

impl Session {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            connection: ConnectionPhase::Connecting,
            player_id: None,
            board: None,
            selection: None,
            pending: None,
            flashes: BTreeMap::new(),
            scores: BTreeMap::new(),
            winner: None,
            max_moves: 0,
            moves_left: 0,
            status: Status::new("Connecting to server...", Phase::Waiting),
            locked: false,
            generation: 0,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn connection(&self) -> ConnectionPhase {
        self.connection
    }

    pub fn player_id(&self) -> Option<&str> {
        self.player_id.as_deref()
    }

    pub fn board(&self) -> Option<&Board> {
        self.board.as_ref()
    }

    pub fn selection(&self) -> Option<Cell> {
        self.selection
    }

    pub fn pending(&self) -> Option<&PendingMove> {
        self.pending.as_ref()
    }

    pub fn scores(&self) -> &BTreeMap<String, i64> {
        &self.scores
    }

    pub fn own_score(&self) -> i64 {
        self.player_id
            .as_ref()
            .and_then(|id| self.scores.get(id))
            .copied()
            .unwrap_or(0)
    }

    pub fn winner(&self) -> Option<&str> {
        self.winner.as_deref()
    }

    pub fn max_moves(&self) -> u32 {
        self.max_moves
    }

    pub fn moves_left(&self) -> u32 {
        self.moves_left
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn highlight(&self, cell: Cell) -> Option<Highlight> {
        if self.selection == Some(cell) {
            return Some(Highlight::Selected);
        }
        if let Some(pending) = &self.pending {
            if !pending.confirmed && (pending.from == cell || pending.to == cell) {
                return Some(Highlight::Processing);
            }
        }
        self.flashes.get(&cell).copied()
    }

    pub fn accepts_clicks(&self) -> bool {
        self.board.is_some()
            && !self.locked
            && self.moves_left > 0
            && self.pending.is_none()
            && self.status.phase != Phase::GameOver
    }

    pub fn handle(&mut self, input: Input) -> Vec<Effect> {
        let mut fx = Vec::new();
        match input {
            Input::Opened => {
                log::info!("connected to {}", self.config.server_url);
                self.connection = ConnectionPhase::Open;
                self.status = Status::new("Connected. Waiting for the game...", Phase::Waiting);
            }
            Input::Closed => {
                log::info!("connection closed");
                self.disconnect("Connection to server lost.");
            }
            Input::Failed(reason) => {
                log::warn!("connection error: {}", reason);
                self.disconnect("Connection error.");
            }
            Input::Frame(text) => match ServerMessage::decode(&text) {
                Ok(msg) => self.receive(msg, &mut fx),
                Err(e) => log::warn!("dropping server payload: {}", e),
            },
            Input::Click(cell) => self.click(cell, &mut fx),
            Input::Quit => {
                if self.connection == ConnectionPhase::Open {
                    fx.push(Effect::Send(ClientMessage::Quit));
                }
                fx.push(Effect::Reload);
            }
            Input::Timer(timer) => self.fire(timer, &mut fx),
        }
        fx
    }

    fn disconnect(&mut self, text: &str) {
        self.connection = ConnectionPhase::Closed;
        self.locked = true;
        self.selection = None;
        self.status = Status::new(text, Phase::GameOver);
    }

    fn receive(&mut self, msg: ServerMessage, fx: &mut Vec<Effect>) {
        match msg {
            ServerMessage::Init {
                player_id,
                board,
                max_moves,
                waiting,
            } => {
                log::debug!("init as {} with {} moves", player_id, max_moves);
                self.scores.entry(player_id.clone()).or_insert(0);
                self.player_id = Some(player_id);
                self.board = Some(board);
                self.max_moves = max_moves;
                self.moves_left = max_moves;
                self.selection = None;
                self.pending = None;
                self.flashes.clear();
                self.generation += 1;
                if waiting {
                    self.status = Status::new("Waiting for another player to connect...", Phase::Waiting);
                    self.locked = self.config.lock_while_waiting;
                } else {
                    self.status = Status::new("Game started! Make your move.", Phase::Playing);
                    self.locked = false;
                }
            }
            ServerMessage::GameStart => {
                if self.status.phase != Phase::GameOver {
                    self.status = Status::new("Game started! Make your move.", Phase::Playing);
                    self.locked = false;
                }
            }
            ServerMessage::BoardUpdate(update) => self.board_update(update, fx),
            ServerMessage::TurnComplete(update) => {
                self.replace_board(&update);
                self.moves_left = 0;
                let text = update
                    .message
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| "All moves played. Waiting for the opponent...".to_string());
                self.status = Status::new(text, Phase::Waiting);
                if let Some(delay_ms) = self.config.result_timeout_ms {
                    fx.push(Effect::Schedule {
                        delay_ms,
                        timer: Timer::ResultFallback {
                            generation: self.generation,
                        },
                    });
                }
            }
            ServerMessage::GameOver { winner, scores } => {
                let text = format!("Game over! Winner: {}", winner);
                self.finish(scores, Some(winner), text);
            }
            ServerMessage::MoveError { message } => {
                let text = if message.is_empty() {
                    "Move rejected.".to_string()
                } else {
                    message
                };
                self.status = Status::new(text, Phase::Waiting);
                self.reject_pending(fx);
            }
            ServerMessage::Waiting { message } => {
                self.status = Status::new(message, Phase::Waiting);
            }
            ServerMessage::PlayerLeft { message } => {
                let text = if message.is_empty() {
                    "The other player left.".to_string()
                } else {
                    message
                };
                self.status = Status::new(text, Phase::GameOver);
                self.locked = true;
                self.selection = None;
            }
            ServerMessage::Unknown => log::debug!("ignoring unrecognized message type"),
        }
    }

    fn board_update(&mut self, update: BoardUpdate, fx: &mut Vec<Effect>) {
        let Some(pending) = self.pending.as_mut().filter(|p| !p.confirmed) else {
            self.apply_update(update);
            return;
        };
        pending.confirmed = true;
        let (from, to, swapped) = (pending.from, pending.to, pending.swapped);
        if !swapped {
            if let Some(board) = self.board.as_mut() {
                board.swap(from, to);
            }
        }
        let flash_ms = self.config.flash_ms;
        for cell in [from, to] {
            self.flashes.insert(cell, Highlight::Valid);
            fx.push(Effect::Schedule {
                delay_ms: flash_ms,
                timer: Timer::ClearFlash(cell),
            });
        }
        fx.push(Effect::Schedule {
            delay_ms: self.config.confirm_delay_ms,
            timer: Timer::ApplyUpdate(update),
        });
    }

    fn apply_update(&mut self, update: BoardUpdate) {
        self.replace_board(&update);
        self.moves_left = clamp_moves(update.moves_left);
        if let Some(message) = update.message.filter(|m| !m.is_empty()) {
            self.status = Status::new(message, Phase::Playing);
        }
    }

    fn replace_board(&mut self, update: &BoardUpdate) {
        self.board = Some(update.board.clone());
        if let Some(id) = &self.player_id {
            self.scores.insert(id.clone(), update.score);
        }
        self.selection = None;
        self.pending = None;
        self.flashes.clear();
        self.generation += 1;
    }

    fn finish(&mut self, scores: BTreeMap<String, i64>, winner: Option<String>, text: String) {
        self.scores = scores;
        self.winner = winner;
        self.status = Status::new(text, Phase::GameOver);
        self.locked = true;
        self.selection = None;
        self.pending = None;
        self.generation += 1;
    }

    fn reject_pending(&mut self, fx: &mut Vec<Effect>) {
        let Some(pending) = self.pending.take() else {
            return;
        };
        if pending.confirmed {
            // Already accepted; the held-back update still owns the board.
            self.pending = Some(pending);
            return;
        }
        if pending.swapped {
            if let Some(board) = self.board.as_mut() {
                board.swap(pending.from, pending.to);
            }
        }
        self.flashes.insert(pending.from, Highlight::Invalid);
        fx.push(Effect::Schedule {
            delay_ms: self.config.flash_ms,
            timer: Timer::ClearFlash(pending.from),
        });
    }

    fn click(&mut self, cell: Cell, fx: &mut Vec<Effect>) {
        if !self.accepts_clicks() || cell.row >= BOARD_SIZE || cell.col >= BOARD_SIZE {
            return;
        }
        match self.selection.take() {
            None => self.selection = Some(cell),
            Some(first) if first == cell => self.selection = Some(first),
            Some(first) => self.attempt_move(first, cell, fx),
        }
    }

    fn attempt_move(&mut self, from: Cell, to: Cell, fx: &mut Vec<Effect>) {
        let mv = encode_move(from.row, from.col, to.row, to.col);
        match self.config.policy {
            MovePolicy::Eager => {
                if from.is_adjacent_to(to) {
                    fx.push(Effect::Send(ClientMessage::Move { mv }));
                } else {
                    log::debug!("dropping non-adjacent pair {}", mv);
                }
            }
            MovePolicy::Confirm | MovePolicy::Optimistic => {
                let swapped = self.config.policy == MovePolicy::Optimistic;
                if swapped {
                    if let Some(board) = self.board.as_mut() {
                        board.swap(from, to);
                    }
                }
                self.flashes.remove(&from);
                self.flashes.remove(&to);
                self.pending = Some(PendingMove {
                    from,
                    to,
                    mv: mv.clone(),
                    swapped,
                    confirmed: false,
                });
                fx.push(Effect::Schedule {
                    delay_ms: self.config.send_delay_ms,
                    timer: Timer::SendMove(mv),
                });
            }
        }
    }

    fn fire(&mut self, timer: Timer, fx: &mut Vec<Effect>) {
        match timer {
            Timer::SendMove(mv) => {
                if self.connection == ConnectionPhase::Open {
                    fx.push(Effect::Send(ClientMessage::Move { mv }));
                } else {
                    log::warn!("not sending {}: connection is not open", mv);
                }
            }
            Timer::ClearFlash(cell) => {
                self.flashes.remove(&cell);
            }
            Timer::ApplyUpdate(update) => {
                // A disconnect or result during the swap animation wins.
                if self.status.phase == Phase::GameOver {
                    log::debug!("dropping held-back update, session already ended");
                    return;
                }
                self.apply_update(update);
            }
            Timer::ResultFallback { generation } => {
                if generation != self.generation || self.status.phase == Phase::GameOver {
                    return;
                }
                log::warn!("no result from the server, showing the last known scores");
                let winner = leader(&self.scores);
                let text = match &winner {
                    Some(w) => format!("Game over! Winner: {} (server result not received)", w),
                    None => "Game over! Final result not received.".to_string(),
                };
                let scores = self.scores.clone();
                self.finish(scores, winner, text);
            }
        }
    }
}

fn clamp_moves(moves: i64) -> u32 {
    moves.clamp(0, u32::MAX as i64) as u32
}

fn leader(scores: &BTreeMap<String, i64>) -> Option<String> {
    let mut best: Option<(&String, i64)> = None;
    for (player, &score) in scores {
        if best.map_or(true, |(_, s)| score > s) {
            best = Some((player, score));
        }
    }
    best.map(|(player, _)| player.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROWS: [&str; 6] = ["OXYZOX", "XYZOXY", "YZOXYZ", "ZOXYZO", "OXYZOX", "XYZOXY"];

    fn board_json(rows: &[&str; 6]) -> String {
        let rows: Vec<Vec<String>> = rows
            .iter()
            .map(|r| r.chars().map(|c| c.to_string()).collect())
            .collect();
        serde_json::to_string(&rows).unwrap()
    }

    fn init_frame(waiting: bool) -> Input {
        Input::Frame(format!(
            r#"{{"type":"init","player_id":"P1","board":{},"max_moves":3,"waiting":{}}}"#,
            board_json(&ROWS),
            waiting
        ))
    }

    fn update_frame(kind: &str, score: i64, moves_left: i64, message: &str) -> Input {
        Input::Frame(format!(
            r#"{{"type":"{}","board":{},"score":{},"moves_left":{},"message":"{}"}}"#,
            kind,
            board_json(&["ZZZZZZ"; 6]),
            score,
            moves_left,
            message
        ))
    }

    fn session(policy: MovePolicy) -> Session {
        let mut s = Session::new(ClientConfig {
            policy,
            ..ClientConfig::default()
        });
        s.handle(Input::Opened);
        s.handle(init_frame(false));
        s
    }

    fn click(s: &mut Session, row: usize, col: usize) -> Vec<Effect> {
        s.handle(Input::Click(Cell::new(row, col)))
    }

    fn scheduled(fx: &[Effect]) -> Vec<Timer> {
        fx.iter()
            .filter_map(|e| match e {
                Effect::Schedule { timer, .. } => Some(timer.clone()),
                _ => None,
            })
            .collect()
    }

    fn sent_moves(fx: &[Effect]) -> Vec<String> {
        fx.iter()
            .filter_map(|e| match e {
                Effect::Send(ClientMessage::Move { mv }) => Some(mv.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn connection_phases_drive_status() {
        let mut s = Session::new(ClientConfig::default());
        assert_eq!(s.connection(), ConnectionPhase::Connecting);
        s.handle(Input::Opened);
        assert_eq!(s.connection(), ConnectionPhase::Open);
        assert_eq!(s.status().phase, Phase::Waiting);
        s.handle(Input::Failed("refused".into()));
        assert_eq!(s.connection(), ConnectionPhase::Closed);
        assert_eq!(s.status().phase, Phase::GameOver);
        assert!(s.is_locked());
    }

    #[test]
    fn init_captures_session_and_locks_while_waiting() {
        let mut s = Session::new(ClientConfig::default());
        s.handle(Input::Opened);
        s.handle(init_frame(true));
        assert_eq!(s.player_id(), Some("P1"));
        assert_eq!(s.max_moves(), 3);
        assert_eq!(s.moves_left(), 3);
        assert_eq!(s.scores().get("P1"), Some(&0));
        assert_eq!(s.status().phase, Phase::Waiting);
        assert!(s.is_locked());
        assert!(click(&mut s, 0, 0).is_empty());
        assert_eq!(s.selection(), None);

        s.handle(Input::Frame(r#"{"type":"game_start"}"#.into()));
        assert_eq!(s.status().phase, Phase::Playing);
        assert!(!s.is_locked());
        click(&mut s, 0, 0);
        assert_eq!(s.selection(), Some(Cell::new(0, 0)));
    }

    #[test]
    fn same_cell_twice_keeps_selection_and_sends_nothing() {
        let mut s = session(MovePolicy::Eager);
        assert!(click(&mut s, 2, 3).is_empty());
        assert!(click(&mut s, 2, 3).is_empty());
        assert_eq!(s.selection(), Some(Cell::new(2, 3)));
        assert_eq!(s.highlight(Cell::new(2, 3)), Some(Highlight::Selected));
    }

    #[test]
    fn eager_sends_adjacent_pair_once() {
        let mut s = session(MovePolicy::Eager);
        click(&mut s, 1, 0);
        let fx = click(&mut s, 0, 0);
        assert_eq!(
            fx,
            vec![Effect::Send(ClientMessage::Move {
                mv: "B1 A1".to_string()
            })]
        );
        assert_eq!(s.selection(), None);
    }

    #[test]
    fn eager_drops_non_adjacent_pair_and_clears_selection() {
        let mut s = session(MovePolicy::Eager);
        click(&mut s, 0, 0);
        assert!(click(&mut s, 1, 1).is_empty());
        assert_eq!(s.selection(), None);
    }

    #[test]
    fn confirm_policy_defers_send_and_swap() {
        let mut s = session(MovePolicy::Confirm);
        click(&mut s, 0, 0);
        let fx = click(&mut s, 3, 4);
        assert!(sent_moves(&fx).is_empty());
        assert_eq!(scheduled(&fx), vec![Timer::SendMove("A1 D5".to_string())]);
        assert_eq!(s.highlight(Cell::new(0, 0)), Some(Highlight::Processing));
        assert_eq!(s.highlight(Cell::new(3, 4)), Some(Highlight::Processing));
        assert_eq!(s.board().unwrap().tile(Cell::new(0, 0)), 'O');
        // Further clicks wait for the answer.
        assert!(click(&mut s, 5, 5).is_empty());

        let fx = s.handle(Input::Timer(Timer::SendMove("A1 D5".into())));
        assert_eq!(sent_moves(&fx), vec!["A1 D5".to_string()]);

        let fx = s.handle(update_frame("board_update", 100, 2, "Nice"));
        // Swap shown right away, authoritative board applied later.
        assert_eq!(s.board().unwrap().tile(Cell::new(0, 0)), 'Z');
        assert_eq!(s.board().unwrap().tile(Cell::new(3, 4)), 'O');
        assert_eq!(s.highlight(Cell::new(0, 0)), Some(Highlight::Valid));
        assert_eq!(s.moves_left(), 3);
        let timers = scheduled(&fx);
        assert_eq!(timers.len(), 3);
        let apply = timers
            .into_iter()
            .find(|t| matches!(t, Timer::ApplyUpdate(_)))
            .unwrap();

        s.handle(Input::Timer(Timer::ClearFlash(Cell::new(0, 0))));
        assert_eq!(s.highlight(Cell::new(0, 0)), None);

        s.handle(Input::Timer(apply));
        assert_eq!(s.moves_left(), 2);
        assert_eq!(s.own_score(), 100);
        assert_eq!(s.status().text, "Nice");
        assert_eq!(s.status().phase, Phase::Playing);
        assert!(s.pending().is_none());
        assert_eq!(s.board().unwrap().tile(Cell::new(1, 1)), 'Z');
    }

    #[test]
    fn optimistic_swap_is_reverted_on_rejection() {
        let mut s = session(MovePolicy::Optimistic);
        click(&mut s, 0, 0);
        click(&mut s, 0, 1);
        assert_eq!(s.board().unwrap().tile(Cell::new(0, 0)), 'X');
        assert_eq!(s.board().unwrap().tile(Cell::new(0, 1)), 'O');

        let fx = s.handle(Input::Frame(
            r#"{"type":"move_error","message":"No match"}"#.into(),
        ));
        assert_eq!(s.board().unwrap().tile(Cell::new(0, 0)), 'O');
        assert_eq!(s.board().unwrap().tile(Cell::new(0, 1)), 'X');
        assert_eq!(s.status().text, "No match");
        assert_eq!(s.highlight(Cell::new(0, 0)), Some(Highlight::Invalid));
        assert_eq!(s.highlight(Cell::new(0, 1)), None);
        assert_eq!(scheduled(&fx), vec![Timer::ClearFlash(Cell::new(0, 0))]);
        assert!(s.accepts_clicks());
    }

    fn confirmed_update(s: &mut Session) -> Timer {
        click(s, 0, 0);
        click(s, 0, 1);
        let fx = s.handle(update_frame("board_update", 100, 2, "Valid move"));
        scheduled(&fx)
            .into_iter()
            .find(|t| matches!(t, Timer::ApplyUpdate(_)))
            .unwrap()
    }

    #[test]
    fn held_back_update_does_not_reopen_closed_session() {
        let mut s = session(MovePolicy::Confirm);
        let apply = confirmed_update(&mut s);
        s.handle(Input::Closed);
        s.handle(Input::Timer(apply));
        assert_eq!(s.status().text, "Connection to server lost.");
        assert_eq!(s.status().phase, Phase::GameOver);
        assert!(!s.accepts_clicks());
    }

    #[test]
    fn held_back_update_does_not_override_player_left() {
        let mut s = session(MovePolicy::Optimistic);
        let apply = confirmed_update(&mut s);
        s.handle(Input::Frame(
            r#"{"type":"player_left","message":"Opponent left"}"#.into(),
        ));
        s.handle(Input::Timer(apply));
        assert_eq!(s.status().text, "Opponent left");
        assert_eq!(s.status().phase, Phase::GameOver);
        assert!(!s.accepts_clicks());
    }

    #[test]
    fn confirm_rejection_clears_processing_without_swap() {
        let mut s = session(MovePolicy::Confirm);
        click(&mut s, 0, 0);
        click(&mut s, 0, 1);
        let fx = s.handle(Input::Frame(
            r#"{"type":"move_error","message":"No match"}"#.into(),
        ));
        assert_eq!(s.board().unwrap().tile(Cell::new(0, 0)), 'O');
        assert_eq!(s.board().unwrap().tile(Cell::new(0, 1)), 'X');
        assert_eq!(s.highlight(Cell::new(0, 0)), Some(Highlight::Invalid));
        assert_eq!(s.highlight(Cell::new(0, 1)), None);
        assert!(s.pending().is_none());
        assert_eq!(scheduled(&fx), vec![Timer::ClearFlash(Cell::new(0, 0))]);
        assert_eq!(s.status().text, "No match");
        assert_eq!(s.status().phase, Phase::Waiting);
        assert!(s.accepts_clicks());
        click(&mut s, 2, 2);
        assert_eq!(s.selection(), Some(Cell::new(2, 2)));
    }

    #[test]
    fn eager_move_error_only_changes_status() {
        let mut s = session(MovePolicy::Eager);
        click(&mut s, 0, 0);
        click(&mut s, 0, 1);
        let board = s.board().cloned();
        let fx = s.handle(Input::Frame(
            r#"{"type":"move_error","message":"No match"}"#.into(),
        ));
        assert!(fx.is_empty());
        assert_eq!(s.board().cloned(), board);
        assert_eq!(s.status().text, "No match");
        assert!(Board::cells().all(|c| s.highlight(c).is_none()));
        assert_eq!(s.moves_left(), 3);
        assert!(s.accepts_clicks());
    }

    #[test]
    fn optimistic_confirmation_does_not_swap_twice() {
        let mut s = session(MovePolicy::Optimistic);
        click(&mut s, 0, 0);
        click(&mut s, 0, 1);
        s.handle(update_frame("board_update", 100, 2, ""));
        assert_eq!(s.board().unwrap().tile(Cell::new(0, 0)), 'X');
    }

    #[test]
    fn turn_complete_forces_zero_moves_and_blocks_clicks() {
        let mut s = session(MovePolicy::Eager);
        let fx = s.handle(update_frame("turn_complete", 300, 2, "Done"));
        assert_eq!(s.moves_left(), 0);
        assert_eq!(s.status().phase, Phase::Waiting);
        assert_eq!(
            scheduled(&fx),
            vec![Timer::ResultFallback {
                generation: s.generation()
            }]
        );
        assert!(click(&mut s, 0, 0).is_empty());
        assert!(click(&mut s, 0, 1).is_empty());
        assert_eq!(s.selection(), None);
    }

    #[test]
    fn result_fallback_synthesizes_game_over() {
        let mut s = session(MovePolicy::Confirm);
        let fx = s.handle(update_frame("turn_complete", 300, 0, ""));
        let timer = scheduled(&fx).remove(0);
        s.handle(Input::Timer(timer));
        assert_eq!(s.status().phase, Phase::GameOver);
        assert_eq!(s.winner(), Some("P1"));
        assert!(s.status().text.contains("P1"));
    }

    #[test]
    fn stale_result_fallback_is_ignored() {
        let mut s = session(MovePolicy::Confirm);
        let fx = s.handle(update_frame("turn_complete", 300, 0, ""));
        let timer = scheduled(&fx).remove(0);
        s.handle(Input::Frame(
            r#"{"type":"game_over","winner":"P2","scores":{"P1":300,"P2":450}}"#.into(),
        ));
        s.handle(Input::Timer(timer));
        assert_eq!(s.winner(), Some("P2"));
        assert_eq!(s.status().text, "Game over! Winner: P2");
    }

    #[test]
    fn game_over_replaces_scores_and_names_winner() {
        let mut s = session(MovePolicy::Eager);
        s.handle(Input::Frame(
            r#"{"type":"game_over","winner":"P1","scores":{"P1":10,"P2":7}}"#.into(),
        ));
        assert_eq!(s.scores().len(), 2);
        assert_eq!(s.scores().get("P2"), Some(&7));
        assert_eq!(s.winner(), Some("P1"));
        assert!(s.status().text.contains("P1"));
        assert_eq!(s.status().phase, Phase::GameOver);
        assert!(!s.accepts_clicks());
    }

    #[test]
    fn negative_moves_left_clamps_to_zero() {
        let mut s = session(MovePolicy::Eager);
        s.handle(update_frame("board_update", 0, -4, ""));
        assert_eq!(s.moves_left(), 0);
    }

    #[test]
    fn unknown_and_malformed_frames_change_nothing() {
        let mut s = session(MovePolicy::Eager);
        click(&mut s, 4, 4);
        let before = (
            s.board().cloned(),
            s.selection(),
            s.status().clone(),
            s.moves_left(),
            s.generation(),
        );
        assert!(s.handle(Input::Frame(r#"{"type":"emote","face":":)"}"#.into())).is_empty());
        assert!(s.handle(Input::Frame("{not json".into())).is_empty());
        let after = (
            s.board().cloned(),
            s.selection(),
            s.status().clone(),
            s.moves_left(),
            s.generation(),
        );
        assert_eq!(before, after);
    }

    #[test]
    fn player_left_is_terminal() {
        let mut s = session(MovePolicy::Eager);
        s.handle(Input::Frame(
            r#"{"type":"player_left","message":"Opponent disconnected"}"#.into(),
        ));
        assert_eq!(s.status().phase, Phase::GameOver);
        assert_eq!(s.status().text, "Opponent disconnected");
        assert!(click(&mut s, 0, 0).is_empty());
    }

    #[test]
    fn waiting_message_only_changes_status() {
        let mut s = session(MovePolicy::Eager);
        s.handle(Input::Frame(
            r#"{"type":"waiting","message":"Hold on"}"#.into(),
        ));
        assert_eq!(s.status().text, "Hold on");
        assert_eq!(s.moves_left(), 3);
    }

    #[test]
    fn quit_sends_then_reloads() {
        let mut s = session(MovePolicy::Eager);
        assert_eq!(
            s.handle(Input::Quit),
            vec![Effect::Send(ClientMessage::Quit), Effect::Reload]
        );
        s.handle(Input::Closed);
        assert_eq!(s.handle(Input::Quit), vec![Effect::Reload]);
    }

    #[test]
    fn delayed_send_is_dropped_after_disconnect() {
        let mut s = session(MovePolicy::Confirm);
        click(&mut s, 0, 0);
        click(&mut s, 0, 1);
        s.handle(Input::Closed);
        assert!(s.handle(Input::Timer(Timer::SendMove("A1 A2".into()))).is_empty());
    }

    #[test]
    fn leader_prefers_first_of_equal_scores() {
        let mut scores = BTreeMap::new();
        scores.insert("player1".to_string(), 200);
        scores.insert("player2".to_string(), 200);
        scores.insert("player3".to_string(), 100);
        assert_eq!(leader(&scores).as_deref(), Some("player1"));
        assert_eq!(leader(&BTreeMap::new()), None);
    }
}
