use serde::Serialize;

use crate::board::{Board, Cell, BOARD_SIZE};
use crate::session::{Highlight, Session};

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct CellView {
    pub row: usize,
    pub col: usize,
    pub symbol: String,
    pub highlight: Option<Highlight>,
    pub disabled: bool,
}

impl CellView {
    /// `cell <symbol> [highlight] [disabled]`, the class list the stylesheet keys on.
    pub fn class_name(&self) -> String {
        let mut class = format!("cell {}", self.symbol);
        if let Some(h) = self.highlight {
            class.push(' ');
            class.push_str(h.class_name());
        }
        if self.disabled {
            class.push_str(" disabled");
        }
        class
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ScoreRow {
    pub player: String,
    pub score: i64,
    pub winner: bool,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct View {
    pub player_id: String,
    pub score: String,
    pub moves_left: String,
    pub max_moves: String,
    pub cells: Vec<CellView>,
    pub scores: Vec<ScoreRow>,
    pub status_text: String,
    pub status_class: String,
    pub interactive: bool,
}

pub fn render(session: &Session) -> View {
    let interactive = session.accepts_clicks();
    let cells = match session.board() {
        Some(board) => Board::cells()
            .map(|cell| CellView {
                row: cell.row,
                col: cell.col,
                symbol: board.tile(cell).to_string(),
                highlight: session.highlight(cell),
                disabled: !interactive,
            })
            .collect(),
        None => Vec::new(),
    };
    let winner = session.winner();
    let scores = session
        .scores()
        .iter()
        .map(|(player, &score)| ScoreRow {
            player: player.clone(),
            score,
            winner: winner == Some(player.as_str()),
        })
        .collect();
    let status = session.status();
    View {
        player_id: session.player_id().unwrap_or_default().to_string(),
        score: session.own_score().to_string(),
        moves_left: session.moves_left().to_string(),
        max_moves: session.max_moves().to_string(),
        cells,
        scores,
        status_text: status.text.clone(),
        status_class: format!("status {}", status.phase.class_name()),
        interactive,
    }
}

impl View {
    pub fn cell(&self, cell: Cell) -> Option<&CellView> {
        self.cells.get(cell.row * BOARD_SIZE + cell.col)
    }

    /// Console rendering: column numbers across the top, row letters down the
    /// side, the selected cell in brackets and in-flight cells in parens.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        if !self.cells.is_empty() {
            out.push_str("   ");
            for col in 0..BOARD_SIZE {
                out.push_str(&format!(" {} ", col + 1));
            }
            out.push('\n');
            for row in self.cells.chunks(BOARD_SIZE) {
                out.push((b'A' + row[0].row as u8) as char);
                out.push_str("  ");
                for cell in row {
                    let (open, close) = match cell.highlight {
                        Some(Highlight::Selected) => ('[', ']'),
                        Some(Highlight::Processing) => ('(', ')'),
                        Some(Highlight::Valid) => ('+', '+'),
                        Some(Highlight::Invalid) => ('!', '!'),
                        None => (' ', ' '),
                    };
                    out.push(open);
                    out.push_str(&cell.symbol);
                    out.push(close);
                }
                out.push('\n');
            }
            out.push('\n');
        }
        if !self.player_id.is_empty() {
            out.push_str(&format!(
                "Player: {}  Score: {}  Moves: {}/{}\n",
                self.player_id, self.score, self.moves_left, self.max_moves
            ));
        }
        if !self.scores.is_empty() {
            let scores: Vec<String> = self
                .scores
                .iter()
                .map(|r| {
                    if r.winner {
                        format!("{}: {} *", r.player, r.score)
                    } else {
                        format!("{}: {}", r.player, r.score)
                    }
                })
                .collect();
            out.push_str(&format!("Scores: {}\n", scores.join(", ")));
        }
        let phase = self.status_class.trim_start_matches("status ");
        out.push_str(&format!("[{}] {}\n", phase, self.status_text));
        out
    }
}
