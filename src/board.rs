use serde::{Deserialize, Serialize};

use crate::error::ClientError;

pub const BOARD_SIZE: usize = 6;

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Cell {
    pub row: usize,
    pub col: usize,
}

impl Cell {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Parses `"B3"` style notation: row letter first, 1-based column second.
    pub fn parse(text: &str) -> Result<Cell, ClientError> {
        let invalid = || ClientError::InvalidCell(text.to_string());
        let mut chars = text.trim().chars();
        let letter = chars.next().ok_or_else(invalid)?.to_ascii_uppercase();
        let digits = chars.as_str();
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let number: usize = digits.parse().map_err(|_| invalid())?;
        if !letter.is_ascii_uppercase() {
            return Err(invalid());
        }
        let row = (letter as u8 - b'A') as usize;
        if row >= BOARD_SIZE || number == 0 || number > BOARD_SIZE {
            return Err(invalid());
        }
        Ok(Cell::new(row, number - 1))
    }

    pub fn is_adjacent_to(self, other: Cell) -> bool {
        is_adjacent(self.row, self.col, other.row, other.col)
    }
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&encode_cell(*self))
    }
}

// The row is the letter and the column the number, the reverse of chess
// notation. The server parses it this way.
pub fn encode_cell(cell: Cell) -> String {
    format!("{}{}", (b'A' + cell.row as u8) as char, cell.col + 1)
}

pub fn encode_move(row1: usize, col1: usize, row2: usize, col2: usize) -> String {
    format!(
        "{} {}",
        encode_cell(Cell::new(row1, col1)),
        encode_cell(Cell::new(row2, col2))
    )
}

pub fn is_adjacent(row1: usize, col1: usize, row2: usize, col2: usize) -> bool {
    let dr = row1.abs_diff(row2);
    let dc = col1.abs_diff(col2);
    (dr == 1 && dc == 0) || (dr == 0 && dc == 1)
}

/// Server-owned 6×6 tile grid. Travels as an array of rows of one-character
/// strings.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(try_from = "Vec<Vec<String>>", into = "Vec<Vec<String>>")]
pub struct Board {
    tiles: [[char; BOARD_SIZE]; BOARD_SIZE],
}

impl Board {
    pub fn from_tiles(tiles: [[char; BOARD_SIZE]; BOARD_SIZE]) -> Self {
        Self { tiles }
    }

    pub fn tile(&self, cell: Cell) -> char {
        self.tiles[cell.row][cell.col]
    }

    pub fn rows(&self) -> &[[char; BOARD_SIZE]; BOARD_SIZE] {
        &self.tiles
    }

    pub fn swap(&mut self, a: Cell, b: Cell) {
        let tmp = self.tiles[a.row][a.col];
        self.tiles[a.row][a.col] = self.tiles[b.row][b.col];
        self.tiles[b.row][b.col] = tmp;
    }

    pub fn cells() -> impl Iterator<Item = Cell> {
        (0..BOARD_SIZE).flat_map(|row| (0..BOARD_SIZE).map(move |col| Cell::new(row, col)))
    }
}

impl TryFrom<Vec<Vec<String>>> for Board {
    type Error = ClientError;

    fn try_from(rows: Vec<Vec<String>>) -> Result<Self, Self::Error> {
        if rows.len() != BOARD_SIZE {
            return Err(ClientError::InvalidBoard(format!(
                "expected {} rows, got {}",
                BOARD_SIZE,
                rows.len()
            )));
        }
        let mut tiles = [[' '; BOARD_SIZE]; BOARD_SIZE];
        for (r, row) in rows.iter().enumerate() {
            if row.len() != BOARD_SIZE {
                return Err(ClientError::InvalidBoard(format!(
                    "row {} has {} tiles",
                    r,
                    row.len()
                )));
            }
            for (c, symbol) in row.iter().enumerate() {
                let mut chars = symbol.chars();
                match (chars.next(), chars.next()) {
                    (Some(ch), None) => tiles[r][c] = ch,
                    _ => {
                        return Err(ClientError::InvalidBoard(format!(
                            "tile {} is {:?}, expected a single symbol",
                            encode_cell(Cell::new(r, c)),
                            symbol
                        )));
                    }
                }
            }
        }
        Ok(Board { tiles })
    }
}

impl From<Board> for Vec<Vec<String>> {
    fn from(board: Board) -> Self {
        board
            .tiles
            .iter()
            .map(|row| row.iter().map(|ch| ch.to_string()).collect())
            .collect()
    }
}
