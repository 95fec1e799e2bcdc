use std::fmt;

use rand::Rng;
use tracing::{debug, instrument};

use crate::error::GameError;

/// Ground truth of a cell, fixed when the board is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Content {
    Empty,
    Mine,
}

/// What the players currently see for a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RevealState {
    #[default]
    Hidden,
    /// Suggested as a treasure.
    MarkedSafe,
    /// Suggested, but flagged as possible danger.
    MarkedRisky,
    Confirmed,
}

/// The fixed set of glyphs a board renders to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tile {
    Blank,
    Mine,
    Treasure,
    Warning,
    Check,
}

impl Tile {
    pub const fn glyph(self) -> &'static str {
        match self {
            Tile::Blank => "⬜",
            Tile::Mine => "💣",
            Tile::Treasure => "💰",
            Tile::Warning => "⭕",
            Tile::Check => "✅",
        }
    }

    pub fn from_glyph(glyph: &str) -> Option<Self> {
        [
            Tile::Blank,
            Tile::Mine,
            Tile::Treasure,
            Tile::Warning,
            Tile::Check,
        ]
        .into_iter()
        .find(|tile| tile.glyph() == glyph)
    }
}

impl From<Content> for Tile {
    fn from(value: Content) -> Self {
        match value {
            Content::Empty => Tile::Blank,
            Content::Mine => Tile::Mine,
        }
    }
}

impl From<RevealState> for Tile {
    fn from(value: RevealState) -> Self {
        match value {
            RevealState::Hidden => Tile::Blank,
            RevealState::MarkedSafe => Tile::Treasure,
            RevealState::MarkedRisky => Tile::Warning,
            RevealState::Confirmed => Tile::Check,
        }
    }
}

impl fmt::Display for Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.glyph())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pos {
    pub x: usize,
    pub y: usize,
}

#[derive(Debug)]
pub struct Board {
    width: usize,
    height: usize,
    mines: usize,
    cells: Vec<Content>,
    revealed: Vec<RevealState>,
}

/// Picks exactly `mines` of `length` cells, each subset equally likely.
fn generate_mines<R: Rng + ?Sized>(length: u32, mines: u32, rng: &mut R) -> Vec<Content> {
    let mut cells = Vec::with_capacity(length as usize);

    let mut mines_left = mines;
    for cells_left in (1..=length).rev() {
        let mine = rng.random_ratio(mines_left, cells_left);
        if mine {
            mines_left -= 1;
            cells.push(Content::Mine);
        } else {
            cells.push(Content::Empty);
        }
    }

    cells
}

impl Board {
    /// Builds a board with `mine_count` clamped so at least one cell stays free.
    /// The cell count must fit in a `u32`.
    #[instrument(level = "trace", skip(rng))]
    pub fn new<R: Rng + ?Sized>(
        width: usize,
        height: usize,
        mine_count: usize,
        rng: &mut R,
    ) -> Result<Self, GameError> {
        if width == 0 || height == 0 {
            return Err(GameError::InvalidDimensions { width, height });
        }

        let Some(length) = width
            .checked_mul(height)
            .and_then(|area| u32::try_from(area).ok())
        else {
            return Err(GameError::InvalidDimensions { width, height });
        };

        let max_mines = length - 1;
        let mines = u32::try_from(mine_count).map_or(max_mines, |count| count.min(max_mines));
        if mines as usize != mine_count {
            debug!("Clamped mine count from {} to {}", mine_count, mines);
        }

        Ok(Self {
            width,
            height,
            mines: mines as usize,
            cells: generate_mines(length, mines, rng),
            revealed: vec![RevealState::Hidden; length as usize],
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn area(&self) -> usize {
        self.width * self.height
    }

    pub fn mines(&self) -> usize {
        self.mines
    }

    pub fn pos(&self, index: usize) -> Pos {
        Pos {
            x: index % self.width,
            y: index / self.width,
        }
    }

    fn index(&self, pos: Pos) -> Option<usize> {
        (pos.x < self.width && pos.y < self.height).then(|| pos.x + pos.y * self.width)
    }

    pub fn content(&self, pos: Pos) -> Option<Content> {
        self.index(pos).map(|index| self.cells[index])
    }

    pub fn reveal_state(&self, pos: Pos) -> Option<RevealState> {
        self.index(pos).map(|index| self.revealed[index])
    }

    /// Updates the visible state of a cell. Refuses to show a mine as safe.
    pub(crate) fn set_reveal_state(&mut self, pos: Pos, state: RevealState) -> bool {
        let Some(index) = self.index(pos) else {
            return false;
        };

        if self.cells[index] == Content::Mine && state == RevealState::MarkedSafe {
            return false;
        }

        self.revealed[index] = state;
        true
    }

    /// True once every mine-free cell has left `Hidden`.
    pub fn is_cleared(&self) -> bool {
        self.cells
            .iter()
            .zip(&self.revealed)
            .all(|(content, state)| *content == Content::Mine || *state != RevealState::Hidden)
    }

    pub fn tile(&self, pos: Pos, reveal_all: bool) -> Option<Tile> {
        let index = self.index(pos)?;
        let state = self.revealed[index];
        if reveal_all && state == RevealState::Hidden {
            Some(self.cells[index].into())
        } else {
            Some(state.into())
        }
    }

    /// Rows separated by newlines, glyphs by single spaces.
    pub fn render(&self, reveal_all: bool) -> String {
        (0..self.height)
            .map(|y| {
                (0..self.width)
                    .filter_map(|x| self.tile(Pos { x, y }, reveal_all))
                    .map(Tile::glyph)
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    fn parse(rendered: &str) -> Vec<Vec<Tile>> {
        rendered
            .lines()
            .map(|row| {
                row.split(' ')
                    .map(|glyph| Tile::from_glyph(glyph).expect("unknown glyph"))
                    .collect()
            })
            .collect()
    }

    fn count_mines(board: &Board) -> usize {
        (0..board.area())
            .filter(|&i| board.content(board.pos(i)) == Some(Content::Mine))
            .count()
    }

    #[test]
    fn rejects_empty_dimensions() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(
            Board::new(0, 5, 3, &mut rng).unwrap_err(),
            GameError::InvalidDimensions {
                width: 0,
                height: 5
            }
        );
        assert!(Board::new(5, 0, 3, &mut rng).is_err());
    }

    #[test]
    fn rejects_dimensions_whose_area_overflows() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(
            Board::new(usize::MAX, 2, 0, &mut rng).unwrap_err(),
            GameError::InvalidDimensions {
                width: usize::MAX,
                height: 2
            }
        );
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn rejects_areas_past_u32() {
        let mut rng = StdRng::seed_from_u64(1);
        let width = 1 << 20;
        let height = 1 << 13;
        assert_eq!(
            Board::new(width, height, 3, &mut rng).unwrap_err(),
            GameError::InvalidDimensions { width, height }
        );
    }

    #[test]
    fn clamps_mines_to_leave_one_free_cell() {
        let mut rng = StdRng::seed_from_u64(7);
        let board = Board::new(5, 5, 100, &mut rng).unwrap();
        assert_eq!(board.mines(), 24);
        assert_eq!(count_mines(&board), 24);
        assert!(!board.is_cleared());

        let board = Board::new(5, 5, usize::MAX, &mut rng).unwrap();
        assert_eq!(board.mines(), 24);
    }

    #[test]
    fn places_exact_mine_count() {
        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let board = Board::new(5, 5, 5, &mut rng).unwrap();
            assert_eq!(count_mines(&board), 5);
        }
    }

    #[test]
    fn single_cell_board_has_no_mines() {
        let mut rng = StdRng::seed_from_u64(3);
        let board = Board::new(1, 1, 1, &mut rng).unwrap();
        assert_eq!(board.mines(), 0);
        assert_eq!(board.render(true), "⬜");
    }

    #[test]
    fn hidden_render_shows_only_blanks() {
        let mut rng = StdRng::seed_from_u64(11);
        let board = Board::new(5, 5, 12, &mut rng).unwrap();
        let tiles = parse(&board.render(false));
        assert_eq!(tiles.len(), 5);
        assert!(tiles.iter().all(|row| row.len() == 5));
        assert!(tiles.iter().flatten().all(|tile| *tile == Tile::Blank));
    }

    #[test]
    fn reveal_all_exposes_only_hidden_cells() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut board = Board::new(3, 2, 2, &mut rng).unwrap();
        let empty = (0..board.area())
            .map(|i| board.pos(i))
            .find(|pos| board.content(*pos) == Some(Content::Empty))
            .unwrap();
        assert!(board.set_reveal_state(empty, RevealState::MarkedRisky));

        let tiles = parse(&board.render(true));
        for y in 0..board.height() {
            for x in 0..board.width() {
                let pos = Pos { x, y };
                let expected = if pos == empty {
                    Tile::Warning
                } else {
                    board.content(pos).unwrap().into()
                };
                assert_eq!(tiles[y][x], expected);
            }
        }
        assert_eq!(parse(&board.render(false))[empty.y][empty.x], Tile::Warning);
    }

    #[test]
    fn mines_are_never_marked_safe() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut board = Board::new(2, 2, 3, &mut rng).unwrap();
        let mine = (0..board.area())
            .map(|i| board.pos(i))
            .find(|pos| board.content(*pos) == Some(Content::Mine))
            .unwrap();
        assert!(!board.set_reveal_state(mine, RevealState::MarkedSafe));
        assert_eq!(board.reveal_state(mine), Some(RevealState::Hidden));
        assert!(!board.set_reveal_state(Pos { x: 2, y: 0 }, RevealState::Confirmed));
    }

    #[test]
    fn glyph_table_is_stable() {
        assert_eq!(Tile::from(RevealState::Hidden).glyph(), "⬜");
        assert_eq!(Tile::from(Content::Mine).glyph(), "💣");
        assert_eq!(Tile::from(RevealState::MarkedSafe).glyph(), "💰");
        assert_eq!(Tile::from(RevealState::MarkedRisky).glyph(), "⭕");
        assert_eq!(Tile::from(RevealState::Confirmed).glyph(), "✅");
        assert_eq!(Tile::from_glyph("🙂"), None);
    }
}
