use std::sync::Arc;

use rand::{Rng, seq::index};
use tracing::{debug, info, instrument};

use crate::{
    data::{Board, Content, Pos, RevealState},
    error::GameError,
    score::{ScoreCounter, ScoreEvent, Tally},
};

/// Chance that a suggested free cell is shown as treasure rather than a warning.
pub const SAFE_CHANCE: f64 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    InProgress,
    Won,
    Lost,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardParams {
    pub width: usize,
    pub height: usize,
    /// End the game as won once every free cell has been suggested.
    pub win_on_clear: bool,
}

impl Default for BoardParams {
    fn default() -> Self {
        Self {
            width: 5,
            height: 5,
            win_on_clear: false,
        }
    }
}

/// Number of cells sampled per proceed step. Halves round to even.
pub fn suggested_areas(area: usize, mines: usize) -> usize {
    let half = (area.saturating_sub(mines)) as f64 / 2.0;
    (half.round_ties_even() as usize).max(1)
}

pub struct SessionController {
    board: Board,
    suggested_areas: usize,
    status: Status,
    win_on_clear: bool,
    tally: Tally,
    score: Arc<ScoreCounter>,
}

impl SessionController {
    #[instrument(level = "trace", skip(score, rng))]
    pub fn new<R: Rng + ?Sized>(
        params: BoardParams,
        mine_count: usize,
        score: Arc<ScoreCounter>,
        rng: &mut R,
    ) -> Result<Self, GameError> {
        let board = Board::new(params.width, params.height, mine_count, rng)?;
        let suggested_areas = suggested_areas(board.area(), board.mines());
        info!(
            "Creating new game: {}x{} with {} mines, {} cells suggested per step",
            board.width(),
            board.height(),
            board.mines(),
            suggested_areas
        );

        Ok(Self {
            board,
            suggested_areas,
            status: Status::InProgress,
            win_on_clear: params.win_on_clear,
            tally: Tally::default(),
            score,
        })
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn suggested_areas(&self) -> usize {
        self.suggested_areas
    }

    /// Reward/punish events recorded through this session.
    pub fn tally(&self) -> Tally {
        self.tally
    }

    /// Marks a random sample of hidden free cells as treasure or warning.
    /// Mines and cells already shown are skipped. Returns the changed cells.
    #[instrument(level = "trace", skip(self, rng))]
    pub fn reveal_safe_cells<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Vec<Pos> {
        let area = self.board.area();
        let amount = self.suggested_areas.min(area);
        let mut changed = Vec::new();

        for i in index::sample(rng, area, amount) {
            let pos = self.board.pos(i);
            if self.board.content(pos) != Some(Content::Empty)
                || self.board.reveal_state(pos) != Some(RevealState::Hidden)
            {
                continue;
            }

            let state = if rng.random::<f64>() < SAFE_CHANCE {
                RevealState::MarkedSafe
            } else {
                RevealState::MarkedRisky
            };
            if self.board.set_reveal_state(pos, state) {
                debug!("Cell ({}, {}) marked {:?}", pos.x, pos.y, state);
                changed.push(pos);
            }
        }

        debug!("Suggested {} of {} sampled cells", changed.len(), amount);
        changed
    }

    /// Ends the game as lost and records one punishment.
    pub fn declare_loss(&mut self) {
        info!("Game lost with {} mines on the board", self.board.mines());
        self.status = Status::Lost;
        self.punish_step();
    }

    /// Checks the optional win condition. Suggested cells become confirmed
    /// and one reward is recorded when the board is cleared.
    pub fn settle(&mut self) -> Status {
        if !self.win_on_clear || self.status != Status::InProgress || !self.board.is_cleared() {
            return self.status;
        }

        for i in 0..self.board.area() {
            let pos = self.board.pos(i);
            if matches!(
                self.board.reveal_state(pos),
                Some(RevealState::MarkedSafe | RevealState::MarkedRisky)
            ) {
                self.board.set_reveal_state(pos, RevealState::Confirmed);
            }
        }

        info!("Game won! All safe cells revealed.");
        self.status = Status::Won;
        self.reward_step();
        self.status
    }

    /// Counts an event already recorded in the shared counter.
    pub fn count(&mut self, event: ScoreEvent) {
        match event {
            ScoreEvent::Reward => self.tally.rewards += 1,
            ScoreEvent::Punish => self.tally.punishments += 1,
        }
    }

    pub fn apply(&mut self, event: ScoreEvent) {
        self.count(event);
        self.score.record(event);
    }

    pub fn reward_step(&mut self) {
        self.apply(ScoreEvent::Reward);
    }

    pub fn punish_step(&mut self) {
        self.apply(ScoreEvent::Punish);
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    fn controller(mines: usize, seed: u64) -> (SessionController, StdRng, Arc<ScoreCounter>) {
        let mut rng = StdRng::seed_from_u64(seed);
        let score = Arc::new(ScoreCounter::new());
        let controller =
            SessionController::new(BoardParams::default(), mines, score.clone(), &mut rng)
                .unwrap();
        (controller, rng, score)
    }

    fn states(controller: &SessionController) -> Vec<(Content, RevealState)> {
        let board = controller.board();
        (0..board.area())
            .map(|i| {
                let pos = board.pos(i);
                (
                    board.content(pos).unwrap(),
                    board.reveal_state(pos).unwrap(),
                )
            })
            .collect()
    }

    #[test]
    fn suggested_areas_follow_mine_count() {
        let (full, _, _) = controller(24, 1);
        assert_eq!(full.board().mines(), 24);
        assert_eq!(full.suggested_areas(), 1);

        let (five, _, _) = controller(5, 1);
        assert_eq!(five.suggested_areas(), 10);

        assert_eq!(suggested_areas(25, 0), 12);
        assert_eq!(suggested_areas(25, 1), 12);
        assert_eq!(suggested_areas(25, 2), 12);
        assert_eq!(suggested_areas(25, 24), 1);
    }

    #[test]
    fn starts_in_progress_with_zero_tally() {
        let (controller, _, score) = controller(5, 2);
        assert_eq!(controller.status(), Status::InProgress);
        assert_eq!(controller.tally(), Tally::default());
        assert_eq!(score.snapshot(), Tally::default());
    }

    #[test]
    fn declare_loss_punishes_once() {
        let (mut controller, _, score) = controller(5, 3);
        controller.declare_loss();
        assert_eq!(controller.status(), Status::Lost);
        assert_eq!(controller.tally().punishments, 1);
        assert_eq!(score.snapshot().punishments, 1);
        assert_eq!(score.snapshot().rewards, 0);
    }

    #[test]
    fn score_steps_reach_shared_counter() {
        let (mut controller, _, score) = controller(5, 4);
        controller.reward_step();
        controller.reward_step();
        controller.punish_step();
        assert_eq!(
            controller.tally(),
            Tally {
                rewards: 2,
                punishments: 1
            }
        );
        assert_eq!(score.snapshot(), controller.tally());
        assert_eq!(controller.status(), Status::InProgress);
    }

    #[test]
    fn counted_events_stay_out_of_shared_counter() {
        let (mut controller, _, score) = controller(5, 4);
        controller.count(ScoreEvent::Reward);
        controller.count(ScoreEvent::Punish);
        assert_eq!(
            controller.tally(),
            Tally {
                rewards: 1,
                punishments: 1
            }
        );
        assert_eq!(score.snapshot(), Tally::default());
    }

    #[test]
    fn reveal_only_marks_hidden_free_cells() {
        let (mut controller, mut rng, _) = controller(5, 5);
        let changed = controller.reveal_safe_cells(&mut rng);
        assert!(changed.len() <= 10);
        for pos in changed {
            assert_eq!(controller.board().content(pos), Some(Content::Empty));
            assert!(matches!(
                controller.board().reveal_state(pos),
                Some(RevealState::MarkedSafe | RevealState::MarkedRisky)
            ));
        }
        assert_eq!(controller.status(), Status::InProgress);
    }

    #[test]
    fn settle_is_inert_without_win_switch() {
        let (mut controller, mut rng, score) = controller(24, 6);
        while !controller.board().is_cleared() {
            controller.reveal_safe_cells(&mut rng);
        }
        assert_eq!(controller.settle(), Status::InProgress);
        assert_eq!(score.snapshot(), Tally::default());
    }

    #[test]
    fn settle_confirms_cleared_board_when_enabled() {
        let mut rng = StdRng::seed_from_u64(8);
        let score = Arc::new(ScoreCounter::new());
        let params = BoardParams {
            win_on_clear: true,
            ..BoardParams::default()
        };
        let mut controller = SessionController::new(params, 24, score.clone(), &mut rng).unwrap();

        assert_eq!(controller.settle(), Status::InProgress);
        while !controller.board().is_cleared() {
            controller.reveal_safe_cells(&mut rng);
        }
        assert_eq!(controller.settle(), Status::Won);
        assert_eq!(score.snapshot().rewards, 1);

        for (content, state) in states(&controller) {
            match content {
                Content::Mine => assert_eq!(state, RevealState::Hidden),
                Content::Empty => assert_eq!(state, RevealState::Confirmed),
            }
        }

        // A finished game is not settled twice.
        assert_eq!(controller.settle(), Status::Won);
        assert_eq!(score.snapshot().rewards, 1);
    }

    proptest! {
        #[test]
        fn board_has_clamped_mine_count(mines in 0usize..100, seed in any::<u64>()) {
            let (controller, _, _) = controller(mines, seed);
            let placed = states(&controller)
                .iter()
                .filter(|(content, _)| *content == Content::Mine)
                .count();
            prop_assert_eq!(placed, mines.min(24));
            prop_assert!(placed < 25);
        }

        #[test]
        fn reveal_never_marks_mines(mines in 0usize..30, seed in any::<u64>(), steps in 1usize..8) {
            let (mut controller, mut rng, _) = controller(mines, seed);
            for _ in 0..steps {
                controller.reveal_safe_cells(&mut rng);
            }
            for (content, state) in states(&controller) {
                if content == Content::Mine {
                    prop_assert_eq!(state, RevealState::Hidden);
                }
            }
        }

        #[test]
        fn reveal_is_monotonic(mines in 0usize..30, seed in any::<u64>(), steps in 1usize..8) {
            let (mut controller, mut rng, _) = controller(mines, seed);
            let mut before = states(&controller);
            for _ in 0..steps {
                controller.reveal_safe_cells(&mut rng);
                let after = states(&controller);
                for ((_, old), (_, new)) in before.iter().zip(&after) {
                    if *old != RevealState::Hidden {
                        prop_assert_eq!(old, new);
                    }
                }
                before = after;
            }
        }
    }
}
