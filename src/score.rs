use std::{
    fmt,
    sync::{Mutex, PoisonError},
};

use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub rewards: u64,
    pub punishments: u64,
}

impl Tally {
    pub fn total(&self) -> u64 {
        self.rewards + self.punishments
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreEvent {
    Reward,
    Punish,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Percentage {
    NoData,
    Ratio {
        percentage: f64,
        rewards: u64,
        total: u64,
    },
}

impl fmt::Display for Percentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Percentage::NoData => f.write_str("Bot has not been rewarded or punished yet."),
            Percentage::Ratio {
                percentage,
                rewards,
                total,
            } => write!(
                f,
                "Bot Reward Percentage: {percentage:.2}% ({rewards} times rewarded / {total} total commands used)"
            ),
        }
    }
}

/// Process-wide reward/punish tally shared by every session and command.
#[derive(Debug, Default)]
pub struct ScoreCounter {
    tally: Mutex<Tally>,
}

impl ScoreCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, event: ScoreEvent) {
        let mut tally = self.tally.lock().unwrap_or_else(PoisonError::into_inner);
        match event {
            ScoreEvent::Reward => tally.rewards += 1,
            ScoreEvent::Punish => tally.punishments += 1,
        }
        debug!(
            "Recorded {:?}: {} rewards, {} punishments",
            event, tally.rewards, tally.punishments
        );
    }

    pub fn record_reward(&self) {
        self.record(ScoreEvent::Reward);
    }

    pub fn record_punish(&self) {
        self.record(ScoreEvent::Punish);
    }

    pub fn snapshot(&self) -> Tally {
        *self.tally.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn percentage(&self) -> Percentage {
        let tally = self.snapshot();
        let total = tally.total();
        if total == 0 {
            return Percentage::NoData;
        }

        Percentage::Ratio {
            percentage: tally.rewards as f64 / total as f64 * 100.0,
            rewards: tally.rewards,
            total,
        }
    }
}
