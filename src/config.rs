use std::{env, str::FromStr, time::Duration};

use tracing::warn;

use crate::logic::BoardParams;

#[derive(Debug, Clone)]
pub struct Config {
    pub board: BoardParams,
    /// How long a session waits for the next reaction.
    pub signal_timeout: Duration,
    pub games_per_minute: u32,
    pub cleanup_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            board: BoardParams::default(),
            signal_timeout: Duration::from_secs(60),
            games_per_minute: 10,
            cleanup_interval: Duration::from_secs(60),
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Err(_) => default,
        Ok(value) => value.trim().parse().unwrap_or_else(|_| {
            warn!("Ignoring invalid value for {}: {:?}", key, value);
            default
        }),
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            board: BoardParams {
                width: env_or("BOARD_WIDTH", defaults.board.width),
                height: env_or("BOARD_HEIGHT", defaults.board.height),
                win_on_clear: env_or("WIN_ON_CLEAR", defaults.board.win_on_clear),
            },
            signal_timeout: Duration::from_secs(env_or(
                "SIGNAL_TIMEOUT_SECONDS",
                defaults.signal_timeout.as_secs(),
            )),
            games_per_minute: env_or("RATE_LIMIT_GAMES_PER_MINUTE", defaults.games_per_minute),
            cleanup_interval: Duration::from_secs(env_or(
                "CLEANUP_INTERVAL_SECONDS",
                defaults.cleanup_interval.as_secs(),
            )),
        }
    }
}
