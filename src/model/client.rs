use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    chat::{MessageId, Requester},
    error::GameError,
};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "name")]
pub enum Command {
    /// `bombs` is kept as sent and read with [`mine_count`].
    #[serde(rename = "ms")]
    StartGame {
        #[serde(default)]
        bombs: Value,
    },
    #[serde(rename = "p")]
    Punish,
    #[serde(rename = "w")]
    Reward,
    #[serde(rename = "m")]
    Stats,
}

impl Command {
    pub fn start_game(bombs: i64) -> Self {
        Command::StartGame {
            bombs: Value::from(bombs),
        }
    }
}

/// Reads a requested mine count. Counts past `i64::MAX` saturate, since they
/// are clamped to the board anyway.
pub fn mine_count(bombs: &Value) -> Result<i64, GameError> {
    match bombs {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_u64().map(|_| i64::MAX))
            .ok_or_else(|| GameError::InvalidMineCount(n.to_string())),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| GameError::InvalidMineCount(s.clone())),
        other => Err(GameError::InvalidMineCount(other.to_string())),
    }
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(tag = "action")]
pub enum ClientMessage {
    #[serde(rename = "command")]
    Command {
        requester: Requester,
        command: Command,
    },
    #[serde(rename = "react")]
    React {
        requester: Requester,
        message: MessageId,
        reaction: String,
    },
}
