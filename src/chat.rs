use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TransportError;

/// Identity of whoever invoked a command or reacted to a message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Requester(pub String);

impl fmt::Display for Requester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Requester {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub Uuid);

impl MessageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Where a command was invoked and where its replies are published.
#[async_trait]
pub trait ChatSurface: Send + Sync {
    async fn send(&self, content: &str) -> Result<MessageId, TransportError>;

    async fn edit(&self, message: MessageId, content: &str) -> Result<(), TransportError>;

    /// Attaches selectable reactions to a published message.
    async fn add_reactions(
        &self,
        message: MessageId,
        reactions: &[&str],
    ) -> Result<(), TransportError>;
}

pub const NEW_BOARD: &str = "Here's your Minesweeper board:";
pub const SUGGESTING: &str = "Revealing safe cells and suggesting where to click:";
pub const GAME_LOST: &str = "Game lost! ❌";
pub const BOARD_CLEARED: &str = "Board cleared! ✅";
pub const TIMES_UP: &str = "Time's up! The game ended.";
pub const PUNISHING: &str = "Punishing the bot!";
/// Sent when a requester aborts their own game.
pub const ABORT_PUNISHING: &str = "Punishing the bot! Use !p";
pub const REWARDING: &str = "Rewarding the bot!";
pub const USAGE: &str = "Usage: !ms <bombs> (bombs must be zero or more)";
pub const SLOW_DOWN: &str = "You're starting games too quickly, try again in a minute.";

/// Wraps a rendered board in a fenced code block below `heading`.
pub fn board_message(heading: &str, board: &str) -> String {
    format!("{heading}\n```\n{board}\n```")
}
