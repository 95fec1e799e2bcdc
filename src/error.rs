use thiserror::Error;

use crate::chat::MessageId;

/// Rejected game parameters. Surfaced to the requester as a usage reply.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GameError {
    #[error("board dimensions must be positive, got {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },
    #[error("mine count must be zero or more, got {0}")]
    NegativeMineCount(i64),
    #[error("mine count must be a whole number, got {0}")]
    InvalidMineCount(String),
}

/// Failure to talk to the chat surface. Fatal to the session that hit it.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("message {0} was never published on this surface")]
    UnknownMessage(MessageId),
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Game(#[from] GameError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("rate limit exceeded")]
    RateLimited,
}
