#![allow(dead_code)]

use std::sync::Mutex;

use async_trait::async_trait;
use minesweeper_bot::{
    chat::{ChatSurface, MessageId},
    data::Tile,
    error::TransportError,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Sent(MessageId, String),
    Edited(MessageId, String),
    Reacted(MessageId, Vec<String>),
}

/// Records everything published to it.
#[derive(Default)]
pub struct RecordingSurface {
    events: Mutex<Vec<Event>>,
    fail_edits: bool,
    fail_reactions: bool,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_edits() -> Self {
        Self {
            fail_edits: true,
            ..Self::default()
        }
    }

    pub fn failing_reactions() -> Self {
        Self {
            fail_reactions: true,
            ..Self::default()
        }
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn sent(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Event::Sent(_, content) => Some(content),
                _ => None,
            })
            .collect()
    }

    pub fn edits(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Event::Edited(_, content) => Some(content),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl ChatSurface for RecordingSurface {
    async fn send(&self, content: &str) -> Result<MessageId, TransportError> {
        let id = MessageId::new();
        self.events
            .lock()
            .unwrap()
            .push(Event::Sent(id, content.to_string()));
        Ok(id)
    }

    async fn edit(&self, message: MessageId, content: &str) -> Result<(), TransportError> {
        if self.fail_edits {
            return Err(TransportError::UnknownMessage(message));
        }
        self.events
            .lock()
            .unwrap()
            .push(Event::Edited(message, content.to_string()));
        Ok(())
    }

    async fn add_reactions(
        &self,
        message: MessageId,
        reactions: &[&str],
    ) -> Result<(), TransportError> {
        if self.fail_reactions {
            return Err(TransportError::UnknownMessage(message));
        }
        self.events.lock().unwrap().push(Event::Reacted(
            message,
            reactions.iter().map(|r| r.to_string()).collect(),
        ));
        Ok(())
    }
}

/// Extracts the grid from a message built by `board_message`.
pub fn grid(content: &str) -> Vec<Vec<Tile>> {
    content
        .split("```")
        .nth(1)
        .expect("message has no board")
        .trim()
        .lines()
        .map(|row| {
            row.split(' ')
                .map(|glyph| Tile::from_glyph(glyph).expect("unknown glyph"))
                .collect()
        })
        .collect()
}

pub fn count(grid: &[Vec<Tile>], tile: Tile) -> usize {
    grid.iter().flatten().filter(|t| **t == tile).count()
}
