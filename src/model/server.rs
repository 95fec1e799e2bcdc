use serde::{Deserialize, Serialize};

use crate::chat::MessageId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    #[serde(rename = "posted")]
    Posted { id: MessageId, content: String },
    #[serde(rename = "edited")]
    Edited { id: MessageId, content: String },
    #[serde(rename = "reacted")]
    Reacted {
        id: MessageId,
        reactions: Vec<String>,
    },
}
