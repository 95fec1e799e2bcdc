use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use async_trait::async_trait;
use dashmap::DashMap;
use rocket::futures::{SinkExt, future::join_all, stream::SplitSink};
use rocket_ws::{Message, stream::DuplexStream};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::{
    chat::{ChatSurface, MessageId},
    error::TransportError,
    model::server::ServerMessage,
};

pub type Channels = Arc<DashMap<String, Arc<WebChannel>>>;

type Stream = SplitSink<DuplexStream, Message>;

#[derive(Default)]
struct ChannelState {
    streams: HashMap<Uuid, Stream>,
    messages: HashSet<MessageId>,
}

/// A named chat room served over WebSocket. Every connected stream sees
/// every message published in the room.
pub struct WebChannel {
    name: String,
    state: Mutex<ChannelState>,
}

/// Returns the channel called `name`, creating it on first use.
pub fn open_channel(channels: &Channels, name: &str) -> Arc<WebChannel> {
    channels
        .entry(name.to_string())
        .or_insert_with(|| {
            info!("Opened channel {}", name);
            Arc::new(WebChannel::new(name))
        })
        .clone()
}

/// Sends to every stream, dropping the ones that fail.
async fn broadcast(
    streams: &mut HashMap<Uuid, Stream>,
    message: &ServerMessage,
) -> Result<(), TransportError> {
    let text = serde_json::to_string(message)?;
    let text = &text;

    let results = join_all(streams.iter_mut().map(|(id, stream)| async move {
        (*id, stream.send(Message::Text(text.clone())).await.is_ok())
    }))
    .await;

    for (id, delivered) in results {
        if !delivered {
            warn!("Dropping stream {} after failed send", id);
            streams.remove(&id);
        }
    }

    Ok(())
}

impl WebChannel {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            state: Mutex::new(ChannelState::default()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    #[instrument(level = "trace", skip(self, stream), fields(channel = %self.name))]
    pub async fn add_stream(&self, stream: Stream) -> Uuid {
        let id = Uuid::new_v4();
        let mut state = self.state.lock().await;
        state.streams.insert(id, stream);
        info!(
            "Stream {} added, total connections: {}",
            id,
            state.streams.len()
        );
        id
    }

    #[instrument(level = "trace", skip(self), fields(channel = %self.name))]
    pub async fn remove_stream(&self, id: &Uuid) {
        let mut state = self.state.lock().await;
        if state.streams.remove(id).is_some() {
            info!(
                "Stream {} removed, remaining connections: {}",
                id,
                state.streams.len()
            );
        } else {
            warn!("Attempted to remove non-existent stream: {}", id);
        }
    }

    pub async fn connections(&self) -> usize {
        self.state.lock().await.streams.len()
    }
}

#[async_trait]
impl ChatSurface for WebChannel {
    async fn send(&self, content: &str) -> Result<MessageId, TransportError> {
        let id = MessageId::new();
        let mut state = self.state.lock().await;
        state.messages.insert(id);
        broadcast(
            &mut state.streams,
            &ServerMessage::Posted {
                id,
                content: content.to_string(),
            },
        )
        .await?;
        debug!("Posted message {} in {}", id, self.name);
        Ok(id)
    }

    async fn edit(&self, message: MessageId, content: &str) -> Result<(), TransportError> {
        let mut state = self.state.lock().await;
        if !state.messages.contains(&message) {
            return Err(TransportError::UnknownMessage(message));
        }
        broadcast(
            &mut state.streams,
            &ServerMessage::Edited {
                id: message,
                content: content.to_string(),
            },
        )
        .await
    }

    async fn add_reactions(
        &self,
        message: MessageId,
        reactions: &[&str],
    ) -> Result<(), TransportError> {
        let mut state = self.state.lock().await;
        if !state.messages.contains(&message) {
            return Err(TransportError::UnknownMessage(message));
        }
        broadcast(
            &mut state.streams,
            &ServerMessage::Reacted {
                id: message,
                reactions: reactions.iter().map(|r| r.to_string()).collect(),
            },
        )
        .await
    }
}
