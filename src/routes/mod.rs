use std::sync::Arc;

use rocket::{State, futures::StreamExt, get, serde::json::Json};
use rocket_ws::{Channel, Message, WebSocket};
use tracing::{debug, error, info, instrument, warn};

use crate::{
    channel::{Channels, open_channel},
    commands::Bot,
    model::client::ClientMessage,
    score::Tally,
    session::Selection,
};

#[get("/stats")]
pub fn stats(bot: &State<Arc<Bot>>) -> Json<Tally> {
    Json(bot.score().snapshot())
}

#[get("/ws?<channel>")]
#[instrument(level = "trace", skip(ws, channels, bot, channel), fields(channel = %channel))]
pub fn websocket_handler(
    ws: WebSocket,
    channels: &State<Channels>,
    bot: &State<Arc<Bot>>,
    channel: String,
) -> Channel<'static> {
    let surface = open_channel(channels, &channel);
    let bot = bot.inner().clone();

    ws.channel(move |stream| {
        Box::pin(async move {
            let (write, mut read) = stream.split();
            let stream_id = surface.add_stream(write).await;

            info!(
                "Client connected to channel {} (stream: {})",
                surface.name(),
                stream_id
            );

            while let Some(message) = read.next().await {
                match message {
                    Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                        Ok(ClientMessage::Command { requester, command }) => {
                            if let Err(e) = bot.dispatch(surface.clone(), requester, command).await
                            {
                                error!("Command failed in channel {}: {}", surface.name(), e);
                            }
                        }
                        Ok(ClientMessage::React {
                            requester,
                            message,
                            reaction,
                        }) => {
                            let selection = Selection {
                                requester,
                                reaction,
                            };
                            if !bot.react(message, selection) {
                                debug!("Reaction on inactive message {}, ignoring", message);
                            }
                        }
                        Err(e) => {
                            warn!(
                                "Invalid message format in channel {}: {} - Error: {}",
                                surface.name(),
                                text,
                                e
                            );
                        }
                    },
                    Ok(Message::Close(_)) => {
                        info!(
                            "WebSocket connection closed for channel {} (stream: {})",
                            surface.name(),
                            stream_id
                        );
                        break;
                    }
                    Err(e) => {
                        error!(
                            "WebSocket error in channel {} (stream: {}): {}",
                            surface.name(),
                            stream_id,
                            e
                        );
                        break;
                    }
                    _ => {
                        debug!("Received non-text message in channel {}, ignoring", surface.name());
                    }
                }
            }

            surface.remove_stream(&stream_id).await;

            info!(
                "Client disconnected from channel {} (stream: {})",
                surface.name(),
                stream_id
            );
            Ok(())
        })
    })
}
