use dashmap::DashMap;
use minesweeper_bot::{
    channel::Channels,
    cleanup::start_cleanup_task,
    commands::Bot,
    config::Config,
    routes::{stats, websocket_handler},
};
use rocket::{
    Build, Rocket,
    fairing::{Fairing, Info, Kind},
    routes,
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

struct CleanupFairing;

#[rocket::async_trait]
impl Fairing for CleanupFairing {
    fn info(&self) -> Info {
        Info {
            name: "Session Cleanup Task",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> rocket::fairing::Result {
        if let Some(bot) = rocket.state::<Arc<Bot>>() {
            info!("Starting cleanup task for session registry");
            let sessions = bot.sessions().clone();
            let limiter = bot.limiter().clone();
            let every = bot.config().cleanup_interval;
            tokio::spawn(async move {
                start_cleanup_task(sessions, limiter, every).await;
            });
        } else {
            warn!("Failed to get bot state for cleanup task");
        }
        Ok(rocket)
    }
}

#[rocket::launch]
fn rocket() -> Rocket<Build> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    info!("💣 Starting Minesweeper bot");

    let config = Config::from_env();
    info!(
        "Boards are {}x{}, reactions time out after {}s",
        config.board.width,
        config.board.height,
        config.signal_timeout.as_secs()
    );

    let bot = Arc::new(Bot::new(config));
    let channels: Channels = Arc::new(DashMap::new());

    rocket::build()
        .attach(CleanupFairing)
        .manage(bot)
        .manage(channels)
        .mount("/", routes![websocket_handler, stats])
}
