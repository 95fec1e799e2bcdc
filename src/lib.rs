pub mod channel;
pub mod chat;
pub mod cleanup;
pub mod commands;
pub mod config;
pub mod data;
pub mod error;
pub mod logic;
pub mod model;
pub mod rate_limit;
pub mod registry;
pub mod routes;
pub mod score;
pub mod session;
