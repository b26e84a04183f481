//! The Telegram instance of the per-skill session runtime: implements
//! `relay_runtime`'s `ApiClient` contract (C6) plus this skill's builder
//! layer (C7), ingest loop (C8), setup wizard step (C11), and
//! representative tool handlers (C12) against the Bot API.

pub mod builders;
pub mod client;
pub mod ingest;
pub mod send;
pub mod setup;
pub mod tools;

pub use client::TelegramClient;
pub use setup::BotTokenStep;
