//! HTTP side of the bot
//!
//! Serves the hosted verification page, the completion endpoint it posts
//! to, and a small JSON API for dashboards.

mod api;
mod pages;
mod server;

pub use server::{start_web_server, AppState};
