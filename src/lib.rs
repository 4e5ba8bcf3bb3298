//! Bitunix futures ticker client for rotating price displays.
//!
//! Provides a REST batch fetcher with 24h change computation, a streaming
//! WebSocket feed client, and the display state machine that rotates
//! through the configured symbols while patching values in place.

pub mod app;
pub mod config;
pub mod display;
pub mod error;
pub mod models;
pub mod rest;
pub mod websocket;

pub use error::{Result, TickerError};
