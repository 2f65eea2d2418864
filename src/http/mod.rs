//! HTTP API server for external control
//!
//! This module provides a REST API over one channel session:
//! - GET /channel - Current state and participants
//! - POST /channel/join - Join a channel
//! - POST /channel/leave - Leave the channel
//! - POST /channel/mute - Toggle microphone mute
//! - POST /channel/speaker - Toggle loudspeaker routing
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
