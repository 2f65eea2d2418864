//! Channel session management
//!
//! This module provides the `SessionController` that coordinates:
//! - Join/leave lifecycle of one voice channel
//! - Microphone mute and speaker routing intent
//! - Remote participants reported by the engine
//! - Ordered delivery of engine events and observer notifications

mod config;
mod controller;
mod dispatcher;
mod error;
mod participants;
mod state;

pub use config::SessionConfig;
pub use controller::{LeaveStatus, SessionController, SessionSnapshot};
pub use dispatcher::{EventDispatcher, SequencedEvent};
pub use error::{Result, SessionError};
pub use participants::{ParticipantRegistry, RemoteParticipant};
pub use state::{SessionPhase, SessionState};
