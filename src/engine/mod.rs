//! Engine seam
//!
//! The real-time engine performs all network and audio I/O. The session core
//! only talks to it through [`EngineFacade`] and receives its callbacks as
//! [`EngineEvent`] values on an [`EngineEventSender`].

pub mod codes;
pub mod events;
pub mod facade;
pub mod loopback;

pub use codes::describe;
pub use events::{
    EngineEvent, EngineEventSender, RemoteAudioReason, RemoteAudioState, UserOfflineReason,
};
pub use facade::{ChannelProfile, EngineError, EngineFacade, EngineHandle, EngineOptions};
pub use loopback::{LoopbackConfig, LoopbackEngine, RemotePeers};
