pub mod config;
pub mod engine;
pub mod http;
pub mod nats;
pub mod observer;
pub mod session;

pub use config::Config;
pub use engine::{
    ChannelProfile, EngineEvent, EngineEventSender, EngineFacade, LoopbackConfig, LoopbackEngine,
    RemotePeers,
};
pub use http::{create_router, AppState};
pub use nats::{NatsClient, NatsObserver, NotificationMessage};
pub use observer::{
    ChannelObserver, Diagnostic, DiagnosticLevel, LoggingObserver, NotificationStream,
    SessionNotification, SessionObserver,
};
pub use session::{
    LeaveStatus, ParticipantRegistry, RemoteParticipant, SessionConfig, SessionController,
    SessionError, SessionPhase, SessionSnapshot, SessionState,
};
