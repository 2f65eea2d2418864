use anyhow::Result;
use serde::Deserialize;
use std::time::Duration;

use crate::engine::{ChannelProfile, LoopbackConfig};
use crate::session::SessionConfig;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub engine: EngineConfig,
    #[serde(default)]
    pub session: SessionSettings,
    #[serde(default)]
    pub nats: NatsConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct EngineConfig {
    pub app_id: String,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub channel_profile: ChannelProfile,
    /// Requested local uid; 0 lets the engine assign one
    #[serde(default)]
    pub local_uid: u32,
    #[serde(default = "default_join_latency_ms")]
    pub join_latency_ms: u64,
    #[serde(default = "default_leave_latency_ms")]
    pub leave_latency_ms: u64,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    pub optional_info: String,
    pub speaker_default: bool,
    pub command_queue: usize,
    pub join_timeout_ms: Option<u64>,
    pub leave_timeout_ms: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        let defaults = SessionConfig::default();
        Self {
            optional_info: defaults.optional_info,
            speaker_default: defaults.speaker_default,
            command_queue: defaults.command_queue,
            join_timeout_ms: defaults.join_timeout.map(|t| t.as_millis() as u64),
            leave_timeout_ms: defaults.leave_timeout.as_millis() as u64,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct NatsConfig {
    pub enabled: bool,
    pub url: String,
}

impl Default for NatsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: "nats://localhost:4222".to_string(),
        }
    }
}

fn default_join_latency_ms() -> u64 {
    50
}

fn default_leave_latency_ms() -> u64 {
    20
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("VOICE_CHANNEL").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Per-session settings for a new controller
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            app_id: self.engine.app_id.clone(),
            channel_profile: self.engine.channel_profile,
            access_token: self.engine.access_token.clone(),
            optional_info: self.session.optional_info.clone(),
            uid: self.engine.local_uid,
            speaker_default: self.session.speaker_default,
            command_queue: self.session.command_queue,
            join_timeout: self.session.join_timeout_ms.map(Duration::from_millis),
            leave_timeout: Duration::from_millis(self.session.leave_timeout_ms),
            ..SessionConfig::default()
        }
    }

    pub fn loopback_config(&self) -> LoopbackConfig {
        LoopbackConfig {
            join_latency: Duration::from_millis(self.engine.join_latency_ms),
            leave_latency: Duration::from_millis(self.engine.leave_latency_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_minimal_config_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("voice.toml");
        fs::write(
            &path,
            r#"
[service]
name = "voice-channel"

[service.http]
bind = "127.0.0.1"
port = 8090

[engine]
app_id = "demo-app"
"#,
        )
        .unwrap();

        let cfg = Config::load(path.to_str().unwrap()).unwrap();
        assert_eq!(cfg.service.http.port, 8090);
        assert_eq!(cfg.engine.channel_profile, ChannelProfile::Communication);
        assert!(!cfg.nats.enabled);

        let session = cfg.session_config();
        assert_eq!(session.app_id, "demo-app");
        assert_eq!(session.uid, 0);
        assert_eq!(session.join_timeout, None);
        assert!(session.session_id.starts_with("voice-session-"));
    }

    #[test]
    fn test_load_full_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("voice.toml");
        fs::write(
            &path,
            r#"
[service]
name = "voice-channel"

[service.http]
bind = "0.0.0.0"
port = 9000

[engine]
app_id = "demo-app"
access_token = "secret"
channel_profile = "live_broadcasting"
local_uid = 42
join_latency_ms = 5
leave_latency_ms = 6

[session]
optional_info = "info"
speaker_default = true
command_queue = 4
join_timeout_ms = 250
leave_timeout_ms = 100

[nats]
enabled = true
url = "nats://example:4222"
"#,
        )
        .unwrap();

        let cfg = Config::load(path.to_str().unwrap()).unwrap();
        let session = cfg.session_config();
        assert_eq!(session.access_token.as_deref(), Some("secret"));
        assert_eq!(session.channel_profile, ChannelProfile::LiveBroadcasting);
        assert_eq!(session.uid, 42);
        assert!(session.speaker_default);
        assert_eq!(session.command_queue, 4);
        assert_eq!(session.join_timeout, Some(Duration::from_millis(250)));
        assert_eq!(session.leave_timeout, Duration::from_millis(100));

        let loopback = cfg.loopback_config();
        assert_eq!(loopback.join_latency, Duration::from_millis(5));
        assert_eq!(loopback.leave_latency, Duration::from_millis(6));
        assert_eq!(cfg.nats.url, "nats://example:4222");
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(Config::load("/nonexistent/voice-channel").is_err());
    }
}
