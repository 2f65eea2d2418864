use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;
use voice_channel::{
    create_router, AppState, ChannelObserver, Config, LoggingObserver, LoopbackEngine,
    NatsClient, NatsObserver, NotificationStream, SessionController, SessionNotification,
    SessionPhase,
};

#[derive(Parser)]
#[command(name = "voice-channel", about = "Voice-only channel session controller")]
struct Cli {
    /// Configuration file (extension optional)
    #[arg(short, long, default_value = "config/voice-channel")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the HTTP control API
    Serve,
    /// Run a scripted session against the loopback engine
    Demo {
        /// Channel to join
        #[arg(long, default_value = "room1")]
        channel: String,
        /// Number of simulated remote users
        #[arg(long, default_value_t = 2)]
        remote_users: u32,
    },
    /// Print the notifications another session publishes on NATS
    Watch {
        /// Session to follow
        session_id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;

    info!("Voice Channel v{}", env!("CARGO_PKG_VERSION"));
    info!("Loaded config: {}", cfg.service.name);

    match cli.command {
        Command::Serve => serve(cfg).await,
        Command::Demo {
            channel,
            remote_users,
        } => demo(cfg, channel, remote_users).await,
        Command::Watch { session_id } => watch(cfg, session_id).await,
    }
}

async fn start_controller(cfg: &Config, engine: LoopbackEngine) -> Result<SessionController> {
    let session_config = cfg.session_config();
    let session_id = session_config.session_id.clone();
    let controller = SessionController::spawn(Box::new(engine), session_config);

    controller.subscribe(Arc::new(LoggingObserver)).await?;

    if cfg.nats.enabled {
        let client = NatsClient::connect(&cfg.nats.url, session_id).await?;
        controller.subscribe(NatsObserver::spawn(client)).await?;
    }

    Ok(controller)
}

async fn serve(cfg: Config) -> Result<()> {
    let engine = LoopbackEngine::new(cfg.loopback_config());
    let controller = start_controller(&cfg, engine).await?;

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("HTTP server listening on {}", addr);

    axum::serve(listener, create_router(AppState::new(controller.clone())))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await
        .context("HTTP server failed")?;

    controller.shutdown().await?;
    Ok(())
}

async fn demo(cfg: Config, channel: String, remote_users: u32) -> Result<()> {
    let engine = LoopbackEngine::new(cfg.loopback_config());
    let peers = engine.remote_peers();
    let controller = start_controller(&cfg, engine).await?;

    let (observer, mut notifications) = ChannelObserver::new();
    controller.subscribe(Arc::new(observer)).await?;

    controller.request_join(channel.as_str()).await?;
    wait_for_phase(&mut notifications, SessionPhase::Joined).await?;

    let remote_uids: Vec<u32> = (1..=remote_users).map(|n| 1000 + n).collect();
    for &uid in &remote_uids {
        peers.join(uid);
    }
    if let Some(&first) = remote_uids.first() {
        peers.freeze(first);
        peers.set_muted(first, true);
    }
    // Lost network: the engine reports a lookup timeout before the user drops
    peers.warn(104);

    info!("Microphone muted: {}", controller.toggle_mute().await?);
    info!("Loudspeaker enabled: {}", controller.toggle_speaker().await?);
    info!("Microphone muted: {}", controller.toggle_mute().await?);

    if let Some((&last, rest)) = remote_uids.split_last() {
        peers.drop_out(last);
        for &uid in rest {
            peers.leave(uid);
        }
    }

    let snapshot = controller.snapshot().await?;
    info!("Snapshot before leaving: {}", serde_json::to_string(&snapshot)?);

    controller.request_leave().await?;
    wait_for_phase(&mut notifications, SessionPhase::Idle).await?;

    controller.shutdown().await?;
    info!("Demo finished");
    Ok(())
}

async fn watch(cfg: Config, session_id: String) -> Result<()> {
    if !cfg.nats.enabled {
        bail!("NATS is disabled in the configuration");
    }

    let client = NatsClient::connect(&cfg.nats.url, session_id.clone()).await?;
    {
        let notifications = client.subscribe_notifications(&session_id).await?;
        tokio::pin!(notifications);

        loop {
            tokio::select! {
                message = notifications.next() => {
                    let Some(message) = message else {
                        break;
                    };
                    info!(
                        "#{} {} {}",
                        message.sequence,
                        message.notification.kind(),
                        serde_json::to_string(&message.notification)?
                    );
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }
    }

    client.close().await
}

async fn wait_for_phase(notifications: &mut NotificationStream, phase: SessionPhase) -> Result<()> {
    let wait = async {
        while let Some(notification) = notifications.recv().await {
            if let SessionNotification::StateChanged(state) = notification {
                if state.phase == phase {
                    return true;
                }
            }
        }
        false
    };

    match tokio::time::timeout(Duration::from_secs(15), wait).await {
        Ok(true) => Ok(()),
        Ok(false) => bail!("Session closed before reaching {:?}", phase),
        Err(_) => bail!("Timed out waiting for {:?}", phase),
    }
}
