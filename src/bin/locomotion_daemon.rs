//! Listen for note messages and drive a simulated agent
//!
//! Run with: cargo run --bin locomotion-daemon -- --port 5054 --debug

use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::Parser;
use midi_locomotion::client::{default_config_path, LocomotionConfig};
use midi_locomotion::{Facing, LocomotionSession, Target, Vec3};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "locomotion-daemon")]
#[command(about = "Receive note messages over UDP and move a simulated agent")]
struct Args {
    /// JSON config file (defaults to ~/.midi-locomotion/config.json if present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// IPv4 address to bind, or "any"
    #[arg(long)]
    bind: Option<String>,

    #[arg(long)]
    port: Option<u16>,

    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Simulated frame rate
    #[arg(long, default_value = "60")]
    tick_hz: u32,

    /// Agent heading in degrees, clockwise from +Z
    #[arg(long, default_value = "0")]
    yaw: f32,

    #[arg(long)]
    debug: bool,
}

/// Agent with a heading and a free position
struct Avatar {
    position: Vec3,
    yaw_deg: f32,
}

impl Facing for Avatar {
    fn forward(&self) -> Vec3 {
        let yaw = self.yaw_deg.to_radians();
        Vec3::new(yaw.sin(), 0.0, yaw.cos())
    }
}

impl Target for Avatar {
    fn apply_delta(&mut self, delta: Vec3) {
        self.position += delta;
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let default_filter = if args.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with_target(false)
        .init();

    let mut config = match &args.config {
        Some(path) => LocomotionConfig::load(path)?,
        None => LocomotionConfig::load_or_default(&default_config_path())?,
    };
    if let Some(bind) = args.bind {
        config.receiver.bind_address = bind;
    }
    if let Some(port) = args.port {
        config.receiver.port = port;
    }
    if let Some(timeout_ms) = args.timeout_ms {
        config.receiver.receive_timeout_ms = timeout_ms;
    }
    config.receiver.debug |= args.debug;
    config.motion.debug |= args.debug;

    let mut session = LocomotionSession::start(config).await?;
    info!(addr = %session.local_addr(), "listening for note messages");

    let mut avatar = Avatar {
        position: Vec3::ZERO,
        yaw_deg: args.yaw,
    };

    let period = Duration::from_secs_f64(1.0 / args.tick_hz.max(1) as f64);
    let mut frames = tokio::time::interval(period);
    frames.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let mut last = Instant::now();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
            _ = frames.tick() => {}
        }

        let now = Instant::now();
        let dt = now.duration_since(last).as_secs_f32();
        last = now;

        let was_traveling = session.motion_state().is_traveling();
        let outcome = session.tick(dt, &mut avatar, None);
        if outcome.consumed.is_some() || (was_traveling && !session.motion_state().is_traveling()) {
            info!(
                position = %avatar.position,
                remaining = session.motion_state().distance_remaining,
                "agent"
            );
        }

        if !session.is_receiving() {
            warn!("receive loop exited");
            break;
        }
    }

    session.shutdown().await?;
    Ok(())
}
