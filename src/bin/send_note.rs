//! Send note messages to a locomotion daemon
//!
//! Run with: cargo run --bin send-note -- 127.0.0.1:5054 --midi 60 --vel 100

use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;
use tokio::net::UdpSocket;
use tracing::info;

#[derive(Parser)]
#[command(name = "send-note")]
#[command(about = "Send note control messages over UDP")]
struct Args {
    #[arg(default_value = "127.0.0.1:5054")]
    target: SocketAddr,

    #[arg(long, default_value = "100")]
    vel: f32,

    #[arg(long, default_value = "0.5")]
    speed: f32,

    #[arg(long)]
    midi: Option<i32>,

    /// Note name sent after the `;` separator
    #[arg(long)]
    note: Option<String>,

    /// Send this text verbatim instead of building a message
    #[arg(long)]
    raw: Option<String>,

    #[arg(long, default_value = "1")]
    count: u32,

    #[arg(long, default_value = "250")]
    interval_ms: u64,
}

fn build_message(args: &Args) -> String {
    if let Some(raw) = &args.raw {
        return raw.clone();
    }
    let mut msg = format!("vel:{},speed:{}", args.vel, args.speed);
    if let Some(midi) = args.midi {
        msg.push_str(&format!(",midi:{}", midi));
    }
    if let Some(note) = &args.note {
        msg.push(';');
        msg.push_str(note);
    }
    msg
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_target(false)
        .init();

    let args = Args::parse();
    let message = build_message(&args);
    let socket = UdpSocket::bind("0.0.0.0:0").await?;

    for i in 0..args.count {
        if i > 0 {
            tokio::time::sleep(Duration::from_millis(args.interval_ms)).await;
        }
        socket.send_to(message.as_bytes(), args.target).await?;
        info!(to = %args.target, payload = %message, "sent");
    }

    Ok(())
}
