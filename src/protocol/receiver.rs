use std::net::SocketAddr;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::client::ReceiverConfig;
use crate::error::{Error, Result};
use crate::protocol::mailbox::MailboxWriter;
use crate::protocol::transport::{
    bind_reusable, local_ipv4_addrs, resolve_bind_addr, DatagramSource, MAX_DATAGRAM_SIZE,
};

/// Number of leading bytes shown in debug packet dumps
const HEX_HEAD_LEN: usize = 24;

/// One received datagram
#[derive(Debug, Clone)]
pub struct RawMessage {
    pub payload: Bytes,
    pub from: SocketAddr,
}

impl RawMessage {
    /// Payload as trimmed UTF-8 text
    pub fn text(&self) -> std::result::Result<&str, std::str::Utf8Error> {
        std::str::from_utf8(&self.payload).map(str::trim)
    }

    fn hex_head(&self) -> String {
        self.payload
            .iter()
            .take(HEX_HEAD_LEN)
            .map(|b| format!("{:02X}", b))
            .collect::<Vec<_>>()
            .join("-")
    }
}

/// Background UDP listener feeding the mailbox
///
/// The receive loop runs on its own tokio task. Each datagram is decoded
/// as text and published to the mailbox, replacing anything the consumer
/// has not picked up yet.
pub struct UdpReceiver {
    config: ReceiverConfig,
    writer: Option<MailboxWriter>,
    shutdown: Option<watch::Sender<bool>>,
    task: Option<JoinHandle<Result<()>>>,
    local_addr: Option<SocketAddr>,
}

impl UdpReceiver {
    pub fn new(config: ReceiverConfig, writer: MailboxWriter) -> Self {
        Self {
            config,
            writer: Some(writer),
            shutdown: None,
            task: None,
            local_addr: None,
        }
    }

    /// Bind the socket and spawn the receive loop.
    ///
    /// Returns the bound address, which differs from the configured one
    /// when port 0 was requested.
    pub async fn start(&mut self) -> Result<SocketAddr> {
        let bind_addr = resolve_bind_addr(&self.config.bind_address, self.config.port)?;
        let writer = self.writer.take().ok_or(Error::AlreadyStarted)?;

        // Lets senders pick the right address when the host has several.
        match local_ipv4_addrs() {
            Ok(addrs) => {
                for ip in addrs {
                    info!(addr = %ip, "local IPv4");
                }
            }
            Err(e) => debug!(error = %e, "could not list local interfaces"),
        }

        let socket = match bind_reusable(bind_addr) {
            Ok(socket) => socket,
            Err(e) => {
                self.writer = Some(writer);
                return Err(e);
            }
        };
        let local_addr = socket.local_addr()?;
        info!(addr = %local_addr, "UDP bound");

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let timeout = self.config.receive_timeout();
        let show_debug = self.config.debug;

        self.task = Some(tokio::spawn(receive_loop(
            socket,
            writer,
            shutdown_rx,
            timeout,
            show_debug,
        )));
        self.shutdown = Some(shutdown_tx);
        self.local_addr = Some(local_addr);
        Ok(local_addr)
    }

    /// Ask the receive loop to exit. Safe to call repeatedly or before
    /// `start`.
    pub fn stop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            // The loop may already be gone after a fatal error.
            let _ = shutdown.send(true);
            if self.config.debug {
                info!("receiver stopped");
            }
        }
    }

    /// Whether the receive loop is still alive
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Wait for the receive loop to finish and surface its outcome.
    ///
    /// Only the first call observes a fatal error; later calls return `Ok`.
    pub async fn join(&mut self) -> Result<()> {
        match self.task.take() {
            Some(task) => task
                .await
                .map_err(|e| Error::ReceiverTaskFailed(e.to_string()))?,
            None => Ok(()),
        }
    }
}

impl Drop for UdpReceiver {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(true);
        }
    }
}

async fn receive_loop<S: DatagramSource>(
    socket: S,
    writer: MailboxWriter,
    mut shutdown: watch::Receiver<bool>,
    timeout: Duration,
    show_debug: bool,
) -> Result<()> {
    let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
    let mut seen_sender = false;

    loop {
        let received = tokio::select! {
            biased;
            // Also fires if the receiver handle was dropped.
            _ = shutdown.changed() => break,
            r = tokio::time::timeout(timeout, socket.recv_datagram(&mut buf)) => r,
        };

        let (len, from) = match received {
            Err(_) => {
                if show_debug {
                    debug!("waiting for UDP packets (no data in last timeout window)");
                }
                continue;
            }
            Ok(Ok(received)) => received,
            Ok(Err(e)) => {
                if *shutdown.borrow() {
                    break;
                }
                error!(error = %e, "receive loop failed");
                return Err(Error::ReceiveLoop(e.to_string()));
            }
        };

        if len == 0 {
            continue;
        }

        let message = RawMessage {
            payload: Bytes::copy_from_slice(&buf[..len]),
            from,
        };

        if !seen_sender {
            seen_sender = true;
            info!(sender = %message.from, "UDP active");
        }

        if show_debug {
            debug!(bytes = len, head = %message.hex_head(), "RX");
        }

        let text = match message.text() {
            Ok(text) => text,
            Err(e) => {
                warn!(sender = %message.from, error = %e, "UTF-8 decode failed, dropping datagram");
                continue;
            }
        };

        if text.is_empty() {
            continue;
        }

        if show_debug {
            debug!(text, "RX text");
        }

        if writer.publish(text.to_string()) && show_debug {
            debug!("replaced unconsumed message");
        }
    }

    Ok(())
}
