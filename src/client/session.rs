use std::net::SocketAddr;

use crate::bot::{Facing, MotionController, MotionState, Target, TickOutcome};
use crate::client::config::LocomotionConfig;
use crate::error::Result;
use crate::protocol::{mailbox, UdpReceiver};

/// Receiver and controller wired together through one mailbox
pub struct LocomotionSession {
    receiver: UdpReceiver,
    controller: MotionController,
    local_addr: SocketAddr,
}

impl LocomotionSession {
    /// Bind the listener and start receiving.
    pub async fn start(config: LocomotionConfig) -> Result<Self> {
        let (writer, reader) = mailbox::channel();
        let mut receiver = UdpReceiver::new(config.receiver, writer);
        let local_addr = receiver.start().await?;

        Ok(Self {
            receiver,
            controller: MotionController::new(config.motion, reader),
            local_addr,
        })
    }

    /// Advance motion by one frame. Never blocks.
    pub fn tick(
        &mut self,
        dt: f32,
        target: &mut dyn Target,
        facing: Option<&dyn Facing>,
    ) -> TickOutcome {
        self.controller.tick(dt, target, facing)
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn motion_state(&self) -> MotionState {
        self.controller.state()
    }

    pub fn controller_mut(&mut self) -> &mut MotionController {
        &mut self.controller
    }

    /// Whether the background receive loop is still alive
    pub fn is_receiving(&self) -> bool {
        self.receiver.is_running()
    }

    pub fn stop(&mut self) {
        self.receiver.stop();
    }

    /// Stop receiving and report any fatal receive error.
    pub async fn shutdown(mut self) -> Result<()> {
        self.receiver.stop();
        self.receiver.join().await
    }
}
