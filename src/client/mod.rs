pub mod config;
pub mod session;

pub use config::{
    LocomotionConfig, MotionConfig, ReceiverConfig,
    default_config_path, DEFAULT_PORT,
};
pub use session::LocomotionSession;
