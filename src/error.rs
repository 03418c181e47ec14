#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid bind address: {0}")]
    InvalidAddress(String),

    #[error("failed to bind {addr}: {reason}")]
    Bind { addr: String, reason: String },

    #[error("receiver already started")]
    AlreadyStarted,

    #[error("receive loop failed: {0}")]
    ReceiveLoop(String),

    #[error("receiver task failed: {0}")]
    ReceiverTaskFailed(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(String),
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
