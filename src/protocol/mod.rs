pub mod mailbox;
pub mod receiver;
pub mod transport;

pub use mailbox::{MailboxReader, MailboxWriter};
pub use receiver::{RawMessage, UdpReceiver};
pub use transport::{
    DatagramSource, bind_reusable, local_ipv4_addrs, resolve_bind_addr,
    MAX_DATAGRAM_SIZE, RECV_BUFFER_SIZE,
};
