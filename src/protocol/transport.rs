use std::future::Future;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
#[cfg(unix)]
use std::os::unix::io::{AsRawFd, FromRawFd};

use tokio::net::UdpSocket;

use crate::error::{Error, Result};

/// Largest payload a single UDP datagram can carry
pub const MAX_DATAGRAM_SIZE: usize = 65_507;

/// Kernel receive buffer requested for listening sockets
pub const RECV_BUFFER_SIZE: usize = 1 << 20;

/// Anything the receive loop can pull datagrams from
pub trait DatagramSource: Send + Sync {
    fn recv_datagram<'a>(
        &'a self,
        buf: &'a mut [u8],
    ) -> impl Future<Output = std::io::Result<(usize, SocketAddr)>> + Send + 'a;
}

impl DatagramSource for UdpSocket {
    fn recv_datagram<'a>(
        &'a self,
        buf: &'a mut [u8],
    ) -> impl Future<Output = std::io::Result<(usize, SocketAddr)>> + Send + 'a {
        self.recv_from(buf)
    }
}

/// Parse a configured bind address.
///
/// `"any"`, `"0.0.0.0"` and blank strings bind every interface; anything
/// else must be an IPv4 literal.
pub fn resolve_bind_addr(host: &str, port: u16) -> Result<SocketAddrV4> {
    let host = host.trim();
    let ip = if host.is_empty() || host.eq_ignore_ascii_case("any") {
        Ipv4Addr::UNSPECIFIED
    } else {
        host.parse::<Ipv4Addr>()
            .map_err(|e| Error::InvalidAddress(format!("{}: {}", host, e)))?
    };
    Ok(SocketAddrV4::new(ip, port))
}

/// Bind a UDP socket with address reuse enabled and an enlarged receive
/// buffer. Must be called from inside a tokio runtime.
///
/// Socket options are only applied on unix. Elsewhere this is a plain
/// bind, so a restart can hit "address in use" until the old socket is
/// released.
pub fn bind_reusable(addr: SocketAddrV4) -> Result<UdpSocket> {
    let std_socket = bind_std(addr).map_err(|e| Error::Bind {
        addr: addr.to_string(),
        reason: e.to_string(),
    })?;
    std_socket.set_nonblocking(true)?;
    Ok(UdpSocket::from_std(std_socket)?)
}

#[cfg(unix)]
fn bind_std(addr: SocketAddrV4) -> std::io::Result<std::net::UdpSocket> {
    // SO_REUSEADDR only takes effect if set before bind(), which std and
    // tokio don't expose, so the socket is assembled by hand.
    let fd = unsafe { libc::socket(libc::AF_INET, libc::SOCK_DGRAM, 0) };
    if fd < 0 {
        return Err(std::io::Error::last_os_error());
    }
    // Owns the fd from here on; dropping it on an error path closes it.
    let socket = unsafe { std::net::UdpSocket::from_raw_fd(fd) };

    set_int_option(&socket, libc::SO_REUSEADDR, 1)?;
    // Best-effort: the kernel may clamp or refuse a large buffer.
    let _ = set_int_option(&socket, libc::SO_RCVBUF, RECV_BUFFER_SIZE as libc::c_int);

    let mut sin: libc::sockaddr_in = unsafe { std::mem::zeroed() };
    #[cfg(any(target_os = "macos", target_os = "ios", target_os = "freebsd", target_os = "openbsd", target_os = "netbsd"))]
    {
        sin.sin_len = std::mem::size_of::<libc::sockaddr_in>() as u8;
    }
    sin.sin_family = libc::AF_INET as libc::sa_family_t;
    sin.sin_port = addr.port().to_be();
    sin.sin_addr = libc::in_addr {
        s_addr: u32::from(*addr.ip()).to_be(),
    };

    let rc = unsafe {
        libc::bind(
            socket.as_raw_fd(),
            &sin as *const libc::sockaddr_in as *const libc::sockaddr,
            std::mem::size_of::<libc::sockaddr_in>() as libc::socklen_t,
        )
    };
    if rc != 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(socket)
}

#[cfg(unix)]
fn set_int_option(
    socket: &std::net::UdpSocket,
    option: libc::c_int,
    value: libc::c_int,
) -> std::io::Result<()> {
    let rc = unsafe {
        libc::setsockopt(
            socket.as_raw_fd(),
            libc::SOL_SOCKET,
            option,
            &value as *const _ as *const libc::c_void,
            std::mem::size_of::<libc::c_int>() as libc::socklen_t,
        )
    };
    if rc != 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(not(unix))]
fn bind_std(addr: SocketAddrV4) -> std::io::Result<std::net::UdpSocket> {
    std::net::UdpSocket::bind(addr)
}

/// IPv4 addresses of every local interface, loopback included.
#[cfg(unix)]
pub fn local_ipv4_addrs() -> Result<Vec<Ipv4Addr>> {
    let mut head: *mut libc::ifaddrs = std::ptr::null_mut();
    if unsafe { libc::getifaddrs(&mut head) } != 0 {
        return Err(std::io::Error::last_os_error().into());
    }

    let mut addrs = Vec::new();
    let mut cur = head;
    while !cur.is_null() {
        let ifa = unsafe { &*cur };
        if !ifa.ifa_addr.is_null()
            && unsafe { (*ifa.ifa_addr).sa_family } as libc::c_int == libc::AF_INET
        {
            let sin = unsafe { &*(ifa.ifa_addr as *const libc::sockaddr_in) };
            addrs.push(Ipv4Addr::from(u32::from_be(sin.sin_addr.s_addr)));
        }
        cur = ifa.ifa_next;
    }
    unsafe { libc::freeifaddrs(head) };
    Ok(addrs)
}

#[cfg(not(unix))]
pub fn local_ipv4_addrs() -> Result<Vec<Ipv4Addr>> {
    Ok(Vec::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_bind_addr() {
        assert_eq!(
            resolve_bind_addr("any", 5054).unwrap(),
            SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 5054)
        );
        assert_eq!(
            resolve_bind_addr("  ", 1).unwrap(),
            SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 1)
        );
        assert_eq!(
            resolve_bind_addr("127.0.0.1", 9000).unwrap(),
            SocketAddrV4::new(Ipv4Addr::LOCALHOST, 9000)
        );
        let any = tokio_test::assert_ok!(resolve_bind_addr("0.0.0.0", 0));
        assert!(any.ip().is_unspecified());
        assert!(matches!(
            resolve_bind_addr("not-an-ip", 9000),
            Err(Error::InvalidAddress(_))
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_second_bind_while_first_is_held() {
        let first = bind_reusable(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 0)).unwrap();
        let addr = match first.local_addr().unwrap() {
            SocketAddr::V4(v4) => v4,
            other => panic!("unexpected address {other}"),
        };

        // Without SO_REUSEADDR the port is taken.
        assert!(std::net::UdpSocket::bind(addr).is_err());

        let second = bind_reusable(addr).unwrap();
        assert_eq!(second.local_addr().unwrap().port(), addr.port());
        assert_eq!(first.local_addr().unwrap().port(), addr.port());
    }

    #[cfg(unix)]
    #[test]
    fn test_local_ipv4_addrs_include_loopback() {
        let addrs = local_ipv4_addrs().unwrap();
        assert!(addrs.contains(&Ipv4Addr::LOCALHOST), "{addrs:?}");
        assert!(addrs.iter().all(|ip| !ip.is_unspecified()));
    }
}
