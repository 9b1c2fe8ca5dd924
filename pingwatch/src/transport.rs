//! Raw ICMP sockets: creation, privilege drop, and the send/receive calls
//! the event loop drives. Packet encoding/decoding itself lives in
//! `pingwatch_core::wire`; this module is the syscall glue around it,
//! following `cjjeakle-network-monitor`'s `socket2`-based raw socket setup
//! (that example builds one `SOCK_RAW`/`IPPROTO_ICMP` socket per client
//! thread; here one of each address family is opened once, up front, and
//! shared across all targets).

use std::mem::MaybeUninit;
use std::net::{IpAddr, SocketAddr};
use std::os::unix::io::{AsRawFd, RawFd};

use socket2::{Domain, Protocol, SockAddr, Socket, Type};

use pingwatch_core::wire::{self, EchoRequest};
use pingwatch_core::TimeVal;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("cannot open raw {family} socket: {source}")]
    OpenSocket { family: &'static str, source: std::io::Error },
}

/// Owns the two raw sockets (v4/v6), opened once at startup while still
/// privileged.
pub struct Sockets {
    v4: Socket,
    v6: Socket,
}

impl Sockets {
    pub fn open() -> Result<Self, TransportError> {
        let v4 = Socket::new(Domain::IPV4, Type::RAW, Some(Protocol::ICMPV4))
            .map_err(|source| TransportError::OpenSocket { family: "IPv4", source })?;
        let v6 = Socket::new(Domain::IPV6, Type::RAW, Some(Protocol::ICMPV6))
            .map_err(|source| TransportError::OpenSocket { family: "IPv6", source })?;
        v4.set_nonblocking(true).map_err(|source| TransportError::OpenSocket { family: "IPv4", source })?;
        v6.set_nonblocking(true).map_err(|source| TransportError::OpenSocket { family: "IPv6", source })?;
        Ok(Self { v4, v6 })
    }

    pub fn v4_fd(&self) -> RawFd {
        self.v4.as_raw_fd()
    }

    pub fn v6_fd(&self) -> RawFd {
        self.v6.as_raw_fd()
    }

    /// Encodes and sends an echo request to `addr` on whichever socket
    /// matches its address family.
    pub fn send_probe(&self, addr: IpAddr, ident: u16, seq: u16, now: TimeVal) -> std::io::Result<usize> {
        let req = EchoRequest { ident, seq, send_time: now };
        let dest = SockAddr::from(SocketAddr::new(addr, 0));
        match addr {
            IpAddr::V4(_) => {
                let buf = wire::encode_v4(&req);
                self.v4.send_to(&buf, &dest)
            }
            IpAddr::V6(_) => {
                let buf = wire::encode_v6(&req);
                self.v6.send_to(&buf, &dest)
            }
        }
    }

    /// Drains one datagram from the v4 socket, if any is pending.
    pub fn recv_v4(&self) -> std::io::Result<(Vec<u8>, IpAddr)> {
        recv_one(&self.v4)
    }

    /// Drains one datagram from the v6 socket, if any is pending.
    pub fn recv_v6(&self) -> std::io::Result<(Vec<u8>, IpAddr)> {
        recv_one(&self.v6)
    }
}

fn recv_one(socket: &Socket) -> std::io::Result<(Vec<u8>, IpAddr)> {
    let mut buf = [MaybeUninit::uninit(); 1024];
    let (len, from) = socket.recv_from(&mut buf)?;
    let bytes: Vec<u8> = buf[..len].iter().map(|b| unsafe { b.assume_init() }).collect();
    let addr = from.as_socket().map(|sa| sa.ip()).unwrap_or(IpAddr::V4(std::net::Ipv4Addr::UNSPECIFIED));
    Ok((bytes, addr))
}

/// Drops from an elevated effective uid back to the real uid, matching the
/// original's `setuid(getuid())` right after the raw sockets are open.
pub fn drop_privileges() -> std::io::Result<()> {
    let real_uid = unsafe { libc::getuid() };
    let rc = unsafe { libc::setuid(real_uid) };
    if rc != 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}
