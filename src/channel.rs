use std::{

    mem::{MaybeUninit},
    io::{ErrorKind},

    time::{

        Duration,
        Instant,
    },

    net::{

        SocketAddrV6,
        SocketAddrV4,
        SocketAddr,
    },

    net::{

        Ipv6Addr,
        Ipv4Addr,
        IpAddr,
    },
};

use socket2::{

    Protocol,
    SockAddr,
    Domain,
    Socket,
    Type,
};

use tracing::{trace};

use super::{

    target::{AddressFamily},
    error::{TraceError},
};

/// Large enough for any datagram on a 1500 octet link.
pub const RECEIVE_BUFFER_SIZE: usize = 1500;

// Sub-microsecond read timeouts turn into "block forever" once converted
// to a timeval.
const MIN_READ_TIMEOUT: Duration = Duration::from_millis(1);

/// Something arrived before the deadline.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Reception {
    /// A datagram, as read from the socket.
    Packet { bytes: Vec<u8>, source: IpAddr },
    /// The platform reported a hop limit expiry as an error instead of
    /// handing over the Time-Exceeded datagram.
    Expired { responder: Option<IpAddr> },
}

/// Sends probes and hands back responses. A deadline expiry is reported
/// as `TraceError::SocketReceiveTimeout`, every other error is a genuine
/// I/O failure.
pub trait Channel {
    fn family(&self) -> AddressFamily;

    /// Hop limit applied to every following `send`.
    fn set_ttl(&mut self, ttl: u32) -> Result<(), TraceError>;

    fn send(&mut self, bytes: &[u8], destination: IpAddr) -> Result<(), TraceError>;

    fn receive(&mut self, deadline: Instant) -> Result<Reception, TraceError>;
}

/// Raw ICMP socket, closed when dropped.
pub struct RawChannel {
    family: AddressFamily,
    socket: Socket,
}

impl RawChannel {

    /// Needs the privilege to open raw sockets.
    pub fn open(family: AddressFamily) -> Result<RawChannel, TraceError> {
        let (domain, protocol, source) = match family {

            AddressFamily::V4 => (Domain::IPV4, Protocol::ICMPV4, {
                SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0))
            }),

            AddressFamily::V6 => (Domain::IPV6, Protocol::ICMPV6, {
                SocketAddr::V6(SocketAddrV6::new(Ipv6Addr::UNSPECIFIED, 0, 0, 0))
            }),
        };

        let socket = Socket::new(domain, Type::RAW, Some(protocol)).map_err(|e| {
            match (e.kind(), family) {

                (ErrorKind::PermissionDenied, _) => TraceError::SocketPermissionDenied(e.to_string()),
                (_, AddressFamily::V4) => TraceError::SocketCreateIcmpv4(e.to_string()),
                (_, AddressFamily::V6) => TraceError::SocketCreateIcmpv6(e.to_string()),
            }
        })?;

        socket.bind(&(source.into())).map_err(|e| {
            TraceError::SocketBind(source.to_string(), e.to_string())
        })?;

        trace!(%family, "raw channel open");

        Ok(RawChannel {
            family,
            socket,
        })
    }
}

impl Channel for RawChannel {
    fn family(&self) -> AddressFamily {
        self.family
    }

    fn set_ttl(&mut self, ttl: u32) -> Result<(), TraceError> {
        let result = match self.family {

            AddressFamily::V4 => self.socket.set_ttl(ttl),
            AddressFamily::V6 => self.socket.set_unicast_hops_v6(ttl),
        };

        result.map_err(|e| TraceError::SocketSetMaxHops(ttl, e.to_string()))
    }

    fn send(&mut self, bytes: &[u8], destination: IpAddr) -> Result<(), TraceError> {
        if !self.family.matches(&destination) {
            return Err(TraceError::SocketIpMismatch {
                src: self.family.to_string(),
                tgt: destination.to_string(),
            })
        }

        let destination = SockAddr::from(SocketAddr::new(destination, 0));
        self.socket.send_to(bytes, &destination).map_err(|e| {
            TraceError::SocketSend(e.to_string())
        })?;

        Ok(())
    }

    fn receive(&mut self, deadline: Instant) -> Result<Reception, TraceError> {
        let mut buf = [MaybeUninit::<u8>::uninit(); RECEIVE_BUFFER_SIZE];

        loop {

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(TraceError::SocketReceiveTimeout)
            }

            self.socket.set_read_timeout(Some(remaining.max(MIN_READ_TIMEOUT))).map_err(|e| {
                TraceError::SocketSetReadTimeout(e.to_string())
            })?;

            match self.socket.recv_from(&mut buf) {

                Ok((length, responder)) => {

                    let source = responder.as_socket()
                        .map(|address| address.ip())
                        .ok_or(TraceError::SocketReceiveNoAddress)?;

                    // SAFETY: recv_from initialized the first `length` octets.
                    let bytes = buf[..length].iter()
                        .map(|octet| unsafe { octet.assume_init() })
                        .collect();

                    return Ok(Reception::Packet { bytes, source })
                }

                Err(e) => match e.kind() {

                    ErrorKind::WouldBlock | ErrorKind::TimedOut => {
                        return Err(TraceError::SocketReceiveTimeout)
                    }

                    // Windows, and Linux sockets with IP_RECVERR, surface the expiry as EHOSTUNREACH.
                    ErrorKind::HostUnreachable => {
                        return Ok(Reception::Expired { responder: None })
                    }

                    ErrorKind::Interrupted => continue,

                    _ => return Err(TraceError::SocketReceive(e.to_string())),
                },
            }
        }
    }
}
