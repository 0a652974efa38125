//! A scripted network behind the `Channel` trait, so the prober and the
//! walker can be driven without raw socket privileges.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::time::{Duration, Instant};

use hopwalk::error::TraceError;
use hopwalk::packets::checksum;
use hopwalk::{AddressFamily, Channel, Reception};

/// How the network answers a probe whose TTL runs out at a given hop.
#[derive(Clone, Debug)]
pub enum Responder {
    /// Router returning a Time-Exceeded that quotes the probe.
    Router(IpAddr),
    /// Router quoting an echo request with someone else's identifier.
    ForeignRouter(IpAddr),
    /// The target answers with an Echo Reply.
    Destination,
    /// The target answers, but with another identifier.
    WrongIdentifier,
    /// A correct echo reply, but from an address other than the target.
    Impostor(IpAddr),
    /// The target answers the previous probe instead of this one.
    StaleReply,
    /// Nothing comes back before the deadline.
    Silent,
    /// Silent for the first `n` probes at this hop, a router afterwards.
    SilentThen(u32, IpAddr),
    /// The probe itself is read back, as happens on loopback.
    Loopback,
    /// The platform reports the expiry as an error.
    Expired,
    /// Bytes that are not an ICMP message.
    Garbage,
    /// A reply to the previous request is read first, then the answer.
    StaleThen(Box<Responder>),
    /// Our own request is read back first, then the answer.
    EchoedThen(Box<Responder>),
    /// The answer misses its own deadline and is read after the next send.
    Late(Box<Responder>),
}

pub struct SimulatedNetwork {
    pub family: AddressFamily,
    pub target: IpAddr,
    pub path: Vec<Responder>,

    pub ttl: u32,
    pub sent: Vec<(u32, Vec<u8>)>,
    pub attempts: HashMap<u32, u32>,
    pub rtt: Duration,

    pending: VecDeque<Reception>,
    late: Vec<Reception>,
}

impl SimulatedNetwork {
    pub fn new(target: IpAddr, path: Vec<Responder>) -> SimulatedNetwork {
        SimulatedNetwork {
            family: AddressFamily::of(&target),
            target,
            path,

            ttl: 0,
            sent: Vec::new(),
            attempts: HashMap::new(),
            rtt: Duration::ZERO,

            pending: VecDeque::new(),
            late: Vec::new(),
        }
    }

    pub fn sent_ttls(&self) -> Vec<u32> {
        self.sent.iter().map(|(ttl, _)| *ttl).collect()
    }

    fn responder(&self, ttl: u32) -> Responder {
        self.path.get(ttl as usize - 1).cloned().unwrap_or(Responder::Silent)
    }

    fn reply(&self, request: &[u8], identifier_mask: u16, sequence_delta: u16) -> Vec<u8> {
        let mut reply = request.to_vec();
        reply[0] = match self.family {
            AddressFamily::V4 => 0,
            AddressFamily::V6 => 129,
        };

        let identifier = u16::from_be_bytes([reply[4], reply[5]]) ^ identifier_mask;
        let sequence = u16::from_be_bytes([reply[6], reply[7]]).wrapping_sub(sequence_delta);
        reply[4..6].copy_from_slice(&identifier.to_be_bytes());
        reply[6..8].copy_from_slice(&sequence.to_be_bytes());

        self.datagram(reply)
    }

    fn time_exceeded(&self, request: &[u8]) -> Vec<u8> {
        let mut message = vec![
            match self.family {
                AddressFamily::V4 => 11,
                AddressFamily::V6 => 3,
            },
            0, 0, 0, 0, 0, 0, 0,
        ];

        message.extend_from_slice(&self.network_header(request.len(), 1));
        message.extend_from_slice(&request[..8]);

        self.datagram(message)
    }

    /// Wrap an ICMP message the way the raw socket of `family` hands it over.
    fn datagram(&self, mut message: Vec<u8>) -> Vec<u8> {
        match self.family {
            AddressFamily::V4 => {
                message[2] = 0;
                message[3] = 0;
                let sum = checksum(&message);
                message[2..4].copy_from_slice(&sum.to_be_bytes());

                let mut datagram = self.network_header(message.len(), 64);
                datagram.extend_from_slice(&message);
                datagram
            }
            AddressFamily::V6 => message,
        }
    }

    fn network_header(&self, payload_len: usize, hops: u8) -> Vec<u8> {
        match self.family {
            AddressFamily::V4 => {
                let total = (20 + payload_len) as u16;
                let mut header = vec![0x45, 0, 0, 0, 0, 0, 0, 0, hops, 1, 0, 0, 192, 0, 2, 1, 198, 51, 100, 9];
                header[2..4].copy_from_slice(&total.to_be_bytes());
                header
            }
            AddressFamily::V6 => {
                let mut header = vec![0u8; 40];
                header[0] = 0x60;
                header[4..6].copy_from_slice(&(payload_len as u16).to_be_bytes());
                header[6] = 58;
                header[7] = hops;
                header
            }
        }
    }
}

impl Channel for SimulatedNetwork {
    fn family(&self) -> AddressFamily {
        self.family
    }

    fn set_ttl(&mut self, ttl: u32) -> Result<(), TraceError> {
        self.ttl = ttl;
        Ok(())
    }

    fn send(&mut self, bytes: &[u8], destination: IpAddr) -> Result<(), TraceError> {
        assert_eq!(destination, self.target);

        let ttl = self.ttl;
        self.sent.push((ttl, bytes.to_vec()));

        let attempt = {
            let count = self.attempts.entry(ttl).or_insert(0);
            *count += 1;
            *count
        };

        // Whatever missed the previous deadline is read before this answer.
        self.pending.extend(self.late.drain(..));

        let responder = self.responder(ttl);
        self.answer(&responder, bytes, attempt);
        Ok(())
    }

    fn receive(&mut self, _deadline: Instant) -> Result<Reception, TraceError> {
        match self.pending.pop_front() {
            Some(reception) => {
                std::thread::sleep(self.rtt);
                Ok(reception)
            }
            None => Err(TraceError::SocketReceiveTimeout),
        }
    }
}

impl SimulatedNetwork {
    /// Queue what `responder` sends back for `request`.
    fn answer(&mut self, responder: &Responder, request: &[u8], attempt: u32) {
        let target = self.target;
        let packet = |bytes: Vec<u8>, source: IpAddr| Reception::Packet { bytes, source };

        let reception = match responder {
            Responder::Router(router) => packet(self.time_exceeded(request), *router),
            Responder::ForeignRouter(router) => {
                let mut quoted = request.to_vec();
                quoted[4] ^= 0xFF;
                packet(self.time_exceeded(&quoted), *router)
            }
            Responder::Destination => packet(self.reply(request, 0, 0), target),
            Responder::Impostor(source) => packet(self.reply(request, 0, 0), *source),
            Responder::WrongIdentifier => packet(self.reply(request, 0xFFFF, 0), target),
            Responder::StaleReply => packet(self.reply(request, 0, 1), target),
            Responder::Silent => return,
            Responder::SilentThen(n, router) if attempt > *n => packet(self.time_exceeded(request), *router),
            Responder::SilentThen(..) => return,
            Responder::Loopback => packet(self.datagram(request.to_vec()), target),
            Responder::Expired => Reception::Expired { responder: None },
            Responder::Garbage => packet(vec![0x45, 1, 2], target),
            Responder::StaleThen(inner) => {
                let stale = packet(self.reply(request, 0, 1), target);
                self.pending.push_back(stale);
                return self.answer(inner, request, attempt)
            }
            Responder::EchoedThen(inner) => {
                let echoed = packet(self.datagram(request.to_vec()), target);
                self.pending.push_back(echoed);
                return self.answer(inner, request, attempt)
            }
            Responder::Late(inner) => {
                let before = self.pending.len();
                self.answer(inner, request, attempt);
                let held: Vec<Reception> = self.pending.drain(before..).collect();
                self.late.extend(held);
                return
            }
        };

        self.pending.push_back(reception);
    }
}

pub fn v4(a: u8, b: u8, c: u8, d: u8) -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(a, b, c, d))
}

pub fn v6(last: u16) -> IpAddr {
    IpAddr::V6(Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, last))
}
