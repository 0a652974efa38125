use std::{

    cmp::{Ordering},
    net::{IpAddr},
    time::{Duration},
};

use super::target::{Target};

/// Result of a single probe.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// A router on the way discarded the probe. The responder is unknown
    /// when the platform only signalled the expiry.
    HopReply { responder: Option<IpAddr>, rtt: Duration },
    DestinationReply { responder: IpAddr, rtt: Duration },
    Timeout,
    /// Something came back that does not answer this probe.
    ParseError,
}

impl Outcome {
    pub fn is_responsive(&self) -> bool {
        matches!(self, Outcome::HopReply { .. } | Outcome::DestinationReply { .. })
    }

    pub fn is_destination(&self) -> bool {
        matches!(self, Outcome::DestinationReply { .. })
    }

    pub fn responder(&self) -> Option<IpAddr> {
        match self {

            Outcome::HopReply { responder, .. } => *responder,
            Outcome::DestinationReply { responder, .. } => Some(*responder),
            _ => None,
        }
    }

    pub fn rtt(&self) -> Option<Duration> {
        match self {

            Outcome::HopReply { rtt, .. } |
            Outcome::DestinationReply { rtt, .. } => Some(*rtt),
            _ => None,
        }
    }
}

/// Every probe issued at one TTL, in the order they were sent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HopRecord {
    ttl: u32,
    outcomes: Vec<Outcome>,
}

impl HopRecord {
    pub(crate) fn new(ttl: u32, first: Outcome) -> HopRecord {
        HopRecord {
            ttl,
            outcomes: vec![first],
        }
    }

    pub(crate) fn push(&mut self, outcome: Outcome) {
        self.outcomes.push(outcome)
    }

    pub fn ttl(&self) -> u32 {
        self.ttl
    }

    pub fn outcomes(&self) -> &[Outcome] {
        &self.outcomes
    }

    /// The outcome shown for this hop, the last attempt made.
    pub fn outcome(&self) -> &Outcome {
        &self.outcomes[self.outcomes.len() - 1]
    }

    pub fn is_terminal(&self) -> bool {
        self.outcome().is_destination()
    }

    pub fn is_unresponsive(&self) -> bool {
        !self.outcome().is_responsive()
    }
}

impl Ord for HopRecord {
    fn cmp(&self, other: &Self) -> Ordering {
        self.ttl.cmp(&(other.ttl))
    }
}

impl PartialOrd for HopRecord {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Termination {
    DestinationReached,
    /// Reached the hop limit without hearing from the destination.
    MaxHopsExceeded,
    Cancelled,
}

/// A finished trace.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Trace {
    pub target: Target,
    pub records: Vec<HopRecord>,
    pub termination: Termination,
}

impl Trace {
    pub fn reached(&self) -> bool {
        self.termination == Termination::DestinationReached
    }

    pub fn destination(&self) -> Option<&HopRecord> {
        self.records.iter().find(|record| record.is_terminal())
    }
}
