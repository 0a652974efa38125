use std::{

    net::{IpAddr},

    time::{

        Duration,
        Instant,
    },
};

use tracing::{debug, trace, warn};

use super::{

    channel::{

        Reception,
        Channel,
    },

    packets::{

        Message,
        Quote,
        Echo,
    },

    responses::{Outcome},
    settings::{TraceSettings},
    error::{TraceError},
    packets,
};

/// Issues one echo request per call and classifies what comes back.
///
/// The identifier stays the same for the lifetime of the prober, the
/// sequence number goes up by one for every probe.
#[derive(Clone, Debug)]
pub struct Prober {
    identifier: u16,
    sequence: u16,
    payload: Vec<u8>,
}

impl Prober {
    pub fn new(identifier: u16, payload: Vec<u8>) -> Prober {
        Prober {
            identifier,
            sequence: 0,
            payload,
        }
    }

    pub fn with_settings(settings: &TraceSettings) -> Prober {
        Prober::new(settings.identifier, settings.payload.clone())
    }

    pub fn identifier(&self) -> u16 {
        self.identifier
    }

    /// Sequence number of the most recent probe, 0 before the first.
    pub fn sequence(&self) -> u16 {
        self.sequence
    }

    /// Send one probe at `ttl` and wait at most `timeout` for its answer.
    ///
    /// Failures are folded into the outcome, a probe never aborts the trace.
    pub fn probe<C>(&mut self, channel: &mut C, ttl: u32, target: IpAddr, timeout: Duration) -> Outcome
    where
        C: Channel + ?Sized,
    {
        self.sequence = self.sequence.wrapping_add(1);

        let expected = Echo {
            identifier: self.identifier,
            sequence: self.sequence,
        };

        let outcome = match self.exchange(channel, ttl, target, timeout, expected) {

            Ok(outcome) => outcome,

            Err(TraceError::SocketReceiveTimeout) => Outcome::Timeout,

            Err(e) => {

                warn!(ttl, sequence = expected.sequence, error = %e, "probe failed");
                Outcome::ParseError
            }
        };

        debug!(ttl, sequence = expected.sequence, ?outcome, "probe classified");
        outcome
    }

    fn exchange<C>(&self, channel: &mut C, ttl: u32, target: IpAddr, timeout: Duration, expected: Echo) -> Result<Outcome, TraceError>
    where
        C: Channel + ?Sized,
    {
        let request = packets::encode_echo_request(channel.family(), {
            expected.identifier
        }, expected.sequence, &self.payload)?;

        channel.set_ttl(ttl)?;
        channel.send(&request, target)?;

        let timepoint = Instant::now();
        let deadline = timepoint + timeout;
        let mut discarded = false;

        // Read until the deadline, skipping datagrams that answer something else.
        loop {

            let reception = match channel.receive(deadline) {

                Ok(reception) => reception,
                Err(TraceError::SocketReceiveTimeout) if discarded => return Ok(Outcome::ParseError),
                Err(e) => return Err(e),
            };

            match classify(reception, channel, target, expected, timepoint.elapsed()) {

                Some(outcome) => return Ok(outcome),
                None => discarded = true,
            }
        }
    }
}

/// `None` when the reception does not answer the probe described by `expected`.
fn classify<C>(reception: Reception, channel: &C, target: IpAddr, expected: Echo, rtt: Duration) -> Option<Outcome>
where
    C: Channel + ?Sized,
{
    let (bytes, source) = match reception {

        Reception::Expired { responder } => {
            return Some(Outcome::HopReply { responder, rtt })
        }

        Reception::Packet { bytes, source } => (bytes, source),
    };

    let message = match packets::decode(&bytes, channel.family()) {

        Ok(message) => message,

        Err(e) => {

            trace!(%source, error = %e, "discarding malformed response");
            return None
        }
    };

    match message {

        Message::EchoReply(echo) if echo == expected && source == target => {
            Some(Outcome::DestinationReply { responder: source, rtt })
        }

        Message::TimeExceeded(Quote::Echo(echo)) if echo == expected => {
            Some(Outcome::HopReply { responder: Some(source), rtt })
        }

        Message::TimeExceeded(Quote::Truncated) => {
            Some(Outcome::HopReply { responder: Some(source), rtt })
        }

        message => {

            trace!(%source, ?message, ?expected, "discarding uncorrelated response");
            None
        }
    }
}
