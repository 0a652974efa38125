use std::sync::{

    atomic::{

        AtomicBool,
        Ordering,
    },

    Arc,
};

use tracing::{debug, info};

use super::{

    channel::{

        RawChannel,
        Channel,
    },

    responses::{

        Termination,
        HopRecord,
        Trace,
    },

    settings::{TraceSettings},
    target::{Target},
    prober::{Prober},
    error::{TraceError},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WalkerState {
    /// The next hop to probe.
    Probing(u32),
    /// Whether the destination answered.
    Done(bool),
}

/// Walks the TTL up from 1 until the destination answers or the hop limit
/// is reached, one hop record per TTL.
pub struct Walker<C> {
    channel: C,
    prober: Prober,

    settings: TraceSettings,
    target: Target,

    state: WalkerState,
    records: Vec<HopRecord>,

    cancel: Option<Arc<AtomicBool>>,
    cancelled: bool,
}

impl Walker<RawChannel> {

    /// Open a raw channel for the configured family and build a walker on it.
    pub fn open(target: Target, settings: TraceSettings) -> Result<Walker<RawChannel>, TraceError> {
        settings.validate()?;

        let channel = RawChannel::open(settings.family)?;
        Walker::new(channel, target, settings)
    }
}

impl<C: Channel> Walker<C> {
    pub fn new(channel: C, target: Target, settings: TraceSettings) -> Result<Walker<C>, TraceError> {
        settings.validate()?;

        if channel.family() != settings.family || target.family() != settings.family {
            return Err(TraceError::SocketIpMismatch {
                src: channel.family().to_string(),
                tgt: target.address().to_string(),
            })
        }

        Ok(Walker {

            prober: Prober::with_settings(&settings),
            channel,

            settings,
            target,

            state: WalkerState::Probing(1),
            records: Vec::new(),

            cancel: None,
            cancelled: false,
        })
    }

    /// Stop before the next hop once `flag` is set.
    pub fn with_cancel(mut self, flag: Arc<AtomicBool>) -> Walker<C> {
        self.cancel = Some(flag);
        self
    }

    pub fn state(&self) -> WalkerState {
        self.state
    }

    pub fn records(&self) -> &[HopRecord] {
        &self.records
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    /// Probe the current hop and return its record, `None` once done.
    pub fn step(&mut self) -> Option<&HopRecord> {
        let ttl = match self.state {

            WalkerState::Probing(ttl) => ttl,
            WalkerState::Done(_) => return None,
        };

        if self.cancel.as_ref().map_or(false, |flag| flag.load(Ordering::SeqCst)) {
            debug!(ttl, "trace cancelled");

            self.cancelled = true;
            self.state = WalkerState::Done(false);
            return None
        }

        let address = self.target.address();
        let timeout = self.settings.timeout;

        let mut record = HopRecord::new(ttl, {
            self.prober.probe(&mut self.channel, ttl, address, timeout)
        });

        while record.is_unresponsive() && record.outcomes().len() < self.settings.attempts as usize {
            record.push(self.prober.probe(&mut self.channel, ttl, address, timeout));
        }

        self.state = match record.is_terminal() {

            true => WalkerState::Done(true),
            false if ttl >= self.settings.max_hops => WalkerState::Done(false),
            false => WalkerState::Probing(ttl + 1),
        };

        self.records.push(record);
        self.records.last()
    }

    /// Walk to the end, handing every record to `observer` as soon as it
    /// is complete.
    pub fn run<F>(mut self, mut observer: F) -> Trace
    where
        F: FnMut(&HopRecord),
    {
        while let Some(record) = self.step() {
            observer(record);
        }

        let termination = match (self.state, self.cancelled) {

            (WalkerState::Done(true), _) => Termination::DestinationReached,
            (_, true) => Termination::Cancelled,
            _ => Termination::MaxHopsExceeded,
        };

        info!(destination = %self.target, hops = self.records.len(), ?termination, "trace finished");

        Trace {
            target: self.target,
            records: self.records,
            termination,
        }
    }
}
