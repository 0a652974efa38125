//! Hopwalk finds the routers between you and a host by sending ICMP echo
//! requests with a growing hop limit and listening for Time-Exceeded.
//!
//! ## Example
//! ```rust,no_run
//! use hopwalk::{ error::{TraceError},
//!     AddressFamily,
//!     TraceSettings,
//!     Target,
//!     Walker,
//! };
//!
//! fn main() -> Result<(), TraceError> {
//!     let target = Target::resolve("example.org", AddressFamily::V4)?;
//!     let walker = Walker::open(target, TraceSettings::default())?;
//!
//!     let trace = walker.run(|record| {
//!         println!("{} {:?}", record.ttl(), record.outcome())
//!     });
//!
//!     println!("reached: {}", trace.reached());
//!     Ok(())
//! }
//! ```

mod responses;
mod settings;
mod channel;
mod prober;
mod walker;
mod target;

pub mod packets;
pub mod error;

pub use channel::{

    RawChannel,
    Reception,
    Channel,
};

pub use settings::{

    process_identifier,
    DEFAULT_PAYLOAD,
    TraceSettings,
};

pub use responses::{

    Termination,
    HopRecord,
    Outcome,
    Trace,
};

pub use walker::{

    WalkerState,
    Walker,
};

pub use target::{

    AddressFamily,
    Target,
};

pub use prober::{Prober};
