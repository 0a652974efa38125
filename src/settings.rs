use std::time::{Duration};

use super::{

    target::{AddressFamily},
    error::{TraceError},
};

/// Payload carried by every echo request of a run.
pub const DEFAULT_PAYLOAD: &[u8] = b"HELLO-R-U-THERE";

/// Largest payload that still fits a 1500 octet frame behind an IPv6 and
/// an ICMP header.
pub const MAX_PAYLOAD: usize = 1500 - 40 - 8;

/// Run-scoped settings, handed to the walker when it is built.
///
/// Take a look at the default implementation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TraceSettings {

    pub family: AddressFamily,
    pub identifier: u16,

    pub timeout: Duration,
    pub max_hops: u32,
    pub attempts: u32,

    pub payload: Vec<u8>,
}

impl Default for TraceSettings {
    fn default() -> TraceSettings {
        TraceSettings {

            family: AddressFamily::V4,
            identifier: process_identifier(),

            timeout: {

                Duration::from_millis(500)
            },

            max_hops: 30,
            attempts: 1,

            payload: DEFAULT_PAYLOAD.to_vec(),
        }
    }
}

impl TraceSettings {
    pub fn with_family(family: AddressFamily) -> TraceSettings {
        TraceSettings {
            family,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), TraceError> {
        if self.max_hops == 0 || self.max_hops > 255 {
            return Err(TraceError::SettingsInvalid({
                format!("max hops must be within 1..=255, got {}", self.max_hops)
            }))
        }

        if self.attempts == 0 {
            return Err(TraceError::SettingsInvalid({
                "at least one attempt per hop is required".to_string()
            }))
        }

        if self.timeout.is_zero() {
            return Err(TraceError::SettingsInvalid({
                "probe timeout must be positive".to_string()
            }))
        }

        if self.payload.len() > MAX_PAYLOAD {
            return Err(TraceError::SettingsInvalid({
                format!("payload of {} octets exceeds {}", self.payload.len(), MAX_PAYLOAD)
            }))
        }

        Ok(())
    }
}

/// Process id masked to the 16 bit echo identifier field.
pub fn process_identifier() -> u16 {
    (std::process::id() & 0xFFFF) as u16
}
