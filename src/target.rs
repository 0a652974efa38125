use std::{

    fmt::{

        Result as FmtResult,
        Formatter,
        Display,
    },

    net::{

        ToSocketAddrs,
        IpAddr,
    },
};

use super::error::{TraceError};

/// Fixed for the whole trace, selects both the socket and the codec variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AddressFamily {
    V4,
    V6,
}

impl AddressFamily {
    pub fn of(address: &IpAddr) -> AddressFamily {
        match address {

            IpAddr::V4(_) => AddressFamily::V4,
            IpAddr::V6(_) => AddressFamily::V6,
        }
    }

    pub fn matches(&self, address: &IpAddr) -> bool {
        AddressFamily::of(address) == *self
    }

    pub fn name(&self) -> &'static str {
        match self {

            AddressFamily::V4 => "IPv4",
            AddressFamily::V6 => "IPv6",
        }
    }
}

impl Display for AddressFamily {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(self.name())
    }
}

/// A resolved destination together with the text the user asked for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Target {
    address: IpAddr,
    display: String,
}

impl Target {
    pub fn new<T: Into<IpAddr>>(address: T, display: impl Into<String>) -> Target {
        Target {
            address: address.into(),
            display: display.into(),
        }
    }

    /// Look up `host` and keep the first address of the requested family.
    pub fn resolve(host: &str, family: AddressFamily) -> Result<Target, TraceError> {
        if let Ok(address) = host.parse::<IpAddr>() {
            return Target::select(host, std::iter::once(address), family)
        }

        let candidates = (host, 0).to_socket_addrs().map_err(|e| {
            tracing::debug!(host, error = %e, "lookup failed");
            TraceError::ResolverIpLookup(host.to_string())
        })?;

        Target::select(host, candidates.map(|x| x.ip()), family)
    }

    /// Pick the first candidate of `family`, candidates of the other
    /// family are skipped rather than converted.
    pub fn select<I>(host: &str, candidates: I, family: AddressFamily) -> Result<Target, TraceError>
    where
        I: IntoIterator<Item = IpAddr>,
    {
        candidates.into_iter()
            .find(|address| family.matches(address))
            .map(|address| Target::new(address, host))
            .ok_or_else(|| TraceError::ResolverNoAddress(host.to_string(), family.name()))
    }

    pub fn address(&self) -> IpAddr {
        self.address
    }

    pub fn display(&self) -> &str {
        &self.display
    }

    pub fn family(&self) -> AddressFamily {
        AddressFamily::of(&self.address)
    }

    /// True when the user typed something other than the literal address.
    pub fn was_resolved(&self) -> bool {
        self.display != self.address.to_string()
    }
}

impl Display for Target {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        write!(fmt, "{}", self.address)
    }
}
