use std::time::{Duration};

use clap::{ArgAction, Parser};

use hopwalk::{

    AddressFamily,
    TraceSettings,
};

/// Discover the route to a host with ICMP echo requests
#[derive(Parser, Debug, Clone)]
#[command(name = "hopwalk")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Target host (IP address or hostname)
    pub target: String,

    /// Force IPv4 (default)
    #[arg(short = '4', long = "ipv4", conflicts_with = "ipv6")]
    pub ipv4: bool,

    /// Force IPv6
    #[arg(short = '6', long = "ipv6")]
    pub ipv6: bool,

    /// Maximum TTL (hops)
    #[arg(short = 'm', long = "max-hops", default_value = "30")]
    pub max_hops: u32,

    /// Probe timeout in milliseconds
    #[arg(short = 'w', long = "timeout", default_value = "500")]
    pub timeout: u64,

    /// Probes per hop before it is reported as unresponsive
    #[arg(short = 'q', long = "attempts", default_value = "1")]
    pub attempts: u32,

    /// Log more (-v debug, -vv trace)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    pub fn family(&self) -> AddressFamily {
        if self.ipv6 {
            AddressFamily::V6
        } else {
            AddressFamily::V4
        }
    }

    pub fn settings(&self) -> TraceSettings {
        TraceSettings {
            timeout: Duration::from_millis(self.timeout),
            max_hops: self.max_hops,
            attempts: self.attempts,
            ..TraceSettings::with_family(self.family())
        }
    }

    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "debug",
            _ => "trace",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hopwalk::error::TraceError;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["hopwalk", "example.org"]).unwrap();
        let settings = args.settings();

        assert_eq!(args.target, "example.org");
        assert_eq!(settings.family, AddressFamily::V4);
        assert_eq!(settings.max_hops, 30);
        assert_eq!(settings.attempts, 1);
        assert_eq!(settings.timeout, Duration::from_millis(500));
        assert_eq!(args.log_level(), "warn");
    }

    #[test]
    fn test_ipv6_and_limits() {
        let args = Args::try_parse_from(["hopwalk", "-6", "-m", "12", "-w", "250", "-q", "3", "-vv", "::1"]).unwrap();
        let settings = args.settings();

        assert_eq!(settings.family, AddressFamily::V6);
        assert_eq!(settings.max_hops, 12);
        assert_eq!(settings.attempts, 3);
        assert_eq!(settings.timeout, Duration::from_millis(250));
        assert_eq!(args.log_level(), "trace");
    }

    #[test]
    fn test_zero_max_hops_is_invalid_settings() {
        let args = Args::try_parse_from(["hopwalk", "-m", "0", "example.org"]).unwrap();

        match args.settings().validate() {
            Err(TraceError::SettingsInvalid(reason)) => assert!(reason.contains("max hops")),
            result => panic!("unexpected result {:?}", result),
        }
    }

    #[test]
    fn test_conflicting_families() {
        assert!(Args::try_parse_from(["hopwalk", "-4", "-6", "example.org"]).is_err());
        assert!(Args::try_parse_from(["hopwalk"]).is_err());
    }
}
