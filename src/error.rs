use thiserror::{Error};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TraceError {
    #[error("Not permitted to open a raw socket, reason: {0}")]
    SocketPermissionDenied(String),
    #[error("Failed to create Icmpv4 socket, reason: {0}")]
    SocketCreateIcmpv4(String),
    #[error("Failed to create Icmpv6 socket, reason: {0}")]
    SocketCreateIcmpv6(String),
    #[error("Socket failed binding to address '{0}', reason: {1}")]
    SocketBind(String, String),
    #[error("Could not set sockets read timeout, reason: {0}")]
    SocketSetReadTimeout(String),
    #[error("Could not set sockets max hops to {0}, reason: {1}")]
    SocketSetMaxHops(u32, String),
    #[error("Socket send, reason: {0}")]
    SocketSend(String),
    #[error("Socket receive timed out.")]
    SocketReceiveTimeout,
    #[error("Socket receive, reason: {0}")]
    SocketReceive(String),
    #[error("Socket returned no address for responder.")]
    SocketReceiveNoAddress,
    #[error("Cannot combine address '{src:?}' (source) with '{tgt:?}' (target).")]
    SocketIpMismatch { src: String, tgt: String },
    #[error("Failed to read response field '{0}', reason: {1}")]
    ResponseReadField(&'static str, String),
    #[error("Failed to write request field '{0}', reason: {1}")]
    RequestWriteField(&'static str, String),
    #[error("Failed to resolve address for hostname: '{0}'")]
    ResolverIpLookup(String),
    #[error("Hostname '{0}' has no {1} address")]
    ResolverNoAddress(String, &'static str),
    #[error("Invalid trace settings: {0}")]
    SettingsInvalid(String),
}

impl TraceError {
    /// Errors that end the run. Anything else stays inside a single probe
    /// and surfaces as an unresponsive hop.
    pub fn is_fatal(&self) -> bool {
        matches!(self,
            Self::SocketPermissionDenied(_)
                | Self::SocketCreateIcmpv4(_)
                | Self::SocketCreateIcmpv6(_)
                | Self::SocketBind(..)
                | Self::ResolverIpLookup(_)
                | Self::ResolverNoAddress(..)
                | Self::SettingsInvalid(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_errors() {
        assert!(TraceError::SocketPermissionDenied("eperm".into()).is_fatal());
        assert!(TraceError::SocketCreateIcmpv6("eafnosupport".into()).is_fatal());
        assert!(TraceError::ResolverNoAddress("example.org".into(), "IPv6").is_fatal());

        assert!(!TraceError::SocketReceiveTimeout.is_fatal());
        assert!(!TraceError::SocketSend("enobufs".into()).is_fatal());
        assert!(!TraceError::ResponseReadField("type", "eof".into()).is_fatal());
    }
}
