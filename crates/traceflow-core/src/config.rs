use std::fmt::{Display, Formatter};

/// Default values for configuration.
pub mod defaults {
    use std::time::Duration;

    /// The default number of paths to probe.
    pub const DEFAULT_PATHS: u8 = 4;

    /// The default maximum ttl probed on each path.
    pub const DEFAULT_MAX_TTL: u8 = 64;

    /// The default base source port; path `n` sends from `base + n`.
    pub const DEFAULT_SOURCE_PORT: u16 = 33452;

    /// The default destination port.
    pub const DEFAULT_DESTINATION_PORT: u16 = 33452;

    /// The default type of service.
    pub const DEFAULT_TOS: u8 = 0;

    /// The default time to wait after sending each probe.
    pub const DEFAULT_PROBE_WAIT: Duration = Duration::from_millis(100);

    /// The default capture socket read timeout.
    ///
    /// This bounds how long a stop request waits on a blocked receive.
    pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(100);
}

/// The maximum number of paths, bounded by the 8 bits available to encode
/// a path in a probe identifier.
pub const MAX_PATHS: u8 = u8::MAX;

/// The largest datagram read from the capture socket.
pub const MAX_PACKET_SIZE: usize = 512;

/// The fixed payload carried by every probe.
pub const PROBE_PAYLOAD: &[u8; 10] = b"0123456789";

/// The port used when asking the OS to choose an egress address.
///
/// No data is ever sent to it.
pub const EGRESS_DISCOVERY_PORT: u16 = 1;

/// The IP version of a probe.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum IpVersion {
    #[default]
    V4,
    V6,
}

impl Display for IpVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::V4 => write!(f, "IPv4"),
            Self::V6 => write!(f, "IPv6"),
        }
    }
}

/// The transport protocol of a probe.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum Protocol {
    #[default]
    Udp,
    Tcp,
}

impl Display for Protocol {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Udp => write!(f, "UDP"),
            Self::Tcp => write!(f, "TCP"),
        }
    }
}
