//! Packet wire format parsing and building for traceflow.
//!
//! Views are provided for the three layers a UDP traceroute touches:
//! - `IPv4` (the outbound probe header and the headers of captured replies)
//! - `UDP` (the outbound probe segment)
//! - `ICMPv4` (`TimeExceeded` and `DestinationUnreachable` replies)
//!
//! Each view borrows a byte slice, either immutably via `new_view` or mutably
//! via `new`, and never copies the underlying bytes.
//!
//! # Endianness
//!
//! Bytes are held in network byte order and every accessor takes or returns
//! values in host byte order.
//!
//! # Example
//!
//! Parse the outer header of a captured `ICMP` reply:
//!
//! ```rust
//! # fn main() -> anyhow::Result<()> {
//! use std::net::Ipv4Addr;
//! use traceflow_packet::ipv4::Ipv4Packet;
//! use traceflow_packet::IpProtocol;
//!
//! let buf = hex_literal::hex!("45 c0 3c 00 4c 54 00 00 39 01 71 d0 01 01 01 01 c0 a8 00 1f");
//! let ipv4 = Ipv4Packet::new_view(&buf)?;
//! assert_eq!(57, ipv4.get_ttl());
//! assert_eq!(IpProtocol::Icmp, ipv4.get_protocol());
//! assert_eq!(Ipv4Addr::new(1, 1, 1, 1), ipv4.get_source());
//! # Ok(())
//! # }
//! ```
#![forbid(unsafe_code)]

mod buffer;

/// Packet errors.
pub mod error;

/// Internet checksum functions.
pub mod checksum;

/// `ICMPv4` packets.
pub mod icmpv4;

/// `IPv4` packets.
pub mod ipv4;

/// `UDP` packets.
pub mod udp;

/// The protocol carried by an `IPv4` packet.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum IpProtocol {
    Icmp,
    Udp,
    Tcp,
    Other(u8),
}

impl IpProtocol {
    #[must_use]
    pub const fn id(self) -> u8 {
        match self {
            Self::Icmp => 1,
            Self::Tcp => 6,
            Self::Udp => 17,
            Self::Other(id) => id,
        }
    }
}

impl From<u8> for IpProtocol {
    fn from(id: u8) -> Self {
        match id {
            1 => Self::Icmp,
            6 => Self::Tcp,
            17 => Self::Udp,
            other => Self::Other(other),
        }
    }
}

/// Format bytes as space separated hex pairs.
#[must_use]
pub fn fmt_payload(bytes: &[u8]) -> String {
    use itertools::Itertools as _;
    format!("{:02x}", bytes.iter().format(" "))
}
