use crate::config::{IpVersion, Protocol, PROBE_PAYLOAD};
use crate::error::{Error, Result};
use crate::ident::Identifier;
use crate::net::socket::Socket;
use crate::net::{SocketImpl, SourceAddr};
use crate::types::{Port, TimeToLive, TypeOfService};
use std::net::{IpAddr, Ipv4Addr};
use traceflow_packet::checksum::udp_ipv4_checksum;
use traceflow_packet::ipv4::Ipv4Packet;
use traceflow_packet::udp::UdpPacket;
use traceflow_packet::IpProtocol;

/// The largest value of the 13-bit fragment offset field.
const MAX_FRAGMENT_OFFSET: u16 = 0x1fff;

/// The size of an encoded `UDP` segment.
const UDP_SEGMENT_SIZE: usize = UdpPacket::minimum_packet_size() + PROBE_PAYLOAD.len();

/// The size of an encoded probe.
pub const PROBE_SIZE: usize = Ipv4Packet::minimum_packet_size() + UDP_SEGMENT_SIZE;

/// A fully validated `IPv4`/`UDP` probe.
///
/// Built with a [`ProbeBuilder`] and immutable afterwards.
///
/// # Examples
///
/// ```
/// # fn main() -> anyhow::Result<()> {
/// use std::net::Ipv4Addr;
/// use traceflow_core::{Identifier, PathId, Port, ProbeDescriptor, TimeToLive};
///
/// let probe = ProbeDescriptor::builder()
///     .source_addr(Ipv4Addr::new(192, 168, 0, 2))
///     .dest_addr(Ipv4Addr::new(1, 1, 1, 1))
///     .src_port(Port(33453))
///     .ttl(TimeToLive(3))
///     .identifier(Identifier::new(PathId(1), TimeToLive(3)))
///     .build()?;
/// let bytes = probe.encode()?;
/// assert_eq!(38, bytes.len());
/// assert_eq!(3, bytes[8]);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ProbeDescriptor {
    source_addr: Ipv4Addr,
    dest_addr: Ipv4Addr,
    src_port: Port,
    dst_port: Port,
    ttl: TimeToLive,
    identifier: Identifier,
    tos: TypeOfService,
    fragment_offset: u16,
}

impl ProbeDescriptor {
    #[must_use]
    pub fn builder() -> ProbeBuilder {
        ProbeBuilder::default()
    }

    #[must_use]
    pub const fn source_addr(&self) -> Ipv4Addr {
        self.source_addr
    }

    #[must_use]
    pub const fn dest_addr(&self) -> Ipv4Addr {
        self.dest_addr
    }

    #[must_use]
    pub const fn src_port(&self) -> Port {
        self.src_port
    }

    #[must_use]
    pub const fn dst_port(&self) -> Port {
        self.dst_port
    }

    #[must_use]
    pub const fn ttl(&self) -> TimeToLive {
        self.ttl
    }

    #[must_use]
    pub const fn identifier(&self) -> Identifier {
        self.identifier
    }

    #[must_use]
    pub const fn tos(&self) -> TypeOfService {
        self.tos
    }

    #[must_use]
    pub const fn fragment_offset(&self) -> u16 {
        self.fragment_offset
    }

    /// Encode the probe as a 20 byte `IPv4` header, an 8 byte `UDP` header
    /// and the fixed payload.
    ///
    /// The `IPv4` total length and checksum are left as zero for the
    /// sending kernel to fill in.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut udp_buf = [0_u8; UDP_SEGMENT_SIZE];
        self.encode_udp(&mut udp_buf)?;
        let mut buf = vec![0_u8; PROBE_SIZE];
        let mut ipv4 = Ipv4Packet::new(&mut buf)?;
        ipv4.set_version(4);
        ipv4.set_header_length(5);
        ipv4.set_tos(self.tos.0);
        ipv4.set_total_length(0);
        ipv4.set_identification(self.identifier.0);
        ipv4.set_flags_and_fragment_offset(0);
        ipv4.set_fragment_offset(self.fragment_offset);
        ipv4.set_ttl(self.ttl.0);
        ipv4.set_protocol(IpProtocol::Udp);
        ipv4.set_checksum(0);
        ipv4.set_source(self.source_addr);
        ipv4.set_destination(self.dest_addr);
        ipv4.set_payload(&udp_buf);
        Ok(buf)
    }

    fn encode_udp(&self, udp_buf: &mut [u8]) -> Result<()> {
        let mut udp = UdpPacket::new(udp_buf)?;
        udp.set_source(self.src_port.0);
        udp.set_destination(self.dst_port.0);
        udp.set_length(UDP_SEGMENT_SIZE as u16);
        udp.set_payload(PROBE_PAYLOAD);
        udp.set_checksum(udp_ipv4_checksum(
            udp.packet(),
            self.source_addr,
            self.dest_addr,
        )?);
        Ok(())
    }
}

/// Build a [`ProbeDescriptor`].
///
/// `ttl` and `dest_addr` are required.  The source address is discovered
/// from the routing table when not given and the identifier is random when
/// not given.
#[derive(Debug, Clone, Default)]
pub struct ProbeBuilder {
    ip_version: IpVersion,
    source_addr: Option<IpAddr>,
    dest_addr: Option<IpAddr>,
    src_port: Port,
    dst_port: Port,
    ttl: Option<TimeToLive>,
    protocol: Protocol,
    identifier: Option<Identifier>,
    tos: TypeOfService,
    fragment_offset: u16,
}

impl ProbeBuilder {
    #[must_use]
    pub const fn ip_version(self, ip_version: IpVersion) -> Self {
        Self { ip_version, ..self }
    }

    #[must_use]
    pub fn source_addr(self, source_addr: impl Into<IpAddr>) -> Self {
        Self {
            source_addr: Some(source_addr.into()),
            ..self
        }
    }

    #[must_use]
    pub fn dest_addr(self, dest_addr: impl Into<IpAddr>) -> Self {
        Self {
            dest_addr: Some(dest_addr.into()),
            ..self
        }
    }

    #[must_use]
    pub const fn src_port(self, src_port: Port) -> Self {
        Self { src_port, ..self }
    }

    #[must_use]
    pub const fn dst_port(self, dst_port: Port) -> Self {
        Self { dst_port, ..self }
    }

    #[must_use]
    pub const fn ttl(self, ttl: TimeToLive) -> Self {
        Self {
            ttl: Some(ttl),
            ..self
        }
    }

    #[must_use]
    pub const fn protocol(self, protocol: Protocol) -> Self {
        Self { protocol, ..self }
    }

    #[must_use]
    pub const fn identifier(self, identifier: Identifier) -> Self {
        Self {
            identifier: Some(identifier),
            ..self
        }
    }

    #[must_use]
    pub const fn tos(self, tos: TypeOfService) -> Self {
        Self { tos, ..self }
    }

    #[must_use]
    pub const fn fragment_offset(self, fragment_offset: u16) -> Self {
        Self {
            fragment_offset,
            ..self
        }
    }

    /// Validate and build the probe.
    pub fn build(self) -> Result<ProbeDescriptor> {
        self.build_with::<SocketImpl>()
    }

    pub fn build_with<S: Socket>(self) -> Result<ProbeDescriptor> {
        if self.ip_version == IpVersion::V6
            || matches!(self.dest_addr, Some(IpAddr::V6(_)))
            || matches!(self.source_addr, Some(IpAddr::V6(_)))
        {
            return Err(Error::NotImplemented(String::from("IPv6 probes")));
        }
        if self.protocol != Protocol::Udp {
            return Err(Error::NotImplemented(format!("{} probes", self.protocol)));
        }
        let ttl = self
            .ttl
            .ok_or_else(|| Error::BadConfig(String::from("probe ttl is required")))?;
        let dest_addr = match self.dest_addr {
            Some(IpAddr::V4(addr)) => addr,
            _ => {
                return Err(Error::BadConfig(String::from(
                    "probe destination address is required",
                )))
            }
        };
        if self.fragment_offset > MAX_FRAGMENT_OFFSET {
            return Err(Error::BadConfig(format!(
                "fragment offset {} exceeds {MAX_FRAGMENT_OFFSET}",
                self.fragment_offset
            )));
        }
        let source_addr = match self.source_addr {
            Some(IpAddr::V4(addr)) => addr,
            _ => SourceAddr::egress::<S>(dest_addr)?,
        };
        let identifier = self
            .identifier
            .unwrap_or_else(|| Identifier(rand::random()));
        Ok(ProbeDescriptor {
            source_addr,
            dest_addr,
            src_port: self.src_port,
            dst_port: self.dst_port,
            ttl,
            identifier,
            tos: self.tos,
            fragment_offset: self.fragment_offset,
        })
    }
}
