//! Owned, decoded forms of the headers found in captured replies.
//!
//! Decoding copies the fields out of the borrowed wire views so a decoded
//! header can outlive the receive buffer.  Checksums are reported as found
//! and never verified.

use crate::error::Result;
use std::net::Ipv4Addr;
use traceflow_packet::icmpv4::destination_unreachable::DestinationUnreachablePacket;
use traceflow_packet::icmpv4::time_exceeded::TimeExceededPacket;
use traceflow_packet::icmpv4::{
    IcmpCode, IcmpDestinationUnreachableCode, IcmpPacket, IcmpTimeExceededCode, IcmpType,
};
use traceflow_packet::ipv4::Ipv4Packet;
use traceflow_packet::udp::UdpPacket;
use traceflow_packet::IpProtocol;

/// A decoded `IPv4` header and the bytes which follow it.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Ipv4Header {
    pub version: u8,
    /// Header length in 32-bit words.
    pub header_length: u8,
    pub tos: u8,
    pub total_length: u16,
    pub identification: u16,
    pub flags_and_fragment_offset: u16,
    pub ttl: u8,
    pub protocol: IpProtocol,
    pub checksum: u16,
    pub source: Ipv4Addr,
    pub destination: Ipv4Addr,
    /// Everything from `header_length * 4` to the end of the buffer.
    pub payload: Vec<u8>,
}

impl Ipv4Header {
    /// Decode the first 20 bytes of `bytes` as an `IPv4` header.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let packet = Ipv4Packet::new_view(bytes)?;
        Ok(Self {
            version: packet.get_version(),
            header_length: packet.get_header_length(),
            tos: packet.get_tos(),
            total_length: packet.get_total_length(),
            identification: packet.get_identification(),
            flags_and_fragment_offset: packet.get_flags_and_fragment_offset(),
            ttl: packet.get_ttl(),
            protocol: packet.get_protocol(),
            checksum: packet.get_checksum(),
            source: packet.get_source(),
            destination: packet.get_destination(),
            payload: packet.payload().to_vec(),
        })
    }

    /// The 13-bit fragment offset.
    #[must_use]
    pub const fn fragment_offset(&self) -> u16 {
        self.flags_and_fragment_offset & 0x1fff
    }
}

/// A decoded `UDP` header and its payload.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct UdpSegment {
    pub src_port: u16,
    pub dst_port: u16,
    /// The wire length less the 8 byte header.
    pub payload_length: u16,
    pub checksum: u16,
    pub payload: Vec<u8>,
}

impl UdpSegment {
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let packet = UdpPacket::new_view(bytes)?;
        let header_len = UdpPacket::minimum_packet_size() as u16;
        Ok(Self {
            src_port: packet.get_source(),
            dst_port: packet.get_destination(),
            payload_length: packet.get_length().saturating_sub(header_len),
            checksum: packet.get_checksum(),
            payload: packet.payload().to_vec(),
        })
    }
}

/// A decoded `ICMPv4` message.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct IcmpMessage {
    pub icmp_type: IcmpType,
    pub code: IcmpCode,
    pub checksum: u16,
    /// The first half of the four bytes after the checksum.
    ///
    /// Unused by `TimeExceeded` and `DestinationUnreachable`, the identifier
    /// for echo messages.
    pub unused: u16,
    /// For error messages, the quoted header and first 8 payload bytes of
    /// the datagram which caused the error.
    pub payload: Vec<u8>,
}

impl IcmpMessage {
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let packet = IcmpPacket::new_view(bytes)?;
        Ok(Self {
            icmp_type: packet.get_icmp_type(),
            code: packet.get_icmp_code(),
            checksum: packet.get_checksum(),
            unused: (packet.get_rest_of_header() >> 16) as u16,
            payload: packet.payload().to_vec(),
        })
    }

    /// Decode the quoted header of the datagram that caused this message.
    pub fn quoted_header(&self) -> Result<Ipv4Header> {
        Ipv4Header::decode(&self.payload)
    }
}

/// The classification of an `ICMP` message and its type specific code.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ReplyKind {
    /// A router discarded the probe when its ttl reached zero.
    TimeExceeded(IcmpTimeExceededCode),
    /// The probe could not be delivered; `PortUnreachable` from the
    /// destination means the probe arrived.
    DestinationUnreachable(IcmpDestinationUnreachableCode),
    Other(IcmpType),
}

impl ReplyKind {
    /// Classify the `ICMP` message in `bytes`.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Ok(match IcmpPacket::new_view(bytes)?.get_icmp_type() {
            IcmpType::TimeExceeded => {
                Self::TimeExceeded(TimeExceededPacket::new_view(bytes)?.get_icmp_code())
            }
            IcmpType::DestinationUnreachable => Self::DestinationUnreachable(
                DestinationUnreachablePacket::new_view(bytes)?.get_icmp_code(),
            ),
            other => Self::Other(other),
        })
    }
}
