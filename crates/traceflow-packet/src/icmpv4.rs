use crate::buffer::Buffer;
use crate::error::{Error, Result};
use crate::fmt_payload;
use std::fmt::{Debug, Formatter};

/// The type of `ICMPv4` packet.
#[derive(Debug, Copy, Clone, Ord, PartialOrd, Eq, PartialEq)]
pub enum IcmpType {
    EchoReply,
    DestinationUnreachable,
    EchoRequest,
    TimeExceeded,
    Other(u8),
}

impl IcmpType {
    #[must_use]
    pub const fn id(&self) -> u8 {
        match self {
            Self::EchoReply => 0,
            Self::DestinationUnreachable => 3,
            Self::EchoRequest => 8,
            Self::TimeExceeded => 11,
            Self::Other(id) => *id,
        }
    }
}

impl From<u8> for IcmpType {
    fn from(val: u8) -> Self {
        match val {
            0 => Self::EchoReply,
            3 => Self::DestinationUnreachable,
            8 => Self::EchoRequest,
            11 => Self::TimeExceeded,
            id => Self::Other(id),
        }
    }
}

/// The `ICMPv4` code.
#[derive(Debug, Copy, Clone, Ord, PartialOrd, Eq, PartialEq)]
pub struct IcmpCode(pub u8);

impl From<u8> for IcmpCode {
    fn from(val: u8) -> Self {
        Self(val)
    }
}

/// The code of a `TimeExceeded` packet.
#[derive(Debug, Copy, Clone, Ord, PartialOrd, Eq, PartialEq)]
pub enum IcmpTimeExceededCode {
    /// The time to live reached zero in transit.
    TtlExpired,
    /// Fragment reassembly time exceeded.
    FragmentReassembly,
    Unknown(u8),
}

impl From<IcmpCode> for IcmpTimeExceededCode {
    fn from(val: IcmpCode) -> Self {
        match val {
            IcmpCode(0) => Self::TtlExpired,
            IcmpCode(1) => Self::FragmentReassembly,
            IcmpCode(id) => Self::Unknown(id),
        }
    }
}

/// The code of a `DestinationUnreachable` packet.
///
/// Only the codes a `UDP` probe can plausibly provoke are named.
#[derive(Debug, Copy, Clone, Ord, PartialOrd, Eq, PartialEq)]
pub enum IcmpDestinationUnreachableCode {
    NetUnreachable,
    HostUnreachable,
    ProtocolUnreachable,
    /// The probe reached the target, which has nothing listening on the port.
    PortUnreachable,
    FragmentationNeeded,
    AdministrativelyProhibited,
    Unknown(u8),
}

impl From<IcmpCode> for IcmpDestinationUnreachableCode {
    fn from(val: IcmpCode) -> Self {
        match val {
            IcmpCode(0) => Self::NetUnreachable,
            IcmpCode(1) => Self::HostUnreachable,
            IcmpCode(2) => Self::ProtocolUnreachable,
            IcmpCode(3) => Self::PortUnreachable,
            IcmpCode(4) => Self::FragmentationNeeded,
            IcmpCode(13) => Self::AdministrativelyProhibited,
            IcmpCode(id) => Self::Unknown(id),
        }
    }
}

const TYPE_OFFSET: usize = 0;
const CODE_OFFSET: usize = 1;
const CHECKSUM_OFFSET: usize = 2;
const REST_OF_HEADER_OFFSET: usize = 4;

/// Check a buffer can hold the 8 byte `ICMP` header.
fn check_len(name: &str, len: usize) -> Result<()> {
    if len >= IcmpPacket::minimum_packet_size() {
        Ok(())
    } else {
        Err(Error::truncated(
            name,
            IcmpPacket::minimum_packet_size(),
            len,
        ))
    }
}

/// An `ICMPv4` packet of any type.
pub struct IcmpPacket<'a> {
    buf: Buffer<'a>,
}

impl<'a> IcmpPacket<'a> {
    pub fn new_view(packet: &'a [u8]) -> Result<Self> {
        check_len("IcmpPacket", packet.len())?;
        Ok(Self {
            buf: Buffer::Immutable(packet),
        })
    }

    #[must_use]
    pub const fn minimum_packet_size() -> usize {
        8
    }

    #[must_use]
    pub fn get_icmp_type(&self) -> IcmpType {
        IcmpType::from(self.buf.read(TYPE_OFFSET))
    }

    #[must_use]
    pub fn get_icmp_code(&self) -> IcmpCode {
        IcmpCode::from(self.buf.read(CODE_OFFSET))
    }

    #[must_use]
    pub fn get_checksum(&self) -> u16 {
        self.buf.read_u16(CHECKSUM_OFFSET)
    }

    /// The four type specific bytes which follow the checksum.
    #[must_use]
    pub fn get_rest_of_header(&self) -> u32 {
        u32::from_be_bytes(self.buf.read_array(REST_OF_HEADER_OFFSET))
    }

    #[must_use]
    pub fn payload(&self) -> &[u8] {
        self.buf.tail(Self::minimum_packet_size())
    }
}

impl Debug for IcmpPacket<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IcmpPacket")
            .field("icmp_type", &self.get_icmp_type())
            .field("icmp_code", &self.get_icmp_code())
            .field("checksum", &self.get_checksum())
            .field("rest_of_header", &self.get_rest_of_header())
            .field("payload", &fmt_payload(self.payload()))
            .finish()
    }
}

pub mod time_exceeded {
    use super::{check_len, IcmpCode, IcmpTimeExceededCode, IcmpType};
    use crate::buffer::Buffer;
    use crate::error::Result;
    use crate::fmt_payload;
    use std::fmt::{Debug, Formatter};

    const TYPE_OFFSET: usize = 0;
    const CODE_OFFSET: usize = 1;
    const CHECKSUM_OFFSET: usize = 2;
    const LENGTH_OFFSET: usize = 5;

    /// An `ICMPv4` `TimeExceeded` packet.
    ///
    /// The payload holds the header of the datagram that expired followed by
    /// (at least) the first 8 bytes of its payload.
    pub struct TimeExceededPacket<'a> {
        buf: Buffer<'a>,
    }

    impl<'a> TimeExceededPacket<'a> {
        pub fn new_view(packet: &'a [u8]) -> Result<Self> {
            check_len("TimeExceededPacket", packet.len())?;
            Ok(Self {
                buf: Buffer::Immutable(packet),
            })
        }

        #[must_use]
        pub fn get_icmp_type(&self) -> IcmpType {
            IcmpType::from(self.buf.read(TYPE_OFFSET))
        }

        #[must_use]
        pub fn get_icmp_code(&self) -> IcmpTimeExceededCode {
            IcmpTimeExceededCode::from(IcmpCode(self.buf.read(CODE_OFFSET)))
        }

        #[must_use]
        pub fn get_checksum(&self) -> u16 {
            self.buf.read_u16(CHECKSUM_OFFSET)
        }

        /// The RFC 4884 length of the original datagram, in 32-bit words.
        ///
        /// Zero when the sender does not support extensions.
        #[must_use]
        pub fn get_length(&self) -> u8 {
            self.buf.read(LENGTH_OFFSET)
        }

        #[must_use]
        pub fn payload(&self) -> &[u8] {
            self.buf.tail(super::IcmpPacket::minimum_packet_size())
        }
    }

    impl Debug for TimeExceededPacket<'_> {
        fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("TimeExceededPacket")
                .field("icmp_code", &self.get_icmp_code())
                .field("checksum", &self.get_checksum())
                .field("length", &self.get_length())
                .field("payload", &fmt_payload(self.payload()))
                .finish()
        }
    }

}

pub mod destination_unreachable {
    use super::{check_len, IcmpCode, IcmpDestinationUnreachableCode, IcmpType};
    use crate::buffer::Buffer;
    use crate::error::Result;
    use crate::fmt_payload;
    use std::fmt::{Debug, Formatter};

    const TYPE_OFFSET: usize = 0;
    const CODE_OFFSET: usize = 1;
    const CHECKSUM_OFFSET: usize = 2;

    /// An `ICMPv4` `DestinationUnreachable` packet.
    pub struct DestinationUnreachablePacket<'a> {
        buf: Buffer<'a>,
    }

    impl<'a> DestinationUnreachablePacket<'a> {
        pub fn new_view(packet: &'a [u8]) -> Result<Self> {
            check_len("DestinationUnreachablePacket", packet.len())?;
            Ok(Self {
                buf: Buffer::Immutable(packet),
            })
        }

        #[must_use]
        pub fn get_icmp_type(&self) -> IcmpType {
            IcmpType::from(self.buf.read(TYPE_OFFSET))
        }

        #[must_use]
        pub fn get_icmp_code(&self) -> IcmpDestinationUnreachableCode {
            IcmpDestinationUnreachableCode::from(IcmpCode(self.buf.read(CODE_OFFSET)))
        }

        #[must_use]
        pub fn get_checksum(&self) -> u16 {
            self.buf.read_u16(CHECKSUM_OFFSET)
        }

        #[must_use]
        pub fn payload(&self) -> &[u8] {
            self.buf.tail(super::IcmpPacket::minimum_packet_size())
        }
    }

    impl Debug for DestinationUnreachablePacket<'_> {
        fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("DestinationUnreachablePacket")
                .field("icmp_code", &self.get_icmp_code())
                .field("checksum", &self.get_checksum())
                .field("payload", &fmt_payload(self.payload()))
                .finish()
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use hex_literal::hex;

        #[test]
        fn test_view() {
            let buf = hex!(
                "03 03 bf f7 00 00 00 00
                 45 00 34 00 e8 ca 00 00 01 11 0e 26 c0 a8 00 1f 01 01 01 01
                 e8 b5 82 af 00 20 d1 7f"
            );
            let packet = DestinationUnreachablePacket::new_view(&buf).unwrap();
            assert_eq!(IcmpType::DestinationUnreachable, packet.get_icmp_type());
            assert_eq!(
                IcmpDestinationUnreachableCode::PortUnreachable,
                packet.get_icmp_code()
            );
            assert_eq!(0xbff7, packet.get_checksum());
            assert_eq!(28, packet.payload().len());
        }
    }
}
