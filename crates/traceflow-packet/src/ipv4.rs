use crate::buffer::Buffer;
use crate::error::{Error, Result};
use crate::{fmt_payload, IpProtocol};
use std::fmt::{Debug, Formatter};
use std::net::Ipv4Addr;

const VERSION_AND_IHL_OFFSET: usize = 0;
const TOS_OFFSET: usize = 1;
const TOTAL_LENGTH_OFFSET: usize = 2;
const IDENTIFICATION_OFFSET: usize = 4;
const FLAGS_AND_FRAGMENT_OFFSET_OFFSET: usize = 6;
const TTL_OFFSET: usize = 8;
const PROTOCOL_OFFSET: usize = 9;
const CHECKSUM_OFFSET: usize = 10;
const SOURCE_OFFSET: usize = 12;
const DESTINATION_OFFSET: usize = 16;

const FRAGMENT_OFFSET_MASK: u16 = 0x1fff;

/// An `IPv4` packet view.
///
/// Only the fixed 20 byte header is required to be present.  Options, if the
/// header length says there are any, are skipped over when locating the
/// payload.
pub struct Ipv4Packet<'a> {
    buf: Buffer<'a>,
}

impl<'a> Ipv4Packet<'a> {
    pub fn new(packet: &'a mut [u8]) -> Result<Self> {
        Self::check_len(packet.len())?;
        Ok(Self {
            buf: Buffer::Mutable(packet),
        })
    }

    pub fn new_view(packet: &'a [u8]) -> Result<Self> {
        Self::check_len(packet.len())?;
        Ok(Self {
            buf: Buffer::Immutable(packet),
        })
    }

    fn check_len(len: usize) -> Result<()> {
        if len >= Self::minimum_packet_size() {
            Ok(())
        } else {
            Err(Error::truncated(
                "Ipv4Packet",
                Self::minimum_packet_size(),
                len,
            ))
        }
    }

    /// The size of a header without options.
    #[must_use]
    pub const fn minimum_packet_size() -> usize {
        20
    }

    #[must_use]
    pub fn get_version(&self) -> u8 {
        self.buf.read(VERSION_AND_IHL_OFFSET) >> 4
    }

    /// The header length in 32-bit words.
    #[must_use]
    pub fn get_header_length(&self) -> u8 {
        self.buf.read(VERSION_AND_IHL_OFFSET) & 0x0f
    }

    #[must_use]
    pub fn get_tos(&self) -> u8 {
        self.buf.read(TOS_OFFSET)
    }

    #[must_use]
    pub fn get_total_length(&self) -> u16 {
        self.buf.read_u16(TOTAL_LENGTH_OFFSET)
    }

    #[must_use]
    pub fn get_identification(&self) -> u16 {
        self.buf.read_u16(IDENTIFICATION_OFFSET)
    }

    /// The raw 16-bit flags and fragment offset field.
    #[must_use]
    pub fn get_flags_and_fragment_offset(&self) -> u16 {
        self.buf.read_u16(FLAGS_AND_FRAGMENT_OFFSET_OFFSET)
    }

    /// The 3 flag bits.
    #[must_use]
    pub fn get_flags(&self) -> u8 {
        (self.get_flags_and_fragment_offset() >> 13) as u8
    }

    /// The 13-bit fragment offset.
    #[must_use]
    pub fn get_fragment_offset(&self) -> u16 {
        self.get_flags_and_fragment_offset() & FRAGMENT_OFFSET_MASK
    }

    #[must_use]
    pub fn get_ttl(&self) -> u8 {
        self.buf.read(TTL_OFFSET)
    }

    #[must_use]
    pub fn get_protocol(&self) -> IpProtocol {
        IpProtocol::from(self.buf.read(PROTOCOL_OFFSET))
    }

    #[must_use]
    pub fn get_checksum(&self) -> u16 {
        self.buf.read_u16(CHECKSUM_OFFSET)
    }

    #[must_use]
    pub fn get_source(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.buf.read_array::<4>(SOURCE_OFFSET))
    }

    #[must_use]
    pub fn get_destination(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.buf.read_array::<4>(DESTINATION_OFFSET))
    }

    pub fn set_version(&mut self, val: u8) {
        let ihl = self.buf.read(VERSION_AND_IHL_OFFSET) & 0x0f;
        self.buf.write(VERSION_AND_IHL_OFFSET, (val << 4) | ihl);
    }

    pub fn set_header_length(&mut self, val: u8) {
        let version = self.buf.read(VERSION_AND_IHL_OFFSET) & 0xf0;
        self.buf.write(VERSION_AND_IHL_OFFSET, version | (val & 0x0f));
    }

    pub fn set_tos(&mut self, val: u8) {
        self.buf.write(TOS_OFFSET, val);
    }

    pub fn set_total_length(&mut self, val: u16) {
        self.buf.write_u16(TOTAL_LENGTH_OFFSET, val);
    }

    pub fn set_identification(&mut self, val: u16) {
        self.buf.write_u16(IDENTIFICATION_OFFSET, val);
    }

    pub fn set_flags_and_fragment_offset(&mut self, val: u16) {
        self.buf.write_u16(FLAGS_AND_FRAGMENT_OFFSET_OFFSET, val);
    }

    /// Set the 13-bit fragment offset, leaving the flag bits untouched.
    pub fn set_fragment_offset(&mut self, val: u16) {
        let flags = self.get_flags_and_fragment_offset() & !FRAGMENT_OFFSET_MASK;
        self.set_flags_and_fragment_offset(flags | (val & FRAGMENT_OFFSET_MASK));
    }

    pub fn set_ttl(&mut self, val: u8) {
        self.buf.write(TTL_OFFSET, val);
    }

    pub fn set_protocol(&mut self, val: IpProtocol) {
        self.buf.write(PROTOCOL_OFFSET, val.id());
    }

    pub fn set_checksum(&mut self, val: u16) {
        self.buf.write_u16(CHECKSUM_OFFSET, val);
    }

    pub fn set_source(&mut self, val: Ipv4Addr) {
        self.buf.write_array(SOURCE_OFFSET, val.octets());
    }

    pub fn set_destination(&mut self, val: Ipv4Addr) {
        self.buf.write_array(DESTINATION_OFFSET, val.octets());
    }

    /// Copy `vals` in directly after the header.
    pub fn set_payload(&mut self, vals: &[u8]) {
        let start = self.payload_offset();
        self.buf.as_slice_mut()[start..start + vals.len()].copy_from_slice(vals);
    }

    #[must_use]
    pub fn packet(&self) -> &[u8] {
        self.buf.as_slice()
    }

    /// The header bytes, including any options present in the buffer.
    #[must_use]
    pub fn header(&self) -> &[u8] {
        let end = self.payload_offset().min(self.buf.len());
        &self.buf.as_slice()[..end]
    }

    /// The bytes after the header.
    ///
    /// The payload starts `header_length * 4` bytes in, never earlier than
    /// the end of the fixed header.  A header length which runs past the end
    /// of the buffer yields an empty payload.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        self.buf.tail(self.payload_offset())
    }

    fn payload_offset(&self) -> usize {
        (usize::from(self.get_header_length()) * 4).max(Self::minimum_packet_size())
    }
}

impl Debug for Ipv4Packet<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ipv4Packet")
            .field("version", &self.get_version())
            .field("header_length", &self.get_header_length())
            .field("tos", &self.get_tos())
            .field("total_length", &self.get_total_length())
            .field("identification", &self.get_identification())
            .field("flags", &self.get_flags())
            .field("fragment_offset", &self.get_fragment_offset())
            .field("ttl", &self.get_ttl())
            .field("protocol", &self.get_protocol())
            .field("checksum", &self.get_checksum())
            .field("source", &self.get_source())
            .field("destination", &self.get_destination())
            .field("payload", &fmt_payload(self.payload()))
            .finish()
    }
}
