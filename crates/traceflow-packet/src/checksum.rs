//! The Internet checksum (RFC 1071) and its `IPv4` header and `UDP` uses.
//!
//! The word summing and carry folding is derived from [`libpnet`] which is
//! available under the Apache 2.0 license.
//!
//! [`libpnet`]: https://github.com/libpnet/libpnet

use crate::error::{Error, Result};
use crate::IpProtocol;
use std::net::Ipv4Addr;

/// The word index of the checksum field within a `UDP` header.
const UDP_CHECKSUM_WORD: usize = 3;

/// Compute the one's complement checksum of `data`.
///
/// Big-endian 16-bit words are summed, an odd trailing byte is padded with a
/// zero byte, carries are folded back in and the complement is returned.
///
/// Summing a buffer whose checksum field already holds the correct value
/// yields zero.
#[must_use]
pub fn checksum16(data: &[u8]) -> u16 {
    finalize_checksum(sum_be_words(data, None))
}

/// Compute the checksum of a `UDP` segment (header and payload) sent over
/// `IPv4`.
///
/// The sum covers the `IPv4` pseudo-header followed by the segment, with the
/// segment checksum field (bytes 6 and 7) skipped.  A computed value of zero
/// is returned as `0xffff` since zero on the wire means "no checksum".
///
/// Fails if the segment is longer than the 16-bit `UDP` length field can
/// describe.
pub fn udp_ipv4_checksum(
    segment: &[u8],
    src_addr: Ipv4Addr,
    dest_addr: Ipv4Addr,
) -> Result<u16> {
    let length = u16::try_from(segment.len())
        .map_err(|_| Error::SegmentTooLong(segment.len(), usize::from(u16::MAX)))?;
    let sum = pseudo_header_sum(src_addr, dest_addr, IpProtocol::Udp, length)
        + sum_be_words(segment, Some(UDP_CHECKSUM_WORD));
    match finalize_checksum(sum) {
        0 => Ok(0xffff),
        checksum => Ok(checksum),
    }
}

/// Build the 12 byte `IPv4` pseudo-header.
///
/// The pseudo-header is never transmitted, it is only prepended to a
/// transport segment for the purpose of computing its checksum.
#[must_use]
pub fn pseudo_header(
    src_addr: Ipv4Addr,
    dest_addr: Ipv4Addr,
    protocol: IpProtocol,
    length: u16,
) -> [u8; 12] {
    let mut header = [0_u8; 12];
    header[..4].copy_from_slice(&src_addr.octets());
    header[4..8].copy_from_slice(&dest_addr.octets());
    header[9] = protocol.id();
    header[10..].copy_from_slice(&length.to_be_bytes());
    header
}

fn pseudo_header_sum(
    src_addr: Ipv4Addr,
    dest_addr: Ipv4Addr,
    protocol: IpProtocol,
    length: u16,
) -> u64 {
    sum_be_words(&pseudo_header(src_addr, dest_addr, protocol, length), None)
}

/// Sum the big-endian words of `data`.
///
/// The sum is 64 bits wide so it cannot overflow for any buffer that fits
/// in memory; carries are folded once at the end.
fn sum_be_words(data: &[u8], skip_word: Option<usize>) -> u64 {
    let mut words = data.chunks_exact(2);
    let mut sum = words
        .by_ref()
        .enumerate()
        .filter(|(i, _)| Some(*i) != skip_word)
        .map(|(_, word)| u64::from(u16::from_be_bytes([word[0], word[1]])))
        .sum::<u64>();
    if let [last] = words.remainder() {
        sum += u64::from(*last) << 8;
    }
    sum
}

const fn finalize_checksum(mut sum: u64) -> u16 {
    while sum >> 16 != 0 {
        sum = (sum >> 16) + (sum & 0xffff);
    }
    !(sum as u16)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_rfc1071_example() {
        assert_eq!(0x220d, checksum16(&hex!("00 01 f2 03 f4 f5 f6 f7")));
    }

    #[test]
    fn test_empty_and_odd_length() {
        assert_eq!(0xffff, checksum16(&[]));
        assert_eq!(0xffff, checksum16(&[0x00]));
        assert_eq!(0xfeff, checksum16(&[0x01]));
        assert_eq!(
            checksum16(&hex!("ab cd ef 00")),
            checksum16(&hex!("ab cd ef"))
        );
    }

    #[test]
    fn test_self_verification() {
        let mut header = hex!("45 00 0f fc 38 c0 00 00 40 01 00 00 0a 00 00 02 0a 00 00 01");
        let checksum = checksum16(&header);
        header[10..12].copy_from_slice(&checksum.to_be_bytes());
        assert_eq!(0, checksum16(&header));
    }

    #[test]
    fn test_large_buffer() {
        assert_eq!(0, checksum16(&vec![0xff; 200_000]));
        assert_eq!(0xffff, checksum16(&vec![0x00; 300_001]));
        let mut buf = vec![0xab; 400_000];
        buf[..2].copy_from_slice(&[0, 0]);
        let checksum = checksum16(&buf);
        buf[..2].copy_from_slice(&checksum.to_be_bytes());
        assert_eq!(0, checksum16(&buf));
    }

    #[test]
    fn test_udp_ipv4_checksum() {
        let src = Ipv4Addr::new(192, 168, 1, 201);
        let dest = Ipv4Addr::new(142, 250, 66, 46);
        let mut segment = [0_u8; 64];
        segment[..8].copy_from_slice(&hex!("62 57 81 a8 00 40 87 d4"));
        assert_eq!(0x87d4, udp_ipv4_checksum(&segment, src, dest).unwrap());
    }

    #[test]
    fn test_udp_segment_too_long() {
        let src = Ipv4Addr::new(10, 0, 0, 1);
        let dest = Ipv4Addr::new(1, 1, 1, 1);
        let segment = vec![0_u8; usize::from(u16::MAX) + 1];
        assert_eq!(
            Error::SegmentTooLong(65536, 65535),
            udp_ipv4_checksum(&segment, src, dest).unwrap_err()
        );
        let segment = vec![0_u8; usize::from(u16::MAX)];
        assert!(udp_ipv4_checksum(&segment, src, dest).is_ok());
    }

    #[test]
    fn test_udp_checksum_matches_pseudo_header_sum() {
        let src = Ipv4Addr::new(10, 0, 0, 1);
        let dest = Ipv4Addr::new(1, 1, 1, 1);
        let segment = hex!("88 b8 00 35 00 12 00 00 30 31 32 33 34 35 36 37 38 39");
        let pseudo = pseudo_header(src, dest, IpProtocol::Udp, 18);
        let mut whole = pseudo.to_vec();
        whole.extend_from_slice(&segment);
        assert_eq!(
            checksum16(&whole),
            udp_ipv4_checksum(&segment, src, dest).unwrap()
        );
    }

    #[test]
    fn test_pseudo_header_layout() {
        let header = pseudo_header(
            Ipv4Addr::new(192, 168, 0, 31),
            Ipv4Addr::new(1, 1, 1, 1),
            IpProtocol::Udp,
            18,
        );
        assert_eq!(hex!("c0 a8 00 1f 01 01 01 01 00 11 00 12"), header);
    }
}
