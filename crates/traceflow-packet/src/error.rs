use thiserror::Error;

/// A packet error result.
pub type Result<T> = std::result::Result<T, Error>;

/// A packet error.
#[derive(Error, Debug, Eq, PartialEq)]
pub enum Error {
    /// The buffer is too short to hold the named packet.
    ///
    /// Holds the packet name, the minimum length and the length supplied.
    #[error("truncated {0} packet, minimum={1}, provided={2}")]
    InsufficientPacketBuffer(String, usize, usize),
    /// A transport segment is longer than its length field can hold.
    ///
    /// Holds the segment length and the maximum.
    #[error("segment of {0} bytes exceeds the maximum of {1}")]
    SegmentTooLong(usize, usize),
}

impl Error {
    pub(crate) fn truncated(name: &str, minimum: usize, provided: usize) -> Self {
        Self::InsufficientPacketBuffer(String::from(name), minimum, provided)
    }
}
