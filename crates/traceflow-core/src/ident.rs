use crate::error::{Error, Result};
use crate::types::{PathId, TimeToLive};
use std::fmt::{Display, Formatter};

/// The 16-bit probe identifier carried in the `IPv4` identification field.
///
/// The high byte is the path and the low byte is the hop, so a router
/// quoting the expired probe back to us tells us exactly which probe it was.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Ord, PartialOrd, Hash)]
pub struct Identifier(pub u16);

impl Identifier {
    /// Encode a path and hop, both of which must be at most 255.
    pub fn encode(path: u16, hop: u16) -> Result<Self> {
        match (u8::try_from(path), u8::try_from(hop)) {
            (Ok(path), Ok(hop)) => Ok(Self::new(PathId(path), TimeToLive(hop))),
            _ => Err(Error::IdentifierOutOfRange { path, hop }),
        }
    }

    #[must_use]
    pub const fn new(path: PathId, ttl: TimeToLive) -> Self {
        Self(((path.0 as u16) << 8) | ttl.0 as u16)
    }

    /// Split the identifier back into its path and hop.
    #[must_use]
    pub const fn decode(self) -> (PathId, TimeToLive) {
        (self.path(), self.ttl())
    }

    #[must_use]
    pub const fn path(self) -> PathId {
        PathId((self.0 >> 8) as u8)
    }

    #[must_use]
    pub const fn ttl(self) -> TimeToLive {
        TimeToLive((self.0 & 0xff) as u8)
    }
}

impl Display for Identifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#06x} (path {}, hop {})", self.0, self.path(), self.ttl())
    }
}
