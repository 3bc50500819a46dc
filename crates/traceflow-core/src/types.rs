use derive_more::{Display, From};

/// `PathId` newtype.
///
/// Identifies one of the (up to 255) flows probed towards a target, each
/// using its own source port.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Ord, PartialOrd, Hash, Display, From)]
pub struct PathId(pub u8);

/// `TimeToLive` (ttl) newtype, the hop number along a path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Ord, PartialOrd, Hash, Display, From)]
pub struct TimeToLive(pub u8);

/// Port newtype.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Ord, PartialOrd, Display, From)]
pub struct Port(pub u16);

/// `TypeOfService` (aka `DSCP` & `ECN`) newtype.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Ord, PartialOrd, Display, From)]
pub struct TypeOfService(pub u8);
