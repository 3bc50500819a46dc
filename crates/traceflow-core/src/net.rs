//! Raw socket plumbing.
//!
//! The [`socket::Socket`] and [`platform::Platform`] traits are the seams
//! where tests swap in mocks.

pub mod platform;
pub mod socket;
mod source;
mod transport;

pub use platform::{HeaderInclusion, Platform, PlatformImpl, SocketImpl};
pub use source::SourceAddr;
pub use transport::Transport;
