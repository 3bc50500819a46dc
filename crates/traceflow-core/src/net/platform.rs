use crate::error::Result;
use std::net::Ipv4Addr;

mod socket;

#[cfg(unix)]
mod unix;

#[cfg(not(unix))]
mod unsupported;

pub use socket::SocketImpl;

#[cfg(unix)]
pub use unix::PlatformImpl;

#[cfg(not(unix))]
pub use unsupported::PlatformImpl;

/// Whether the platform lets a raw socket send a caller built `IPv4` header.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum HeaderInclusion {
    Supported,
    /// Not available, with the reason.
    Unsupported(&'static str),
}

/// Platform specific operations.
#[cfg_attr(test, mockall::automock)]
pub trait Platform {
    /// Report whether raw `IPv4` header injection is available.
    ///
    /// This is checked before any socket is opened so that an unsupported
    /// platform fails up front rather than on the first send.
    fn header_inclusion() -> HeaderInclusion;

    /// Lookup the `IPv4` address of a named interface.
    ///
    /// If the interface has more than one `IPv4` address then an arbitrary
    /// one is returned.
    fn lookup_interface_addr(name: &str) -> Result<Ipv4Addr>;
}
