use crate::error::{Error, Result};
use crate::net::platform::{HeaderInclusion, Platform};
use std::net::Ipv4Addr;

pub struct PlatformImpl;

impl Platform for PlatformImpl {
    fn header_inclusion() -> HeaderInclusion {
        HeaderInclusion::Unsupported("raw sockets cannot send UDP with a caller built IPv4 header")
    }

    fn lookup_interface_addr(name: &str) -> Result<Ipv4Addr> {
        Err(Error::UnknownInterface(name.to_string()))
    }
}
