use crate::error::{Error, Result};
use crate::net::platform::{HeaderInclusion, Platform};
use nix::sys::socket::{AddressFamily, SockaddrLike};
use std::net::Ipv4Addr;
use tracing::instrument;

pub struct PlatformImpl;

impl Platform for PlatformImpl {
    fn header_inclusion() -> HeaderInclusion {
        header_inclusion()
    }

    #[instrument(ret, level = "trace")]
    fn lookup_interface_addr(name: &str) -> Result<Ipv4Addr> {
        nix::ifaddrs::getifaddrs()
            .map_err(|_| Error::UnknownInterface(name.to_string()))?
            .find_map(|ia| {
                ia.address.and_then(|addr| match addr.family() {
                    Some(AddressFamily::Inet) if ia.interface_name == name => {
                        addr.as_sockaddr_in().map(|sock_addr| sock_addr.ip())
                    }
                    _ => None,
                })
            })
            .ok_or_else(|| Error::UnknownInterface(name.to_string()))
    }
}

/// The Darwin kernel rewrites and validates the length and offset fields of
/// an included header in host byte order and rejects the zeroed length a
/// probe carries.
#[cfg(any(target_os = "macos", target_os = "ios"))]
const fn header_inclusion() -> HeaderInclusion {
    HeaderInclusion::Unsupported("raw IPv4 header injection is not supported on this platform")
}

#[cfg(not(any(target_os = "macos", target_os = "ios")))]
const fn header_inclusion() -> HeaderInclusion {
    HeaderInclusion::Supported
}
