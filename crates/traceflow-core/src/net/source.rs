use crate::config::EGRESS_DISCOVERY_PORT;
use crate::error::{Error, Result};
use crate::net::platform::Platform;
use crate::net::socket::Socket;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use tracing::instrument;

/// Discover the source address to put in outgoing probes.
pub struct SourceAddr;

impl SourceAddr {
    /// Discover the source `Ipv4Addr`.
    ///
    /// Uses the address of `interface` if one is given, otherwise the
    /// address the OS would route `target_addr` from.
    pub fn discover<S: Socket, P: Platform>(
        target_addr: Ipv4Addr,
        interface: Option<&str>,
    ) -> Result<Ipv4Addr> {
        match interface {
            Some(interface) => P::lookup_interface_addr(interface),
            None => Self::egress::<S>(target_addr),
        }
    }

    /// The local address the OS selects to reach `target_addr`.
    ///
    /// A `UDP` socket is connected (which sends nothing) and its bound
    /// local address read back.  The socket is closed on return.
    #[instrument(ret, level = "trace")]
    pub fn egress<S: Socket>(target_addr: Ipv4Addr) -> Result<Ipv4Addr> {
        let mut socket = S::new_udp_dgram_socket_ipv4()?;
        socket.connect(SocketAddr::new(
            IpAddr::V4(target_addr),
            EGRESS_DISCOVERY_PORT,
        ))?;
        match socket.local_addr()? {
            Some(SocketAddr::V4(addr)) => Ok(*addr.ip()),
            _ => Err(Error::MissingAddr),
        }
    }
}
