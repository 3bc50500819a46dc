use crate::error::IoResult as Result;
use std::net::SocketAddr;
use std::time::Duration;

/// The socket operations needed to send probes and capture replies.
#[cfg_attr(test, mockall::automock)]
pub trait Socket
where
    Self: Sized,
{
    /// Create a raw `IPv4` socket for sending packets with a caller built
    /// `IPv4` header.
    fn new_raw_send_socket_ipv4() -> Result<Self>;
    /// Create a raw `IPv4` socket which receives all inbound `ICMP`.
    fn new_icmp_recv_socket_ipv4() -> Result<Self>;
    /// Create a (non-raw) `IPv4`/`UDP` socket for local address discovery.
    fn new_udp_dgram_socket_ipv4() -> Result<Self>;
    fn set_header_included(&mut self, included: bool) -> Result<()>;
    fn set_read_timeout(&mut self, timeout: Duration) -> Result<()>;
    fn connect(&mut self, address: SocketAddr) -> Result<()>;
    /// Returns the number of bytes accepted by the OS.
    fn send_to(&mut self, buf: &[u8], addr: SocketAddr) -> Result<usize>;
    fn recv_from(&mut self, buf: &mut [u8]) -> Result<(usize, Option<SocketAddr>)>;
    fn local_addr(&mut self) -> Result<Option<SocketAddr>>;
}

#[cfg(test)]
pub mod tests {
    use std::sync::Mutex;

    /// Held by every test which mocks the `UDP` datagram socket constructor,
    /// whose expectations are process wide.
    pub static UDP_DGRAM_MTX: Mutex<()> = Mutex::new(());

    #[macro_export]
    macro_rules! mocket_recv_from {
        ($packet: expr, $addr: expr) => {
            move |buf: &mut [u8]| -> IoResult<(usize, Option<SocketAddr>)> {
                buf[..$packet.len()].copy_from_slice(&$packet);
                Ok(($packet.len(), Some($addr)))
            }
        };
    }
}
