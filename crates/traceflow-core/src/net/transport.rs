use crate::error::{Error, Result};
use crate::net::platform::{HeaderInclusion, Platform, PlatformImpl, SocketImpl};
use crate::net::socket::Socket;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use tracing::instrument;

/// Sends encoded probes to a single destination over a raw socket.
///
/// The caller supplies the complete `IPv4` header of every probe.
#[derive(Debug)]
pub struct Transport<S: Socket = SocketImpl> {
    socket: S,
    dest_addr: Ipv4Addr,
}

impl Transport {
    /// Open a raw send socket for `dest_addr`.
    ///
    /// Fails with [`Error::UnsupportedPlatform`] if this platform cannot
    /// send a caller built `IPv4` header and with
    /// [`Error::PermissionDenied`] if the process may not open raw sockets.
    pub fn connect(dest_addr: Ipv4Addr) -> Result<Self> {
        Self::connect_with::<PlatformImpl>(dest_addr)
    }
}

impl<S: Socket> Transport<S> {
    #[instrument(level = "debug")]
    pub fn connect_with<P: Platform>(dest_addr: Ipv4Addr) -> Result<Self> {
        if let HeaderInclusion::Unsupported(reason) = P::header_inclusion() {
            return Err(Error::UnsupportedPlatform(reason.to_string()));
        }
        let mut socket = S::new_raw_send_socket_ipv4().map_err(Error::from_raw_socket)?;
        socket.set_header_included(true)?;
        Ok(Self { socket, dest_addr })
    }

    #[must_use]
    pub const fn dest_addr(&self) -> Ipv4Addr {
        self.dest_addr
    }

    /// Send an encoded probe, returning the number of bytes the OS accepted.
    pub fn send(&mut self, probe: &[u8]) -> Result<usize> {
        let addr = SocketAddr::new(IpAddr::V4(self.dest_addr), 0);
        self.socket.send_to(probe, addr).map_err(Error::ProbeFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{IoError, IoOperation};
    use crate::net::platform::MockPlatform;
    use crate::net::socket::MockSocket;
    use mockall::predicate;
    use std::io;
    use std::str::FromStr;
    use std::sync::Mutex;

    static MTX: Mutex<()> = Mutex::new(());

    const DEST: Ipv4Addr = Ipv4Addr::new(1, 1, 1, 1);

    #[test]
    fn test_connect_and_send() -> anyhow::Result<()> {
        let _m = MTX.lock();

        let platform_ctx = MockPlatform::header_inclusion_context();
        platform_ctx
            .expect()
            .times(1)
            .returning(|| HeaderInclusion::Supported);
        let ctx = MockSocket::new_raw_send_socket_ipv4_context();
        ctx.expect().times(1).returning(|| {
            let mut mocket = MockSocket::new();
            mocket
                .expect_set_header_included()
                .with(predicate::eq(true))
                .times(1)
                .returning(|_| Ok(()));
            mocket
                .expect_send_to()
                .with(
                    predicate::eq(&[0x45, 0x00][..]),
                    predicate::eq(SocketAddr::from_str("1.1.1.1:0").unwrap()),
                )
                .times(1)
                .returning(|buf, _| Ok(buf.len()));
            Ok(mocket)
        });

        let mut transport = Transport::<MockSocket>::connect_with::<MockPlatform>(DEST)?;
        assert_eq!(DEST, transport.dest_addr());
        assert_eq!(2, transport.send(&[0x45, 0x00])?);
        Ok(())
    }

    #[test]
    fn test_unsupported_platform_fails_before_socket() {
        let _m = MTX.lock();

        let platform_ctx = MockPlatform::header_inclusion_context();
        platform_ctx
            .expect()
            .times(1)
            .returning(|| HeaderInclusion::Unsupported("no header inclusion"));
        let ctx = MockSocket::new_raw_send_socket_ipv4_context();
        ctx.expect().times(0);

        let err = Transport::<MockSocket>::connect_with::<MockPlatform>(DEST).unwrap_err();
        assert!(matches!(err, Error::UnsupportedPlatform(reason) if reason == "no header inclusion"));
    }

    #[test]
    fn test_permission_denied() {
        let _m = MTX.lock();

        let platform_ctx = MockPlatform::header_inclusion_context();
        platform_ctx
            .expect()
            .times(1)
            .returning(|| HeaderInclusion::Supported);
        let ctx = MockSocket::new_raw_send_socket_ipv4_context();
        ctx.expect().times(1).returning(|| {
            Err(IoError::Other(
                io::Error::from(io::ErrorKind::PermissionDenied),
                IoOperation::NewSocket,
            ))
        });

        let err = Transport::<MockSocket>::connect_with::<MockPlatform>(DEST).unwrap_err();
        assert!(matches!(err, Error::PermissionDenied(_)));
        assert!(err.to_string().starts_with("requires elevated privilege"));
    }

    #[test]
    fn test_send_failure() -> anyhow::Result<()> {
        let _m = MTX.lock();

        let platform_ctx = MockPlatform::header_inclusion_context();
        platform_ctx
            .expect()
            .times(1)
            .returning(|| HeaderInclusion::Supported);
        let ctx = MockSocket::new_raw_send_socket_ipv4_context();
        ctx.expect().times(1).returning(|| {
            let mut mocket = MockSocket::new();
            mocket
                .expect_set_header_included()
                .times(1)
                .returning(|_| Ok(()));
            mocket.expect_send_to().times(1).returning(|_, addr| {
                Err(IoError::SendTo(
                    io::Error::from(io::ErrorKind::ConnectionRefused),
                    addr,
                ))
            });
            Ok(mocket)
        });

        let mut transport = Transport::<MockSocket>::connect_with::<MockPlatform>(DEST)?;
        let err = transport.send(&[0; 38]).unwrap_err();
        assert!(matches!(err, Error::ProbeFailed(IoError::SendTo(..))));
        Ok(())
    }
}
