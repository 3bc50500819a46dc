//! Background capture of `ICMP` replies to our probes.
//!
//! A [`Collector`] owns a raw `ICMP` socket and a receive thread which
//! decodes every datagram, recovers the identifier of the probe it quotes
//! and stores it.  The store is only ever read through copies.

use crate::codec::{IcmpMessage, Ipv4Header, ReplyKind};
use crate::config::MAX_PACKET_SIZE;
use crate::error::{Error, Result};
use crate::ident::Identifier;
use crate::net::socket::Socket;
use crate::net::SocketImpl;
use crate::types::{PathId, TimeToLive};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::instrument;

/// A decoded reply to one of our probes.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct CapturedReply {
    /// The identifier of the probe, taken from the quoted `IPv4` header.
    pub identifier: Identifier,
    /// The address the reply came from.
    pub responder: Ipv4Addr,
    pub kind: ReplyKind,
    pub outer: Ipv4Header,
    pub icmp: IcmpMessage,
}

impl CapturedReply {
    /// Decode a raw `IPv4` datagram carrying an `ICMP` error message.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let outer = Ipv4Header::decode(bytes)?;
        let kind = ReplyKind::decode(&outer.payload)?;
        let icmp = IcmpMessage::decode(&outer.payload)?;
        let quoted = icmp.quoted_header()?;
        Ok(Self {
            identifier: Identifier(quoted.identification),
            responder: outer.source,
            kind,
            outer,
            icmp,
        })
    }

    #[must_use]
    pub const fn path(&self) -> PathId {
        self.identifier.path()
    }

    #[must_use]
    pub const fn ttl(&self) -> TimeToLive {
        self.identifier.ttl()
    }

    #[must_use]
    pub const fn is_time_exceeded(&self) -> bool {
        matches!(self.kind, ReplyKind::TimeExceeded(_))
    }
}

/// Captures replies for a single destination on a background thread.
///
/// The thread runs until [`Collector::stop`] is called or the collector is
/// dropped.  Both set a shutdown flag which the thread checks each time a
/// receive returns or times out, so shutdown takes at most one read timeout.
#[derive(Debug)]
pub struct Collector {
    inner: Arc<Inner>,
    handle: Option<JoinHandle<Result<()>>>,
}

#[derive(Debug)]
struct Inner {
    dest_addr: Ipv4Addr,
    store: Mutex<BTreeMap<Identifier, CapturedReply>>,
    shutdown: AtomicBool,
}

impl Collector {
    /// Open a raw `ICMP` socket and start capturing.
    ///
    /// Fails with [`Error::PermissionDenied`] if the process may not open
    /// raw sockets.
    pub fn start(dest_addr: Ipv4Addr, read_timeout: Duration) -> Result<Self> {
        Self::start_with::<SocketImpl>(dest_addr, read_timeout)
    }

    #[instrument(level = "debug")]
    pub fn start_with<S: Socket + Send + 'static>(
        dest_addr: Ipv4Addr,
        read_timeout: Duration,
    ) -> Result<Self> {
        let mut socket = S::new_icmp_recv_socket_ipv4().map_err(Error::from_raw_socket)?;
        socket.set_read_timeout(read_timeout)?;
        let inner = Arc::new(Inner {
            dest_addr,
            store: Mutex::new(BTreeMap::new()),
            shutdown: AtomicBool::new(false),
        });
        let receiver = inner.clone();
        let handle = thread::Builder::new()
            .name(String::from("traceflow-capture"))
            .spawn(move || receiver.run(socket))
            .map_err(|err| Error::Other(err.to_string()))?;
        tracing::debug!(%dest_addr, ?read_timeout, "capture started");
        Ok(Self {
            inner,
            handle: Some(handle),
        })
    }

    #[must_use]
    pub fn dest_addr(&self) -> Ipv4Addr {
        self.inner.dest_addr
    }

    /// A copy of every reply captured so far, ordered by identifier.
    #[must_use]
    pub fn get_all(&self) -> Vec<CapturedReply> {
        self.inner.store.lock().values().cloned().collect()
    }

    /// A copy of the replies captured so far for `path`, ordered by hop.
    #[must_use]
    pub fn get_by_path(&self, path: PathId) -> Vec<CapturedReply> {
        let first = Identifier::new(path, TimeToLive(u8::MIN));
        let last = Identifier::new(path, TimeToLive(u8::MAX));
        self.inner
            .store
            .lock()
            .range(first..=last)
            .map(|(_, reply)| reply.clone())
            .collect()
    }

    #[must_use]
    pub fn get_by_identifier(&self, identifier: Identifier) -> Option<CapturedReply> {
        self.inner.store.lock().get(&identifier).cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.store.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stop the receive thread and wait for it to exit.
    ///
    /// Returns the error which ended the receive loop early, if any.
    pub fn stop(mut self) -> Result<()> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<()> {
        self.inner.shutdown.store(true, Ordering::Relaxed);
        match self.handle.take() {
            Some(handle) => {
                let res = handle
                    .join()
                    .map_err(|_| Error::Other(String::from("capture thread panicked")))?;
                tracing::debug!(?res, "capture stopped");
                res
            }
            None => Ok(()),
        }
    }
}

impl Drop for Collector {
    fn drop(&mut self) {
        if let Err(err) = self.shutdown() {
            tracing::warn!(%err, "capture failed");
        }
    }
}

impl Inner {
    fn run<S: Socket>(&self, mut socket: S) -> Result<()> {
        let mut buf = [0_u8; MAX_PACKET_SIZE];
        while !self.shutdown.load(Ordering::Relaxed) {
            match socket.recv_from(&mut buf) {
                Ok((bytes_read, _)) => self.handle(&buf[..bytes_read]),
                Err(err) if err.is_timeout() => {}
                Err(err) => return Err(Error::IoError(err)),
            }
        }
        Ok(())
    }

    fn handle(&self, bytes: &[u8]) {
        let reply = match CapturedReply::decode(bytes) {
            Ok(reply) => reply,
            Err(err) => {
                tracing::debug!(%err, "dropping undecodable packet");
                return;
            }
        };
        // Replies from the destination itself are kept whatever their type.
        if reply.is_time_exceeded() || reply.responder == self.dest_addr {
            tracing::trace!(identifier = %reply.identifier, responder = %reply.responder, "captured");
            self.store.lock().insert(reply.identifier, reply);
        } else {
            tracing::debug!(responder = %reply.responder, kind = ?reply.kind, "dropping unrelated reply");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{IoError, IoOperation, IoResult};
    use crate::mocket_recv_from;
    use crate::net::socket::MockSocket;
    use hex_literal::hex;
    use traceflow_packet::icmpv4::{
        IcmpDestinationUnreachableCode, IcmpTimeExceededCode, IcmpType,
    };
    use std::collections::VecDeque;
    use std::io;
    use std::net::SocketAddr;
    use std::sync::Mutex as StdMutex;
    use std::time::Instant;

    static MTX: StdMutex<()> = StdMutex::new(());

    const DEST: Ipv4Addr = Ipv4Addr::new(1, 1, 1, 1);
    const ROUTER: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 1);

    const CAPTURED: [u8; 80] = hex!(
        "45 c0 3c 00 4c 54 00 00 39 01 71 d0 01 01 01 01 c0 a8 00 1f
         03 03 bf f7 00 00 00 00
         45 00 34 00 e8 ca 00 00 01 11 0e 26 c0 a8 00 1f 01 01 01 01
         e8 b5 82 af 00 20 d1 7f
         00 00 00 00 00 00 00 00 00 00 00 00
         00 00 00 00 00 00 00 00 00 00 00 00"
    );

    type Queue = Arc<StdMutex<VecDeque<IoResult<Vec<u8>>>>>;

    /// An `ICMP` error from `responder` quoting the probe `identifier`.
    fn reply(icmp_type: IcmpType, responder: Ipv4Addr, identifier: Identifier) -> Vec<u8> {
        let mut buf = vec![0x45, 0x00, 0x00, 0x38, 0x00, 0x00, 0x00, 0x00, 0x40, 0x01, 0x00, 0x00];
        buf.extend(responder.octets());
        buf.extend([192, 168, 0, 2]);
        buf.extend([icmp_type.id(), 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]);
        buf.extend([0x45, 0x00, 0x00, 0x26]);
        buf.extend(identifier.0.to_be_bytes());
        buf.extend([0x00, 0x00, 0x01, 0x11, 0x00, 0x00, 192, 168, 0, 2]);
        buf.extend(DEST.octets());
        buf.extend([0x88, 0xb8, 0x00, 0x35, 0x00, 0x12, 0x00, 0x00]);
        buf
    }

    fn id(path: u8, ttl: u8) -> Identifier {
        Identifier::new(PathId(path), TimeToLive(ttl))
    }

    fn would_block() -> IoError {
        IoError::Other(io::Error::from(io::ErrorKind::WouldBlock), IoOperation::RecvFrom)
    }

    /// Start a collector whose socket yields the datagrams pushed to the
    /// returned queue, timing out whenever the queue is empty.
    fn start_mocked() -> anyhow::Result<(Collector, Queue)> {
        let queue: Queue = Arc::new(StdMutex::new(VecDeque::new()));
        let socket_queue = queue.clone();
        let ctx = MockSocket::new_icmp_recv_socket_ipv4_context();
        ctx.expect().times(1).returning(move || {
            let queue = socket_queue.clone();
            let mut mocket = MockSocket::new();
            mocket
                .expect_set_read_timeout()
                .times(1)
                .returning(|_| Ok(()));
            mocket.expect_recv_from().returning(move |buf| {
                let next = queue.lock().unwrap().pop_front();
                match next {
                    Some(Ok(packet)) => {
                        let recv = mocket_recv_from!(packet, SocketAddr::from((ROUTER, 0)));
                        recv(buf)
                    }
                    Some(Err(err)) => Err(err),
                    None => {
                        thread::sleep(Duration::from_millis(1));
                        Err(would_block())
                    }
                }
            });
            Ok(mocket)
        });
        let collector = Collector::start_with::<MockSocket>(DEST, Duration::from_millis(10))?;
        Ok((collector, queue))
    }

    fn push(queue: &Queue, packet: Vec<u8>) {
        queue.lock().unwrap().push_back(Ok(packet));
    }

    /// Wait until the receive thread has drained the queue.
    fn drain(queue: &Queue) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !queue.lock().unwrap().is_empty() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }
        // one more read so the last datagram has been handled
        push_would_block(queue);
        while !queue.lock().unwrap().is_empty() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }
    }

    fn push_would_block(queue: &Queue) {
        queue.lock().unwrap().push_back(Err(would_block()));
    }

    #[test]
    fn test_decode_captured_reply() -> anyhow::Result<()> {
        let reply = CapturedReply::decode(&CAPTURED)?;
        assert_eq!(Identifier(0xe8ca), reply.identifier);
        assert_eq!(DEST, reply.responder);
        assert_eq!(57, reply.outer.ttl);
        assert_eq!(IcmpType::DestinationUnreachable, reply.icmp.icmp_type);
        assert_eq!(
            ReplyKind::DestinationUnreachable(IcmpDestinationUnreachableCode::PortUnreachable),
            reply.kind
        );
        assert!(!reply.is_time_exceeded());
        Ok(())
    }

    #[test]
    fn test_decode_reply_without_quoted_header() {
        let err = CapturedReply::decode(&CAPTURED[..40]).unwrap_err();
        assert!(matches!(err, Error::PacketError(_)));
    }

    #[test]
    fn test_collects_and_queries() -> anyhow::Result<()> {
        let _m = MTX.lock();
        let (collector, queue) = start_mocked()?;
        push(&queue, reply(IcmpType::TimeExceeded, ROUTER, id(1, 1)));
        push(&queue, reply(IcmpType::TimeExceeded, ROUTER, id(1, 2)));
        push(&queue, reply(IcmpType::DestinationUnreachable, DEST, id(1, 3)));
        push(&queue, reply(IcmpType::TimeExceeded, ROUTER, id(2, 1)));
        drain(&queue);

        assert_eq!(4, collector.len());
        assert!(!collector.is_empty());
        let path1 = collector.get_by_path(PathId(1));
        assert_eq!(
            vec![id(1, 1), id(1, 2), id(1, 3)],
            path1.iter().map(|r| r.identifier).collect::<Vec<_>>()
        );
        assert_eq!(1, collector.get_by_path(PathId(2)).len());
        assert!(collector.get_by_path(PathId(3)).is_empty());
        let terminal = collector.get_by_identifier(id(1, 3)).unwrap();
        assert_eq!(DEST, terminal.responder);
        assert_eq!(
            ReplyKind::DestinationUnreachable(IcmpDestinationUnreachableCode::NetUnreachable),
            terminal.kind
        );
        let first = collector.get_by_identifier(id(1, 1)).unwrap();
        assert_eq!(ReplyKind::TimeExceeded(IcmpTimeExceededCode::TtlExpired), first.kind);
        assert!(collector.get_by_identifier(id(9, 9)).is_none());
        assert_eq!(4, collector.get_all().len());
        collector.stop()?;
        Ok(())
    }

    #[test]
    fn test_ignores_unrelated_and_undecodable() -> anyhow::Result<()> {
        let _m = MTX.lock();
        let (collector, queue) = start_mocked()?;
        push(&queue, reply(IcmpType::DestinationUnreachable, ROUTER, id(1, 1)));
        push(&queue, reply(IcmpType::EchoReply, ROUTER, id(1, 2)));
        push(&queue, vec![0x45, 0x00, 0x00]);
        push(&queue, CAPTURED[..30].to_vec());
        push(&queue, reply(IcmpType::TimeExceeded, ROUTER, id(1, 3)));
        drain(&queue);

        assert_eq!(vec![id(1, 3)], collector.get_all().iter().map(|r| r.identifier).collect::<Vec<_>>());
        collector.stop()?;
        Ok(())
    }

    #[test]
    fn test_later_reply_overwrites() -> anyhow::Result<()> {
        let _m = MTX.lock();
        let (collector, queue) = start_mocked()?;
        push(&queue, reply(IcmpType::TimeExceeded, ROUTER, id(1, 4)));
        push(&queue, reply(IcmpType::DestinationUnreachable, DEST, id(1, 4)));
        drain(&queue);

        let all = collector.get_all();
        assert_eq!(1, all.len());
        assert_eq!(DEST, all[0].responder);
        collector.stop()?;
        Ok(())
    }

    #[test]
    fn test_captured_fixture_is_stored_for_destination() -> anyhow::Result<()> {
        let _m = MTX.lock();
        let (collector, queue) = start_mocked()?;
        push(&queue, CAPTURED.to_vec());
        drain(&queue);

        let reply = collector.get_by_identifier(Identifier(0xe8ca)).unwrap();
        assert_eq!(CapturedReply::decode(&CAPTURED)?, reply);
        collector.stop()?;
        Ok(())
    }

    #[test]
    fn test_snapshot_is_a_copy() -> anyhow::Result<()> {
        let _m = MTX.lock();
        let (collector, queue) = start_mocked()?;
        push(&queue, reply(IcmpType::TimeExceeded, ROUTER, id(1, 1)));
        drain(&queue);
        let snapshot = collector.get_all();
        push(&queue, reply(IcmpType::TimeExceeded, ROUTER, id(1, 2)));
        drain(&queue);

        assert_eq!(1, snapshot.len());
        assert_eq!(2, collector.len());
        collector.stop()?;
        Ok(())
    }

    #[test]
    fn test_recv_error_is_reported_on_stop() -> anyhow::Result<()> {
        let _m = MTX.lock();
        let (collector, queue) = start_mocked()?;
        push(&queue, reply(IcmpType::TimeExceeded, ROUTER, id(1, 1)));
        queue.lock().unwrap().push_back(Err(IoError::Other(
            io::Error::from(io::ErrorKind::ConnectionReset),
            IoOperation::RecvFrom,
        )));
        let deadline = Instant::now() + Duration::from_secs(5);
        while !queue.lock().unwrap().is_empty() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }

        assert_eq!(1, collector.len());
        let err = collector.stop().unwrap_err();
        assert!(matches!(err, Error::IoError(_)));
        Ok(())
    }

    #[test]
    fn test_permission_denied() {
        let _m = MTX.lock();
        let ctx = MockSocket::new_icmp_recv_socket_ipv4_context();
        ctx.expect().times(1).returning(|| {
            Err(IoError::Other(
                io::Error::from(io::ErrorKind::PermissionDenied),
                IoOperation::NewSocket,
            ))
        });

        let err = Collector::start_with::<MockSocket>(DEST, Duration::from_millis(10)).unwrap_err();
        assert!(matches!(err, Error::PermissionDenied(_)));
    }

    #[test]
    fn test_drop_stops_thread() -> anyhow::Result<()> {
        let _m = MTX.lock();
        let (collector, _queue) = start_mocked()?;
        let inner = collector.inner.clone();
        drop(collector);
        assert!(inner.shutdown.load(Ordering::Relaxed));
        assert_eq!(1, Arc::strong_count(&inner));
        Ok(())
    }

    #[test]
    fn test_concurrent_readers() -> anyhow::Result<()> {
        let _m = MTX.lock();
        let (collector, queue) = start_mocked()?;
        let collector = Arc::new(collector);
        let readers = (0..4)
            .map(|_| {
                let collector = collector.clone();
                thread::spawn(move || {
                    for _ in 0..200 {
                        for reply in collector.get_all() {
                            assert_eq!(ROUTER, reply.responder);
                            assert_eq!(reply.identifier, Identifier(reply.icmp.quoted_header().unwrap().identification));
                        }
                        let _ = collector.get_by_path(PathId(3));
                    }
                })
            })
            .collect::<Vec<_>>();
        for path in 1..=8 {
            for ttl in 1..=16 {
                push(&queue, reply(IcmpType::TimeExceeded, ROUTER, id(path, ttl)));
            }
        }
        for reader in readers {
            reader.join().unwrap();
        }
        drain(&queue);
        assert_eq!(128, collector.len());
        assert_eq!(16, collector.get_by_path(PathId(3)).len());
        Ok(())
    }
}
