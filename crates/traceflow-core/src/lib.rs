//! Traceflow - multipath UDP tracing.
//!
//! This crate sends `UDP` probes whose `IPv4` identification field encodes
//! both a path and a hop, captures the `ICMP` replies on a background thread
//! and rebuilds one hop sequence per path.
//!
//! Each path uses its own source port, so routers which balance flows across
//! equal cost links send each path along a (potentially) different route.
//!
//! # Example
//!
//! Trace a single path towards `1.1.1.1`:
//!
//! ```no_run
//! # fn main() -> anyhow::Result<()> {
//! use std::net::Ipv4Addr;
//! use std::time::Duration;
//! use traceflow_core::{
//!     reconstruct, Collector, Identifier, PathId, Port, ProbeDescriptor, TimeToLive, Transport,
//! };
//!
//! let dest = Ipv4Addr::new(1, 1, 1, 1);
//! let collector = Collector::start(dest, Duration::from_millis(100))?;
//! let mut transport = Transport::connect(dest)?;
//! for ttl in 1..=30 {
//!     let probe = ProbeDescriptor::builder()
//!         .dest_addr(dest)
//!         .src_port(Port(33453))
//!         .dst_port(Port(33452))
//!         .ttl(TimeToLive(ttl))
//!         .identifier(Identifier::new(PathId(1), TimeToLive(ttl)))
//!         .build()?;
//!     transport.send(&probe.encode()?)?;
//!     std::thread::sleep(Duration::from_millis(100));
//! }
//! let traces = reconstruct(&collector.get_all(), dest);
//! collector.stop()?;
//! for (path, trace) in traces.paths() {
//!     println!("{path}: {:?}", trace);
//! }
//! # Ok(())
//! # }
//! ```
#![warn(clippy::all, clippy::pedantic, clippy::nursery, rust_2018_idioms)]
#![allow(
    clippy::module_name_repetitions,
    clippy::option_if_let_else,
    clippy::missing_const_for_fn,
    clippy::cast_possible_truncation,
    clippy::missing_errors_doc
)]
#![deny(unsafe_code)]

mod capture;
mod codec;
mod config;
mod error;
mod ident;
mod net;
mod probe;
mod reconstruct;
mod types;

pub use capture::{CapturedReply, Collector};
pub use codec::{IcmpMessage, Ipv4Header, ReplyKind, UdpSegment};
pub use config::{
    defaults, IpVersion, Protocol, EGRESS_DISCOVERY_PORT, MAX_PACKET_SIZE, MAX_PATHS,
    PROBE_PAYLOAD,
};
pub use error::{Error, IoError, IoOperation, IoResult, Result};
pub use ident::Identifier;
pub use net::socket::Socket;
pub use net::{HeaderInclusion, Platform, PlatformImpl, SocketImpl, SourceAddr, Transport};
pub use probe::{ProbeBuilder, ProbeDescriptor, PROBE_SIZE};
pub use reconstruct::{reconstruct, Hop, PathTrace, TraceSet};
pub use types::{PathId, Port, TimeToLive, TypeOfService};
