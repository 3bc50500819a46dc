use crate::config::{LogFormat, TraceflowConfig};
use crate::report;
use anyhow::{anyhow, Context};
use std::net::{IpAddr, Ipv4Addr};
use std::process::ExitCode;
use std::str::FromStr;
use std::thread;
use traceflow_core::{
    reconstruct, CapturedReply, Collector, Error, Identifier, PathId, PlatformImpl, Port,
    ProbeDescriptor, SocketImpl, SourceAddr, TimeToLive, TraceSet, Transport, TypeOfService,
};
use traceflow_privilege::Privilege;

/// Run the traceflow application.
pub fn run_traceflow(cfg: &TraceflowConfig) -> anyhow::Result<ExitCode> {
    configure_logging(cfg);
    Privilege::acquire_privileges()?.check()?;
    let dest_addr = resolve_target(&cfg.target)?;
    println!("Resolved {} to {dest_addr}", cfg.target);
    let source_addr = match cfg.source_addr {
        Some(addr) => addr,
        None => SourceAddr::discover::<SocketImpl, PlatformImpl>(
            dest_addr,
            cfg.interface.as_deref(),
        )?,
    };
    tracing::debug!(%source_addr, %dest_addr, "starting trace");
    let collector = Collector::start(dest_addr, cfg.read_timeout)?;
    let mut transport = Transport::connect(dest_addr)?;
    Privilege::drop_privileges()?;
    for path in 1..=cfg.paths {
        trace_path(cfg, &collector, &mut transport, source_addr, PathId(path))?;
    }
    let replies = collector.get_all();
    collector.stop()?;
    let Some(traces) = rebuild_paths(&replies, dest_addr, cfg.dedup) else {
        println!("Did not receive any TTL expired ICMP packets. Exiting");
        return Ok(ExitCode::FAILURE);
    };
    report::run_report(&traces, cfg.format)?;
    Ok(ExitCode::SUCCESS)
}

/// Reconstruct the paths, or `None` if no reply belongs to any of them.
fn rebuild_paths(
    replies: &[CapturedReply],
    dest_addr: Ipv4Addr,
    dedup: bool,
) -> Option<TraceSet> {
    let traces = reconstruct(replies, dest_addr);
    if traces.is_empty() {
        None
    } else if dedup {
        Some(traces.dedup_paths())
    } else {
        Some(traces)
    }
}

/// Probe every ttl of a single path.
///
/// The path is abandoned early once the destination has replied to any
/// probe on it, or if a probe cannot be sent.
fn trace_path(
    cfg: &TraceflowConfig,
    collector: &Collector,
    transport: &mut Transport,
    source_addr: Ipv4Addr,
    path: PathId,
) -> anyhow::Result<()> {
    let src_port = Port(cfg.src_port + u16::from(path.0));
    println!(
        "Looking at Path ID {path} (src port:{src_port} , dst port:{})",
        cfg.dst_port
    );
    for ttl in (1..=cfg.max_ttl).map(TimeToLive) {
        let probe = ProbeDescriptor::builder()
            .source_addr(source_addr)
            .dest_addr(transport.dest_addr())
            .src_port(src_port)
            .dst_port(Port(cfg.dst_port))
            .ttl(ttl)
            .tos(TypeOfService(cfg.tos))
            .identifier(Identifier::new(path, ttl))
            .build()?;
        match transport.send(&probe.encode()?) {
            Ok(_) => {}
            Err(Error::ProbeFailed(err)) => {
                tracing::warn!(%path, %ttl, %err, "abandoning path");
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        }
        thread::sleep(cfg.wait);
        if reached_destination(&collector.get_by_path(path), collector.dest_addr()) {
            tracing::debug!(%path, %ttl, "destination reached");
            break;
        }
    }
    Ok(())
}

fn reached_destination(replies: &[CapturedReply], dest_addr: Ipv4Addr) -> bool {
    replies.iter().any(|reply| reply.responder == dest_addr)
}

/// Resolve the target to the first `IPv4` address found.
fn resolve_target(target: &str) -> anyhow::Result<Ipv4Addr> {
    if let Ok(addr) = Ipv4Addr::from_str(target) {
        return Ok(addr);
    }
    dns_lookup::lookup_host(target)
        .with_context(|| format!("failed to resolve target: {target}"))?
        .into_iter()
        .find_map(|addr| match addr {
            IpAddr::V4(addr) => Some(addr),
            IpAddr::V6(_) => None,
        })
        .ok_or_else(|| anyhow!("failed to find an IPv4 address for {target}"))
}

fn configure_logging(cfg: &TraceflowConfig) {
    if cfg.verbose {
        match cfg.log_format {
            LogFormat::Compact => {
                tracing_subscriber::fmt()
                    .with_env_filter(&cfg.log_filter)
                    .compact()
                    .init();
            }
            LogFormat::Pretty => {
                tracing_subscriber::fmt()
                    .with_env_filter(&cfg.log_filter)
                    .pretty()
                    .init();
            }
            LogFormat::Json => {
                tracing_subscriber::fmt()
                    .with_env_filter(&cfg.log_filter)
                    .json()
                    .init();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // A time exceeded from 10.0.0.1 quoting path 1 hop 1.
    const TIME_EXCEEDED: [u8; 56] = [
        0x45, 0x00, 0x00, 0x38, 0x00, 0x00, 0x00, 0x00, 0x40, 0x01, 0x00, 0x00, 0x0a, 0x00, 0x00,
        0x01, 0xc0, 0xa8, 0x00, 0x1f, 0x0b, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x45, 0x00,
        0x00, 0x26, 0x01, 0x01, 0x00, 0x00, 0x01, 0x11, 0x00, 0x00, 0xc0, 0xa8, 0x00, 0x1f, 0x01,
        0x01, 0x01, 0x01, 0x82, 0xad, 0x82, 0xac, 0x00, 0x12, 0x00, 0x00,
    ];

    #[test]
    fn test_resolve_literal() {
        assert_eq!(
            Ipv4Addr::new(192, 0, 2, 1),
            resolve_target("192.0.2.1").unwrap()
        );
    }

    #[test]
    fn test_reached_destination() {
        let mut reply = CapturedReply::decode(&TIME_EXCEEDED).unwrap();
        let dest = Ipv4Addr::new(1, 1, 1, 1);
        assert_eq!(Identifier(0x0101), reply.identifier);
        assert!(!reached_destination(&[reply.clone()], dest));
        reply.responder = dest;
        assert!(reached_destination(&[reply], dest));
        assert!(!reached_destination(&[], dest));
    }

    #[test]
    fn test_rebuild_paths() {
        let reply = CapturedReply::decode(&TIME_EXCEEDED).unwrap();
        let dest = Ipv4Addr::new(1, 1, 1, 1);
        let traces = rebuild_paths(&[reply.clone()], dest, false).unwrap();
        assert_eq!(1, traces.len());
        let duplicate = CapturedReply {
            identifier: Identifier::new(PathId(2), TimeToLive(1)),
            ..reply.clone()
        };
        let traces = rebuild_paths(&[reply, duplicate], dest, true).unwrap();
        assert_eq!(1, traces.len());
    }

    #[test]
    fn test_rebuild_paths_without_own_replies() {
        let reply = CapturedReply::decode(&TIME_EXCEEDED).unwrap();
        let foreign = [
            CapturedReply {
                identifier: Identifier::new(PathId(0), TimeToLive(1)),
                ..reply.clone()
            },
            CapturedReply {
                identifier: Identifier::new(PathId(1), TimeToLive(0)),
                ..reply
            },
        ];
        let dest = Ipv4Addr::new(1, 1, 1, 1);
        assert!(rebuild_paths(&foreign, dest, false).is_none());
        assert!(rebuild_paths(&[], dest, true).is_none());
    }
}
