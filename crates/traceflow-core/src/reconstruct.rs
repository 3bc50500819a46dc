//! Turn captured replies into one hop sequence per path.

use crate::capture::CapturedReply;
use crate::types::{PathId, TimeToLive};
use std::collections::{BTreeMap, HashSet};
use std::fmt::{Display, Formatter};
use std::net::{AddrParseError, Ipv4Addr};
use std::str::FromStr;

/// A single hop of a reconstructed path.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Hop {
    /// The address which replied for this hop.
    Addr(Ipv4Addr),
    /// No reply was captured for this hop, rendered as `*`.
    NoReply,
    /// This hop is beyond the end of a path shorter than the longest
    /// path, rendered as `x`.
    Padding,
}

impl Display for Hop {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Addr(addr) => write!(f, "{addr}"),
            Self::NoReply => write!(f, "*"),
            Self::Padding => write!(f, "x"),
        }
    }
}

impl FromStr for Hop {
    type Err = AddrParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "*" => Ok(Self::NoReply),
            "x" => Ok(Self::Padding),
            addr => Ok(Self::Addr(Ipv4Addr::from_str(addr)?)),
        }
    }
}

/// The hops of a single path keyed by ttl.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct PathTrace(BTreeMap<TimeToLive, Hop>);

impl PathTrace {
    #[must_use]
    pub fn get(&self, ttl: TimeToLive) -> Option<&Hop> {
        self.0.get(&ttl)
    }

    /// Set the hop at `ttl`, returning the hop it replaced.
    pub fn insert(&mut self, ttl: TimeToLive, hop: Hop) -> Option<Hop> {
        self.0.insert(ttl, hop)
    }

    /// The hops in ttl order.
    pub fn hops(&self) -> impl Iterator<Item = (TimeToLive, &Hop)> + '_ {
        self.0.iter().map(|(ttl, hop)| (*ttl, hop))
    }

    /// The highest ttl with a hop.
    #[must_use]
    pub fn last_ttl(&self) -> Option<TimeToLive> {
        self.0.keys().next_back().copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Keep only the lowest hop at which `dest_addr` replied.
    ///
    /// Once a probe reaches the destination every probe with a higher ttl
    /// does too, so later replies from it carry no information.
    pub fn dedup_terminal(&mut self, dest_addr: Ipv4Addr) {
        let mut seen = false;
        self.0.retain(|_, hop| {
            if *hop != Hop::Addr(dest_addr) {
                return true;
            }
            !std::mem::replace(&mut seen, true)
        });
    }

    /// Insert [`Hop::NoReply`] for every ttl from 1 to the last ttl which
    /// has no hop.
    pub fn fill_missing(&mut self) {
        if let Some(last) = self.last_ttl() {
            for ttl in 1..=last.0 {
                self.0.entry(TimeToLive(ttl)).or_insert(Hop::NoReply);
            }
        }
    }

    /// Insert [`Hop::Padding`] for every ttl after the last ttl up to and
    /// including `path_max`.
    pub fn pad_to(&mut self, path_max: TimeToLive) {
        let first = self.last_ttl().map_or(1, |ttl| ttl.0.saturating_add(1));
        for ttl in first..=path_max.0 {
            self.0.entry(TimeToLive(ttl)).or_insert(Hop::Padding);
        }
    }
}

impl FromIterator<(TimeToLive, Hop)> for PathTrace {
    fn from_iter<T: IntoIterator<Item = (TimeToLive, Hop)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// The reconstructed paths keyed by path id.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct TraceSet(BTreeMap<PathId, PathTrace>);

impl TraceSet {
    /// The paths in path id order.
    pub fn paths(&self) -> impl Iterator<Item = (PathId, &PathTrace)> + '_ {
        self.0.iter().map(|(path, trace)| (*path, trace))
    }

    #[must_use]
    pub fn path(&self, path: PathId) -> Option<&PathTrace> {
        self.0.get(&path)
    }

    /// The highest ttl across all paths.
    #[must_use]
    pub fn path_max(&self) -> Option<TimeToLive> {
        self.0.values().filter_map(PathTrace::last_ttl).max()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Remove paths whose ordered hops are identical to a lower numbered
    /// path.
    ///
    /// The hops of each remaining path are renumbered from ttl 1.
    #[must_use]
    pub fn dedup_paths(self) -> Self {
        let mut seen = HashSet::new();
        self.0
            .into_iter()
            .filter_map(|(path, trace)| {
                let hops = trace.0.into_values().collect::<Vec<_>>();
                if seen.contains(&hops) {
                    tracing::debug!(%path, "dropping duplicate path");
                    return None;
                }
                seen.insert(hops.clone());
                let trace = (1..=u8::MAX).map(TimeToLive).zip(hops).collect();
                Some((path, trace))
            })
            .collect()
    }
}

impl FromIterator<(PathId, PathTrace)> for TraceSet {
    fn from_iter<T: IntoIterator<Item = (PathId, PathTrace)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Reconstruct the paths towards `dest_addr` from a set of replies.
///
/// Replies are grouped by the path and ttl of the probe they quote, and for
/// each path:
///
/// - only the first reply from `dest_addr` is kept
/// - missing hops up to the last hop are [`Hop::NoReply`]
/// - hops beyond the last hop, up to the last hop of the longest path, are
///   [`Hop::Padding`]
///
/// Replies quoting path 0 or ttl 0 were not sent by us and are ignored.
#[must_use]
pub fn reconstruct(replies: &[CapturedReply], dest_addr: Ipv4Addr) -> TraceSet {
    let mut traces = BTreeMap::<PathId, PathTrace>::new();
    for reply in replies {
        let (path, ttl) = reply.identifier.decode();
        if path.0 == 0 || ttl.0 == 0 {
            tracing::debug!(identifier = %reply.identifier, "ignoring reply to foreign probe");
            continue;
        }
        traces
            .entry(path)
            .or_default()
            .0
            .entry(ttl)
            .or_insert(Hop::Addr(reply.responder));
    }
    for trace in traces.values_mut() {
        trace.dedup_terminal(dest_addr);
    }
    let mut traces = TraceSet(traces);
    if let Some(path_max) = traces.path_max() {
        for trace in traces.0.values_mut() {
            trace.fill_missing();
            trace.pad_to(path_max);
        }
    }
    traces
}
