use crate::config::ReportFormat;
use traceflow_core::TraceSet;

pub mod json;
pub mod table;

/// Render the reconstructed paths to stdout.
pub fn run_report(traces: &TraceSet, format: ReportFormat) -> anyhow::Result<()> {
    match format {
        ReportFormat::Vertical => table::report_vertical(traces),
        ReportFormat::Horizontal => table::report_horizontal(traces),
        ReportFormat::Json => json::report(traces),
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::net::Ipv4Addr;
    use traceflow_core::{Hop, PathId, PathTrace, TimeToLive, TraceSet};

    /// Two paths, the second one hop shorter and missing its first hop.
    pub fn traces() -> TraceSet {
        let dest = Hop::Addr(Ipv4Addr::new(1, 1, 1, 1));
        let path1 = [
            Hop::Addr(Ipv4Addr::new(10, 0, 0, 1)),
            Hop::Addr(Ipv4Addr::new(10, 0, 1, 1)),
            dest,
        ];
        let path2 = [Hop::NoReply, dest, Hop::Padding];
        [(PathId(1), trace(path1)), (PathId(2), trace(path2))]
            .into_iter()
            .collect()
    }

    fn trace(hops: [Hop; 3]) -> PathTrace {
        (1..).map(TimeToLive).zip(hops).collect()
    }
}
