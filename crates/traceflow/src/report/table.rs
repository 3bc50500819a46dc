use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};
use itertools::Itertools;
use tracing::instrument;
use traceflow_core::{Hop, TimeToLive, TraceSet};

/// Print one row per path with one column per hop.
#[instrument(skip_all, level = "trace")]
pub fn report_vertical(traces: &TraceSet) -> anyhow::Result<()> {
    println!("{}", vertical_table(traces));
    Ok(())
}

/// Print one row per hop with one column per path.
#[instrument(skip_all, level = "trace")]
pub fn report_horizontal(traces: &TraceSet) -> anyhow::Result<()> {
    println!("{}", horizontal_table(traces));
    Ok(())
}

fn vertical_table(traces: &TraceSet) -> Table {
    let header = std::iter::once(String::from("TTL"))
        .chain(ttls(traces).map(|ttl| ttl.to_string()))
        .collect_vec();
    let mut table = new_table(header);
    for (path, trace) in traces.paths() {
        let row = std::iter::once(format!("Path ID {path}"))
            .chain(ttls(traces).map(|ttl| cell(trace.get(ttl))))
            .collect_vec();
        table.add_row(row);
    }
    table
}

fn horizontal_table(traces: &TraceSet) -> Table {
    let header = std::iter::once(String::new())
        .chain(traces.paths().map(|(path, _)| format!("Path ID {path}")))
        .collect_vec();
    let mut table = new_table(header);
    for ttl in ttls(traces) {
        let row = std::iter::once(format!("TTL {ttl}"))
            .chain(traces.paths().map(|(_, trace)| cell(trace.get(ttl))))
            .collect_vec();
        table.add_row(row);
    }
    table
}

fn new_table(header: Vec<String>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

fn ttls(traces: &TraceSet) -> impl Iterator<Item = TimeToLive> {
    let path_max = traces.path_max().map_or(0, |ttl| ttl.0);
    (1..=path_max).map(TimeToLive)
}

fn cell(hop: Option<&Hop>) -> String {
    hop.map_or_else(|| Hop::Padding.to_string(), ToString::to_string)
}
