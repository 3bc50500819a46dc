use std::collections::BTreeMap;
use tracing::instrument;
use traceflow_core::TraceSet;

/// Print the paths as a json object of path id to ttl to hop.
#[instrument(skip_all, level = "trace")]
pub fn report(traces: &TraceSet) -> anyhow::Result<()> {
    serde_json::to_writer_pretty(std::io::stdout(), &to_map(traces))?;
    println!();
    Ok(())
}

fn to_map(traces: &TraceSet) -> BTreeMap<u8, BTreeMap<u8, String>> {
    traces
        .paths()
        .map(|(path, trace)| {
            let hops = trace
                .hops()
                .map(|(ttl, hop)| (ttl.0, hop.to_string()))
                .collect();
            (path.0, hops)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::fixtures;

    #[test]
    fn test_json() {
        let json = serde_json::to_value(to_map(&fixtures::traces())).unwrap();
        let expected = serde_json::json!({
            "1": {"1": "10.0.0.1", "2": "10.0.1.1", "3": "1.1.1.1"},
            "2": {"1": "*", "2": "1.1.1.1", "3": "x"},
        });
        pretty_assertions::assert_eq!(expected, json);
    }
}
