use crate::config::{LogFormat, ReportFormat};
use clap::builder::Styles;
use clap::Parser;
use std::net::Ipv4Addr;
use std::str::FromStr;
use std::time::Duration;

/// Enumerate the distinct network paths towards a host
#[derive(Parser, Debug)]
#[command(name = "traceflow", author, version, about, long_about = None, arg_required_else_help(true), styles=Styles::styled())]
pub struct Args {
    /// The hostname or IPv4 address to trace
    pub target: String,

    /// Config file
    #[arg(short = 'c', long, value_hint = clap::ValueHint::FilePath)]
    pub config_file: Option<String>,

    /// The number of paths to probe, at most 255 [default: 4]
    #[arg(short = 'p', long)]
    pub paths: Option<u16>,

    /// The maximum time-to-live probed on each path [default: 64]
    #[arg(short = 't', long)]
    pub max_ttl: Option<u8>,

    /// The base source port, path n is probed from this port plus n [default: 33452]
    #[arg(long)]
    pub src_port: Option<u16>,

    /// The destination port [default: 33452]
    #[arg(long)]
    pub dst_port: Option<u16>,

    /// The TOS (i.e. DSCP+ECN) IP header value [default: 0]
    #[arg(short = 'Q', long)]
    pub tos: Option<u8>,

    /// The time to wait after sending each probe [default: 100ms]
    #[arg(short = 'w', long, value_parser = parse_duration)]
    pub wait: Option<Duration>,

    /// The capture socket read timeout [default: 100ms]
    #[arg(long, value_parser = parse_duration)]
    pub read_timeout: Option<Duration>,

    /// The source IPv4 address [default: auto]
    #[arg(short = 'A', long, value_parser = parse_addr, conflicts_with = "interface")]
    pub source_address: Option<Ipv4Addr>,

    /// The network interface [default: auto]
    #[arg(short = 'I', long)]
    pub interface: Option<String>,

    /// How to render the paths [default: vertical]
    #[arg(value_enum, short = 'f', long)]
    pub format: Option<ReportFormat>,

    /// Remove paths identical to a lower numbered path [default: false]
    #[arg(long)]
    pub dedup: bool,

    /// Enable verbose debug logging
    #[arg(short = 'v', long, default_value_t = false)]
    pub verbose: bool,

    /// The debug log format [default: pretty]
    #[arg(value_enum, long)]
    pub log_format: Option<LogFormat>,

    /// The debug log filter [default: traceflow=debug]
    #[arg(long)]
    pub log_filter: Option<String>,
}

fn parse_duration(value: &str) -> anyhow::Result<Duration> {
    Ok(humantime::parse_duration(value)?)
}

fn parse_addr(value: &str) -> anyhow::Result<Ipv4Addr> {
    Ok(Ipv4Addr::from_str(value)?)
}
