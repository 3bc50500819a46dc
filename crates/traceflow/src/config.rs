use anyhow::anyhow;
use clap::ValueEnum;
use file::ConfigFile;
use serde::Deserialize;
use std::net::Ipv4Addr;
use std::time::Duration;
use traceflow_core::{defaults, MAX_PATHS};

mod cmd;
mod constants;
mod file;

pub use cmd::Args;

/// How to render the reconstructed paths.
#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReportFormat {
    /// One row per path, one column per hop.
    Vertical,
    /// One row per hop, one column per path.
    Horizontal,
    /// A json object of paths to hops.
    Json,
}

/// How to format log data.
#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LogFormat {
    /// Display log data in a compact format.
    Compact,
    /// Display log data in a pretty format.
    Pretty,
    /// Display log data in a json format.
    Json,
}

/// Fully parsed and validated configuration.
#[derive(Debug, Eq, PartialEq)]
pub struct TraceflowConfig {
    pub target: String,
    pub paths: u8,
    pub max_ttl: u8,
    pub src_port: u16,
    pub dst_port: u16,
    pub tos: u8,
    pub wait: Duration,
    pub read_timeout: Duration,
    pub source_addr: Option<Ipv4Addr>,
    pub interface: Option<String>,
    pub format: ReportFormat,
    pub dedup: bool,
    pub verbose: bool,
    pub log_format: LogFormat,
    pub log_filter: String,
}

impl TraceflowConfig {
    pub fn from(args: Args) -> anyhow::Result<Self> {
        let cfg_file = if let Some(cfg) = &args.config_file {
            file::read_config_file(cfg)?
        } else {
            file::read_default_config_file()?.unwrap_or_default()
        };
        Self::build_config(args, cfg_file)
    }

    fn build_config(args: Args, cfg_file: ConfigFile) -> anyhow::Result<Self> {
        let cfg_file_trace = cfg_file.trace.unwrap_or_default();
        let cfg_file_report = cfg_file.report.unwrap_or_default();
        let cfg_file_log = cfg_file.log.unwrap_or_default();
        let paths = cfg_layer(
            args.paths,
            cfg_file_trace.paths,
            u16::from(defaults::DEFAULT_PATHS),
        );
        let max_ttl = cfg_layer(
            args.max_ttl,
            cfg_file_trace.max_ttl,
            defaults::DEFAULT_MAX_TTL,
        );
        let src_port = cfg_layer(
            args.src_port,
            cfg_file_trace.src_port,
            defaults::DEFAULT_SOURCE_PORT,
        );
        let dst_port = cfg_layer(
            args.dst_port,
            cfg_file_trace.dst_port,
            defaults::DEFAULT_DESTINATION_PORT,
        );
        let tos = cfg_layer(args.tos, cfg_file_trace.tos, defaults::DEFAULT_TOS);
        let wait = cfg_layer(
            args.wait,
            cfg_file_trace.wait,
            defaults::DEFAULT_PROBE_WAIT,
        );
        let read_timeout = cfg_layer(
            args.read_timeout,
            cfg_file_trace.read_timeout,
            defaults::DEFAULT_READ_TIMEOUT,
        );
        let source_addr = cfg_layer_opt(args.source_address, cfg_file_trace.source_address);
        let interface = cfg_layer_opt(args.interface, cfg_file_trace.interface);
        let format = cfg_layer(
            args.format,
            cfg_file_report.format,
            constants::DEFAULT_REPORT_FORMAT,
        );
        let dedup = cfg_layer_bool_flag(args.dedup, cfg_file_report.dedup, constants::DEFAULT_DEDUP);
        let verbose = args.verbose;
        let log_format = cfg_layer(
            args.log_format,
            cfg_file_log.log_format,
            constants::DEFAULT_LOG_FORMAT,
        );
        let log_filter = cfg_layer(
            args.log_filter,
            cfg_file_log.log_filter,
            String::from(constants::DEFAULT_LOG_FILTER),
        );
        let paths = clamp_paths(paths)?;
        validate_ttl(max_ttl)?;
        validate_source_port(src_port, paths)?;
        validate_read_timeout(read_timeout)?;
        validate_source(source_addr, interface.as_deref())?;
        Ok(Self {
            target: args.target,
            paths,
            max_ttl,
            src_port,
            dst_port,
            tos,
            wait,
            read_timeout,
            source_addr,
            interface,
            format,
            dedup,
            verbose,
            log_format,
            log_filter,
        })
    }
}

#[cfg(test)]
impl Default for TraceflowConfig {
    fn default() -> Self {
        Self {
            target: String::new(),
            paths: defaults::DEFAULT_PATHS,
            max_ttl: defaults::DEFAULT_MAX_TTL,
            src_port: defaults::DEFAULT_SOURCE_PORT,
            dst_port: defaults::DEFAULT_DESTINATION_PORT,
            tos: defaults::DEFAULT_TOS,
            wait: defaults::DEFAULT_PROBE_WAIT,
            read_timeout: defaults::DEFAULT_READ_TIMEOUT,
            source_addr: None,
            interface: None,
            format: constants::DEFAULT_REPORT_FORMAT,
            dedup: constants::DEFAULT_DEDUP,
            verbose: false,
            log_format: constants::DEFAULT_LOG_FORMAT,
            log_filter: String::from(constants::DEFAULT_LOG_FILTER),
        }
    }
}

fn cfg_layer<T>(fst: Option<T>, snd: Option<T>, def: T) -> T {
    match (fst, snd) {
        (Some(val), _) | (None, Some(val)) => val,
        (None, None) => def,
    }
}

fn cfg_layer_opt<T>(fst: Option<T>, snd: Option<T>) -> Option<T> {
    match (fst, snd) {
        (Some(val), _) | (None, Some(val)) => Some(val),
        (None, None) => None,
    }
}

const fn cfg_layer_bool_flag(fst: bool, snd: Option<bool>, default: bool) -> bool {
    match (fst, snd) {
        (true, _) => true,
        (false, Some(val)) => val,
        (false, None) => default,
    }
}

/// Clamp `paths` to the number of paths an identifier can encode.
fn clamp_paths(paths: u16) -> anyhow::Result<u8> {
    if paths == 0 {
        return Err(anyhow!("paths ({paths}) must be greater than zero"));
    }
    Ok(u8::try_from(paths).unwrap_or_else(|_| {
        eprintln!(
            "Max paths we can probe is {MAX_PATHS}. Setting --paths to {MAX_PATHS} and continuing"
        );
        MAX_PATHS
    }))
}

/// Validate `max_ttl`.
fn validate_ttl(max_ttl: u8) -> anyhow::Result<()> {
    if max_ttl == 0 {
        Err(anyhow!("max-ttl ({max_ttl}) must be in the range 1..{}", u8::MAX))
    } else {
        Ok(())
    }
}

/// Validate that the source port of every path fits in a port.
fn validate_source_port(src_port: u16, paths: u8) -> anyhow::Result<()> {
    if src_port.checked_add(u16::from(paths)).is_none() {
        Err(anyhow!(
            "src-port ({src_port}) plus paths ({paths}) must not exceed {}",
            u16::MAX
        ))
    } else {
        Ok(())
    }
}

/// Validate `read_timeout`.
fn validate_read_timeout(read_timeout: Duration) -> anyhow::Result<()> {
    if read_timeout < constants::MIN_READ_TIMEOUT || read_timeout > constants::MAX_READ_TIMEOUT {
        Err(anyhow!(
            "read-timeout ({:?}) must be between {:?} and {:?} inclusive",
            read_timeout,
            constants::MIN_READ_TIMEOUT,
            constants::MAX_READ_TIMEOUT
        ))
    } else {
        Ok(())
    }
}

/// A source address and an interface are mutually exclusive, which the
/// command line enforces but a config file does not.
fn validate_source(source_addr: Option<Ipv4Addr>, interface: Option<&str>) -> anyhow::Result<()> {
    if source_addr.is_some() && interface.is_some() {
        Err(anyhow!(
            "source-address and interface cannot both be given"
        ))
    } else {
        Ok(())
    }
}
