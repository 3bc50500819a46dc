#![warn(clippy::all, clippy::pedantic, clippy::nursery, rust_2018_idioms)]
#![allow(
    clippy::module_name_repetitions,
    clippy::option_if_let_else,
    clippy::missing_const_for_fn,
    clippy::struct_excessive_bools,
    clippy::redundant_pub_crate
)]
#![forbid(unsafe_code)]

use clap::Parser;
use config::{Args, TraceflowConfig};
use std::process::ExitCode;

mod app;
mod config;
mod report;

fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();
    let cfg = TraceflowConfig::from(args)?;
    app::run_traceflow(&cfg)
}
