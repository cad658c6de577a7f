// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

#![deny(clippy::all, clippy::pedantic)]

mod args;
mod output;

use crate::args::{CmdArgs, Parser};
use crate::output::FlowTable;

use conntrack::{ConntrackTable, LocalAddrs};
use std::process::ExitCode;
use tracing::level_filters::LevelFilter;
use tracing::{debug, error};
use tracing_subscriber::{EnvFilter, prelude::*};

fn init_logging(level: LevelFilter) {
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_line_number(true)
        .with_target(true)
        .with_thread_names(false)
        .with_level(true);

    if let Err(e) = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
    {
        eprintln!("Failed to initialize logging: {e}");
    }
}

fn main() -> ExitCode {
    let args = CmdArgs::parse();
    init_logging(args.log_level());

    let local = match LocalAddrs::discover() {
        Ok(local) => local,
        Err(e) => {
            error!("Unable to learn the local addresses: {e}");
            return ExitCode::FAILURE;
        }
    };

    let table = ConntrackTable::new(args.source());
    let flows = match table.snapshot() {
        Ok(flows) => flows,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let types = args.flow_types();
    debug!("selecting {types} flows out of {}", flows.len());
    let mut flows = flows.filter_by_type(types, &local);
    if let Some(protocol) = args.protocol() {
        flows = flows.filter_by_protocol(protocol);
    }
    if let Some(state) = args.state() {
        flows = flows.filter_by_state(state);
    }

    print!(
        "{}",
        FlowTable {
            flows: &flows,
            local: &local,
            header: args.show_header(),
        }
    );
    ExitCode::SUCCESS
}
