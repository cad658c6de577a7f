// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

pub use clap::Parser;
use conntrack::{FlowType, LEGACY_TABLE_PATH};
use std::path::PathBuf;
use tracing::level_filters::LevelFilter;

#[derive(Parser, Debug)]
#[command(name = "natstat")]
#[command(version)]
#[command(about = "Show the connections translated by the kernel NAT", long_about = None)]
#[allow(clippy::struct_excessive_bools)]
pub struct CmdArgs {
    #[arg(long, value_name = "PATH", default_value = LEGACY_TABLE_PATH, help = "Connection tracking table to read")]
    source: PathBuf,

    #[arg(short = 'S', long, help = "Show source-NATed connections")]
    snat: bool,

    #[arg(short = 'D', long, help = "Show destination-NATed connections")]
    dnat: bool,

    #[arg(short = 'L', long, help = "Show connections to or from this host, without NAT")]
    local: bool,

    #[arg(short = 'R', long, help = "Show connections routed through this host, without NAT")]
    routed: bool,

    #[arg(short = 'p', long, value_name = "NAME", help = "Only show this protocol (e.g. tcp)")]
    protocol: Option<String>,

    #[arg(short = 's', long, value_name = "NAME", help = "Only show connections in this state (e.g. ESTABLISHED)")]
    state: Option<String>,

    #[arg(short = 'n', long, help = "Do not print the header line")]
    no_header: bool,

    #[arg(
        long,
        value_name = "LEVEL",
        default_value_t = LevelFilter::WARN,
        help = "Log level (off, error, warn, info, debug, trace); RUST_LOG takes precedence"
    )]
    log_level: LevelFilter,
}

impl CmdArgs {
    pub fn source(&self) -> &PathBuf {
        &self.source
    }

    /// Flow types to show. Without any explicit selection, all NATed connections are shown.
    pub fn flow_types(&self) -> FlowType {
        let mut types = FlowType::empty();
        types.set(FlowType::SNAT, self.snat);
        types.set(FlowType::DNAT, self.dnat);
        types.set(FlowType::LOCAL, self.local);
        types.set(FlowType::ROUTED, self.routed);
        if types.is_empty() {
            FlowType::SNAT | FlowType::DNAT
        } else {
            types
        }
    }

    pub fn protocol(&self) -> Option<&str> {
        self.protocol.as_deref()
    }

    pub fn state(&self) -> Option<&str> {
        self.state.as_deref()
    }

    pub fn show_header(&self) -> bool {
        !self.no_header
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }
}
