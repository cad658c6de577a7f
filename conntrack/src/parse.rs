// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Parser for the legacy connection tracking table (`/proc/net/ip_conntrack`).
//!
//! Each line of the table describes one tracked connection:
//!
//! ```text
//! tcp      6 431999 ESTABLISHED src=10.0.0.5 dst=93.184.216.34 sport=4000 dport=80 packets=5 bytes=600 \
//!     src=93.184.216.34 dst=203.0.113.9 sport=80 dport=4000 packets=3 bytes=300 [ASSURED] mark=0 use=1
//! ```
//!
//! The tuple of the original direction comes first, then the tuple of the reply direction, both
//! with the same key names. A line is therefore parsed in two phases: [`tokenize`] classifies the
//! tokens and tags every `key=value` pair with the [`Direction`] it belongs to (first occurrence of
//! a key is [`Direction::Original`], any later one is [`Direction::Reply`]), and [`assign`] folds
//! the pairs of one direction into a [`Subflow`].
//!
//! Malformed values never fail a line: numbers fall back to zero and addresses to [`None`].
//! Parsing of a table stops at the first line without any token; everything after it is ignored.

use std::collections::HashSet;
use std::io::{BufRead, Read};
use std::net::IpAddr;
use std::str::FromStr;

use procfs::{FromBufRead, ProcResult};
use tracing::{debug, trace};

use crate::filter::Flows;
use crate::flow::{Direction, Flow, Subflow};

const FLAG_UNREPLIED: &str = "[UNREPLIED]";
const FLAG_ASSURED: &str = "[ASSURED]";

/// A `key=value` token, tagged with the direction it was assigned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TupleField<'a> {
    pub(crate) key: &'a str,
    pub(crate) value: &'a str,
    pub(crate) direction: Direction,
}

/// The tokens of one table line, classified but not yet interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LineTokens<'a> {
    pub(crate) protocol: &'a str,
    pub(crate) ttl: Option<&'a str>,
    pub(crate) state: Option<&'a str>,
    pub(crate) unreplied: bool,
    pub(crate) assured: bool,
    pub(crate) fields: Vec<TupleField<'a>>,
}

/// First phase: split a line into its tokens and classify them.
///
/// Token 0 is the protocol name, token 1 (the protocol number) is skipped, token 2 is the ttl.
/// For `tcp`, token 3 is the connection state. Tokens from position 3 on are flags or `key=value`
/// pairs; anything else (including the tcp state) is ignored there.
///
/// Returns [`None`] if the line has no token at all.
pub(crate) fn tokenize(line: &str) -> Option<LineTokens<'_>> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let protocol = *tokens.first()?;
    let state = if protocol == "tcp" {
        tokens.get(3).copied()
    } else {
        None
    };

    let mut seen = HashSet::new();
    let mut parsed = LineTokens {
        protocol,
        ttl: tokens.get(2).copied(),
        state,
        unreplied: false,
        assured: false,
        fields: Vec::new(),
    };
    for token in tokens.iter().skip(3) {
        match *token {
            FLAG_UNREPLIED => parsed.unreplied = true,
            FLAG_ASSURED => parsed.assured = true,
            token => {
                let mut kv = token.split('=');
                let (Some(key), Some(value), None) = (kv.next(), kv.next(), kv.next()) else {
                    continue;
                };
                let direction = if seen.insert(key) {
                    Direction::Original
                } else {
                    Direction::Reply
                };
                parsed.fields.push(TupleField {
                    key,
                    value,
                    direction,
                });
            }
        }
    }
    Some(parsed)
}

/// Unsigned decimal number, or zero. Signs are refused, including the `+` that [`FromStr`] would
/// accept for integers.
fn parse_or_default<T: FromStr + Default>(value: &str) -> T {
    if !value.bytes().all(|b| b.is_ascii_digit()) {
        return T::default();
    }
    value.parse().unwrap_or_default()
}

/// Second phase: build the [`Subflow`] of the given direction out of the classified fields.
///
/// Fields are applied in order, so a repeated key overwrites what was set before it.
pub(crate) fn assign(fields: &[TupleField<'_>], direction: Direction) -> Subflow {
    fields
        .iter()
        .filter(|field| field.direction == direction)
        .fold(Subflow::default(), |mut subflow, field| {
            match field.key {
                "src" => subflow.src = parse_addr(field.value),
                "dst" => subflow.dst = parse_addr(field.value),
                "sport" => subflow.sport = parse_or_default(field.value),
                "dport" => subflow.dport = parse_or_default(field.value),
                "bytes" => subflow.bytes = parse_or_default(field.value),
                "packets" => subflow.packets = parse_or_default(field.value),
                _ => {}
            }
            subflow
        })
}

fn parse_addr(value: &str) -> Option<IpAddr> {
    IpAddr::from_str(value).ok().map(|addr| addr.to_canonical())
}

/// Parse a single line of the table into a [`Flow`].
///
/// Returns [`None`] only if the line contains no token.
#[must_use]
pub fn parse_line(line: &str) -> Option<Flow> {
    let tokens = tokenize(line)?;
    let original = assign(&tokens.fields, Direction::Original);
    let reply = assign(&tokens.fields, Direction::Reply);
    let flow = Flow::new(
        tokens.protocol.to_string(),
        tokens.state.unwrap_or_default().to_string(),
        tokens.ttl.map_or(0, parse_or_default),
        (tokens.unreplied, tokens.assured),
        original,
        reply,
    );
    trace!("parsed flow: {flow}");
    Some(flow)
}

/// Parse a whole table, in order, until the first line without any token.
///
/// The reader is consumed entirely before parsing starts, so a read failure anywhere in the
/// source fails the whole table, even past the line where parsing stops.
///
/// # Errors
///
/// Only errors from the underlying reader are reported. Content is never an error: bytes which
/// are not valid UTF-8 are replaced and malformed fields fall back to their zero value.
pub fn parse_table<R: BufRead>(mut reader: R) -> std::io::Result<Flows> {
    let mut content = Vec::new();
    reader.read_to_end(&mut content)?;

    let mut flows = Vec::new();
    for (index, line) in String::from_utf8_lossy(&content).lines().enumerate() {
        match parse_line(line) {
            Some(flow) => flows.push(flow),
            None => {
                debug!("stopped parsing at line {} (no tokens)", index + 1);
                break;
            }
        }
    }
    Ok(Flows::from(flows))
}

impl FromBufRead for Flows {
    fn from_buf_read<R: BufRead>(r: R) -> ProcResult<Self> {
        Ok(parse_table(r)?)
    }
}
