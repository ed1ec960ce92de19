// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

use aal::{AsicError, PortNum};

pub type McResult<T> = Result<T, McError>;

#[derive(Debug, thiserror::Error)]
pub enum McError {
    /// A malformed or out-of-range request, rejected before anything was
    /// modified.
    #[error("Invalid argument: {0}")]
    BadArgument(String),
    /// The compiled directives do not fit in one row.  The caller may split
    /// the request across rows or reject it.
    #[error(
        "Spray group {group} needs {needed} directive slots, only {capacity} \
         available"
    )]
    TableOverflow {
        group: usize,
        needed: usize,
        capacity: usize,
    },
    #[error("Port {port} appears more than once in a spray group")]
    DuplicatePort { port: PortNum },
    #[error("VC hop {vchop} for port {port} is out of range")]
    VcHopOutOfRange { port: PortNum, vchop: u8 },
    /// A directive decoded to a crossbar position that has no port behind
    /// it.  The row is corrupt or was built for a different fabric.
    #[error("No port at column {column} offset {offset}")]
    InvalidSentinelLookup { column: u8, offset: u8 },
    #[error("Invalid fabric configuration: {0}")]
    Config(String),
    #[error("ASIC error: {0}")]
    Asic(#[from] AsicError),
}

impl McError {
    pub(crate) fn bad_arg(msg: impl ToString) -> Self {
        McError::BadArgument(msg.to_string())
    }
}
