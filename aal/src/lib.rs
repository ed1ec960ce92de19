// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

use std::fmt;

use schemars::JsonSchema;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

/// Identifies a single switch port by its global port number.
pub type PortNum = u8;

/// A specialized Result type for ASIC operations
pub type AsicResult<T> = Result<T, AsicError>;

/// Error type conveying additional information about ASIC errors
#[derive(Error, Debug)]
pub enum AsicError {
    /// An argument passed to the ASIC layer is invalid or inappropriate.  This
    /// indicates misbehavior from the caller.
    #[error("Invalid argument: {}", .0)]
    InvalidArg(String),
    /// This operation is unsupported by the ASIC model being used
    #[error("Operation unsupported by the ASIC")]
    OperationUnsupported,
    /// The ASIC layer detected some internal inconsistency
    #[error("Internal error: {}",.0)]
    Internal(String),
    /// An error derived from a purposely triggered synthetic fault for testing
    /// purposes.
    #[error("Synthetic ASIC error: {}", .0)]
    Synthetic(String),
    /// A general indication that a caller is trying to read something that
    /// is not present.
    #[error("Missing")]
    Missing(String),
}

/// The physical position of a port within the crossbar: the column it hangs
/// off of, and its slot within that column.
#[derive(
    Clone,
    Copy,
    Debug,
    Deserialize,
    Eq,
    Hash,
    JsonSchema,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
)]
pub struct PortLocation {
    pub column: u8,
    pub offset: u8,
}

impl PortLocation {
    pub const fn new(column: u8, offset: u8) -> Self {
        PortLocation { column, offset }
    }
}

impl fmt::Display for PortLocation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}/{}", self.column, self.offset)
    }
}

/// The fixed adjacency between port numbers and crossbar positions.  The
/// mapping must be total over the ports it knows about, and injective.
pub trait PortTopology {
    /// Where does this port sit in the crossbar?
    fn port_location(&self, port: PortNum) -> Option<PortLocation>;

    /// Which port, if any, occupies this crossbar position?
    fn port_at(&self, location: PortLocation) -> Option<PortNum>;
}

/// The multicast RID table comes in two flavors: the main table indexed by
/// the multicast ID, and a smaller extended table that main-table rows can
/// chain to when they need more directives.
#[derive(
    Clone,
    Copy,
    Debug,
    Deserialize,
    Eq,
    Hash,
    JsonSchema,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
)]
pub enum RidTableSelect {
    Main,
    Extended,
}

impl fmt::Display for RidTableSelect {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RidTableSelect::Main => write!(f, "main"),
            RidTableSelect::Extended => write!(f, "extended"),
        }
    }
}

/// Register-level access to the per-port multicast RID tables.  A row is
/// moved as a whole, as the sequence of 32-bit words the table codec
/// produces.  Implementations are responsible for any bus locking, and for
/// serializing concurrent access to a single row.
pub trait RidTableOps {
    /// Write one full row.
    fn mc_rid_write(
        &self,
        port: PortNum,
        table: RidTableSelect,
        index: u8,
        words: &[u32],
    ) -> AsicResult<()>;

    /// Read back `words` words of one row.
    fn mc_rid_read(
        &self,
        port: PortNum,
        table: RidTableSelect,
        index: u8,
        words: usize,
    ) -> AsicResult<Vec<u32>>;
}
