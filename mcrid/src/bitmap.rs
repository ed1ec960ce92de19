// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

//! Per-column views of a single spray group.

use aal::{PortLocation, PortNum, PortTopology};

use crate::config::FabricConfig;
use crate::directive::VcHop;
use crate::error::{McError, McResult};

/// The set of occupied offsets within one column.  Offsets are always
/// visited in ascending order; the directive encoding depends on it.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct PortBitset(u16);

impl PortBitset {
    pub fn new() -> Self {
        PortBitset(0)
    }

    /// Add an offset, returning false if it was already present.
    pub fn insert(&mut self, offset: u8) -> bool {
        assert!(u32::from(offset) < u16::BITS, "offset {offset} too large");
        let bit = 1u16 << offset;
        let fresh = self.0 & bit == 0;
        self.0 |= bit;
        fresh
    }

    pub fn contains(&self, offset: u8) -> bool {
        u32::from(offset) < u16::BITS && self.0 & (1u16 << offset) != 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Remove and return the lowest offset still present.
    pub fn pop_lowest(&mut self) -> Option<u8> {
        if self.0 == 0 {
            return None;
        }
        let offset = self.0.trailing_zeros() as u8;
        self.0 &= self.0 - 1;
        Some(offset)
    }

    /// Iterate over the offsets in ascending order without modifying the set.
    pub fn iter(&self) -> impl Iterator<Item = u8> {
        let mut remaining = *self;
        std::iter::from_fn(move || remaining.pop_lowest())
    }

    /// Iterate over the offsets in ascending order, removing each one as it
    /// is consumed.  Offsets not consumed stay in the set.
    pub fn drain(&mut self) -> impl Iterator<Item = u8> + '_ {
        std::iter::from_fn(move || self.pop_lowest())
    }
}

/// One spray group laid out over the crossbar: which offsets of each column
/// it occupies, and the VC hop setting for each of those ports.
#[derive(Clone, Debug)]
pub struct ColumnPortBitmap {
    columns: Vec<PortBitset>,
    vchops: Vec<Vec<VcHop>>,
}

impl ColumnPortBitmap {
    /// Build the bitmap for a single spray group.  `vchops` runs parallel to
    /// `ports`.
    pub fn build(
        config: &FabricConfig,
        topology: &impl PortTopology,
        ports: &[PortNum],
        vchops: &[u8],
    ) -> McResult<Self> {
        if ports.is_empty() || ports.len() > usize::from(config.num_ports) {
            return Err(McError::bad_arg(format!(
                "spray group size {} out of range",
                ports.len()
            )));
        }
        if vchops.len() != ports.len() {
            return Err(McError::bad_arg(format!(
                "{} vc hops supplied for {} ports",
                vchops.len(),
                ports.len()
            )));
        }

        let ncols = usize::from(config.num_columns);
        let ppc = usize::from(config.ports_per_column);
        let mut bitmap = ColumnPortBitmap {
            columns: vec![PortBitset::new(); ncols],
            vchops: vec![vec![VcHop::Pass; ppc]; ncols],
        };

        for (&port, &vchop) in ports.iter().zip(vchops) {
            let location = topology.port_location(port).ok_or_else(|| {
                McError::bad_arg(format!("no such port: {port}"))
            })?;
            let (col, off) =
                (usize::from(location.column), usize::from(location.offset));
            if col >= ncols || off >= ppc {
                return Err(McError::bad_arg(format!(
                    "port {port} maps to {location}, outside the crossbar"
                )));
            }
            if !bitmap.columns[col].insert(location.offset) {
                return Err(McError::DuplicatePort { port });
            }
            bitmap.vchops[col][off] = VcHop::try_from(vchop)
                .map_err(|vchop| McError::VcHopOutOfRange { port, vchop })?;
        }
        Ok(bitmap)
    }

    pub fn column(&self, column: u8) -> PortBitset {
        self.columns[usize::from(column)]
    }

    pub fn vchop(&self, location: PortLocation) -> VcHop {
        self.vchops[usize::from(location.column)][usize::from(location.offset)]
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }
}
