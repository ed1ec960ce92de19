// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

//! Mapping between switch port numbers and crossbar positions.
//!
//! Every port hangs off exactly one column of the crossbar, at a fixed slot
//! (its offset) within that column.  The directive encoding only ever names
//! columns and offsets, so both directions of the mapping are needed: ports
//! to positions when compiling a row, and positions back to ports when
//! unwinding one.

use std::collections::BTreeMap;

use aal::{PortLocation, PortNum, PortTopology};

use crate::config::FabricConfig;
use crate::error::{McError, McResult};

/// A fixed, two-way mapping between ports and crossbar positions.
#[derive(Clone, Debug)]
pub struct PortMap {
    // NOTE: We maintain both mappings so that neither direction needs a
    // linear search.
    port_to_location: BTreeMap<PortNum, PortLocation>,
    location_to_port: BTreeMap<PortLocation, PortNum>,
}

impl PortMap {
    /// The reference fabric fills its columns in order: ports 0 through
    /// `ports_per_column - 1` sit on column 0, the next batch on column 1,
    /// and so on.  Any slots past the last port are left empty.
    pub fn reference(config: &FabricConfig) -> Self {
        let ppc = config.ports_per_column;
        let entries = (0..config.num_ports)
            .map(|port| (port, PortLocation::new(port / ppc, port % ppc)));
        // The column-major layout is trivially injective, and validate() has
        // already established that every port lands on a real column.
        Self::collect(entries)
    }

    /// Build a map from an explicit table of (port, location) pairs.  The
    /// table must name each of the ports `0..num_ports` exactly once, and
    /// each location at most once.
    pub fn from_entries(
        config: &FabricConfig,
        entries: &[(PortNum, PortLocation)],
    ) -> McResult<Self> {
        if entries.len() != usize::from(config.num_ports) {
            return Err(McError::Config(format!(
                "port map has {} entries, expected {}",
                entries.len(),
                config.num_ports
            )));
        }
        let map = Self::collect(entries.iter().copied());
        for (port, location) in entries {
            if *port >= config.num_ports {
                return Err(McError::Config(format!(
                    "port {port} is outside the fabric"
                )));
            }
            if location.column >= config.num_columns
                || location.offset >= config.ports_per_column
            {
                return Err(McError::Config(format!(
                    "port {port} mapped to nonexistent location {location}"
                )));
            }
        }
        if map.port_to_location.len() != entries.len() {
            return Err(McError::Config(
                "port map names a port more than once".to_string(),
            ));
        }
        if map.location_to_port.len() != entries.len() {
            return Err(McError::Config(
                "port map places two ports at one location".to_string(),
            ));
        }
        Ok(map)
    }

    fn collect(
        entries: impl Iterator<Item = (PortNum, PortLocation)>,
    ) -> Self {
        let mut port_to_location = BTreeMap::new();
        let mut location_to_port = BTreeMap::new();
        for (port, location) in entries {
            port_to_location.insert(port, location);
            location_to_port.insert(location, port);
        }
        PortMap {
            port_to_location,
            location_to_port,
        }
    }

    /// The number of ports in the map.
    pub fn len(&self) -> usize {
        self.port_to_location.len()
    }

    pub fn is_empty(&self) -> bool {
        self.port_to_location.is_empty()
    }
}

impl PortTopology for PortMap {
    fn port_location(&self, port: PortNum) -> Option<PortLocation> {
        self.port_to_location.get(&port).copied()
    }

    fn port_at(&self, location: PortLocation) -> Option<PortNum> {
        self.location_to_port.get(&location).copied()
    }
}
