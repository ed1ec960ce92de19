// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

//! Capacity settings for the fabric whose tables are being compiled.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::codec;
use crate::error::{McError, McResult};

/// The dimensions of the crossbar and of its multicast RID tables.  The
/// defaults describe the reference fabric.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct FabricConfig {
    /// Number of switch ports, numbered from 0.
    pub num_ports: u8,
    /// Number of crossbar columns.  Columns are processed in adjacent
    /// even/odd pairs, so this must be even.
    pub num_columns: u8,
    /// Maximum number of ports hanging off a single column.
    pub ports_per_column: u8,
    /// Directive slots in a single table row, shared by all spray groups.
    pub directives_per_row: usize,
    /// Maximum number of spray groups in a single row.
    pub max_spray_groups: usize,
    /// Highest valid index in the main table.
    pub main_table_depth: u8,
    /// Highest valid index in the extended table.
    pub ext_table_depth: u8,
}

impl Default for FabricConfig {
    fn default() -> Self {
        FabricConfig {
            num_ports: 64,
            num_columns: 6,
            ports_per_column: 11,
            directives_per_row: 32,
            max_spray_groups: 16,
            main_table_depth: 127,
            ext_table_depth: 63,
        }
    }
}

impl FabricConfig {
    pub fn num_column_pairs(&self) -> u8 {
        self.num_columns / 2
    }

    /// Size of the position-mapped scratch list used while building a single
    /// spray group: one round per possible port in a column, with one slot
    /// per column pair in each round.
    pub fn scratch_slots(&self) -> usize {
        usize::from(self.ports_per_column)
            * usize::from(self.num_column_pairs())
    }

    /// Number of 32-bit registers holding the spray group pointers.
    pub fn pointer_words(&self) -> usize {
        self.max_spray_groups.div_ceil(codec::PTRS_PER_WORD)
    }

    /// Number of 32-bit words in one encoded row.
    pub fn row_words(&self) -> usize {
        1 + self.pointer_words() + self.directives_per_row
    }

    /// Check that every dimension can be represented in the row format.
    pub fn validate(&self) -> McResult<()> {
        if self.num_columns == 0 || self.num_columns % 2 != 0 {
            return Err(McError::Config(format!(
                "column count {} must be even and non-zero",
                self.num_columns
            )));
        }
        if self.num_column_pairs() > codec::MAX_COLUMN_PAIRS {
            return Err(McError::Config(format!(
                "{} column pairs exceed the limit of {}",
                self.num_column_pairs(),
                codec::MAX_COLUMN_PAIRS
            )));
        }
        if self.ports_per_column == 0
            || self.ports_per_column > codec::MAX_PORTS_PER_COLUMN
        {
            return Err(McError::Config(format!(
                "ports per column must be in 1..={}, not {}",
                codec::MAX_PORTS_PER_COLUMN,
                self.ports_per_column
            )));
        }
        let slots =
            usize::from(self.num_columns) * usize::from(self.ports_per_column);
        if self.num_ports == 0 || usize::from(self.num_ports) > slots {
            return Err(McError::Config(format!(
                "{} ports do not fit in {} column slots",
                self.num_ports, slots
            )));
        }
        if self.directives_per_row == 0
            || self.directives_per_row > codec::MAX_DIRECTIVES_PER_ROW
        {
            return Err(McError::Config(format!(
                "directives per row must be in 1..={}, not {}",
                codec::MAX_DIRECTIVES_PER_ROW,
                self.directives_per_row
            )));
        }
        if self.max_spray_groups == 0
            || self.max_spray_groups > codec::MAX_SPRAY_GROUPS
        {
            return Err(McError::Config(format!(
                "spray groups per row must be in 1..={}, not {}",
                codec::MAX_SPRAY_GROUPS,
                self.max_spray_groups
            )));
        }
        Ok(())
    }

    /// Parse and validate a TOML description of the fabric.  Any field left
    /// out takes the reference fabric's value.
    pub fn from_toml_str(s: &str) -> McResult<Self> {
        let config: FabricConfig =
            toml::from_str(s).map_err(|e| McError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> McResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            McError::Config(format!("reading {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&contents)
    }
}
