// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

//! Compilation of a full table row from its spray groups.

use aal::{PortNum, PortTopology};
use slog::{debug, o};

use crate::bitmap::ColumnPortBitmap;
use crate::builder::build_directives;
use crate::compact::compact;
use crate::config::FabricConfig;
use crate::directive::Directive;
use crate::error::{McError, McResult};
use crate::flags::apply_flags;

/// A set of ports that jointly receive one copy of a multicast packet.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SprayGroup {
    pub ports: Vec<PortNum>,
    /// VC hop setting for each port, parallel to `ports`
    pub vchops: Vec<u8>,
    /// Index into `ports` of the port producing the group's response
    pub primary: Option<usize>,
}

/// The flattened form of a list of spray groups, as carried by the control
/// plane: one array of all ports, one of their VC hops, the size of each
/// group, and each group's primary replica as an offset within the group.
pub type FlatGroups = (Vec<PortNum>, Vec<u8>, Vec<u8>, Vec<Option<u8>>);

impl SprayGroup {
    /// Cut the flat control plane arrays into spray groups.
    pub fn split(
        ports: &[PortNum],
        vchops: &[u8],
        sizes: &[u8],
        replica_offsets: &[Option<u8>],
    ) -> McResult<Vec<SprayGroup>> {
        if vchops.len() != ports.len() {
            return Err(McError::bad_arg(format!(
                "{} vc hops supplied for {} ports",
                vchops.len(),
                ports.len()
            )));
        }
        if replica_offsets.len() != sizes.len() {
            return Err(McError::bad_arg(format!(
                "{} replica offsets supplied for {} spray groups",
                replica_offsets.len(),
                sizes.len()
            )));
        }
        let total: usize = sizes.iter().map(|s| usize::from(*s)).sum();
        if total != ports.len() {
            return Err(McError::bad_arg(format!(
                "spray groups hold {total} ports, but {} were supplied",
                ports.len()
            )));
        }

        let mut groups = Vec::with_capacity(sizes.len());
        let mut start = 0;
        for (size, offset) in sizes.iter().zip(replica_offsets) {
            let end = start + usize::from(*size);
            groups.push(SprayGroup {
                ports: ports[start..end].to_vec(),
                vchops: vchops[start..end].to_vec(),
                primary: offset.map(usize::from),
            });
            start = end;
        }
        Ok(groups)
    }

    /// The inverse of `split()`.
    pub fn flatten(groups: &[SprayGroup]) -> FlatGroups {
        let mut flat: FlatGroups = Default::default();
        for group in groups {
            flat.0.extend_from_slice(&group.ports);
            flat.1.extend_from_slice(&group.vchops);
            flat.2.push(group.ports.len() as u8);
            flat.3.push(group.primary.map(|p| p as u8));
        }
        flat
    }

    /// The primary replica port, if there is one.
    pub fn primary_port(&self) -> Option<PortNum> {
        self.primary.and_then(|p| self.ports.get(p).copied())
    }
}

/// A compiled row: the directive list shared by all groups, and the index
/// of each group's first directive.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct McpList {
    pub spray_group_ptrs: Vec<u8>,
    pub directives: Vec<Directive>,
}

/// Compiles spray groups into directive lists and unwinds them again, for a
/// single fabric.
pub struct McpCompiler<T> {
    pub(crate) log: slog::Logger,
    pub(crate) config: FabricConfig,
    pub(crate) topology: T,
}

impl<T: PortTopology> McpCompiler<T> {
    pub fn new(
        log: &slog::Logger,
        config: FabricConfig,
        topology: T,
    ) -> McResult<Self> {
        config.validate()?;
        Ok(McpCompiler {
            log: log.new(o!("unit" => "mcp-compiler")),
            config,
            topology,
        })
    }

    pub fn config(&self) -> &FabricConfig {
        &self.config
    }

    pub fn topology(&self) -> &T {
        &self.topology
    }

    fn validate(&self, groups: &[SprayGroup]) -> McResult<()> {
        if groups.is_empty() || groups.len() > self.config.max_spray_groups {
            return Err(McError::bad_arg(format!(
                "spray group count {} out of range 1..={}",
                groups.len(),
                self.config.max_spray_groups
            )));
        }

        let num_ports = usize::from(self.config.num_ports);
        let mut total = 0;
        for (idx, group) in groups.iter().enumerate() {
            let size = group.ports.len();
            if size == 0 || size > num_ports {
                return Err(McError::bad_arg(format!(
                    "spray group {idx} has {size} ports"
                )));
            }
            if group.vchops.len() != size {
                return Err(McError::bad_arg(format!(
                    "spray group {idx} has {} vc hops for {size} ports",
                    group.vchops.len()
                )));
            }
            if let Some(primary) = group.primary {
                if primary >= size {
                    return Err(McError::bad_arg(format!(
                        "replica offset {primary} is outside spray group \
                         {idx} of size {size}"
                    )));
                }
            }
            total += size;
        }
        if total > num_ports {
            return Err(McError::bad_arg(format!(
                "{total} ports across all spray groups, limit is {num_ports}"
            )));
        }
        Ok(())
    }

    /// Compile a row's spray groups into a single directive list.  Nothing
    /// is returned unless every group fits.
    pub fn build(&self, groups: &[SprayGroup]) -> McResult<McpList> {
        self.validate(groups)?;

        let capacity = self.config.directives_per_row;
        let mut list = McpList {
            spray_group_ptrs: Vec::with_capacity(groups.len()),
            directives: Vec::with_capacity(capacity),
        };

        for (idx, group) in groups.iter().enumerate() {
            let bitmap = ColumnPortBitmap::build(
                &self.config,
                &self.topology,
                &group.ports,
                &group.vchops,
            )?;
            // The bitmap has already checked that every port is known
            let primary = group
                .primary_port()
                .and_then(|port| self.topology.port_location(port));

            let mut scratch = build_directives(&self.config, &bitmap, primary);
            apply_flags(&mut scratch);
            let directives = compact(scratch);

            let offset = list.directives.len();
            let needed = offset + directives.len();
            if needed > capacity {
                return Err(McError::TableOverflow {
                    group: idx,
                    needed,
                    capacity,
                });
            }
            debug!(self.log, "compiled spray group";
                "group" => idx,
                "ports" => group.ports.len(),
                "offset" => offset,
                "directives" => directives.len()
            );
            // The row capacity is limited to what a pointer can address
            list.spray_group_ptrs.push(offset as u8);
            list.directives.extend(directives);
        }
        Ok(list)
    }
}
