// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

//! Programming multicast RID table rows through an ASIC handle.

use aal::{PortNum, PortTopology, RidTableOps, RidTableSelect};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use slog::{error, info, o};

use crate::assemble::{McpCompiler, SprayGroup};
use crate::codec::{McRidEntry, RowHeader, RowRegisters};
use crate::config::FabricConfig;
use crate::directive::VcHop;
use crate::error::{McError, McResult};

/// The contents of a single table row, in the form the control plane deals
/// in.
#[derive(
    Clone, Debug, Default, Deserialize, Eq, JsonSchema, PartialEq, Serialize,
)]
pub struct McRidTableParams {
    /// The port whose table is being addressed
    pub port_num: PortNum,
    pub index: u8,
    pub extended_table: bool,
    /// Every port in the row, grouped by spray group
    pub ports: Vec<PortNum>,
    /// VC hop for each port, parallel to `ports`
    pub vc_hop: Vec<VcHop>,
    /// Number of responses expected for a replicated packet
    pub mc_size: u16,
    /// Number of ports in each spray group
    pub ports_per_spray_group: Vec<u8>,
    /// Each spray group's primary replica, as an offset within the group
    pub replica_offset: Vec<Option<u8>>,
    /// Continuation row in the extended table
    pub extended_ptr: Option<u8>,
    pub no_dyn_rsp: bool,
    pub entry_valid: bool,
}

impl McRidTableParams {
    pub fn table(&self) -> RidTableSelect {
        if self.extended_table {
            RidTableSelect::Extended
        } else {
            RidTableSelect::Main
        }
    }
}

/// Reads and writes the multicast RID tables of every port on a switch.
pub struct RidTable<T> {
    log: slog::Logger,
    compiler: McpCompiler<T>,
}

impl<T: PortTopology> RidTable<T> {
    pub fn new(
        log: &slog::Logger,
        config: FabricConfig,
        topology: T,
    ) -> McResult<Self> {
        let log = log.new(o!("unit" => "mc-rid-table"));
        let compiler = McpCompiler::new(&log, config, topology)?;
        Ok(RidTable { log, compiler })
    }

    pub fn compiler(&self) -> &McpCompiler<T> {
        &self.compiler
    }

    fn config(&self) -> &FabricConfig {
        self.compiler.config()
    }

    fn check_address(
        &self,
        port: PortNum,
        index: u8,
        table: RidTableSelect,
    ) -> McResult<()> {
        let config = self.config();
        if port >= config.num_ports {
            return Err(McError::bad_arg(format!("invalid port: {port}")));
        }
        let depth = match table {
            RidTableSelect::Main => config.main_table_depth,
            RidTableSelect::Extended => config.ext_table_depth,
        };
        if index > depth {
            return Err(McError::bad_arg(format!(
                "index {index} is past the end of the {table} table"
            )));
        }
        Ok(())
    }

    fn log_failure<R>(
        &self,
        op: &str,
        port: PortNum,
        index: u8,
        table: RidTableSelect,
        result: McResult<R>,
    ) -> McResult<R> {
        if let Err(e) = &result {
            error!(self.log, "{op} failed: {e}";
                "port" => port,
                "index" => index,
                "table" => %table
            );
        }
        result
    }

    /// Compile and write one row.  Nothing is written if the request is
    /// rejected.  A request with `entry_valid` clear invalidates the row.
    pub fn set(
        &self,
        hdl: &impl RidTableOps,
        params: &McRidTableParams,
    ) -> McResult<()> {
        let table = params.table();
        let result = self.program(hdl, params);
        self.log_failure("set", params.port_num, params.index, table, result)
    }

    fn program(
        &self,
        hdl: &impl RidTableOps,
        params: &McRidTableParams,
    ) -> McResult<()> {
        let config = self.config();
        let table = params.table();
        self.check_address(params.port_num, params.index, table)?;

        if !params.entry_valid {
            let regs = RowRegisters::invalid(config);
            return self.write(hdl, params.port_num, params.index, table, regs);
        }

        if params.mc_size == 0 || params.mc_size > u16::from(config.num_ports)
        {
            return Err(McError::bad_arg(format!(
                "mc size {} out of range",
                params.mc_size
            )));
        }
        if let Some(ptr) = params.extended_ptr {
            if params.extended_table {
                return Err(McError::bad_arg(
                    "extended table entries cannot be chained",
                ));
            }
            if ptr > config.ext_table_depth {
                return Err(McError::bad_arg(format!(
                    "extended pointer {ptr} is past the end of the table"
                )));
            }
        }

        let vchops: Vec<u8> =
            params.vc_hop.iter().map(|v| u8::from(*v)).collect();
        let groups = SprayGroup::split(
            &params.ports,
            &vchops,
            &params.ports_per_spray_group,
            &params.replica_offset,
        )?;
        let list = self.compiler.build(&groups)?;

        let entry = McRidEntry {
            header: RowHeader {
                mc_size: params.mc_size,
                num_spray_groups: groups.len(),
                ext_ptr: params.extended_ptr,
                no_dyn_rsp: params.no_dyn_rsp,
                valid: true,
            },
            spray_group_ptrs: list.spray_group_ptrs,
            directives: list.directives,
        };
        let regs = RowRegisters::encode(config, &entry)?;
        self.write(hdl, params.port_num, params.index, table, regs)?;
        info!(self.log, "programmed multicast row";
            "port" => params.port_num,
            "index" => params.index,
            "table" => %table,
            "spray_groups" => groups.len(),
            "entries_used" => entry.directives.len()
        );
        Ok(())
    }

    fn write(
        &self,
        hdl: &impl RidTableOps,
        port: PortNum,
        index: u8,
        table: RidTableSelect,
        regs: RowRegisters,
    ) -> McResult<()> {
        hdl.mc_rid_write(port, table, index, &regs.words())
            .map_err(McError::from)
    }

    /// Read one row back in its control plane form.  Ports within a spray
    /// group are returned in directive order, which need not match the
    /// order they were programmed in.
    pub fn get(
        &self,
        hdl: &impl RidTableOps,
        port: PortNum,
        index: u8,
        table: RidTableSelect,
    ) -> McResult<McRidTableParams> {
        let result = self.fetch(hdl, port, index, table);
        self.log_failure("get", port, index, table, result)
    }

    fn fetch(
        &self,
        hdl: &impl RidTableOps,
        port: PortNum,
        index: u8,
        table: RidTableSelect,
    ) -> McResult<McRidTableParams> {
        let config = self.config();
        self.check_address(port, index, table)?;

        let words = hdl.mc_rid_read(port, table, index, config.row_words())?;
        let entry = RowRegisters::from_words(config, &words)?.decode(config)?;
        let mut params = McRidTableParams {
            port_num: port,
            index,
            extended_table: table == RidTableSelect::Extended,
            ..Default::default()
        };
        if !entry.header.valid {
            return Ok(params);
        }

        let groups = self
            .compiler
            .unwind_with_ptrs(&entry.directives, &entry.spray_group_ptrs)?;
        let (ports, vchops, sizes, offsets) = SprayGroup::flatten(&groups);
        params.vc_hop = ports
            .iter()
            .zip(vchops)
            .map(|(port, vchop)| {
                VcHop::try_from(vchop).map_err(|vchop| {
                    McError::VcHopOutOfRange { port: *port, vchop }
                })
            })
            .collect::<McResult<_>>()?;
        params.ports = ports;
        params.mc_size = entry.header.mc_size;
        params.ports_per_spray_group = sizes;
        params.replica_offset = offsets;
        params.extended_ptr = entry.header.ext_ptr;
        params.no_dyn_rsp = entry.header.no_dyn_rsp;
        params.entry_valid = true;
        Ok(params)
    }

    /// Mark one row invalid, clearing its directives.
    pub fn invalidate(
        &self,
        hdl: &impl RidTableOps,
        port: PortNum,
        index: u8,
        table: RidTableSelect,
    ) -> McResult<()> {
        let result = self.check_address(port, index, table).and_then(|_| {
            let regs = RowRegisters::invalid(self.config());
            self.write(hdl, port, index, table, regs)
        });
        self.log_failure("invalidate", port, index, table, result)
    }
}
