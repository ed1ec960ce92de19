// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

//! Recovery of spray groups from a compiled directive list.

use aal::{PortLocation, PortTopology};
use slog::warn;

use crate::assemble::{McpCompiler, SprayGroup};
use crate::directive::Directive;
use crate::error::{McError, McResult};
use crate::flags::find_primary;

impl<T: PortTopology> McpCompiler<T> {
    /// Decode one group's directives.  Ports come back in directive order,
    /// even side before odd.
    fn unwind_group(&self, group: &[Directive]) -> McResult<SprayGroup> {
        let signal = find_primary(group);
        let mut out = SprayGroup::default();

        for (idx, d) in group.iter().enumerate() {
            for (side, port) in d.ports() {
                let column = side.column(d.tcp, port.alt_path);
                let location = PortLocation::new(column, port.offset);
                let port_num = self.topology.port_at(location).ok_or(
                    McError::InvalidSentinelLookup {
                        column,
                        offset: port.offset,
                    },
                )?;
                if signal == Some((idx, side)) {
                    out.primary = Some(out.ports.len());
                }
                out.ports.push(port_num);
                out.vchops.push(u8::from(port.vchop));
            }
        }
        Ok(out)
    }

    /// Unwind a directive list with no pointer array.  Groups are taken to
    /// be packed back to back, each ending at a last-round directive.  The
    /// list ends at its first unused directive, or at the end of the slice.
    pub fn unwind(
        &self,
        directives: &[Directive],
    ) -> McResult<Vec<SprayGroup>> {
        let used = directives
            .iter()
            .position(Directive::is_unused)
            .unwrap_or(directives.len());

        let mut groups = Vec::new();
        let mut start = 0;
        for (idx, d) in directives[..used].iter().enumerate() {
            if d.last_round {
                groups.push(self.unwind_group(&directives[start..=idx])?);
                start = idx + 1;
            }
        }
        if start < used {
            warn!(self.log, "directive list ends mid-group";
                "group" => groups.len(),
                "directives" => used - start
            );
            groups.push(self.unwind_group(&directives[start..used])?);
        }
        Ok(groups)
    }

    /// Unwind a directive list using its spray group pointers.  Each group
    /// runs from its pointer to the next last-round directive.
    pub fn unwind_with_ptrs(
        &self,
        directives: &[Directive],
        ptrs: &[u8],
    ) -> McResult<Vec<SprayGroup>> {
        if ptrs.len() > self.config.max_spray_groups {
            return Err(McError::bad_arg(format!(
                "{} spray group pointers, limit is {}",
                ptrs.len(),
                self.config.max_spray_groups
            )));
        }

        ptrs.iter()
            .enumerate()
            .map(|(g, ptr)| {
                let start = usize::from(*ptr);
                let rest = directives.get(start..).unwrap_or_default();
                if rest.first().map_or(true, Directive::is_unused) {
                    return Err(McError::bad_arg(format!(
                        "spray group {g} points at empty slot {start}"
                    )));
                }
                let end = rest
                    .iter()
                    .position(|d| d.last_round || d.is_unused())
                    .map_or(rest.len(), |idx| {
                        if rest[idx].last_round {
                            idx + 1
                        } else {
                            idx
                        }
                    });
                if !rest[end - 1].last_round {
                    warn!(self.log, "spray group has no last round";
                        "group" => g,
                        "start" => start
                    );
                }
                self.unwind_group(&rest[..end])
            })
            .collect()
    }
}
