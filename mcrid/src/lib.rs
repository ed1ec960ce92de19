// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

//! Compiler and decompiler for crossbar multicast RID table rows.
//!
//! A multicast RID table row tells the crossbar which egress ports receive a
//! copy of a multicast packet.  The ports are organized into spray groups,
//! each of which receives one logical copy of the packet, and each of which
//! may nominate a primary replica to produce the group's response.  The
//! hardware consumes a row as a list of directives, each naming up to two
//! ports in a pair of adjacent crossbar columns.
//!
//! [`McpCompiler`] turns spray groups into directive lists and back again.
//! [`RidTable`] layers the register encoding on top, and programs rows
//! through any [`aal::RidTableOps`] transport.

pub mod assemble;
pub mod bitmap;
pub mod builder;
pub mod codec;
pub mod compact;
pub mod config;
pub mod directive;
pub mod error;
pub mod flags;
pub mod table;
pub mod topology;
mod unwind;

pub use assemble::{McpCompiler, McpList, SprayGroup};
pub use codec::{McRidEntry, RowHeader, RowRegisters};
pub use config::FabricConfig;
pub use directive::{Directive, Side, SidePort, VcHop};
pub use error::{McError, McResult};
pub use table::{McRidTableParams, RidTable};
pub use topology::PortMap;
