// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

use aal::{AsicError, RidTableSelect};
use asic::chaos::{AsicConfig, Chaos, Handle};
use asic::stub::StubHandle;
use common::logging::test_logger;
use mcrid::{
    FabricConfig, McError, McRidTableParams, PortMap, RidTable, VcHop,
};

fn setup(config: AsicConfig) -> (RidTable<PortMap>, Handle<StubHandle>) {
    let log = test_logger();
    let fabric = FabricConfig::default();
    let stub = StubHandle::new(&log, fabric.num_ports);
    let map = PortMap::reference(&fabric);
    (
        RidTable::new(&log, fabric, map).unwrap(),
        Handle::new(&log, config, stub),
    )
}

fn request() -> McRidTableParams {
    McRidTableParams {
        port_num: 7,
        index: 3,
        ports: vec![4, 15, 26],
        vc_hop: vec![VcHop::Pass; 3],
        mc_size: 1,
        ports_per_spray_group: vec![3],
        replica_offset: vec![Some(1)],
        entry_valid: true,
        ..Default::default()
    }
}

#[test]
fn test_write_failure() {
    let (table, hdl) = setup(AsicConfig::uniform(1.0));
    assert!(matches!(
        table.set(&hdl, &request()),
        Err(McError::Asic(AsicError::Synthetic(_)))
    ));
    assert!(matches!(
        table.invalidate(&hdl, 7, 3, RidTableSelect::Main),
        Err(McError::Asic(AsicError::Synthetic(_)))
    ));
    assert_eq!(hdl.inner().rows_written(), 0);
}

#[test]
fn test_read_failure() {
    let (table, hdl) = setup(AsicConfig {
        mc_rid_write: Chaos::new(0.0),
        mc_rid_read: Chaos::new(1.0),
    });
    table.set(&hdl, &request()).unwrap();
    assert!(hdl.inner().row(7, RidTableSelect::Main, 3).is_some());
    assert!(matches!(
        table.get(&hdl, 7, 3, RidTableSelect::Main),
        Err(McError::Asic(AsicError::Synthetic(_)))
    ));
}

#[test]
fn test_no_chaos() {
    let (table, hdl) = setup(AsicConfig::default());
    let req = request();
    table.set(&hdl, &req).unwrap();
    assert_eq!(table.get(&hdl, 7, 3, RidTableSelect::Main).unwrap(), req);
}
