// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

use pretty_assertions::assert_eq;

use aal::{AsicError, AsicResult, PortNum, RidTableOps, RidTableSelect};
use common::logging::test_logger;
use mcrid::codec::UNUSED_DIRECTIVE;
use mcrid::{McError, McRidTableParams, VcHop};

use crate::integration_tests::util::*;

mockall::mock! {
    pub Transport {}
    impl RidTableOps for Transport {
        fn mc_rid_write(
            &self,
            port: PortNum,
            table: RidTableSelect,
            index: u8,
            words: &[u32],
        ) -> AsicResult<()>;
        fn mc_rid_read(
            &self,
            port: PortNum,
            table: RidTableSelect,
            index: u8,
            words: usize,
        ) -> AsicResult<Vec<u32>>;
    }
}

fn request() -> McRidTableParams {
    McRidTableParams {
        port_num: 12,
        index: 100,
        extended_table: false,
        ports: vec![0, 11, 1, 2, 40],
        vc_hop: vec![
            VcHop::Pass,
            VcHop::Invert,
            VcHop::Force0,
            VcHop::Force1,
            VcHop::Pass,
        ],
        mc_size: 2,
        ports_per_spray_group: vec![4, 1],
        replica_offset: vec![Some(2), Some(0)],
        extended_ptr: None,
        no_dyn_rsp: true,
        entry_valid: true,
    }
}

#[test]
fn test_row_layout() -> anyhow::Result<()> {
    let table = rid_table();
    let hdl = asic::Handle::new(&test_logger(), 64);
    table.set(&hdl, &request())?;

    let words = hdl.row(12, RidTableSelect::Main, 100).unwrap();
    assert_eq!(words.len(), 37);

    // mc size 2, two groups, no dynamic response, valid
    assert_eq!(words[0], 0x1 | 0x2 << 8 | 1 << 21 | 1 << 22);
    // The first group needs three directives
    assert_eq!(&words[1..5], &[0x0300, 0, 0, 0]);

    // Ports 0 and 11 pair off at offset 0 of columns 0 and 1
    assert_eq!(words[5], 0x1 << 12);
    // Port 1 stays on the even side.  It's the primary, so it carries the
    // port flag, and the next directive's clear port flag says "even".
    assert_eq!(words[6], 0x1 | 0x2 << 5 | 0xf << 7 | 1 << 17);
    // Port 2 crosses to the odd side, and closes the group
    assert_eq!(words[7], 0xf | 0x2 << 7 | 1 << 11 | 0x3 << 12 | 1 << 19);
    // Port 40 sits alone at offset 7 of column 3, and is its group's
    // primary: the last directive continues its round to say so.
    assert_eq!(
        words[8],
        0xf | 0x7 << 7 | 0x1 << 14 | 1 << 17 | 1 << 18 | 1 << 19
    );
    assert!(words[9..].iter().all(|w| *w == UNUSED_DIRECTIVE));
    Ok(())
}

#[test]
fn test_set_get() -> anyhow::Result<()> {
    let table = rid_table();
    let hdl = asic::Handle::new(&test_logger(), 64);
    let req = request();
    table.set(&hdl, &req)?;

    // The request's ports are already listed in directive order, so the
    // row reads back unchanged.
    let back = table.get(&hdl, 12, 100, RidTableSelect::Main)?;
    assert_eq!(back, req);

    // Listing a group's ports differently produces the same row
    let mut shuffled = req.clone();
    shuffled.ports.swap(0, 3);
    shuffled.vc_hop.swap(0, 3);
    shuffled.replica_offset[0] = Some(2);
    table.set(&hdl, &shuffled)?;
    assert_eq!(table.get(&hdl, 12, 100, RidTableSelect::Main)?, req);
    Ok(())
}

#[test]
fn test_extended_table() -> anyhow::Result<()> {
    let table = rid_table();
    let hdl = asic::Handle::new(&test_logger(), 64);

    let mut ext = request();
    ext.extended_table = true;
    ext.index = 63;
    table.set(&hdl, &ext)?;

    let mut main = request();
    main.extended_ptr = Some(63);
    table.set(&hdl, &main)?;

    assert_eq!(hdl.rows_written(), 2);
    let back = table.get(&hdl, 12, 63, RidTableSelect::Extended)?;
    assert!(back.extended_table);
    assert_eq!(back.extended_ptr, None);
    let back = table.get(&hdl, 12, 100, RidTableSelect::Main)?;
    assert_eq!(back.extended_ptr, Some(63));
    Ok(())
}

#[test]
fn test_rejected_requests_never_write() {
    let table = rid_table();
    let mut hdl = MockTransport::new();
    hdl.expect_mc_rid_write().never();
    hdl.expect_mc_rid_read().never();

    let bad = [
        McRidTableParams {
            port_num: 64,
            ..request()
        },
        McRidTableParams {
            ports: vec![],
            vc_hop: vec![],
            ports_per_spray_group: vec![],
            replica_offset: vec![],
            ..request()
        },
        McRidTableParams {
            ports: vec![0, 11, 1, 1, 40],
            ..request()
        },
        McRidTableParams {
            ports_per_spray_group: vec![3, 2],
            replica_offset: vec![Some(2), Some(2)],
            ..request()
        },
        McRidTableParams {
            vc_hop: vec![VcHop::Pass],
            ..request()
        },
        McRidTableParams {
            extended_table: true,
            extended_ptr: Some(1),
            index: 1,
            ..request()
        },
    ];
    for req in bad {
        assert!(table.set(&hdl, &req).is_err(), "accepted {req:?}");
    }
    assert!(table.get(&hdl, 0, 128, RidTableSelect::Main).is_err());
    assert!(table
        .invalidate(&hdl, 0, 64, RidTableSelect::Extended)
        .is_err());
}

#[test]
fn test_single_write() -> anyhow::Result<()> {
    let table = rid_table();
    let mut hdl = MockTransport::new();
    hdl.expect_mc_rid_write()
        .times(1)
        .withf(|port, table, index, words| {
            *port == 12
                && *table == RidTableSelect::Main
                && *index == 100
                && words.len() == 37
        })
        .returning(|_, _, _, _| Ok(()));
    table.set(&hdl, &request())?;
    Ok(())
}

#[test]
fn test_transport_errors() {
    let table = rid_table();
    let mut hdl = MockTransport::new();
    hdl.expect_mc_rid_write()
        .returning(|_, _, _, _| Err(AsicError::Missing("gone".into())));
    // A short read is rejected rather than decoded
    hdl.expect_mc_rid_read()
        .returning(|_, _, _, words| Ok(vec![0; words - 1]));

    assert!(matches!(
        table.set(&hdl, &request()),
        Err(McError::Asic(AsicError::Missing(_)))
    ));
    assert!(matches!(
        table.get(&hdl, 12, 100, RidTableSelect::Main),
        Err(McError::BadArgument(_))
    ));
}

#[test]
fn test_corrupt_row() {
    let table = rid_table();
    let mut hdl = MockTransport::new();
    // A valid header over a directive naming an empty crossbar slot
    hdl.expect_mc_rid_read().returning(|_, _, _, words| {
        let mut row = vec![UNUSED_DIRECTIVE; words];
        row[0] = 1 << 8 | 1 << 22;
        row[1..5].copy_from_slice(&[0; 4]);
        row[5] = 0xf | 0xa << 7 | 0x2 << 14 | 1 << 19;
        Ok(row)
    });
    assert!(matches!(
        table.get(&hdl, 0, 0, RidTableSelect::Main),
        Err(McError::InvalidSentinelLookup {
            column: 5,
            offset: 10
        })
    ));
}
