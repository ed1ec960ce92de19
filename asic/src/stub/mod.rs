// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

use std::collections::BTreeMap;
use std::sync::Mutex;

use slog::{debug, o, Logger};

use aal::{AsicError, AsicResult, PortNum, RidTableOps, RidTableSelect};

type RowKey = (PortNum, RidTableSelect, u8);

/// A register file standing in for the per-port RID tables.  Rows that have
/// never been written read back as all zeroes, just as they would after a
/// hardware reset.
pub struct StubHandle {
    log: Logger,
    num_ports: PortNum,
    rows: Mutex<BTreeMap<RowKey, Vec<u32>>>,
}

impl StubHandle {
    pub fn new(log: &Logger, num_ports: PortNum) -> Self {
        let log = log.new(o!("unit" => "asic_stub"));
        StubHandle {
            log,
            num_ports,
            rows: Mutex::new(BTreeMap::new()),
        }
    }

    /// Return the raw contents of a row, if it has ever been written.
    pub fn row(
        &self,
        port: PortNum,
        table: RidTableSelect,
        index: u8,
    ) -> Option<Vec<u32>> {
        let rows = self.rows.lock().unwrap();
        rows.get(&(port, table, index)).cloned()
    }

    /// The number of distinct rows that have been written.
    pub fn rows_written(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    fn check_port(&self, port: PortNum) -> AsicResult<()> {
        if port >= self.num_ports {
            return Err(AsicError::InvalidArg(format!(
                "no such port: {port}"
            )));
        }
        Ok(())
    }
}

impl RidTableOps for StubHandle {
    fn mc_rid_write(
        &self,
        port: PortNum,
        table: RidTableSelect,
        index: u8,
        words: &[u32],
    ) -> AsicResult<()> {
        self.check_port(port)?;
        debug!(
            self.log,
            "writing {} words to {} rid table row {} on port {}",
            words.len(),
            table,
            index,
            port
        );
        let mut rows = self.rows.lock().unwrap();
        rows.insert((port, table, index), words.to_vec());
        Ok(())
    }

    fn mc_rid_read(
        &self,
        port: PortNum,
        table: RidTableSelect,
        index: u8,
        words: usize,
    ) -> AsicResult<Vec<u32>> {
        self.check_port(port)?;
        let rows = self.rows.lock().unwrap();
        match rows.get(&(port, table, index)) {
            Some(row) if row.len() == words => Ok(row.clone()),
            Some(row) => Err(AsicError::Internal(format!(
                "row {index} holds {} words, {words} requested",
                row.len()
            ))),
            None => Ok(vec![0; words]),
        }
    }
}
