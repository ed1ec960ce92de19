// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

use rand::random;
use serde::{Deserialize, Serialize};
use slog::{o, Logger};

use aal::{AsicError, AsicResult, PortNum, RidTableOps, RidTableSelect};

/// Chaos that happens according to a probability.
#[derive(Default, Debug, Serialize, Deserialize, Copy, Clone)]
pub struct Chaos {
    /// A probability between 0.0 and 1.0
    pub value: f64,
}

impl Chaos {
    /// Create a new chaos value.
    pub fn new(value: f64) -> Self {
        let mut c = Self::default();
        c.set(value);
        c
    }
    /// Set the chaos value. Panics if value is outside the range [0.0, 1.0].
    pub fn set(&mut self, value: f64) {
        if !(0.0..=1.0).contains(&value) {
            panic!("probability out of range");
        }
        self.value = value;
    }

    /// Get the underlying chaos value.
    pub fn get(&self) -> f64 {
        self.value
    }

    /// Return a chaos error according to the underlying probability value.
    pub fn unfurled(&self, log: &Logger, message: &str) -> AsicResult<()> {
        if self.value >= random() {
            slog::error!(log, "chaos error: {}", message);
            return Err(AsicError::Synthetic(message.into()));
        }
        Ok(())
    }
}

/// The chaos ASIC config contains chaos values for each transport operation.
#[derive(Debug, Default, Serialize, Deserialize, Clone)]
pub struct AsicConfig {
    pub mc_rid_write: Chaos,
    pub mc_rid_read: Chaos,
}

impl AsicConfig {
    /// Apply the same failure probability to every operation.
    pub fn uniform(v: f64) -> Self {
        Self {
            mc_rid_write: Chaos::new(v),
            mc_rid_read: Chaos::new(v),
        }
    }
}

/// A transport that forwards to an inner transport, after first rolling the
/// dice on each operation.
pub struct Handle<H> {
    log: Logger,
    config: AsicConfig,
    inner: H,
}

impl<H: RidTableOps> Handle<H> {
    pub fn new(log: &Logger, config: AsicConfig, inner: H) -> Self {
        let log = log.new(o!("unit" => "asic_chaos"));
        Handle { log, config, inner }
    }

    pub fn inner(&self) -> &H {
        &self.inner
    }
}

impl<H: RidTableOps> RidTableOps for Handle<H> {
    fn mc_rid_write(
        &self,
        port: PortNum,
        table: RidTableSelect,
        index: u8,
        words: &[u32],
    ) -> AsicResult<()> {
        self.config.mc_rid_write.unfurled(
            &self.log,
            &format!("writing {table} rid row {index} on port {port}"),
        )?;
        self.inner.mc_rid_write(port, table, index, words)
    }

    fn mc_rid_read(
        &self,
        port: PortNum,
        table: RidTableSelect,
        index: u8,
        words: usize,
    ) -> AsicResult<Vec<u32>> {
        self.config.mc_rid_read.unfurled(
            &self.log,
            &format!("reading {table} rid row {index} on port {port}"),
        )?;
        self.inner.mc_rid_read(port, table, index, words)
    }
}
