// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;

use common::logging::test_logger;
use mcrid::{FabricConfig, McpCompiler, PortMap, RidTable, SprayGroup};

pub(crate) fn compiler() -> McpCompiler<PortMap> {
    let config = FabricConfig::default();
    let map = PortMap::reference(&config);
    McpCompiler::new(&test_logger(), config, map).unwrap()
}

pub(crate) fn rid_table() -> RidTable<PortMap> {
    let config = FabricConfig::default();
    let map = PortMap::reference(&config);
    RidTable::new(&test_logger(), config, map).unwrap()
}

pub(crate) fn group(ports: &[u8], primary: Option<usize>) -> SprayGroup {
    SprayGroup {
        ports: ports.to_vec(),
        vchops: vec![0; ports.len()],
        primary,
    }
}

/// A group's membership with each port's vc hop, sorted by port, along with
/// the primary replica port.  Unwinding doesn't preserve port order, so this
/// is what survives a round trip.
pub(crate) type Membership = (Vec<(u8, u8)>, Option<u8>);

pub(crate) fn membership(g: &SprayGroup) -> Membership {
    let mut ports: Vec<_> = g
        .ports
        .iter()
        .copied()
        .zip(g.vchops.iter().copied())
        .collect();
    ports.sort();
    (ports, g.primary_port())
}

/// A random set of disjoint spray groups.  Each group takes up at most one
/// directive per port, so keeping the total at or under the row capacity
/// guarantees that the groups fit.
pub(crate) fn random_groups(
    rng: &mut StdRng,
    config: &FabricConfig,
) -> Vec<SprayGroup> {
    let mut ports: Vec<u8> = (0..config.num_ports).collect();
    ports.shuffle(rng);

    let total = rng.gen_range(1..=config.directives_per_row);
    let ngroups = rng.gen_range(1..=total.min(config.max_spray_groups));

    // Cut `total` ports into `ngroups` non-empty runs
    let mut cuts: Vec<usize> = (1..total).collect();
    cuts.shuffle(rng);
    cuts.truncate(ngroups - 1);
    cuts.sort();
    cuts.insert(0, 0);
    cuts.push(total);

    cuts.windows(2)
        .map(|w| {
            let members = &ports[w[0]..w[1]];
            let primary = rng
                .gen_bool(0.75)
                .then(|| rng.gen_range(0..members.len()));
            SprayGroup {
                ports: members.to_vec(),
                vchops: members.iter().map(|_| rng.gen_range(0..4)).collect(),
                primary,
            }
        })
        .collect()
}
