// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

use std::collections::BTreeMap;

use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::SeedableRng;

use aal::PortTopology;
use mcrid::{
    Directive, McRidEntry, McpList, RowHeader, RowRegisters, SprayGroup,
};

use crate::integration_tests::util::*;

const ROUNDS: u64 = 500;

// The directive list of each group, located by its pointer.
fn group_slices(list: &McpList) -> Vec<&[Directive]> {
    let mut ends: Vec<usize> = list
        .spray_group_ptrs
        .iter()
        .skip(1)
        .map(|p| usize::from(*p))
        .collect();
    ends.push(list.directives.len());
    list.spray_group_ptrs
        .iter()
        .zip(ends)
        .map(|(start, end)| &list.directives[usize::from(*start)..end])
        .collect()
}

#[test]
fn test_round_trip() -> anyhow::Result<()> {
    let c = compiler();
    let config = c.config().clone();
    let mut rng = StdRng::seed_from_u64(0x6d63_7269);

    for round in 0..ROUNDS {
        let groups = random_groups(&mut rng, &config);
        let list = c.build(&groups)?;
        let expected: Vec<_> = groups.iter().map(membership).collect();

        let unwound = c.unwind(&list.directives)?;
        let actual: Vec<_> = unwound.iter().map(membership).collect();
        assert_eq!(actual, expected, "round {round}: {groups:?}");

        // Through the registers and back, using the pointer array
        let entry = McRidEntry {
            header: RowHeader {
                mc_size: groups.len() as u16,
                num_spray_groups: groups.len(),
                ext_ptr: None,
                no_dyn_rsp: false,
                valid: true,
            },
            spray_group_ptrs: list.spray_group_ptrs.clone(),
            directives: list.directives.clone(),
        };
        let words = RowRegisters::encode(&config, &entry)?.words();
        let decoded =
            RowRegisters::from_words(&config, &words)?.decode(&config)?;
        assert_eq!(decoded, entry, "round {round}");
        let unwound = c.unwind_with_ptrs(
            &decoded.directives,
            &decoded.spray_group_ptrs,
        )?;
        let actual: Vec<_> = unwound.iter().map(membership).collect();
        assert_eq!(actual, expected, "round {round}");
    }
    Ok(())
}

#[test]
fn test_rebuild_from_unwound() -> anyhow::Result<()> {
    // Rebuilding from an unwound row reproduces the row exactly.
    let c = compiler();
    let config = c.config().clone();
    let mut rng = StdRng::seed_from_u64(17);
    for _ in 0..ROUNDS {
        let list = c.build(&random_groups(&mut rng, &config))?;
        let again = c.build(&c.unwind(&list.directives)?)?;
        assert_eq!(again, list);
    }
    Ok(())
}

#[test]
fn test_deterministic() -> anyhow::Result<()> {
    let c = compiler();
    let config = c.config().clone();
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..ROUNDS {
        let groups = random_groups(&mut rng, &config);
        assert_eq!(c.build(&groups)?, c.build(&groups)?);
    }
    Ok(())
}

// Directives per column pair, as the group's port layout says there should
// be.
fn expected_pair_usage(
    c: &mcrid::McpCompiler<mcrid::PortMap>,
    group: &SprayGroup,
) -> BTreeMap<u8, usize> {
    let mut counts: BTreeMap<u8, (usize, usize)> = BTreeMap::new();
    for port in &group.ports {
        let location = c.topology().port_location(*port).unwrap();
        let entry = counts.entry(location.column / 2).or_default();
        if location.column % 2 == 0 {
            entry.0 += 1;
        } else {
            entry.1 += 1;
        }
    }
    counts
        .into_iter()
        .map(|(tcp, (even, odd))| (tcp, even.max(odd)))
        .collect()
}

#[test]
fn test_balance() -> anyhow::Result<()> {
    let c = compiler();
    let config = c.config().clone();
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..ROUNDS {
        let groups = random_groups(&mut rng, &config);
        let list = c.build(&groups)?;
        for (group, directives) in groups.iter().zip(group_slices(&list)) {
            let mut usage = BTreeMap::new();
            for d in directives {
                *usage.entry(d.tcp).or_insert(0) += 1;
            }
            assert_eq!(usage, expected_pair_usage(&c, group));
        }
    }
    Ok(())
}

#[test]
fn test_flag_consistency() -> anyhow::Result<()> {
    let c = compiler();
    let config = c.config().clone();
    let mut rng = StdRng::seed_from_u64(99);
    for _ in 0..ROUNDS {
        let groups = random_groups(&mut rng, &config);
        let list = c.build(&groups)?;
        for (group, directives) in groups.iter().zip(group_slices(&list)) {
            let (last, body) = directives.split_last().unwrap();

            // One last round, at the end
            assert!(last.last_round);
            assert!(body.iter().all(|d| !d.last_round));

            // Rounds close where the TCP index stops increasing
            for (d, next) in body.iter().zip(&directives[1..]) {
                assert_eq!(d.continue_round, next.tcp > d.tcp);
            }
            for (idx, d) in directives.iter().enumerate() {
                let opens = idx == 0 || d.tcp <= directives[idx - 1].tcp;
                assert_eq!(d.round_size > 0, opens);
            }

            // The last directive only continues its round when it holds
            // the primary replica.
            if last.continue_round {
                let primary = group.primary_port().unwrap();
                let location = c.topology().port_location(primary).unwrap();
                assert_eq!(location.column / 2, last.tcp);
                assert!(last.ports().any(|(_, p)| p.offset == location.offset));
            }

            // Round sizes add up to the group
            let total: usize =
                directives.iter().map(|d| usize::from(d.round_size)).sum();
            assert_eq!(total, directives.len());
        }
    }
    Ok(())
}
