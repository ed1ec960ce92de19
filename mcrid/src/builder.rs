// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

//! Translation of a single spray group into directives.
//!
//! Column pairs are walked in increasing order.  Within a pair, ports from
//! the even and odd columns are matched up one-for-one into directives, lowest
//! offsets first.  Whatever remains in the fuller column is then spread one
//! port per directive: the first on its own side, the rest on the opposite
//! side with the alt-path flag set.  A pair therefore contributes exactly
//! max(even count, odd count) directives.
//!
//! The k'th directive of each pair is placed in round k of a position-mapped
//! scratch list, so that each round visits the column pairs in increasing
//! order.  Pairs with fewer directives leave holes, which are squeezed out by
//! the compactor once the flags have been computed.

use aal::PortLocation;

use crate::bitmap::ColumnPortBitmap;
use crate::config::FabricConfig;
use crate::directive::{Directive, Side, SidePort};

/// A directive under construction, along with the side (if any) holding the
/// group's primary replica.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ScratchEntry {
    pub directive: Directive,
    pub primary: Option<Side>,
}

/// The position-mapped list for a single spray group.  Slot
/// `round * pairs + tcp` holds the round'th directive of column pair `tcp`.
#[derive(Clone, Debug)]
pub struct ScratchList {
    pairs: usize,
    slots: Vec<Option<ScratchEntry>>,
}

impl ScratchList {
    pub fn new(config: &FabricConfig) -> Self {
        ScratchList {
            pairs: usize::from(config.num_column_pairs()),
            slots: vec![None; config.scratch_slots()],
        }
    }

    fn place(&mut self, round: usize, entry: ScratchEntry) {
        let slot = round * self.pairs + usize::from(entry.directive.tcp);
        assert!(
            slot < self.slots.len(),
            "round {round} of pair {} beyond scratch capacity",
            entry.directive.tcp
        );
        assert!(self.slots[slot].is_none(), "scratch slot {slot} reused");
        self.slots[slot] = Some(entry);
    }

    /// Total number of slots, occupied or not.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// The number of directives placed.
    pub fn used(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Indices of the occupied slots, in directive order.
    pub fn occupied(&self) -> Vec<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(idx, s)| s.map(|_| idx))
            .collect()
    }

    /// The occupied entries, in directive order.
    pub(crate) fn entries_mut(&mut self) -> Vec<&mut ScratchEntry> {
        self.slots.iter_mut().flatten().collect()
    }

    pub(crate) fn into_slots(self) -> Vec<Option<ScratchEntry>> {
        self.slots
    }
}

/// Lay out one spray group's ports as directives.  `primary` is the
/// crossbar position of the group's primary replica, if it has one.
pub fn build_directives(
    config: &FabricConfig,
    bitmap: &ColumnPortBitmap,
    primary: Option<PortLocation>,
) -> ScratchList {
    let mut scratch = ScratchList::new(config);

    for tcp in 0..config.num_column_pairs() {
        let even_col = tcp * 2;
        let odd_col = tcp * 2 + 1;
        let mut even = bitmap.column(even_col);
        let mut odd = bitmap.column(odd_col);
        let ecount = even.len();
        let ocount = odd.len();

        if ecount == 0 && ocount == 0 {
            continue;
        }

        let side_port = |column: u8, offset: u8, alt_path: bool| SidePort {
            offset,
            vchop: bitmap.vchop(PortLocation::new(column, offset)),
            alt_path,
        };
        let is_primary = |column: u8, offset: u8| {
            primary == Some(PortLocation::new(column, offset))
        };

        let mut round = 0;

        // Pair off ports from both columns
        for _ in 0..ecount.min(ocount) {
            let e = even
                .pop_lowest()
                .expect("even column exhausted before its count");
            let o = odd
                .pop_lowest()
                .expect("odd column exhausted before its count");

            let mut directive = Directive::new(tcp);
            directive.set_side(Side::Even, side_port(even_col, e, false));
            directive.set_side(Side::Odd, side_port(odd_col, o, false));
            let primary = if is_primary(even_col, e) {
                Some(Side::Even)
            } else if is_primary(odd_col, o) {
                Some(Side::Odd)
            } else {
                None
            };
            scratch.place(round, ScratchEntry { directive, primary });
            round += 1;
        }

        if ecount == ocount {
            continue;
        }

        // Spread the leftovers from the fuller column, one per directive.
        // Only the first stays on its own side.
        let (mut surplus, column) = if ecount > ocount {
            (even, even_col)
        } else {
            (odd, odd_col)
        };
        let home = Side::of_column(column);
        for (n, offset) in surplus.drain().enumerate() {
            let alt_path = n > 0;
            let side = if alt_path { home.opposite() } else { home };

            let mut directive = Directive::new(tcp);
            directive.set_side(side, side_port(column, offset, alt_path));
            let primary = is_primary(column, offset).then_some(side);
            scratch.place(round, ScratchEntry { directive, primary });
            round += 1;
        }

        assert_eq!(
            round,
            ecount.max(ocount),
            "column pair {tcp} produced the wrong number of directives"
        );
    }

    scratch
}
