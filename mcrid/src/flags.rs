// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

//! Round and primary replica flags.
//!
//! A round is a run of directives with strictly increasing TCP indices.  The
//! last directive of a round has its continue flag clear, and the last
//! directive of a spray group has its last-round flag set.
//!
//! The primary replica is the single port in a group whose response is
//! forwarded.  Its position is signalled with the port flag, in one of two
//! ways depending on where it falls:
//!
//! - in the last directive, the continue flag is set even though the round
//!   is over, and the port flag names the side;
//! - anywhere else, the port flag is set on the directive holding it, and
//!   the port flag of the directive after it names the side.

use crate::builder::ScratchList;
use crate::directive::{Directive, Side};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ReplicaSignal {
    None,
    ThisEven,
    ThisOdd,
    NextEven,
    NextOdd,
}

fn side_flag(side: Side) -> bool {
    side == Side::Odd
}

fn flag_side(flag: bool) -> Side {
    if flag {
        Side::Odd
    } else {
        Side::Even
    }
}

impl ReplicaSignal {
    /// The signal for a primary replica found on `side` of the directive at
    /// `position` in a group of `len` directives.
    pub fn new(position: usize, len: usize, side: Side) -> Self {
        assert!(position < len, "primary replica outside its group");
        match (position + 1 == len, side) {
            (true, Side::Even) => ReplicaSignal::ThisEven,
            (true, Side::Odd) => ReplicaSignal::ThisOdd,
            (false, Side::Even) => ReplicaSignal::NextEven,
            (false, Side::Odd) => ReplicaSignal::NextOdd,
        }
    }

    pub fn side(self) -> Option<Side> {
        match self {
            Self::None => None,
            Self::ThisEven | Self::NextEven => Some(Side::Even),
            Self::ThisOdd | Self::NextOdd => Some(Side::Odd),
        }
    }

    /// Mark the signal on the directive holding the primary replica, and on
    /// the one following it when the signal needs it.
    pub fn stamp(self, this: &mut Directive, next: Option<&mut Directive>) {
        match self {
            ReplicaSignal::None => (),
            ReplicaSignal::ThisEven | ReplicaSignal::ThisOdd => {
                this.continue_round = true;
                this.port_flag = self.side().is_some_and(side_flag);
            }
            ReplicaSignal::NextEven | ReplicaSignal::NextOdd => {
                let next = next.expect("primary signal needs a next directive");
                this.port_flag = true;
                next.port_flag = self.side().is_some_and(side_flag);
            }
        }
    }

    /// The signal carried by `this`, which is followed by `next` within the
    /// same group.
    pub fn read(this: &Directive, next: Option<&Directive>) -> Self {
        if this.last_round && this.continue_round {
            match flag_side(this.port_flag) {
                Side::Even => ReplicaSignal::ThisEven,
                Side::Odd => ReplicaSignal::ThisOdd,
            }
        } else if let (true, Some(next)) = (this.port_flag, next) {
            match flag_side(next.port_flag) {
                Side::Even => ReplicaSignal::NextEven,
                Side::Odd => ReplicaSignal::NextOdd,
            }
        } else {
            ReplicaSignal::None
        }
    }
}

/// Locate the primary replica in a single group's directives.  Returns the
/// index of the directive holding it and the side it is encoded on.  A
/// signal naming an empty side is treated as no signal at all.
pub fn find_primary(group: &[Directive]) -> Option<(usize, Side)> {
    // The first signal found is the only real one: the port flag consumed by
    // a Next* signal always follows it.
    let (idx, side) = group.iter().enumerate().find_map(|(idx, this)| {
        let side = ReplicaSignal::read(this, group.get(idx + 1)).side()?;
        Some((idx, side))
    })?;
    group[idx].side(side).map(|_| (idx, side))
}

/// The size of each round in a group, given the TCP index of each of its
/// directives in order.  Each round's size is reported at the index of its
/// first directive, with 0 everywhere else.
pub fn round_sizes(tcps: &[u8]) -> Vec<u8> {
    let mut sizes = vec![0; tcps.len()];
    let mut start = 0;
    for idx in 0..tcps.len() {
        let closes = match tcps.get(idx + 1) {
            Some(next) => *next <= tcps[idx],
            None => true,
        };
        if closes {
            sizes[start] = (idx + 1 - start) as u8;
            start = idx + 1;
        }
    }
    sizes
}

/// Recompute the round sizes of a directive list holding one or more groups,
/// each ending with its last-round directive.
pub fn stamp_round_sizes(directives: &mut [Directive]) {
    for group in directives.split_inclusive_mut(|d| d.last_round) {
        let tcps: Vec<u8> = group.iter().map(|d| d.tcp).collect();
        for (d, size) in group.iter_mut().zip(round_sizes(&tcps)) {
            d.round_size = size;
        }
    }
}

/// Set the round flags, round sizes, and the primary replica signal on a
/// single group's scratch list.  Empty slots are skipped.
pub fn apply_flags(scratch: &mut ScratchList) {
    let mut entries = scratch.entries_mut();
    let tcps: Vec<u8> = entries.iter().map(|e| e.directive.tcp).collect();
    let sizes = round_sizes(&tcps);
    let len = entries.len();

    let mut primary = None;
    for (idx, entry) in entries.iter_mut().enumerate() {
        let d = &mut entry.directive;
        let last = idx + 1 == len;
        d.last_round = last;
        d.continue_round = !last && tcps[idx + 1] > tcps[idx];
        d.port_flag = false;
        d.round_size = sizes[idx];
        if let Some(side) = entry.primary {
            assert!(primary.is_none(), "spray group has two primary replicas");
            primary = Some((idx, side));
        }
    }

    if let Some((idx, side)) = primary {
        let (head, tail) = entries.split_at_mut(idx + 1);
        ReplicaSignal::new(idx, len, side).stamp(
            &mut head[idx].directive,
            tail.first_mut().map(|e| &mut e.directive),
        );
    }
}
