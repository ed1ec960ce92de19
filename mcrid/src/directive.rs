// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

//! The unit of the hardware encoding.
//!
//! A directive names a column pair and up to two ports within it: one on the
//! even side, one on the odd side.  A side normally refers to a port in its
//! own column; when its alt-path flag is set it refers to a port in the
//! other column of the pair instead.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One half of a column pair.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Side {
    Even,
    Odd,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Even => Side::Odd,
            Side::Odd => Side::Even,
        }
    }

    /// The side owning `column`.
    pub fn of_column(column: u8) -> Side {
        if column % 2 == 0 {
            Side::Even
        } else {
            Side::Odd
        }
    }

    /// The column a port encoded on this side of pair `tcp` actually lives
    /// in.
    pub fn column(self, tcp: u8, alt_path: bool) -> u8 {
        let side = if alt_path { self.opposite() } else { self };
        match side {
            Side::Even => tcp * 2,
            Side::Odd => tcp * 2 + 1,
        }
    }
}

/// Virtual channel handling for a replicated packet as it leaves a port.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Eq,
    Hash,
    JsonSchema,
    PartialEq,
    Serialize,
    strum::Display,
    strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum VcHop {
    #[default]
    Pass = 0,
    Invert = 1,
    Force0 = 2,
    Force1 = 3,
}

impl From<VcHop> for u8 {
    fn from(v: VcHop) -> u8 {
        v as u8
    }
}

impl TryFrom<u8> for VcHop {
    type Error = u8;

    fn try_from(x: u8) -> Result<Self, Self::Error> {
        match x {
            0 => Ok(VcHop::Pass),
            1 => Ok(VcHop::Invert),
            2 => Ok(VcHop::Force0),
            3 => Ok(VcHop::Force1),
            x => Err(x),
        }
    }
}

/// A port as seen from one side of a directive.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SidePort {
    /// Offset of the port within its column
    pub offset: u8,
    pub vchop: VcHop,
    /// Set when the port lives in the other column of the pair
    pub alt_path: bool,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Directive {
    /// Index of the column pair
    pub tcp: u8,
    pub even: Option<SidePort>,
    pub odd: Option<SidePort>,
    /// Carries the primary replica signal.  See `flags::ReplicaSignal`.
    pub port_flag: bool,
    /// Clear on the last directive of each round
    pub continue_round: bool,
    /// Set on the last directive of a spray group
    pub last_round: bool,
    /// The number of directives in the round this directive opens, or 0 if
    /// it doesn't open one.  This is bookkeeping only; it isn't part of the
    /// hardware encoding.
    pub round_size: u8,
}

impl Directive {
    pub fn new(tcp: u8) -> Self {
        Directive {
            tcp,
            even: None,
            odd: None,
            port_flag: false,
            continue_round: false,
            last_round: false,
            round_size: 0,
        }
    }

    pub fn side(&self, side: Side) -> Option<&SidePort> {
        match side {
            Side::Even => self.even.as_ref(),
            Side::Odd => self.odd.as_ref(),
        }
    }

    pub fn set_side(&mut self, side: Side, port: SidePort) {
        match side {
            Side::Even => self.even = Some(port),
            Side::Odd => self.odd = Some(port),
        }
    }

    /// Populated sides, even first.
    pub fn ports(&self) -> impl Iterator<Item = (Side, &SidePort)> {
        [(Side::Even, &self.even), (Side::Odd, &self.odd)]
            .into_iter()
            .filter_map(|(side, port)| port.as_ref().map(|p| (side, p)))
    }

    /// A directive naming no ports marks the end of the list.
    pub fn is_unused(&self) -> bool {
        self.even.is_none() && self.odd.is_none()
    }
}
