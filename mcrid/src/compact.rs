// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

use crate::builder::ScratchList;
use crate::directive::Directive;

/// Squeeze the empty slots out of a group's scratch list, keeping the
/// directives in order.
pub fn compact(scratch: ScratchList) -> Vec<Directive> {
    scratch
        .into_slots()
        .into_iter()
        .flatten()
        .map(|entry| entry.directive)
        .collect()
}
