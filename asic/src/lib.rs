// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

//! Multicast RID table transports.
//!
//! Neither backend talks to real hardware.  The stub keeps every row written
//! to it in memory, which is enough to exercise the table codec end to end.
//! The chaos backend wraps another transport and fails operations at random,
//! so callers can verify that transport errors are surfaced intact.

pub mod chaos;
pub mod stub;

pub use stub::StubHandle as Handle;
