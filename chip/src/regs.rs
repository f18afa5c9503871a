// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

//! Bit-level contract of the per-port shaper control word and the traffic
//! class mapping tables.  These assignments are common to every supported
//! chip model; only the addresses the words live at differ.

use crate::topology::ShaperGroup;

/// Credit-reset pulse bit in the shaper control word.  Port-wide: one pulse
/// clears the accumulated credit of every group on the port.
pub const CTRL_CREDIT_RESET: u32 = 1 << 8;

/// Credit-based mode select bit in the shaper control word.
pub const CTRL_MODE_CREDIT_BASED: u32 = 1 << 16;

/// Enable bit for one shaper group in the control word (bit 0 enables
/// group A, bit 1 group B, and so on).
pub const fn ctrl_group_enable(group: ShaperGroup) -> u32 {
    1 << group
}

/// Width in bits of one traffic-class field in the VLAN and PCP tables.
pub const TC_FIELD_WIDTH: u32 = 3;

/// Mask covering one traffic-class field, before shifting.
pub const TC_FIELD_MASK: u32 = (1 << TC_FIELD_WIDTH) - 1;
