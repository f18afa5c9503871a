// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

//! The canonical assignment of streaming service roles to egress traffic
//! classes.  Higher traffic-class index means higher scheduling priority;
//! live video outranks stored content, which outranks everything that can
//! tolerate jitter.

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::ports::TrafficClass;

/// The service roles a shaped switch carries, each pinned to one egress
/// traffic class.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Deserialize,
    Serialize,
    strum::EnumIter,
    strum::IntoStaticStr,
)]
#[repr(u8)]
pub enum StreamClass {
    /// General traffic with no reservation.
    BestEffort = 0,
    /// Bulk transfers.
    Bulk = 1,
    /// Diagnostic and telemetry traffic.
    Diagnostic = 2,
    /// Device control traffic.
    Control = 3,
    /// Audio streams.
    Audio = 4,
    /// Stored-content video streaming.
    Vod = 5,
    /// Live FHD video.
    LiveFhd = 6,
    /// Live 4K video.
    Live4k = 7,
}

impl StreamClass {
    /// The egress traffic class this role is carried on.
    pub const fn traffic_class(self) -> TrafficClass {
        self as u8
    }
}

impl From<StreamClass> for TrafficClass {
    fn from(sc: StreamClass) -> TrafficClass {
        sc.traffic_class()
    }
}

impl fmt::Display for StreamClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}
