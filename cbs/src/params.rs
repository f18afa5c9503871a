// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

//! Derivation of credit-based shaper parameters from a bandwidth
//! reservation.

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::types::CbsError;
use crate::types::CbsResult;

/// The four per-group shaper registers' worth of derived parameters.
///
/// The two slopes always partition the port's line rate:
/// `idle_slope_bps + send_slope_bps` equals the port speed.  Both credit
/// fields are non-negative magnitudes; the direction is implicit, with hi
/// bounding accumulation while the queue waits and lo bounding depletion
/// while it transmits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct ShaperParams {
    /// Rate at which credit accrues while the queue is idle, in bits per
    /// second.  This is the reserved bandwidth.
    pub idle_slope_bps: u32,
    /// Rate at which credit depletes while the queue transmits.
    pub send_slope_bps: u32,
    /// Upper bound on accumulated credit, in bytes.
    pub hi_credit_bytes: u32,
    /// Lower bound (magnitude) on depleted credit, in bytes.
    pub lo_credit_bytes: u32,
}

impl ShaperParams {
    /// Derive shaper parameters for a reservation of `bandwidth_bps` on a
    /// port running at `port_speed_bps` and forwarding frames of up to
    /// `max_frame_size_bytes`.
    ///
    /// A reservation above the line rate is clamped to the line rate rather
    /// than refused, since "as much as possible" is a common operator
    /// intent.  Callers that want strict rejection must compare against the
    /// port speed before calling.
    pub fn for_bandwidth(
        bandwidth_bps: u64,
        port_speed_bps: u32,
        max_frame_size_bytes: u32,
    ) -> CbsResult<Self> {
        if port_speed_bps == 0 {
            return Err(CbsError::Invalid(
                "a port speed of 0 bps cannot carry a reservation"
                    .to_string(),
            ));
        }

        let speed = u64::from(port_speed_bps);
        let idle = bandwidth_bps.min(speed);
        let send = speed - idle;
        let frame = u64::from(max_frame_size_bytes);

        Ok(ShaperParams {
            idle_slope_bps: idle as u32,
            send_slope_bps: send as u32,
            hi_credit_bytes: (frame * idle / speed) as u32,
            lo_credit_bytes: (frame * send / speed) as u32,
        })
    }
}

impl fmt::Display for ShaperParams {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "idle {} bps, send {} bps, hi {} B, lo {} B",
            self.idle_slope_bps,
            self.send_slope_bps,
            self.hi_credit_bytes,
            self.lo_credit_bytes
        )
    }
}
