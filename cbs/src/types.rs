// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

//! General types used throughout the shaper engine.

use common::ports::PortId;
use common::ports::TrafficClass;
use ral::RalError;

pub type CbsResult<T> = Result<T, CbsError>;

#[derive(Debug, thiserror::Error)]
pub enum CbsError {
    /// An argument fell outside the bounds declared by the chip topology.
    /// Raised before any register is touched.
    #[error("Invalid argument: {0}")]
    Invalid(String),
    /// An operation needed the register backend before one was bound.
    #[error("No register backend bound")]
    NotInitialized,
    /// Every hardware shaper group on the port is already bound to another
    /// traffic class.  Nothing on the port has changed.
    #[error("No shaper group free on port {port} for traffic class {tc}")]
    GroupExhausted { port: PortId, tc: TrafficClass },
    /// A register transaction failed.  The engine does not retry; registers
    /// written before the failure keep their last-written values.
    #[error("Register I/O error: {0}")]
    Backend(#[from] RalError),
}
