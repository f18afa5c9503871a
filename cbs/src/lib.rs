// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

//! Credit-based shaper configuration engine.
//!
//! The engine derives IEEE 802.1Qav shaper parameters from bandwidth
//! reservations and programs them into switch silicon through an injected
//! register backend.  A shaped traffic class is brought up in a fixed
//! sequence: program the slope and credit registers, reset the port's
//! accumulated credit, then set the enable bit.  The enable bit is the last
//! register written in every sequence, so a failure partway through is
//! always observable as "still disabled" rather than as a shaper running
//! with inconsistent parameters.

use std::collections::BTreeMap;

use slog::info;
use slog::o;

use chip::ChipTopology;
use common::ports::PortId;
use common::ports::TrafficClass;
use ral::RegisterIo;

mod diag;
mod groups;
mod lifecycle;
mod mapper;
mod params;
mod plan;
mod program;
mod types;

pub use diag::GroupDump;
pub use diag::ShaperDump;
pub use lifecycle::TcState;
pub use params::ShaperParams;
pub use plan::PcpTcEntry;
pub use plan::PortPlan;
pub use plan::SwitchPlan;
pub use plan::TcReservation;
pub use plan::VlanTcEntry;
pub use types::CbsError;
pub use types::CbsResult;

use groups::GroupAllocator;
use lifecycle::PortState;

/// Owner of one switch's shaper configuration.
///
/// The register space behind the backend is a shared mutable resource and
/// the control-word and mapping-table updates are read-modify-write cycles,
/// so a port's configuration sequence must have exactly one driver at a
/// time.  Every mutating operation therefore takes `&mut self`; callers
/// sharing a controller across threads wrap it in their own lock.  The
/// diagnostic reads (`status`, `dump`) take `&self` and perform only
/// whole-word reads.
pub struct ShaperCtl {
    log: slog::Logger,
    topo: ChipTopology,
    io: Option<Box<dyn RegisterIo>>,
    groups: GroupAllocator,
    ports: BTreeMap<PortId, PortState>,
}

impl ShaperCtl {
    /// Create a controller for one chip.  The controller starts with no
    /// register backend; every operation that touches hardware fails with
    /// `NotInitialized` until `bind` hands one in.
    pub fn new(topo: ChipTopology, log: &slog::Logger) -> Self {
        let log = log.new(o!(
            "unit" => "shaper_ctl",
            "chip" => topo.model().to_string(),
        ));
        let groups = GroupAllocator::new(&log, topo.shaper_groups_per_port());
        ShaperCtl {
            log,
            topo,
            io: None,
            groups,
            ports: BTreeMap::new(),
        }
    }

    /// Attach the register backend.  The backend arrives already opened and
    /// initialized; the engine never opens one itself.  There can be only
    /// one: binding a second handle is refused rather than silently
    /// replacing the first.
    pub fn bind(&mut self, io: Box<dyn RegisterIo>) -> CbsResult<()> {
        if self.io.is_some() {
            return Err(CbsError::Invalid(
                "a register backend is already bound".to_string(),
            ));
        }
        self.io = Some(io);
        info!(self.log, "register backend bound");
        Ok(())
    }

    /// The topology this controller was built around.
    pub fn topology(&self) -> &ChipTopology {
        &self.topo
    }

    pub(crate) fn io(&self) -> CbsResult<&dyn RegisterIo> {
        self.io.as_deref().ok_or(CbsError::NotInitialized)
    }

    pub(crate) fn validate_port(&self, port: PortId) -> CbsResult<()> {
        if port >= self.topo.port_count() {
            return Err(CbsError::Invalid(format!(
                "port {port} out of range on {} ({} ports)",
                self.topo.model(),
                self.topo.port_count()
            )));
        }
        Ok(())
    }

    pub(crate) fn validate_tc(
        &self,
        port: PortId,
        tc: TrafficClass,
    ) -> CbsResult<()> {
        self.validate_port(port)?;
        if tc >= self.topo.queues_per_port() {
            return Err(CbsError::Invalid(format!(
                "traffic class {tc} out of range on port {port} ({} queues)",
                self.topo.queues_per_port()
            )));
        }
        Ok(())
    }

    pub(crate) fn validate_traffic_class(
        &self,
        tc: TrafficClass,
    ) -> CbsResult<()> {
        if tc >= self.topo.queues_per_port() {
            return Err(CbsError::Invalid(format!(
                "traffic class {tc} out of range ({} queues)",
                self.topo.queues_per_port()
            )));
        }
        Ok(())
    }
}
