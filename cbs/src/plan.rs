// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

//! Declarative whole-switch bring-up.
//!
//! A provisioning layer hands the controller a `SwitchPlan` holding every
//! per-port bandwidth reservation plus the VLAN and PCP mapping entries,
//! and `apply` drives the full lifecycle for each port.  The plan is
//! checked in its entirety before the first register write.

use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;
use slog::info;

use common::ports::validate_pcp;
use common::ports::validate_vlan;
use common::ports::Pcp;
use common::ports::PortId;
use common::ports::TrafficClass;
use common::ports::VlanId;

use crate::params::ShaperParams;
use crate::types::CbsError;
use crate::types::CbsResult;
use crate::ShaperCtl;

/// One bandwidth reservation on a port.
#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
pub struct TcReservation {
    pub tc: TrafficClass,
    pub bandwidth_bps: u64,
}

/// All reservations for one egress port.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PortPlan {
    pub port: PortId,
    pub reservations: Vec<TcReservation>,
}

/// One VLAN-to-traffic-class table entry.
#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
pub struct VlanTcEntry {
    pub vlan_id: VlanId,
    pub tc: TrafficClass,
}

/// One PCP-to-traffic-class table entry.
#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
pub struct PcpTcEntry {
    pub pcp: Pcp,
    pub tc: TrafficClass,
}

/// Everything needed to bring a switch's shapers up from cold.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct SwitchPlan {
    pub ports: Vec<PortPlan>,
    #[serde(default)]
    pub vlans: Vec<VlanTcEntry>,
    #[serde(default)]
    pub pcps: Vec<PcpTcEntry>,
}

impl ShaperCtl {
    /// Bring the switch up per `plan`.
    ///
    /// For each port the reservations are programmed highest traffic class
    /// first, so the highest class lands on group A; the port's credits are
    /// reset once; then each class is enabled, with the enable bits the
    /// last registers written.  The mapping tables are programmed after the
    /// shapers.  The whole plan is bounds-checked before any register is
    /// written.
    pub fn apply(&mut self, plan: &SwitchPlan) -> CbsResult<()> {
        self.validate_plan(plan)?;

        for pp in &plan.ports {
            let mut reservations = pp.reservations.clone();
            reservations.sort_by(|a, b| b.tc.cmp(&a.tc));

            for r in &reservations {
                let params = ShaperParams::for_bandwidth(
                    r.bandwidth_bps,
                    self.topo.port_speed().bps(),
                    self.topo.max_frame_size(),
                )?;
                self.configure(pp.port, r.tc, params)?;
            }
            self.reset_credits(pp.port)?;
            for r in &reservations {
                self.enable(pp.port, r.tc)?;
            }
        }

        for v in &plan.vlans {
            self.set_vlan_tc(v.vlan_id, v.tc)?;
        }
        for p in &plan.pcps {
            self.set_pcp_tc(p.pcp, p.tc)?;
        }

        info!(
            self.log,
            "applied plan: {} ports, {} vlan entries, {} pcp entries",
            plan.ports.len(),
            plan.vlans.len(),
            plan.pcps.len()
        );
        Ok(())
    }

    fn validate_plan(&self, plan: &SwitchPlan) -> CbsResult<()> {
        self.io()?;

        for pp in &plan.ports {
            let groups = self.topo.shaper_groups_per_port() as usize;
            if pp.reservations.len() > groups {
                return Err(CbsError::Invalid(format!(
                    "port {}: {} reservations but only {groups} shaper groups",
                    pp.port,
                    pp.reservations.len()
                )));
            }
            let mut seen = BTreeSet::new();
            for r in &pp.reservations {
                self.validate_tc(pp.port, r.tc)?;
                if !seen.insert(r.tc) {
                    return Err(CbsError::Invalid(format!(
                        "port {}: traffic class {} reserved twice",
                        pp.port, r.tc
                    )));
                }
            }
        }

        for v in &plan.vlans {
            validate_vlan(v.vlan_id)
                .map_err(|e| CbsError::Invalid(e.to_string()))?;
            self.validate_traffic_class(v.tc)?;
        }
        for p in &plan.pcps {
            validate_pcp(p.pcp)
                .map_err(|e| CbsError::Invalid(e.to_string()))?;
            self.validate_traffic_class(p.tc)?;
        }
        Ok(())
    }
}
