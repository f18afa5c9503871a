// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

//! The VLAN-to-traffic-class and PCP-to-traffic-class association tables.
//!
//! Both tables pack 3-bit traffic-class fields into shared register words:
//! the VLAN table gives each VLAN ID its own word with the field at a
//! model-specific position, while a single word carries all eight PCP
//! fields.  Every update is a read-modify-write that clears only the field
//! owned by the key being written and must leave the neighboring bits
//! exactly as found.

use slog::info;

use chip::regs;
use common::ports::validate_pcp;
use common::ports::validate_vlan;
use common::ports::Pcp;
use common::ports::TrafficClass;
use common::ports::VlanId;

use crate::types::CbsError;
use crate::types::CbsResult;
use crate::ShaperCtl;

impl ShaperCtl {
    /// Point `vlan` at egress traffic class `tc`.
    pub fn set_vlan_tc(
        &mut self,
        vlan: VlanId,
        tc: TrafficClass,
    ) -> CbsResult<()> {
        validate_vlan(vlan)
            .map_err(|e| CbsError::Invalid(e.to_string()))?;
        self.validate_traffic_class(tc)?;

        let io = self.io()?;
        let reg = self.topo.vlan_entry_reg(vlan);
        let shift = self.topo.vlan_tc_shift();
        let val = (io.read(reg)? & !(regs::TC_FIELD_MASK << shift))
            | (u32::from(tc) << shift);
        io.write(reg, val)?;

        info!(self.log, "vlan {vlan} -> tc {tc}");
        Ok(())
    }

    /// Point priority code point `pcp` at egress traffic class `tc`.
    pub fn set_pcp_tc(&mut self, pcp: Pcp, tc: TrafficClass) -> CbsResult<()> {
        validate_pcp(pcp).map_err(|e| CbsError::Invalid(e.to_string()))?;
        self.validate_traffic_class(tc)?;

        let io = self.io()?;
        let reg = self.topo.pcp_map_reg();
        let shift = u32::from(pcp) * regs::TC_FIELD_WIDTH;
        let val = (io.read(reg)? & !(regs::TC_FIELD_MASK << shift))
            | (u32::from(tc) << shift);
        io.write(reg, val)?;

        info!(self.log, "pcp {pcp} -> tc {tc}");
        Ok(())
    }
}
