// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

//! Read-only views of the shaper register state, for verification and
//! operator tooling.

use serde::Deserialize;
use serde::Serialize;

use chip::regs;
use chip::ShaperGroup;
use common::ports::PortId;

use crate::types::CbsResult;
use crate::ShaperCtl;

/// One shaper group's registers, as read back from the silicon.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct GroupDump {
    pub group: ShaperGroup,
    pub idle_slope_bps: u32,
    pub send_slope_bps: u32,
    pub hi_credit_bytes: u32,
    pub lo_credit_bytes: u32,
    /// Whether the group's enable bit is set in the control word.
    pub enabled: bool,
}

/// Raw contents of one port's shaper block.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ShaperDump {
    pub port: PortId,
    pub ctrl: u32,
    pub status: u32,
    pub groups: Vec<GroupDump>,
}

impl ShaperCtl {
    /// The port's shaper status word.
    pub fn status(&self, port: PortId) -> CbsResult<u32> {
        self.validate_port(port)?;
        let io = self.io()?;
        Ok(io.read(self.topo.status_reg(port))?)
    }

    /// Read back the full shaper block for `port`.  Performs only
    /// single-register whole-word reads and mutates nothing, so it is safe
    /// to interleave with a configuration sequence driven elsewhere.
    pub fn dump(&self, port: PortId) -> CbsResult<ShaperDump> {
        self.validate_port(port)?;
        let io = self.io()?;

        let ctrl = io.read(self.topo.ctrl_reg(port))?;
        let status = io.read(self.topo.status_reg(port))?;
        let mut groups = Vec::new();
        for group in 0..self.topo.shaper_groups_per_port() {
            groups.push(GroupDump {
                group,
                idle_slope_bps: io
                    .read(self.topo.idle_slope_reg(port, group))?,
                send_slope_bps: io
                    .read(self.topo.send_slope_reg(port, group))?,
                hi_credit_bytes: io
                    .read(self.topo.hi_credit_reg(port, group))?,
                lo_credit_bytes: io
                    .read(self.topo.lo_credit_reg(port, group))?,
                enabled: ctrl & regs::ctrl_group_enable(group) != 0,
            });
        }

        Ok(ShaperDump {
            port,
            ctrl,
            status,
            groups,
        })
    }
}
