// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

//! Static per-model switch facts: sizing, line rates, and register
//! addressing.  One `ChipTopology` is built per chip model, once, and every
//! piece of offset arithmetic in the workspace flows through it.

use std::fmt;
use std::str::FromStr;

use common::ports::PortId;
use common::ports::PortSpeed;
use common::ports::VlanId;
use common::ports::MAX_VLAN_ID;
use ral::RegAddr;

/// Index of one of a port's hardware shaper slots ("group A" is 0,
/// "group B" is 1).
pub type ShaperGroup = u8;

/// The switch models this workspace knows how to program.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    strum::EnumIter,
    strum::IntoStaticStr,
)]
pub enum ChipModel {
    /// 12-port TSN switch, standard Ethernet frames
    Lan9692,
    /// 64-port gigabit switch with jumbo frame support
    Lan9662,
}

impl fmt::Display for ChipModel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ChipModel::Lan9692 => write!(f, "LAN9692"),
            ChipModel::Lan9662 => write!(f, "LAN9662"),
        }
    }
}

impl FromStr for ChipModel {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "lan9692" => Ok(ChipModel::Lan9692),
            "lan9662" => Ok(ChipModel::Lan9662),
            _ => Err("unrecognized chip model"),
        }
    }
}

/// Immutable per-model facts.  Within a port's shaper block the layout is
/// shared by all models: the control word at +0x00, then for `G` shaper
/// groups the idle-slope, send-slope, hi-credit, and lo-credit words in
/// `G`-word runs starting at +0x04, with the status word after the last
/// run.
#[derive(Clone, Debug)]
pub struct ChipTopology {
    model: ChipModel,
    port_count: u8,
    queues_per_port: u8,
    shaper_groups_per_port: u8,
    port_speed: PortSpeed,
    max_frame_size: u32,
    // Shaper block of port 0, and the per-port spacing.
    shaper_base: RegAddr,
    shaper_stride: RegAddr,
    // One word per VLAN ID, with the TC field at a model-specific shift.
    vlan_table_base: RegAddr,
    vlan_tc_shift: u32,
    // A single word holding all eight 3-bit PCP fields.
    pcp_table_base: RegAddr,
}

impl ChipTopology {
    pub fn new(model: ChipModel) -> Self {
        match model {
            ChipModel::Lan9692 => ChipTopology {
                model,
                port_count: 12,
                queues_per_port: 8,
                shaper_groups_per_port: 2,
                port_speed: PortSpeed::Speed1G,
                max_frame_size: 1522,
                shaper_base: 0x1800,
                shaper_stride: 0x1000,
                vlan_table_base: 0x2_0000,
                vlan_tc_shift: 13,
                pcp_table_base: 0x3_0000,
            },
            ChipModel::Lan9662 => ChipTopology {
                model,
                port_count: 64,
                queues_per_port: 8,
                shaper_groups_per_port: 2,
                port_speed: PortSpeed::Speed1G,
                max_frame_size: 9600,
                shaper_base: 0xc000,
                shaper_stride: 0x100,
                vlan_table_base: 0x4_0000,
                vlan_tc_shift: 0,
                pcp_table_base: 0x4_4000,
            },
        }
    }

    pub fn model(&self) -> ChipModel {
        self.model
    }

    /// Number of front-panel ports.
    pub fn port_count(&self) -> u8 {
        self.port_count
    }

    /// Number of egress priority queues (traffic classes) per port.
    pub fn queues_per_port(&self) -> u8 {
        self.queues_per_port
    }

    /// Number of concurrent hardware shaper slots per port.  This is much
    /// smaller than the queue count; it is the real limit on how many
    /// classes can be shaped at once.
    pub fn shaper_groups_per_port(&self) -> u8 {
        self.shaper_groups_per_port
    }

    /// Nominal line rate of every port.
    pub fn port_speed(&self) -> PortSpeed {
        self.port_speed
    }

    /// Largest frame the chip will forward, in bytes.
    pub fn max_frame_size(&self) -> u32 {
        self.max_frame_size
    }

    // Base of the shaper register block for `port`.  Callers must have
    // validated `port` against `port_count()`.
    fn block(&self, port: PortId) -> RegAddr {
        debug_assert!(port < self.port_count);
        self.shaper_base + RegAddr::from(port) * self.shaper_stride
    }

    // Address of the `group`-th word of the `run`-th per-group register run
    // within `port`'s shaper block.
    fn group_reg(
        &self,
        port: PortId,
        run: RegAddr,
        group: ShaperGroup,
    ) -> RegAddr {
        debug_assert!(group < self.shaper_groups_per_port);
        let groups = RegAddr::from(self.shaper_groups_per_port);
        self.block(port) + 4 + 4 * (run * groups + RegAddr::from(group))
    }

    /// Address of the shaper control word for `port`.
    pub fn ctrl_reg(&self, port: PortId) -> RegAddr {
        self.block(port)
    }

    /// Address of the shaper status word for `port`.
    pub fn status_reg(&self, port: PortId) -> RegAddr {
        self.group_reg(port, 4, 0)
    }

    /// Address of the idle-slope word for `group` on `port`.
    pub fn idle_slope_reg(&self, port: PortId, group: ShaperGroup) -> RegAddr {
        self.group_reg(port, 0, group)
    }

    /// Address of the send-slope word for `group` on `port`.
    pub fn send_slope_reg(&self, port: PortId, group: ShaperGroup) -> RegAddr {
        self.group_reg(port, 1, group)
    }

    /// Address of the hi-credit word for `group` on `port`.
    pub fn hi_credit_reg(&self, port: PortId, group: ShaperGroup) -> RegAddr {
        self.group_reg(port, 2, group)
    }

    /// Address of the lo-credit word for `group` on `port`.
    pub fn lo_credit_reg(&self, port: PortId, group: ShaperGroup) -> RegAddr {
        self.group_reg(port, 3, group)
    }

    /// Address of the VLAN table word holding `vid`'s traffic-class field.
    pub fn vlan_entry_reg(&self, vid: VlanId) -> RegAddr {
        debug_assert!(vid <= MAX_VLAN_ID);
        self.vlan_table_base + RegAddr::from(vid) * 4
    }

    /// Bit position of the traffic-class field within a VLAN table word.
    pub fn vlan_tc_shift(&self) -> u32 {
        self.vlan_tc_shift
    }

    /// Address of the word holding all eight PCP traffic-class fields.
    pub fn pcp_map_reg(&self) -> RegAddr {
        self.pcp_table_base
    }
}
