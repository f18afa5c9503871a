// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

//! Identifier and speed types for switch ports and their egress queues.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

/// Index of a front-panel port on the switch.
pub type PortId = u8;

/// Index of an egress priority queue on a port.  Higher indexes are
/// scheduled ahead of lower ones.
pub type TrafficClass = u8;

/// 3-bit Priority Code Point carried in a VLAN tag.
pub type Pcp = u8;

/// 12-bit VLAN identifier.
pub type VlanId = u16;

/// Largest encodable VLAN identifier.
pub const MAX_VLAN_ID: VlanId = 4095;

/// Number of distinct PCP values in a VLAN tag.
pub const PCP_COUNT: u8 = 8;

#[derive(Error, Debug, Clone)]
pub enum VlanError {
    /// Not a valid VLAN ID
    #[error("Invalid VLAN tag: {}", .0)]
    InvalidVlan(u16),
}

pub fn validate_vlan(id: impl Into<u16>) -> Result<(), VlanError> {
    let id: u16 = id.into();
    if id > MAX_VLAN_ID {
        Err(VlanError::InvalidVlan(id))
    } else {
        Ok(())
    }
}

#[derive(Error, Debug, Clone)]
pub enum PcpError {
    /// Not a valid priority code point
    #[error("Invalid PCP value: {}", .0)]
    InvalidPcp(u8),
}

pub fn validate_pcp(pcp: impl Into<u8>) -> Result<(), PcpError> {
    let pcp: u8 = pcp.into();
    if pcp >= PCP_COUNT {
        Err(PcpError::InvalidPcp(pcp))
    } else {
        Ok(())
    }
}

/// Nominal line rate of a switch port.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub enum PortSpeed {
    #[serde(rename = "10M")]
    Speed10M,
    #[serde(rename = "100M")]
    Speed100M,
    #[serde(rename = "1G")]
    Speed1G,
}

impl PortSpeed {
    /// The line rate in bits per second.
    pub const fn bps(self) -> u32 {
        match self {
            PortSpeed::Speed10M => 10_000_000,
            PortSpeed::Speed100M => 100_000_000,
            PortSpeed::Speed1G => 1_000_000_000,
        }
    }
}

impl fmt::Display for PortSpeed {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PortSpeed::Speed10M => write!(f, "10M"),
            PortSpeed::Speed100M => write!(f, "100M"),
            PortSpeed::Speed1G => write!(f, "1G"),
        }
    }
}

impl FromStr for PortSpeed {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "10M" => Ok(PortSpeed::Speed10M),
            "100M" => Ok(PortSpeed::Speed100M),
            "1G" => Ok(PortSpeed::Speed1G),
            _ => Err("invalid port speed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_speed_bps() {
        assert_eq!(PortSpeed::Speed1G.bps(), 1_000_000_000);
        assert_eq!(PortSpeed::Speed100M.bps(), 100_000_000);
        assert_eq!(PortSpeed::Speed10M.bps(), 10_000_000);
    }

    #[test]
    fn test_speed_parse() {
        let s: PortSpeed = "1G".parse().unwrap();
        assert_eq!(s, PortSpeed::Speed1G);
        assert_eq!(s.to_string(), "1G");
        assert!("400G".parse::<PortSpeed>().is_err());
    }

    #[test]
    fn test_validate_vlan() {
        assert!(validate_vlan(0u16).is_ok());
        assert!(validate_vlan(4095u16).is_ok());
        assert!(validate_vlan(4096u16).is_err());
    }

    #[test]
    fn test_validate_pcp() {
        assert!(validate_pcp(0u8).is_ok());
        assert!(validate_pcp(7u8).is_ok());
        assert!(validate_pcp(8u8).is_err());
    }
}
