// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

//! Per-traffic-class shaper lifecycle.
//!
//! A shaped class moves through `Disabled -> Configuring -> CreditReset ->
//! Enabled`.  Credit accumulated under one configuration must never carry
//! into another, so a class whose parameters were just written cannot be
//! enabled until the port's credits have been reset.  Disabling only clears
//! the enable bit; the programmed reservation survives and can be enabled
//! again as-is.

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fmt;
use std::thread;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use slog::debug;
use slog::info;

use chip::regs;
use chip::ShaperGroup;
use common::ports::PortId;
use common::ports::TrafficClass;

use crate::params::ShaperParams;
use crate::types::CbsError;
use crate::types::CbsResult;
use crate::ShaperCtl;

// How long the credit-reset bit is held before being cleared.  The pulse
// must stay visible across the silicon's internal clock domains.
const CREDIT_RESET_SETTLE: Duration = Duration::from_micros(1000);

/// Position of one traffic class in the bring-up sequence.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Deserialize,
    Serialize,
    strum::EnumIter,
    strum::IntoStaticStr,
)]
pub enum TcState {
    /// Not shaping.  The slope and credit registers may still hold the last
    /// configuration.
    #[default]
    Disabled,
    /// Slope and credit registers programmed; credits not yet reset.
    Configuring,
    /// Credits reset since the last configuration; eligible to enable.
    CreditReset,
    /// Shaping traffic.
    Enabled,
}

impl fmt::Display for TcState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

// Everything the controller tracks for one (port, traffic class) pair.
#[derive(Clone, Debug, Default)]
pub(crate) struct TcConfig {
    pub state: TcState,
    pub params: Option<ShaperParams>,
    pub group: Option<ShaperGroup>,
    // Credits have been reset since `params` was last written.
    pub credits_clean: bool,
}

// Per-port runtime state, created when the first traffic class on the port
// is configured and torn down by `shutdown`.
#[derive(Debug, Default)]
pub(crate) struct PortState {
    pub tcs: BTreeMap<TrafficClass, TcConfig>,
    // A configuration was written since the last credit reset.
    pub pending_reset: bool,
    pub enabled_groups: BTreeSet<ShaperGroup>,
}

impl ShaperCtl {
    /// Program a bandwidth reservation for (`port`, `tc`).
    ///
    /// Validates bounds, claims a shaper group, and writes the slope and
    /// credit registers.  The class is left in `Configuring`: it does not
    /// shape until `reset_credits` and `enable` have run.  A class that is
    /// currently enabled must go through `reconfigure` (or be disabled
    /// first) instead.
    pub fn configure(
        &mut self,
        port: PortId,
        tc: TrafficClass,
        params: ShaperParams,
    ) -> CbsResult<()> {
        self.validate_tc(port, tc)?;
        self.io()?;

        if self.tc_state(port, tc) == TcState::Enabled {
            return Err(CbsError::Invalid(format!(
                "port {port} tc {tc} is enabled; disable or reconfigure it"
            )));
        }

        let held = self.groups.group_of(port, tc);
        let group = self.groups.allocate(port, tc)?;

        if let Err(e) = self.write_shaper_params(port, group, &params) {
            // The write sequence stopped partway.  A freshly claimed group
            // goes back to the pool; a class that already owned the group
            // keeps it, but its credits are no longer trustworthy.
            match held {
                None => {
                    self.groups.release(port, tc);
                }
                Some(_) => {
                    if let Some(entry) = self.tc_entry_mut(port, tc) {
                        entry.state = TcState::Disabled;
                        entry.credits_clean = false;
                    }
                }
            }
            return Err(e);
        }

        let pstate = self.ports.entry(port).or_default();
        let entry = pstate.tcs.entry(tc).or_default();
        entry.state = TcState::Configuring;
        entry.params = Some(params);
        entry.group = Some(group);
        entry.credits_clean = false;
        pstate.pending_reset = true;

        info!(
            self.log,
            "port {port} tc {tc}: configured group {group} ({params})"
        );
        Ok(())
    }

    /// Pulse the credit-reset bit for `port`: set it, hold it for a fixed
    /// settle interval, clear it.  The wait is unconditional.
    ///
    /// The pulse is port-wide (the control word has a single reset bit), so
    /// every configured class on the port comes out credit-clean.  Only the
    /// control word is touched; the slope and credit registers are not.
    pub fn reset_credits(&mut self, port: PortId) -> CbsResult<()> {
        self.validate_port(port)?;

        self.ctrl_rmw(port, 0, regs::CTRL_CREDIT_RESET)?;
        thread::sleep(CREDIT_RESET_SETTLE);
        self.ctrl_rmw(port, regs::CTRL_CREDIT_RESET, 0)?;

        if let Some(pstate) = self.ports.get_mut(&port) {
            pstate.pending_reset = false;
            for entry in pstate.tcs.values_mut() {
                if entry.params.is_some() {
                    entry.credits_clean = true;
                    if entry.state == TcState::Configuring {
                        entry.state = TcState::CreditReset;
                    }
                }
            }
        }
        debug!(self.log, "port {port}: credits reset");
        Ok(())
    }

    /// Start shaping (`port`, `tc`).
    ///
    /// Requires a configured class whose credits have been reset since its
    /// parameters were last written.  Sets the credit-based mode select and
    /// the group's enable bit in a single control-word update; nothing else
    /// is written, and nothing is written at all for a class that is
    /// already enabled.
    pub fn enable(&mut self, port: PortId, tc: TrafficClass) -> CbsResult<()> {
        self.validate_tc(port, tc)?;
        self.io()?;

        let entry = match self.ports.get(&port).and_then(|p| p.tcs.get(&tc)) {
            Some(e) => e,
            None => {
                return Err(CbsError::Invalid(format!(
                    "port {port} tc {tc} has never been configured"
                )))
            }
        };
        if entry.state == TcState::Enabled {
            return Ok(());
        }
        let group = match entry.group {
            Some(g) => g,
            None => {
                return Err(CbsError::Invalid(format!(
                    "port {port} tc {tc} holds no shaper group"
                )))
            }
        };
        if !entry.credits_clean {
            return Err(CbsError::Invalid(format!(
                "port {port} tc {tc}: credits not reset since configuration"
            )));
        }

        self.ctrl_rmw(
            port,
            0,
            regs::CTRL_MODE_CREDIT_BASED | regs::ctrl_group_enable(group),
        )?;

        if let Some(pstate) = self.ports.get_mut(&port) {
            if let Some(entry) = pstate.tcs.get_mut(&tc) {
                entry.state = TcState::Enabled;
            }
            pstate.enabled_groups.insert(group);
        }
        info!(self.log, "port {port} tc {tc}: shaping enabled (group {group})");
        Ok(())
    }

    /// Stop shaping (`port`, `tc`), clearing only the group's enable bit.
    /// The slope/credit registers, the group binding, and the credit-clean
    /// status all survive, so a later `enable` restores the identical
    /// reservation.  Disabling a class that is not shaping is a no-op.
    pub fn disable(&mut self, port: PortId, tc: TrafficClass) -> CbsResult<()> {
        self.validate_tc(port, tc)?;

        let group = match self.ports.get(&port).and_then(|p| p.tcs.get(&tc)) {
            Some(e) if e.state == TcState::Enabled => match e.group {
                Some(g) => g,
                None => return Ok(()),
            },
            _ => return Ok(()),
        };

        self.ctrl_rmw(port, regs::ctrl_group_enable(group), 0)?;

        if let Some(pstate) = self.ports.get_mut(&port) {
            if let Some(entry) = pstate.tcs.get_mut(&tc) {
                entry.state = TcState::Disabled;
            }
            pstate.enabled_groups.remove(&group);
        }
        info!(self.log, "port {port} tc {tc}: shaping disabled");
        Ok(())
    }

    /// Replace the reservation on (`port`, `tc`): disable, program the new
    /// parameters, reset credits, re-enable, as one caller-visible
    /// sequence.  If any step fails the class is left `Disabled`; the
    /// registers may hold old or partially updated slope values, but a
    /// shaper is never left enabled with inconsistent parameters.
    pub fn reconfigure(
        &mut self,
        port: PortId,
        tc: TrafficClass,
        params: ShaperParams,
    ) -> CbsResult<()> {
        self.validate_tc(port, tc)?;
        self.io()?;

        self.disable(port, tc)?;
        if let Err(e) = self.bring_up(port, tc, params) {
            if let Some(entry) = self.tc_entry_mut(port, tc) {
                entry.state = TcState::Disabled;
            }
            return Err(e);
        }
        Ok(())
    }

    /// Whether a configuration has been written on `port` since its last
    /// credit reset.  While this is set, newly configured classes on the
    /// port cannot be enabled.
    pub fn reset_pending(&self, port: PortId) -> bool {
        self.ports
            .get(&port)
            .map(|p| p.pending_reset)
            .unwrap_or(false)
    }

    /// Where (`port`, `tc`) currently sits in the bring-up sequence.
    pub fn tc_state(&self, port: PortId, tc: TrafficClass) -> TcState {
        self.ports
            .get(&port)
            .and_then(|p| p.tcs.get(&tc))
            .map(|e| e.state)
            .unwrap_or_default()
    }

    /// Tear the whole switch down: every shaping class disabled, every
    /// group released, the backend dropped.  Teardown keeps going past
    /// backend errors; the first one is returned after everything has been
    /// attempted.
    pub fn shutdown(&mut self) -> CbsResult<()> {
        let mut first_err = None;

        if self.io.is_some() {
            let active: Vec<(PortId, u32)> = self
                .ports
                .iter()
                .filter(|(_, p)| !p.enabled_groups.is_empty())
                .map(|(port, p)| {
                    let mask = p
                        .enabled_groups
                        .iter()
                        .fold(0, |m, g| m | regs::ctrl_group_enable(*g));
                    (*port, mask)
                })
                .collect();
            for (port, mask) in active {
                if let Err(e) = self.ctrl_rmw(port, mask, 0) {
                    if first_err.is_none() {
                        first_err = Some(e);
                    }
                }
            }
        }

        self.ports.clear();
        self.groups.clear();
        self.io = None;
        info!(self.log, "shaper controller shut down");

        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn bring_up(
        &mut self,
        port: PortId,
        tc: TrafficClass,
        params: ShaperParams,
    ) -> CbsResult<()> {
        self.configure(port, tc, params)?;
        self.reset_credits(port)?;
        self.enable(port, tc)
    }

    fn tc_entry_mut(
        &mut self,
        port: PortId,
        tc: TrafficClass,
    ) -> Option<&mut TcConfig> {
        self.ports.get_mut(&port).and_then(|p| p.tcs.get_mut(&tc))
    }
}
