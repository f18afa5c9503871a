// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

//! Low-level programming of the shaper register blocks.
//!
//! The slope and credit registers are whole-word writes issued in a fixed
//! order: idle-slope, send-slope, hi-credit, lo-credit.  Only the shared
//! control word needs a read-modify-write merge.  Nothing here retries; a
//! failed transaction surfaces immediately and whatever was written before
//! it stays as last written.

use slog::debug;

use chip::ShaperGroup;
use common::ports::PortId;

use crate::params::ShaperParams;
use crate::types::CbsResult;
use crate::ShaperCtl;

impl ShaperCtl {
    // Write the four slope/credit words for `group` on `port`.  Bounds must
    // already have been validated and the group allocated.
    pub(crate) fn write_shaper_params(
        &self,
        port: PortId,
        group: ShaperGroup,
        params: &ShaperParams,
    ) -> CbsResult<()> {
        let io = self.io()?;
        io.write(
            self.topo.idle_slope_reg(port, group),
            params.idle_slope_bps,
        )?;
        io.write(
            self.topo.send_slope_reg(port, group),
            params.send_slope_bps,
        )?;
        io.write(
            self.topo.hi_credit_reg(port, group),
            params.hi_credit_bytes,
        )?;
        io.write(
            self.topo.lo_credit_reg(port, group),
            params.lo_credit_bytes,
        )?;
        debug!(self.log, "port {port} group {group}: programmed {params}");
        Ok(())
    }

    // Read-modify-write the shaper control word for `port`: clear the bits
    // in `clear`, then set the bits in `set`.  Returns the value written.
    pub(crate) fn ctrl_rmw(
        &self,
        port: PortId,
        clear: u32,
        set: u32,
    ) -> CbsResult<u32> {
        let io = self.io()?;
        let reg = self.topo.ctrl_reg(port);
        let val = (io.read(reg)? & !clear) | set;
        io.write(reg, val)?;
        Ok(val)
    }
}
