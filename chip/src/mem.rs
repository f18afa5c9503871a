// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

//! A pure in-memory register backend.
//!
//! `MemIo` stands in for the mapped hardware window when there is no
//! hardware: it records every write in order, lets a test seed and inspect
//! arbitrary words, and can be told to start failing writes at a chosen
//! point to exercise mid-sequence error paths.  Clones share the same
//! underlying register file, so a test can keep one handle for inspection
//! while the engine owns the other.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;

use ral::RalError;
use ral::RalResult;
use ral::RegAddr;
use ral::RegisterIo;

#[derive(Clone, Default)]
pub struct MemIo {
    state: Arc<Mutex<MemState>>,
}

#[derive(Default)]
struct MemState {
    words: BTreeMap<RegAddr, u32>,
    writes: Vec<(RegAddr, u32)>,
    fail_after: Option<usize>,
}

impl MemIo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a word directly, bypassing the write log.
    pub fn seed(&self, addr: RegAddr, value: u32) {
        self.state.lock().unwrap().words.insert(addr, value);
    }

    /// Current contents of `addr`.  Words never written read as zero, as
    /// they would out of reset.
    pub fn get(&self, addr: RegAddr) -> u32 {
        *self.state.lock().unwrap().words.get(&addr).unwrap_or(&0)
    }

    /// Every write issued through the `RegisterIo` interface, oldest first.
    pub fn write_log(&self) -> Vec<(RegAddr, u32)> {
        self.state.lock().unwrap().writes.clone()
    }

    /// Number of writes issued through the `RegisterIo` interface.
    pub fn write_count(&self) -> usize {
        self.state.lock().unwrap().writes.len()
    }

    /// Allow `n` more successful writes; every write after that fails with
    /// a synthetic backend error and leaves no trace in the register file.
    pub fn fail_writes_after(&self, n: usize) {
        let mut state = self.state.lock().unwrap();
        let fail_at = state.writes.len() + n;
        state.fail_after = Some(fail_at);
    }
}

impl RegisterIo for MemIo {
    fn read(&self, addr: RegAddr) -> RalResult<u32> {
        Ok(self.get(addr))
    }

    fn write(&self, addr: RegAddr, value: u32) -> RalResult<()> {
        let mut state = self.state.lock().unwrap();
        if let Some(limit) = state.fail_after {
            if state.writes.len() >= limit {
                return Err(RalError::Backend {
                    ctx: format!("write {addr:#x}"),
                    err: "synthetic write failure".to_string(),
                });
            }
        }
        state.words.insert(addr, value);
        state.writes.push((addr, value));
        Ok(())
    }
}
