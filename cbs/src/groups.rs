// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

/// Tracking and assignment of the per-port hardware shaper slots.
///
/// Each port exposes a small fixed number of concurrent shaping slots
/// ("group A", "group B"), independent of the number of traffic classes.
/// A slot binds one traffic class at a time; once every slot on a port is
/// taken, further reservations on that port are refused.
use std::collections::BTreeMap;

use slog::debug;

use crate::types::CbsError;
use crate::types::CbsResult;
use chip::ShaperGroup;
use common::ports::PortId;
use common::ports::TrafficClass;

pub(crate) struct GroupAllocator {
    // Where debug messages are logged
    log: slog::Logger,
    // Slots available on each port
    groups_per_port: u8,
    // Slot g of a port's vector holds the traffic class bound to shaper
    // group g.  Ports with no bindings have no entry.
    slots: BTreeMap<PortId, Vec<Option<TrafficClass>>>,
}

impl GroupAllocator {
    pub fn new(log: &slog::Logger, groups_per_port: u8) -> Self {
        let log = log.new(slog::o!("unit" => "shaper_groups"));
        GroupAllocator {
            log,
            groups_per_port,
            slots: BTreeMap::new(),
        }
    }

    /// Bind `tc` to a free shaper group on `port`.  Groups are handed out
    /// lowest-numbered first, so a caller working through its classes in
    /// descending priority order puts the highest class on group A.  Asking
    /// again for a class that already holds a group returns that group.
    /// When every slot is taken the request fails and nothing changes.
    pub fn allocate(
        &mut self,
        port: PortId,
        tc: TrafficClass,
    ) -> CbsResult<ShaperGroup> {
        let slots = self
            .slots
            .entry(port)
            .or_insert_with(|| vec![None; self.groups_per_port as usize]);

        if let Some(g) = slots.iter().position(|s| *s == Some(tc)) {
            return Ok(g as ShaperGroup);
        }

        match slots.iter().position(|s| s.is_none()) {
            Some(g) => {
                slots[g] = Some(tc);
                debug!(self.log, "port {port}: tc {tc} -> group {g}");
                Ok(g as ShaperGroup)
            }
            None => Err(CbsError::GroupExhausted { port, tc }),
        }
    }

    /// Free the group bound to (`port`, `tc`), returning it.  Freeing an
    /// unbound pair is a quiet no-op.
    pub fn release(
        &mut self,
        port: PortId,
        tc: TrafficClass,
    ) -> Option<ShaperGroup> {
        let slots = self.slots.get_mut(&port)?;
        let g = slots.iter().position(|s| *s == Some(tc))?;
        slots[g] = None;
        debug!(self.log, "port {port}: released group {g} (tc {tc})");
        Some(g as ShaperGroup)
    }

    /// The group currently bound to (`port`, `tc`), if any.
    pub fn group_of(&self, port: PortId, tc: TrafficClass) -> Option<ShaperGroup> {
        let slots = self.slots.get(&port)?;
        slots
            .iter()
            .position(|s| *s == Some(tc))
            .map(|g| g as ShaperGroup)
    }

    /// Drop every binding on every port.
    pub fn clear(&mut self) {
        self.slots.clear();
    }
}

#[cfg(test)]
fn new_allocator(groups_per_port: u8) -> GroupAllocator {
    let log =
        common::logging::init("test", &None, common::logging::LogFormat::Human)
            .unwrap();
    GroupAllocator::new(&log, groups_per_port)
}

// The first classes shaped on a port land on the low-numbered groups.
#[test]
fn test_alloc_order() -> anyhow::Result<()> {
    let mut alloc = new_allocator(2);
    assert_eq!(alloc.allocate(0, 7)?, 0);
    assert_eq!(alloc.allocate(0, 6)?, 1);
    // A different port has its own slots.
    assert_eq!(alloc.allocate(1, 5)?, 0);
    Ok(())
}

// Re-requesting a held binding returns the same group without consuming
// another slot.
#[test]
fn test_idempotent_allocation() -> anyhow::Result<()> {
    let mut alloc = new_allocator(2);
    assert_eq!(alloc.allocate(0, 7)?, 0);
    assert_eq!(alloc.allocate(0, 7)?, 0);
    assert_eq!(alloc.allocate(0, 6)?, 1);
    Ok(())
}

// Exhaustion is an error and leaves the existing bindings untouched.
#[test]
fn test_exhaustion() -> anyhow::Result<()> {
    let mut alloc = new_allocator(2);
    alloc.allocate(0, 7)?;
    alloc.allocate(0, 6)?;
    let err = alloc.allocate(0, 5).unwrap_err();
    assert!(matches!(
        err,
        CbsError::GroupExhausted { port: 0, tc: 5 }
    ));
    assert_eq!(alloc.group_of(0, 7), Some(0));
    assert_eq!(alloc.group_of(0, 6), Some(1));
    assert_eq!(alloc.group_of(0, 5), None);
    Ok(())
}

// A released slot is reusable; releasing an unbound pair does nothing.
#[test]
fn test_release() -> anyhow::Result<()> {
    let mut alloc = new_allocator(2);
    alloc.allocate(0, 7)?;
    alloc.allocate(0, 6)?;
    assert_eq!(alloc.release(0, 7), Some(0));
    assert_eq!(alloc.release(0, 7), None);
    assert_eq!(alloc.allocate(0, 5)?, 0);
    Ok(())
}
