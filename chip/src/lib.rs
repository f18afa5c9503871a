// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

//! Per-model silicon facts for the supported switch chips, plus an
//! in-memory register backend for exercising the stack without hardware.

mod mem;
pub mod regs;
mod topology;

pub use mem::MemIo;
pub use topology::ChipModel;
pub use topology::ChipTopology;
pub use topology::ShaperGroup;
