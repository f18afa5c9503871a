// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

//! The register abstraction layer: the interface through which the shaper
//! engine reaches switch-silicon registers, independent of what actually
//! carries the transactions.

use thiserror::Error;

/// Byte offset of a 32-bit register within the switch's register space.
pub type RegAddr = u32;

/// A specialized Result type for register-backend operations
pub type RalResult<T> = Result<T, RalError>;

/// Error type conveying additional information about register-backend
/// failures
#[derive(Error, Debug)]
pub enum RalError {
    /// The backend failed to complete a register transaction.  This reports
    /// both the location in the access layer that detected the error and
    /// the backend's own message.
    #[error("register backend error at {ctx}: {err}")]
    Backend { ctx: String, err: String },
    /// The address falls outside the window the backend has mapped.
    #[error("register address {addr:#x} outside mapped window")]
    Unmapped { addr: RegAddr },
}

/// The `RegisterIo` trait is the only path between the engine and hardware.
/// A backend may be a mapped physical address range, a remote management
/// channel, or an in-memory fake; it is always opened and initialized by
/// the caller and handed in whole, and exactly one handle should be live
/// for a given device at a time.
///
/// Reads and writes move whole 32-bit words.  Implementations must make
/// each call atomic with respect to other calls on the same handle.
pub trait RegisterIo: Send {
    /// Read the 32-bit word at `addr`.
    fn read(&self, addr: RegAddr) -> RalResult<u32>;

    /// Write `value` to the 32-bit word at `addr`.
    fn write(&self, addr: RegAddr, value: u32) -> RalResult<()>;
}
