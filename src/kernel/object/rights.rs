// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Handle Rights
//!
//! Rights are permissions that control what operations can be performed
//! on a kernel object through a handle. A handle's rights can only narrow
//! (duplicate, replace, transfer); nothing in this crate widens them.

use crate::rustux::{ObjectType, Result, Status};
use bitflags::bitflags;

bitflags! {
    /// Handle rights bitmask
    #[repr(transparent)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Rights: u32 {
        /// Duplicate handle
        const DUPLICATE = 1 << 0;
        /// Transfer through a channel
        const TRANSFER = 1 << 1;
        /// Read state / messages
        const READ = 1 << 2;
        /// Modify state / write messages
        const WRITE = 1 << 3;
        /// Execute code
        const EXECUTE = 1 << 4;
        /// Map into VMAR
        const MAP = 1 << 5;
        /// Read object properties
        const GET_PROPERTY = 1 << 6;
        /// Modify object properties
        const SET_PROPERTY = 1 << 7;
        /// Enumerate children
        const ENUMERATE = 1 << 8;
        /// Destroy the object
        const DESTROY = 1 << 9;
        /// Set policy
        const SET_POLICY = 1 << 10;
        /// Get policy
        const GET_POLICY = 1 << 11;
        /// Assert user signals on the object
        const SIGNAL = 1 << 12;
        /// Assert user signals on the peer
        const SIGNAL_PEER = 1 << 13;
        /// Wait on signals
        const WAIT = 1 << 14;
        /// Inspect
        const INSPECT = 1 << 15;
        /// Manage a job
        const MANAGE_JOB = 1 << 16;
        /// Manage a process
        const MANAGE_PROCESS = 1 << 17;
        /// Manage a thread
        const MANAGE_THREAD = 1 << 18;
        /// Apply a scheduler profile
        const APPLY_PROFILE = 1 << 19;
        /// Manage a socket
        const MANAGE_SOCKET = 1 << 20;
        /// Keep same rights on duplicate / replace
        const SAME_RIGHTS = 1 << 31;

        /// Basic rights carried by most handles
        const BASIC = Self::TRANSFER.bits()
            | Self::DUPLICATE.bits()
            | Self::WAIT.bits()
            | Self::INSPECT.bits();
        /// IO rights
        const IO = Self::READ.bits() | Self::WRITE.bits();
        /// Property rights
        const PROPERTY = Self::GET_PROPERTY.bits() | Self::SET_PROPERTY.bits();
        /// Policy rights
        const POLICY = Self::GET_POLICY.bits() | Self::SET_POLICY.bits();
        /// Rights of a new channel endpoint handle
        const CHANNEL_DEFAULT = (Self::BASIC.bits() & !Self::DUPLICATE.bits())
            | Self::IO.bits()
            | Self::SIGNAL.bits()
            | Self::SIGNAL_PEER.bits();
        /// Default rights for generic objects
        const DEFAULT = Self::BASIC.bits()
            | Self::IO.bits()
            | Self::PROPERTY.bits()
            | Self::SIGNAL.bits();
    }
}

impl Rights {
    /// No rights
    pub const NONE: Self = Self::empty();

    /// Create a rights mask from raw value, dropping unknown bits
    pub const fn from_raw(raw: u32) -> Self {
        Self::from_bits_truncate(raw)
    }

    /// Get raw value
    pub const fn into_raw(self) -> u32 {
        self.bits()
    }

    /// Require specific rights
    ///
    /// # Returns
    ///
    /// - `Ok(())` if all rights are present
    /// - `Err(Status::AccessDenied)` if any right is missing
    pub fn require(self, required: Self) -> Result {
        if self.contains(required) {
            Ok(())
        } else {
            Err(Status::AccessDenied)
        }
    }

    /// Apply a reduction mask
    ///
    /// `SAME_RIGHTS` in the mask keeps `self` unchanged; otherwise the result
    /// is the intersection. Never a superset of `self`.
    pub fn reduce(self, mask: Self) -> Self {
        if mask.contains(Self::SAME_RIGHTS) {
            self
        } else {
            self & mask
        }
    }

    /// Get default rights for a given object type
    pub fn default_for(obj_type: ObjectType) -> Self {
        match obj_type {
            ObjectType::Channel => Self::CHANNEL_DEFAULT,
            ObjectType::Process => Self::BASIC | Self::IO | Self::PROPERTY | Self::MANAGE_PROCESS,
            ObjectType::Thread => Self::BASIC | Self::IO | Self::PROPERTY | Self::MANAGE_THREAD,
            ObjectType::Job => Self::BASIC | Self::IO | Self::PROPERTY | Self::POLICY | Self::MANAGE_JOB,
            ObjectType::Vmo => Self::BASIC | Self::IO | Self::PROPERTY | Self::MAP | Self::EXECUTE,
            ObjectType::Vmar => Self::BASIC | Self::IO | Self::MAP | Self::EXECUTE,
            ObjectType::Event | ObjectType::EventPair => Self::BASIC | Self::SIGNAL | Self::SIGNAL_PEER,
            ObjectType::Timer => Self::BASIC | Self::WRITE | Self::SIGNAL,
            ObjectType::Port => Self::BASIC | Self::IO,
            ObjectType::Unknown => Self::NONE,
        }
    }
}
