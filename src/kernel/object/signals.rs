// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Object Signals
//!
//! Per-object readiness bits observed by waiters. Bits 0-23 belong to the
//! object type; bits 24-31 are user signals reserved for higher-level
//! protocols.

use crate::rustux::{Result, Status};
use bitflags::bitflags;

bitflags! {
    /// Signal bitmask
    #[repr(transparent)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Signals: u32 {
        /// Messages are pending
        const READABLE = 1 << 0;
        /// A write would be accepted
        const WRITABLE = 1 << 1;
        /// The other endpoint is closed
        const PEER_CLOSED = 1 << 2;

        /// User signal 0
        const USER_0 = 1 << 24;
        /// User signal 1
        const USER_1 = 1 << 25;
        /// User signal 2
        const USER_2 = 1 << 26;
        /// User signal 3
        const USER_3 = 1 << 27;
        /// User signal 4
        const USER_4 = 1 << 28;
        /// User signal 5
        const USER_5 = 1 << 29;
        /// User signal 6
        const USER_6 = 1 << 30;
        /// User signal 7
        const USER_7 = 1 << 31;

        /// All object-specific bits
        const OBJECT_ALL = 0x00ff_ffff;
        /// All user bits
        const USER_ALL = 0xff00_0000;
    }
}

impl Signals {
    /// No signals
    pub const NONE: Self = Self::empty();

    /// Create from raw value, dropping undefined object bits
    pub const fn from_raw(raw: u32) -> Self {
        Self::from_bits_truncate(raw)
    }

    /// Get raw value
    pub const fn into_raw(self) -> u32 {
        self.bits()
    }

    /// Fails with `InvalidArgs` unless every bit is a user signal
    pub fn validate_user(self) -> Result {
        if Self::USER_ALL.contains(self) {
            Ok(())
        } else {
            Err(Status::InvalidArgs)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_bits() {
        assert_eq!(Signals::READABLE.bits(), 0x1);
        assert_eq!(Signals::WRITABLE.bits(), 0x2);
        assert_eq!(Signals::PEER_CLOSED.bits(), 0x4);
        assert!(Signals::OBJECT_ALL.contains(Signals::READABLE | Signals::PEER_CLOSED));
    }

    #[test]
    fn test_user_bits() {
        assert_eq!(Signals::USER_0.bits(), 1 << 24);
        assert_eq!(Signals::USER_7.bits(), 1 << 31);
        assert!(!Signals::USER_ALL.intersects(Signals::OBJECT_ALL));
        assert_eq!((Signals::USER_ALL | Signals::OBJECT_ALL).bits(), u32::MAX);
    }

    #[test]
    fn test_validate_user() {
        assert_eq!((Signals::USER_1 | Signals::USER_5).validate_user(), Ok(()));
        assert_eq!(Signals::NONE.validate_user(), Ok(()));
        assert_eq!(Signals::READABLE.validate_user(), Err(Status::InvalidArgs));
    }
}
