// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Status codes returned by every IPC operation
//!
//! Success is `Ok(..)`; every failure is one [`Status`]. Raw values match
//! the Zircon numbering so they can cross a syscall boundary unchanged.

use thiserror::Error;

/// Raw success code
pub const RX_OK: i32 = 0;

/// Result type for IPC operations
pub type Result<T = ()> = core::result::Result<T, Status>;

/// Error status
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum Status {
    /// Allocation or table growth failed
    #[error("out of memory")]
    NoMemory = -4,

    /// Malformed argument (null object, bad endpoint selector, ...)
    #[error("invalid arguments")]
    InvalidArgs = -10,

    /// Handle does not name a usable object
    #[error("bad handle")]
    BadHandle = -11,

    /// Handle names an object of the wrong type
    #[error("wrong object type")]
    WrongType = -12,

    /// Message exceeds the data or handle limit
    #[error("argument out of range")]
    OutOfRange = -14,

    /// Caller buffer cannot hold the pending message
    #[error("buffer too small")]
    BufferTooSmall = -15,

    /// Operation not valid in the object's current state
    #[error("bad state")]
    BadState = -20,

    /// Wait deadline expired
    #[error("timed out")]
    TimedOut = -21,

    /// Retry after a signal change (queue full or empty)
    #[error("should wait")]
    ShouldWait = -22,

    /// The other endpoint is closed
    #[error("peer closed")]
    PeerClosed = -24,

    /// Unknown handle
    #[error("not found")]
    NotFound = -25,

    /// Handle lacks the required rights
    #[error("access denied")]
    AccessDenied = -30,
}

impl Status {
    /// Convert to the raw status code
    pub const fn into_raw(self) -> i32 {
        self as i32
    }

    /// Convert a raw status code
    ///
    /// Returns `None` for `RX_OK` and for codes this crate never produces.
    pub const fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            -4 => Some(Self::NoMemory),
            -10 => Some(Self::InvalidArgs),
            -11 => Some(Self::BadHandle),
            -12 => Some(Self::WrongType),
            -14 => Some(Self::OutOfRange),
            -15 => Some(Self::BufferTooSmall),
            -20 => Some(Self::BadState),
            -21 => Some(Self::TimedOut),
            -22 => Some(Self::ShouldWait),
            -24 => Some(Self::PeerClosed),
            -25 => Some(Self::NotFound),
            -30 => Some(Self::AccessDenied),
            _ => None,
        }
    }

    /// Stable name, as used in logs and the status taxonomy
    pub const fn name(self) -> &'static str {
        match self {
            Self::NoMemory => "ERR_NO_MEMORY",
            Self::InvalidArgs => "ERR_INVALID_ARGS",
            Self::BadHandle => "ERR_BAD_HANDLE",
            Self::WrongType => "ERR_WRONG_TYPE",
            Self::OutOfRange => "ERR_OUT_OF_RANGE",
            Self::BufferTooSmall => "ERR_BUFFER_TOO_SMALL",
            Self::BadState => "ERR_BAD_STATE",
            Self::TimedOut => "ERR_TIMED_OUT",
            Self::ShouldWait => "ERR_SHOULD_WAIT",
            Self::PeerClosed => "ERR_PEER_CLOSED",
            Self::NotFound => "ERR_NOT_FOUND",
            Self::AccessDenied => "ERR_ACCESS_DENIED",
        }
    }

    /// Only `ShouldWait` is meant to be retried after a signal change
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::ShouldWait)
    }
}

impl From<Status> for i32 {
    fn from(status: Status) -> Self {
        status.into_raw()
    }
}

/// Flatten a result into a raw status code (`RX_OK` on success)
pub fn status_of<T>(result: &Result<T>) -> i32 {
    match result {
        Ok(_) => RX_OK,
        Err(status) => status.into_raw(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::string::ToString;

    #[test]
    fn test_raw_round_trip() {
        for status in [
            Status::NoMemory,
            Status::InvalidArgs,
            Status::BadHandle,
            Status::WrongType,
            Status::OutOfRange,
            Status::BufferTooSmall,
            Status::BadState,
            Status::TimedOut,
            Status::ShouldWait,
            Status::PeerClosed,
            Status::NotFound,
            Status::AccessDenied,
        ] {
            assert_eq!(Status::from_raw(status.into_raw()), Some(status));
        }
        assert_eq!(Status::from_raw(RX_OK), None);
    }

    #[test]
    fn test_status_of() {
        assert_eq!(status_of(&Ok::<u32, Status>(3)), RX_OK);
        assert_eq!(status_of::<()>(&Err(Status::PeerClosed)), -24);
    }

    #[test]
    fn test_only_should_wait_is_retryable() {
        assert!(Status::ShouldWait.is_retryable());
        assert!(!Status::PeerClosed.is_retryable());
        assert!(!Status::BadState.is_retryable());
    }

    #[test]
    fn test_display() {
        assert_eq!(Status::AccessDenied.to_string(), "access denied");
        assert_eq!(Status::ShouldWait.name(), "ERR_SHOULD_WAIT");
    }
}
