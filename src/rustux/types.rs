// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Common types used throughout the IPC core

use core::fmt;

/// Handle value handed out by a [`HandleTable`](crate::HandleTable)
pub type HandleValue = u32;

/// The "never a handle" value. Never allocated by any table.
pub const HANDLE_INVALID: HandleValue = 0;

/// ============================================================================
/// Kernel Object Identifier
/// ============================================================================

/// Opaque identifier of a kernel object owned outside the IPC core
///
/// The core never dereferences or frees the object; the id is pure data.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct KernelObjectId(u64);

impl KernelObjectId {
    /// The null object id
    pub const INVALID: Self = Self(0);

    /// Create from raw value
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Get raw value
    pub const fn into_raw(self) -> u64 {
        self.0
    }

    /// Check if this is a non-null id
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl From<u64> for KernelObjectId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for KernelObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "koid:{}", self.0)
    }
}

/// ============================================================================
/// Kernel Object Types
/// ============================================================================

/// Kernel object type
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ObjectType {
    /// Unknown type
    Unknown = 0,

    /// Process object
    Process = 1,

    /// Thread object
    Thread = 2,

    /// Virtual Memory Object
    Vmo = 3,

    /// Virtual Memory Address Region
    Vmar = 4,

    /// Channel endpoint
    Channel = 5,

    /// Event object
    Event = 6,

    /// Event pair
    EventPair = 7,

    /// Timer object
    Timer = 8,

    /// Job object
    Job = 9,

    /// Port (waitset)
    Port = 10,
}

impl ObjectType {
    /// Create from raw value
    pub const fn from_raw(raw: u32) -> Self {
        match raw {
            1 => Self::Process,
            2 => Self::Thread,
            3 => Self::Vmo,
            4 => Self::Vmar,
            5 => Self::Channel,
            6 => Self::Event,
            7 => Self::EventPair,
            8 => Self::Timer,
            9 => Self::Job,
            10 => Self::Port,
            _ => Self::Unknown,
        }
    }

    /// Get raw value
    pub const fn into_raw(self) -> u32 {
        self as u32
    }

    /// Get name as string
    pub const fn name(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Process => "process",
            Self::Thread => "thread",
            Self::Vmo => "vmo",
            Self::Vmar => "vmar",
            Self::Channel => "channel",
            Self::Event => "event",
            Self::EventPair => "eventpair",
            Self::Timer => "timer",
            Self::Job => "job",
            Self::Port => "port",
        }
    }
}

/// ============================================================================
/// Kernel Object Reference
/// ============================================================================

/// Typed reference to a kernel object
///
/// This is what a handle entry points at and what a message carries when
/// a handle is transferred. The type tag travels with the id so the
/// receiver can re-register the object with sensible default rights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct KernelObject {
    kind: ObjectType,
    id: KernelObjectId,
}

impl KernelObject {
    /// The null object reference
    pub const NULL: Self = Self {
        kind: ObjectType::Unknown,
        id: KernelObjectId::INVALID,
    };

    /// Create a new object reference
    pub const fn new(kind: ObjectType, id: KernelObjectId) -> Self {
        Self { kind, id }
    }

    /// Object type tag
    pub const fn kind(&self) -> ObjectType {
        self.kind
    }

    /// Object id
    pub const fn id(&self) -> KernelObjectId {
        self.id
    }

    /// A reference is valid when it has both a type and a non-null id
    pub const fn is_valid(&self) -> bool {
        self.id.is_valid() && !matches!(self.kind, ObjectType::Unknown)
    }
}

impl fmt::Display for KernelObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.kind.name(), self.id.0)
    }
}

/// ============================================================================
/// Timestamp
/// ============================================================================

/// Logical write time of a message
///
/// Assigned from a per-channel counter, so stamps in one queue strictly
/// increase in FIFO order.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Create from raw value
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Get raw value
    pub const fn into_raw(self) -> u64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_type() {
        assert_eq!(ObjectType::from_raw(5), ObjectType::Channel);
        assert_eq!(ObjectType::Channel.into_raw(), 5);
        assert_eq!(ObjectType::Channel.name(), "channel");
        assert_eq!(ObjectType::from_raw(99), ObjectType::Unknown);
    }

    #[test]
    fn test_kernel_object_validity() {
        assert!(!KernelObject::NULL.is_valid());
        assert!(!KernelObject::new(ObjectType::Vmo, KernelObjectId::INVALID).is_valid());
        assert!(!KernelObject::new(ObjectType::Unknown, KernelObjectId::from_raw(7)).is_valid());
        assert!(KernelObject::new(ObjectType::Vmo, KernelObjectId::from_raw(7)).is_valid());
    }
}
