// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! IPC Configuration
//!
//! Compile-time limits for messages and channel queues, and the runtime
//! configuration of a handle table.

use static_assertions::const_assert;

/// Maximum message size in bytes
pub const MAX_MSG_BYTES: usize = 64 * 1024;

/// Maximum handles per message
pub const MAX_MSG_HANDLES: usize = 64;

/// Maximum undelivered messages per endpoint
pub const MAX_PENDING_MESSAGES: usize = 256;

/// Bucket count used when a table is created with zero buckets
pub const DEFAULT_INITIAL_BUCKETS: u32 = 64;

/// Average chain length that triggers bucket doubling
pub const MAX_LOAD_FACTOR: usize = 4;

/// Default cap on live handles per table
pub const DEFAULT_MAX_HANDLES: usize = 1 << 20;

const_assert!(MAX_MSG_BYTES == 65536);
const_assert!(MAX_MSG_HANDLES == 64);
const_assert!(MAX_PENDING_MESSAGES == 256);
const_assert!(DEFAULT_INITIAL_BUCKETS.is_power_of_two());
const_assert!(MAX_LOAD_FACTOR >= 1);

/// Handle table configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandleTableConfig {
    /// Initial number of hash buckets (0 selects the default)
    pub initial_buckets: u32,

    /// Maximum number of live handles before `alloc` fails with `NoMemory`
    pub max_handles: usize,

    /// Whether the bucket array doubles when chains grow too long
    pub growable: bool,
}

impl HandleTableConfig {
    /// Config with the given bucket count and default limits
    pub const fn with_buckets(initial_buckets: u32) -> Self {
        Self {
            initial_buckets,
            max_handles: DEFAULT_MAX_HANDLES,
            growable: true,
        }
    }

    /// Cap the number of live handles
    pub const fn max_handles(mut self, max_handles: usize) -> Self {
        self.max_handles = max_handles;
        self
    }

    /// Enable or disable bucket growth
    pub const fn growable(mut self, growable: bool) -> Self {
        self.growable = growable;
        self
    }

    /// Bucket count after applying the zero-means-default rule
    pub const fn effective_buckets(&self) -> u32 {
        if self.initial_buckets == 0 {
            DEFAULT_INITIAL_BUCKETS
        } else {
            self.initial_buckets
        }
    }
}

impl Default for HandleTableConfig {
    fn default() -> Self {
        Self::with_buckets(DEFAULT_INITIAL_BUCKETS)
    }
}
