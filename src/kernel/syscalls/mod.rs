// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Handle-Based Entry Layer
//!
//! Channel and handle operations expressed in terms of handle values, the
//! way a system call layer exposes them. Every call works against an
//! explicit [`IpcSpace`] (one per process or other capability owner);
//! there is no global handle table.
//!
//! # Calls Implemented
//!
//! - `sys_channel_create` / `sys_channel_write` / `sys_channel_read` /
//!   `sys_channel_close`
//! - `sys_handle_close` / `sys_handle_close_many` /
//!   `sys_handle_duplicate` / `sys_handle_replace`
//!
//! # Error Return Convention
//!
//! ```text
//! Success: return value (positive or zero)
//! Failure: negative status code
//! ```

pub mod channel;
pub mod handle_ops;

// Re-exports
pub use channel::*;
pub use handle_ops::*;

use crate::kernel::config::HandleTableConfig;
use crate::kernel::object::HandleTable;
use crate::rustux::{Result, Status};
use alloc::sync::Arc;

/// ============================================================================
/// IPC Space
/// ============================================================================

/// Capability namespace of one owner
///
/// Pairs the owner's handle table with the channel registry used to
/// resolve channel endpoint objects. Spaces that exchange channel handles
/// must share one registry.
pub struct IpcSpace {
    table: HandleTable,
    channels: Arc<ChannelRegistry>,
}

impl IpcSpace {
    /// Create a space with its own registry and a default handle table
    pub fn new() -> Result<Self> {
        Self::with_registry(Arc::new(ChannelRegistry::new()), HandleTableConfig::default())
    }

    /// Create a space resolving channels through `channels`
    pub fn with_registry(channels: Arc<ChannelRegistry>, config: HandleTableConfig) -> Result<Self> {
        Ok(Self {
            table: HandleTable::with_config(config)?,
            channels,
        })
    }

    /// Get the handle table
    pub fn table(&self) -> &HandleTable {
        &self.table
    }

    /// Get the channel registry
    pub fn channels(&self) -> &Arc<ChannelRegistry> {
        &self.channels
    }
}

/// ============================================================================
/// Return Values
/// ============================================================================

/// Flat return value at an ABI boundary
pub type SyscallRet = isize;

/// Convert error code to negative return value
#[inline]
pub const fn err_to_ret(err: Status) -> SyscallRet {
    err.into_raw() as SyscallRet
}

/// Convert success value to return value
#[inline]
pub const fn ok_to_ret(val: usize) -> SyscallRet {
    val as SyscallRet
}

/// Convert a result to a return value
pub fn to_ret(result: Result<usize>) -> SyscallRet {
    match result {
        Ok(val) => ok_to_ret(val),
        Err(err) => err_to_ret(err),
    }
}

/// Unknown handles surface as `BadHandle` at this layer
pub(crate) fn bad_handle(err: Status) -> Status {
    match err {
        Status::NotFound => Status::BadHandle,
        other => other,
    }
}
