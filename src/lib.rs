// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Rustux IPC Core
//!
//! Capability handles and bidirectional message channels for the
//! Rustux microkernel.
//!
//! # Layout
//!
//! - [`rustux`] - Common types and status codes
//! - [`kernel::object`] - Rights, signals, handle table, message queue, channel
//! - [`kernel::sync`] - Signal observer and waiter seams
//! - [`kernel::syscalls`] - Handle-based entry layer (`sys_channel_*`, `sys_handle_*`)
//!
//! # Usage
//!
//! ```rust
//! use rustux_ipc::{Channel, Endpoint, Signals};
//!
//! let (channel, h0, h1) = Channel::create(100).unwrap();
//! assert_eq!((h0, h1), (100, 101));
//!
//! channel.write(Endpoint::Zero, &[1, 2, 3, 4], &[]).unwrap();
//! assert!(channel.get_signals(Endpoint::One).contains(Signals::READABLE));
//!
//! let msg = channel.read(Endpoint::One).unwrap();
//! assert_eq!(msg.data(), &[1, 2, 3, 4]);
//! ```

#![no_std]

extern crate alloc;

#[cfg(test)]
extern crate std;

pub mod rustux;
pub mod kernel;

// Re-exports
pub use kernel::config::{
    HandleTableConfig, DEFAULT_INITIAL_BUCKETS, MAX_LOAD_FACTOR, MAX_MSG_BYTES,
    MAX_MSG_HANDLES, MAX_PENDING_MESSAGES,
};
pub use kernel::object::{
    handle_table_init, Channel, ChannelId, ChannelMessage, Endpoint, HandleEntry, HandleInfo,
    HandleOwner, HandleTable, MessagePacket, MessageQueue, MessageSize, Rights, Signals,
};
pub use kernel::sync::{NoWait, NullObserver, SignalObserver, SpinWaiter, Waiter};
pub use kernel::syscalls::{ChannelRegistry, IpcSpace};
pub use rustux::{
    status_of, HandleValue, KernelObject, KernelObjectId, ObjectType, Result, Status, Timestamp,
    HANDLE_INVALID, RX_OK,
};
