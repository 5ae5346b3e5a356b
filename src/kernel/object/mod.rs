// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Kernel Objects & IPC (Zircon-style)
//!
//! This module implements the capability-based IPC core. Kernel objects
//! are reached only through handles with rights, and channels move bytes
//! and object references between endpoints.
//!
//! # Design
//!
//! - **Capability-based security**: All access through handles with rights
//! - **Rights narrowing**: Duplication and transfer can only drop rights
//! - **Handle passing**: Messages carry object references between endpoints
//! - **Reference counting**: `close` reports when the last handle goes away
//!
//! # Modules
//!
//! - [`rights`] - Handle rights
//! - [`signals`] - Object signals
//! - [`handle`] - Handle table
//! - [`message`] - Message packets and queues
//! - [`channel`] - IPC channels

pub mod rights;
pub mod signals;
pub mod handle;
pub mod message;
pub mod channel;

#[cfg(test)]
mod tests_prop;

// Re-exports
pub use channel::{Channel, ChannelId, Endpoint};
pub use handle::{handle_table_init, HandleEntry, HandleOwner, HandleTable};
pub use message::{ChannelMessage, HandleInfo, MessagePacket, MessageQueue, MessageSize};
pub use rights::Rights;
pub use signals::Signals;
