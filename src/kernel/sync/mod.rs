// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! IPC Synchronization Seams
//!
//! The IPC core never blocks. Operations that cannot proceed return
//! `ShouldWait`, and the objects report every signal change through an
//! observer hook. Actual parking and waking belong to the embedder, which
//! plugs in here.
//!
//! # Interfaces
//!
//! - **SignalObserver**: Notified after an object's signals change
//! - **Waiter**: Parks a caller until signals are asserted (used by `call`)

pub mod observer;
pub mod wait;

// Re-exports
pub use observer::*;
pub use wait::*;
