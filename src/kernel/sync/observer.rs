// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Signal Observer
//!
//! Hook through which a channel publishes signal changes to an external
//! wait/notify mechanism (wait queue, futex, async reactor).

use crate::kernel::object::channel::{ChannelId, Endpoint};
use crate::kernel::object::signals::Signals;

/// Receiver of signal-change notifications
///
/// Called after the channel lock is released, once per endpoint whose
/// signals changed during an operation. Implementations may call back into
/// the channel.
///
/// # Ordering
///
/// Notifications from operations running concurrently on one channel can
/// arrive in any order, so `previous`/`current` may already be stale. Treat
/// a notification as a hint to wake up, and re-read the live state with
/// [`Channel::get_signals`](crate::kernel::object::Channel::get_signals)
/// before acting on it.
pub trait SignalObserver: Send + Sync {
    /// Signals of `endpoint` on `channel` went from `previous` to `current`
    fn signals_changed(
        &self,
        channel: ChannelId,
        endpoint: Endpoint,
        previous: Signals,
        current: Signals,
    );
}

/// Observer that ignores every notification
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl SignalObserver for NullObserver {
    fn signals_changed(&self, _: ChannelId, _: Endpoint, _: Signals, _: Signals) {}
}

/// Signals asserted by a change (clear in `previous`, set in `current`)
pub fn asserted(previous: Signals, current: Signals) -> Signals {
    current & !previous
}
