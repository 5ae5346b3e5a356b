// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Waiters
//!
//! A [`Waiter`] parks the caller until an endpoint asserts any of the
//! wanted signals. The core ships two non-scheduling implementations:
//!
//! - [`NoWait`]: never waits, reports `ShouldWait`
//! - [`SpinWaiter`]: polls the channel for a bounded number of iterations
//!
//! A kernel embedding plugs its own wait queue in behind this trait.

use crate::kernel::object::channel::{Channel, Endpoint};
use crate::kernel::object::signals::Signals;
use crate::rustux::{Result, Status};
use core::time::Duration;

/// Blocks a caller until signals are asserted
pub trait Waiter {
    /// Wait until `endpoint` of `channel` has any of `wanted` asserted
    ///
    /// # Returns
    ///
    /// The endpoint's signals at wake-up
    ///
    /// # Errors
    ///
    /// - `TimedOut` if `timeout` elapsed first
    /// - `ShouldWait` if the waiter cannot block at all
    fn wait(
        &self,
        channel: &Channel,
        endpoint: Endpoint,
        wanted: Signals,
        timeout: Option<Duration>,
    ) -> Result<Signals>;
}

/// Waiter that never blocks
#[derive(Debug, Clone, Copy, Default)]
pub struct NoWait;

impl Waiter for NoWait {
    fn wait(&self, channel: &Channel, endpoint: Endpoint, wanted: Signals, _: Option<Duration>) -> Result<Signals> {
        let signals = channel.get_signals(endpoint);
        if signals.intersects(wanted) {
            Ok(signals)
        } else {
            Err(Status::ShouldWait)
        }
    }
}

/// Busy-polling waiter
///
/// There is no clock in the core, so the wait is bounded by an iteration
/// budget instead of `timeout`. A zero timeout polls once.
#[derive(Debug, Clone, Copy)]
pub struct SpinWaiter {
    spins: usize,
}

impl SpinWaiter {
    /// Default iteration budget
    pub const DEFAULT_SPINS: usize = 1 << 20;

    /// Poll at most `spins` times before timing out
    pub const fn new(spins: usize) -> Self {
        Self { spins }
    }
}

impl Default for SpinWaiter {
    fn default() -> Self {
        Self::new(Self::DEFAULT_SPINS)
    }
}

impl Waiter for SpinWaiter {
    fn wait(
        &self,
        channel: &Channel,
        endpoint: Endpoint,
        wanted: Signals,
        timeout: Option<Duration>,
    ) -> Result<Signals> {
        let budget = match timeout {
            Some(t) if t.is_zero() => 1,
            _ => self.spins.max(1),
        };

        for _ in 0..budget {
            let signals = channel.get_signals(endpoint);
            if signals.intersects(wanted) {
                return Ok(signals);
            }
            core::hint::spin_loop();
        }
        Err(Status::TimedOut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_wait() {
        let (ch, _, _) = Channel::create(10).unwrap();
        assert_eq!(
            NoWait.wait(&ch, Endpoint::One, Signals::READABLE, None),
            Err(Status::ShouldWait)
        );

        ch.write(Endpoint::Zero, &[1], &[]).unwrap();
        let signals = NoWait.wait(&ch, Endpoint::One, Signals::READABLE, None).unwrap();
        assert!(signals.contains(Signals::READABLE));
    }

    #[test]
    fn test_spin_waiter_times_out() {
        let (ch, _, _) = Channel::create(10).unwrap();
        let waiter = SpinWaiter::new(16);
        assert_eq!(
            waiter.wait(&ch, Endpoint::Zero, Signals::READABLE, None),
            Err(Status::TimedOut)
        );
        assert_eq!(
            waiter.wait(&ch, Endpoint::Zero, Signals::READABLE, Some(Duration::ZERO)),
            Err(Status::TimedOut)
        );
    }

    #[test]
    fn test_spin_waiter_sees_peer_closed() {
        let (ch, _, _) = Channel::create(10).unwrap();
        ch.close_endpoint(Endpoint::One).unwrap();
        let signals = SpinWaiter::default()
            .wait(&ch, Endpoint::Zero, Signals::READABLE | Signals::PEER_CLOSED, None)
            .unwrap();
        assert!(signals.contains(Signals::PEER_CLOSED));
    }
}
