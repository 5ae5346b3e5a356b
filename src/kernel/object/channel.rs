// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! IPC Channels
//!
//! A channel is a pair of mutually-peered endpoints that pass messages
//! (bytes plus object references) in both directions.
//!
//! # Design
//!
//! - **Bidirectional**: Created as a pair; a write on one endpoint lands in
//!   the other endpoint's queue
//! - **FIFO ordering**: Messages are read in write order
//! - **Bounded queue**: At most `MAX_PENDING_MESSAGES` per endpoint; a full
//!   queue yields `ShouldWait` (backpressure), never a silent drop
//! - **One lock**: A single mutex serializes every operation on either
//!   endpoint
//! - **Peer closure**: Closing one endpoint asserts `PEER_CLOSED` on the
//!   other; an endpoint never reopens
//! - **Non-blocking**: Waiting is delegated to a [`Waiter`]; signal changes
//!   are published through a [`SignalObserver`]
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
//! let msg = channel.read(Endpoint::One).unwrap();
//! assert_eq!(msg.data(), &[1, 2, 3, 4]);
//! ```

use crate::kernel::object::message::{
    ChannelMessage, HandleInfo, MessagePacket, MessageQueue, MessageSize,
};
use crate::kernel::object::signals::Signals;
use crate::kernel::sync::{SignalObserver, Waiter};
use crate::rustux::{HandleValue, Result, Status, Timestamp, HANDLE_INVALID};
use alloc::sync::Arc;
use core::fmt;
use core::time::Duration;
use spin::Mutex;

use crate::{log_debug, log_trace};

/// ============================================================================
/// Endpoint
/// ============================================================================

/// Channel identifier (the base handle value it was created with)
pub type ChannelId = u64;

/// Endpoint selector
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Endpoint {
    /// Endpoint 0
    Zero = 0,

    /// Endpoint 1
    One = 1,
}

impl Endpoint {
    /// Both endpoints, in index order
    pub const ALL: [Endpoint; 2] = [Endpoint::Zero, Endpoint::One];

    /// The other endpoint
    pub const fn peer(self) -> Self {
        match self {
            Endpoint::Zero => Endpoint::One,
            Endpoint::One => Endpoint::Zero,
        }
    }

    /// Index into per-endpoint arrays
    pub const fn index(self) -> usize {
        self as usize
    }
}

impl TryFrom<u32> for Endpoint {
    type Error = Status;

    fn try_from(raw: u32) -> Result<Self> {
        match raw {
            0 => Ok(Endpoint::Zero),
            1 => Ok(Endpoint::One),
            _ => Err(Status::InvalidArgs),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ep{}", self.index())
    }
}

/// ============================================================================
/// Channel State
/// ============================================================================

/// Per-endpoint state
#[derive(Debug)]
struct EndpointState {
    /// Messages written by the peer, waiting to be read here
    queue: MessageQueue,

    signals: Signals,

    closed: bool,
}

impl EndpointState {
    fn new() -> Self {
        Self {
            queue: MessageQueue::new(),
            signals: Signals::WRITABLE,
            closed: false,
        }
    }
}

#[derive(Debug)]
struct ChannelInner {
    endpoints: [EndpointState; 2],

    /// Logical clock stamped on each written message
    next_timestamp: u64,
}

impl ChannelInner {
    fn ep(&self, endpoint: Endpoint) -> &EndpointState {
        &self.endpoints[endpoint.index()]
    }

    fn ep_mut(&mut self, endpoint: Endpoint) -> &mut EndpointState {
        &mut self.endpoints[endpoint.index()]
    }

    fn signals(&self) -> [Signals; 2] {
        [self.endpoints[0].signals, self.endpoints[1].signals]
    }

    /// Status of a read on `endpoint` if its queue were drained now
    fn readable(&self, endpoint: Endpoint) -> Result {
        let state = self.ep(endpoint);
        if state.closed {
            return Err(Status::BadState);
        }
        if state.queue.is_empty() {
            return if self.ep(endpoint.peer()).closed {
                Err(Status::PeerClosed)
            } else {
                Err(Status::ShouldWait)
            };
        }
        Ok(())
    }

    /// Pop the head message of `endpoint` and update signals
    fn pop(&mut self, endpoint: Endpoint) -> Option<MessagePacket> {
        let was_full = self.ep(endpoint).queue.is_full();
        let state = self.ep_mut(endpoint);
        let packet = state.queue.dequeue()?;

        if state.queue.is_empty() {
            state.signals.remove(Signals::READABLE);
        }

        let peer = self.ep_mut(endpoint.peer());
        if was_full && !peer.closed {
            peer.signals.insert(Signals::WRITABLE);
        }
        Some(packet)
    }
}

/// ============================================================================
/// Channel
/// ============================================================================

/// Channel pair
///
/// Endpoints are addressed with [`Endpoint`]. The owner destroys the
/// channel (drops it) once [`is_fully_closed`](Self::is_fully_closed) holds
/// and no one else references it.
pub struct Channel {
    id: ChannelId,

    /// Handle values assigned at creation
    handles: [HandleValue; 2],

    inner: Mutex<ChannelInner>,

    observer: Option<Arc<dyn SignalObserver>>,
}

impl Channel {
    /// Create a channel pair
    ///
    /// # Returns
    ///
    /// `(channel, base_id, base_id + 1)`: the handle values of endpoint 0
    /// and endpoint 1
    ///
    /// # Errors
    ///
    /// - `InvalidArgs` if `base_id` is `HANDLE_INVALID` or `base_id + 1`
    ///   overflows
    pub fn create(base_id: HandleValue) -> Result<(Self, HandleValue, HandleValue)> {
        Self::build(base_id, None)
    }

    /// Create a channel pair that reports signal changes to `observer`
    pub fn create_with_observer(
        base_id: HandleValue,
        observer: Arc<dyn SignalObserver>,
    ) -> Result<(Self, HandleValue, HandleValue)> {
        Self::build(base_id, Some(observer))
    }

    fn build(
        base_id: HandleValue,
        observer: Option<Arc<dyn SignalObserver>>,
    ) -> Result<(Self, HandleValue, HandleValue)> {
        if base_id == HANDLE_INVALID {
            return Err(Status::InvalidArgs);
        }
        let h0 = base_id;
        let h1 = base_id.checked_add(1).ok_or(Status::InvalidArgs)?;

        let channel = Self {
            id: base_id as ChannelId,
            handles: [h0, h1],
            inner: Mutex::new(ChannelInner {
                endpoints: [EndpointState::new(), EndpointState::new()],
                next_timestamp: 1,
            }),
            observer,
        };

        log_debug!("channel {}: created (handles {}, {})", channel.id, h0, h1);
        Ok((channel, h0, h1))
    }

    /// Get channel ID
    pub fn id(&self) -> ChannelId {
        self.id
    }

    /// Handle value assigned to `endpoint` at creation
    pub fn handle_of(&self, endpoint: Endpoint) -> HandleValue {
        self.handles[endpoint.index()]
    }

    /// Endpoint whose creation handle is `handle`
    pub fn endpoint_for(&self, handle: HandleValue) -> Result<Endpoint> {
        Endpoint::ALL
            .into_iter()
            .find(|ep| self.handles[ep.index()] == handle)
            .ok_or(Status::BadHandle)
    }

    /// Run `op` under the channel lock, then report signal changes
    fn mutate<R>(&self, op: impl FnOnce(&mut ChannelInner) -> R) -> R {
        let (result, before, after) = {
            let mut inner = self.inner.lock();
            let before = inner.signals();
            let result = op(&mut inner);
            (result, before, inner.signals())
        };

        if let Some(observer) = &self.observer {
            for ep in Endpoint::ALL {
                let (prev, cur) = (before[ep.index()], after[ep.index()]);
                if prev != cur {
                    observer.signals_changed(self.id, ep, prev, cur);
                }
            }
        }
        result
    }

    /// Write a message to the peer of `src`
    ///
    /// # Errors
    ///
    /// - `OutOfRange` if `data` or `handles` exceed the message limits
    /// - `BadState` if `src` is closed
    /// - `PeerClosed` if the peer is closed
    /// - `ShouldWait` if the peer's queue is full
    /// - `NoMemory` if the message cannot be allocated
    pub fn write(&self, src: Endpoint, data: &[u8], handles: &[HandleInfo]) -> Result {
        // Copy the payload before taking the lock; the timestamp is set inside.
        let mut packet = MessagePacket::new(data, handles, Timestamp::default())?;
        let dst = src.peer();

        self.mutate(|inner| {
            if inner.ep(src).closed {
                return Err(Status::BadState);
            }
            if inner.ep(dst).closed {
                log_trace!("channel {}: write on {} rejected, peer closed", self.id, src);
                return Err(Status::PeerClosed);
            }
            if inner.ep(dst).queue.is_full() {
                log_trace!("channel {}: write on {} rejected, peer queue full", self.id, src);
                return Err(Status::ShouldWait);
            }

            packet.stamp(Timestamp::from_raw(inner.next_timestamp));
            inner.ep_mut(dst).queue.enqueue(packet)?;
            inner.next_timestamp += 1;

            let peer = inner.ep_mut(dst);
            peer.signals.insert(Signals::READABLE);
            if peer.queue.is_full() {
                inner.ep_mut(src).signals.remove(Signals::WRITABLE);
            }
            Ok(())
        })
    }

    /// Read the oldest message queued on `endpoint`
    ///
    /// # Errors
    ///
    /// - `BadState` if `endpoint` is closed
    /// - `ShouldWait` if nothing is queued and the peer is open
    /// - `PeerClosed` if nothing is queued and the peer is closed
    pub fn read(&self, endpoint: Endpoint) -> Result<ChannelMessage> {
        self.mutate(|inner| {
            inner.readable(endpoint)?;
            inner.pop(endpoint).ok_or(Status::ShouldWait)
        })
    }

    /// Read the oldest message into caller buffers
    ///
    /// If the message does not fit, `BufferTooSmall` is returned and the
    /// message stays queued, unless `may_discard` is set, in which case it
    /// is dropped.
    ///
    /// # Returns
    ///
    /// Size of the message copied
    pub fn read_into(
        &self,
        endpoint: Endpoint,
        data_buf: &mut [u8],
        handle_buf: &mut [HandleInfo],
        may_discard: bool,
    ) -> Result<MessageSize> {
        let packet = self.mutate(|inner| {
            inner.readable(endpoint)?;

            let size = inner
                .ep(endpoint)
                .queue
                .peek()
                .map(MessagePacket::size)
                .ok_or(Status::ShouldWait)?;

            if size.bytes > data_buf.len() || size.handles > handle_buf.len() {
                if may_discard {
                    inner.pop(endpoint);
                    log_trace!("channel {}: discarded oversized message on {}", self.id, endpoint);
                }
                return Err(Status::BufferTooSmall);
            }

            inner.pop(endpoint).ok_or(Status::ShouldWait)
        })?;

        let size = packet.size();
        data_buf[..size.bytes].copy_from_slice(packet.data());
        handle_buf[..size.handles].copy_from_slice(packet.handles());
        Ok(size)
    }

    /// Size of the oldest message queued on `endpoint`
    ///
    /// Fails like [`read`](Self::read) when nothing is queued.
    pub fn peek_size(&self, endpoint: Endpoint) -> Result<MessageSize> {
        let inner = self.inner.lock();
        inner.readable(endpoint)?;
        inner
            .ep(endpoint)
            .queue
            .peek()
            .map(MessagePacket::size)
            .ok_or(Status::ShouldWait)
    }

    /// Write a request, then read the reply
    ///
    /// Whenever the read reports `ShouldWait`, `waiter` is asked to wait
    /// for `READABLE | PEER_CLOSED` on `endpoint`. Errors from the write,
    /// the read, or the waiter are returned as is.
    pub fn call<W: Waiter + ?Sized>(
        &self,
        endpoint: Endpoint,
        request: &[u8],
        handles: &[HandleInfo],
        timeout: Option<Duration>,
        waiter: &W,
    ) -> Result<ChannelMessage> {
        self.write(endpoint, request, handles)?;

        loop {
            match self.read(endpoint) {
                Err(Status::ShouldWait) => {
                    waiter.wait(self, endpoint, Signals::READABLE | Signals::PEER_CLOSED, timeout)?;
                }
                reply => return reply,
            }
        }
    }

    /// Close an endpoint
    ///
    /// Releases the endpoint's pending messages and asserts `PEER_CLOSED`
    /// on the peer. Messages already sent to the peer stay readable.
    ///
    /// # Errors
    ///
    /// - `BadState` if the endpoint is already closed
    pub fn close_endpoint(&self, endpoint: Endpoint) -> Result {
        let released = self.mutate(|inner| {
            let state = inner.ep_mut(endpoint);
            if state.closed {
                return Err(Status::BadState);
            }
            state.closed = true;
            state.signals = Signals::NONE;
            let released = core::mem::take(&mut state.queue);

            let peer = inner.ep_mut(endpoint.peer());
            if !peer.closed {
                peer.signals.insert(Signals::PEER_CLOSED);
                peer.signals.remove(Signals::WRITABLE);
            }
            Ok(released)
        })?;

        log_debug!(
            "channel {}: {} closed, released {} pending messages",
            self.id,
            endpoint,
            released.len()
        );
        Ok(())
    }

    /// Clear and set user signals on `endpoint`
    ///
    /// # Errors
    ///
    /// - `InvalidArgs` if `clear` or `set` contain non-user bits
    /// - `BadState` if `endpoint` is closed
    pub fn signal(&self, endpoint: Endpoint, clear: Signals, set: Signals) -> Result {
        clear.validate_user()?;
        set.validate_user()?;

        self.mutate(|inner| {
            let state = inner.ep_mut(endpoint);
            if state.closed {
                return Err(Status::BadState);
            }
            state.signals.remove(clear);
            state.signals.insert(set);
            Ok(())
        })
    }

    /// Clear and set user signals on the peer of `endpoint`
    ///
    /// # Errors
    ///
    /// - `InvalidArgs` if `clear` or `set` contain non-user bits
    /// - `BadState` if `endpoint` is closed
    /// - `PeerClosed` if the peer is closed
    pub fn signal_peer(&self, endpoint: Endpoint, clear: Signals, set: Signals) -> Result {
        clear.validate_user()?;
        set.validate_user()?;

        self.mutate(|inner| {
            if inner.ep(endpoint).closed {
                return Err(Status::BadState);
            }
            let peer = inner.ep_mut(endpoint.peer());
            if peer.closed {
                return Err(Status::PeerClosed);
            }
            peer.signals.remove(clear);
            peer.signals.insert(set);
            Ok(())
        })
    }

    /// Check if messages are queued on `endpoint`
    pub fn has_pending(&self, endpoint: Endpoint) -> bool {
        !self.inner.lock().ep(endpoint).queue.is_empty()
    }

    /// Number of messages queued on `endpoint`
    pub fn pending_count(&self, endpoint: Endpoint) -> usize {
        self.inner.lock().ep(endpoint).queue.len()
    }

    /// Current signals of `endpoint`
    pub fn get_signals(&self, endpoint: Endpoint) -> Signals {
        self.inner.lock().ep(endpoint).signals
    }

    pub fn is_closed(&self, endpoint: Endpoint) -> bool {
        self.inner.lock().ep(endpoint).closed
    }

    pub fn is_peer_closed(&self, endpoint: Endpoint) -> bool {
        self.inner.lock().ep(endpoint.peer()).closed
    }

    /// Check if both endpoints are closed
    pub fn is_fully_closed(&self) -> bool {
        let inner = self.inner.lock();
        inner.endpoints.iter().all(|ep| ep.closed)
    }
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("Channel")
            .field("id", &self.id)
            .field("handles", &self.handles)
            .field("signals", &inner.signals())
            .field("pending", &[inner.endpoints[0].queue.len(), inner.endpoints[1].queue.len()])
            .finish()
    }
}

/// ============================================================================
/// Tests
/// ============================================================================
