// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Message Packets and Queues
//!
//! A message packet carries bytes plus transferred object references. Each
//! channel endpoint holds its undelivered packets in a bounded FIFO
//! [`MessageQueue`]. The queue owns every enqueued packet; `dequeue` hands
//! ownership to the caller, and dropping the queue releases the rest.

use crate::kernel::config::{MAX_MSG_BYTES, MAX_MSG_HANDLES, MAX_PENDING_MESSAGES};
use crate::kernel::object::rights::Rights;
use crate::rustux::{KernelObject, Result, Status, Timestamp};
use alloc::collections::VecDeque;
use alloc::vec::Vec;

use crate::log_warn;

/// ============================================================================
/// Message Packet
/// ============================================================================

/// Payload size of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MessageSize {
    /// Data bytes
    pub bytes: usize,

    /// Transferred handles
    pub handles: usize,
}

/// Handle in flight: the object and the rights the sender held
///
/// The receiver re-registers `object` with exactly `rights`, so a transfer
/// never widens a capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandleInfo {
    /// Transferred object
    pub object: KernelObject,

    /// Rights carried across
    pub rights: Rights,
}

impl HandleInfo {
    /// Empty slot for receive buffers
    pub const NULL: Self = Self {
        object: KernelObject::NULL,
        rights: Rights::NONE,
    };

    pub const fn new(object: KernelObject, rights: Rights) -> Self {
        Self { object, rights }
    }
}

/// Message packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessagePacket {
    data: Vec<u8>,
    handles: Vec<HandleInfo>,
    timestamp: Timestamp,
}

/// Message as seen by a channel reader
pub type ChannelMessage = MessagePacket;

impl MessagePacket {
    /// Create a packet, copying `data` and `handles`
    ///
    /// # Errors
    ///
    /// - `OutOfRange` if `data` exceeds `MAX_MSG_BYTES` or `handles`
    ///   exceeds `MAX_MSG_HANDLES`
    /// - `NoMemory` if the payload cannot be allocated
    pub fn new(data: &[u8], handles: &[HandleInfo], timestamp: Timestamp) -> Result<Self> {
        Self::check_limits(data.len(), handles.len())?;

        let mut data_buf = Vec::new();
        data_buf
            .try_reserve_exact(data.len())
            .map_err(|_| Status::NoMemory)?;
        data_buf.extend_from_slice(data);

        let mut handle_buf = Vec::new();
        handle_buf
            .try_reserve_exact(handles.len())
            .map_err(|_| Status::NoMemory)?;
        handle_buf.extend_from_slice(handles);

        Ok(Self {
            data: data_buf,
            handles: handle_buf,
            timestamp,
        })
    }

    /// Check message limits
    pub fn check_limits(bytes: usize, handles: usize) -> Result {
        if bytes > MAX_MSG_BYTES || handles > MAX_MSG_HANDLES {
            return Err(Status::OutOfRange);
        }
        Ok(())
    }

    /// Message bytes
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Transferred handles
    pub fn handles(&self) -> &[HandleInfo] {
        &self.handles
    }

    /// Write timestamp
    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    pub(crate) fn stamp(&mut self, timestamp: Timestamp) {
        self.timestamp = timestamp;
    }

    /// Payload size
    pub fn size(&self) -> MessageSize {
        MessageSize {
            bytes: self.data.len(),
            handles: self.handles.len(),
        }
    }

    /// Check if message is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty() && self.handles.is_empty()
    }

    /// Split into data and handles
    pub fn into_parts(self) -> (Vec<u8>, Vec<HandleInfo>) {
        (self.data, self.handles)
    }
}

/// ============================================================================
/// Message Queue
/// ============================================================================

/// Bounded FIFO of message packets
#[derive(Debug)]
pub struct MessageQueue {
    packets: VecDeque<MessagePacket>,
    capacity: usize,
    bytes: usize,
}

impl MessageQueue {
    /// Create a queue bounded at `MAX_PENDING_MESSAGES`
    pub const fn new() -> Self {
        Self::with_capacity(MAX_PENDING_MESSAGES)
    }

    /// Create a queue holding at most `capacity` packets
    pub const fn with_capacity(capacity: usize) -> Self {
        Self {
            packets: VecDeque::new(),
            capacity,
            bytes: 0,
        }
    }

    /// Append a packet at the tail
    ///
    /// # Errors
    ///
    /// - `ShouldWait` if the queue is full; the packet is not enqueued
    /// - `NoMemory` if queue storage cannot grow
    pub fn enqueue(&mut self, packet: MessagePacket) -> Result {
        if self.is_full() {
            return Err(Status::ShouldWait);
        }

        self.packets.try_reserve(1).map_err(|_| {
            log_warn!("message queue: cannot grow past {} packets", self.packets.len());
            Status::NoMemory
        })?;

        self.bytes += packet.data.len();
        self.packets.push_back(packet);
        Ok(())
    }

    /// Pop the oldest packet
    pub fn dequeue(&mut self) -> Option<MessagePacket> {
        let packet = self.packets.pop_front()?;
        self.bytes -= packet.data.len();
        Some(packet)
    }

    /// Oldest packet, without removing it
    pub fn peek(&self) -> Option<&MessagePacket> {
        self.packets.front()
    }

    /// Release every queued packet
    ///
    /// # Returns
    ///
    /// Number of packets released
    pub fn destroy(&mut self) -> usize {
        let released = self.packets.len();
        self.packets.clear();
        self.bytes = 0;
        released
    }

    /// Queued packets
    pub fn len(&self) -> usize {
        self.packets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.packets.len() >= self.capacity
    }

    /// Maximum queued packets
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Data bytes held by queued packets
    pub fn bytes_queued(&self) -> usize {
        self.bytes
    }
}

impl Default for MessageQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// ============================================================================
/// Tests
/// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rustux::{KernelObjectId, ObjectType};
    use std::vec;

    fn packet(byte: u8, ts: u64) -> MessagePacket {
        MessagePacket::new(&[byte], &[], Timestamp::from_raw(ts)).unwrap()
    }

    #[test]
    fn test_packet_limits() {
        let big = vec![0u8; MAX_MSG_BYTES];
        assert!(MessagePacket::new(&big, &[], Timestamp::from_raw(1)).is_ok());

        let too_big = vec![0u8; MAX_MSG_BYTES + 1];
        assert_eq!(
            MessagePacket::new(&too_big, &[], Timestamp::from_raw(1)),
            Err(Status::OutOfRange)
        );

        let obj = KernelObject::new(ObjectType::Event, KernelObjectId::from_raw(1));
        let handles = vec![HandleInfo::new(obj, Rights::BASIC); MAX_MSG_HANDLES + 1];
        assert_eq!(
            MessagePacket::new(&[], &handles, Timestamp::from_raw(1)),
            Err(Status::OutOfRange)
        );
    }

    #[test]
    fn test_packet_accessors() {
        let obj = KernelObject::new(ObjectType::Vmo, KernelObjectId::from_raw(200));
        let info = HandleInfo::new(obj, Rights::READ | Rights::TRANSFER);
        let p = MessagePacket::new(&[1, 2, 3], &[info], Timestamp::from_raw(5)).unwrap();

        assert_eq!(p.data(), &[1, 2, 3]);
        assert_eq!(p.handles(), &[info]);
        assert_eq!(p.timestamp().into_raw(), 5);
        assert_eq!(p.size(), MessageSize { bytes: 3, handles: 1 });
        assert!(!p.is_empty());
        assert!(packet(0, 1).size().handles == 0);
    }

    #[test]
    fn test_fifo_order() {
        let mut q = MessageQueue::new();
        for i in 0..5 {
            q.enqueue(packet(i, i as u64)).unwrap();
        }
        assert_eq!(q.len(), 5);
        assert_eq!(q.peek().unwrap().data(), &[0]);

        for i in 0..5 {
            assert_eq!(q.dequeue().unwrap().data(), &[i]);
        }
        assert!(q.dequeue().is_none());
        assert!(q.is_empty());
    }

    #[test]
    fn test_bounded() {
        let mut q = MessageQueue::with_capacity(2);
        q.enqueue(packet(1, 1)).unwrap();
        q.enqueue(packet(2, 2)).unwrap();
        assert!(q.is_full());
        assert_eq!(q.enqueue(packet(3, 3)), Err(Status::ShouldWait));
        assert_eq!(q.len(), 2);

        q.dequeue();
        assert!(!q.is_full());
        q.enqueue(packet(3, 3)).unwrap();
        assert_eq!(q.dequeue().unwrap().data(), &[2]);
    }

    #[test]
    fn test_default_capacity() {
        let q = MessageQueue::default();
        assert_eq!(q.capacity(), MAX_PENDING_MESSAGES);
    }

    #[test]
    fn test_bytes_and_destroy() {
        let mut q = MessageQueue::new();
        q.enqueue(MessagePacket::new(&[0; 10], &[], Timestamp::from_raw(1)).unwrap())
            .unwrap();
        q.enqueue(MessagePacket::new(&[0; 6], &[], Timestamp::from_raw(2)).unwrap())
            .unwrap();
        assert_eq!(q.bytes_queued(), 16);

        q.dequeue();
        assert_eq!(q.bytes_queued(), 6);

        assert_eq!(q.destroy(), 1);
        assert!(q.is_empty());
        assert_eq!(q.bytes_queued(), 0);
    }
}
