// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Handle Table
//!
//! This module implements the capability store. A handle value is an
//! opaque integer that maps to exactly one entry holding an object
//! reference and a rights mask.
//!
//! # Design
//!
//! - **Hashed buckets**: Handle value modulo bucket count selects a chain
//! - **Arena + index**: Chain nodes live in a vector; links are indices and
//!   freed nodes go on a free list
//! - **Rights narrowing**: Duplicate and replace intersect rights, never widen
//! - **Object references**: Every live handle counts as one reference to its
//!   object; `close` reports when the last one goes away
//! - **All-or-nothing**: Storage is reserved before any mutation, so a
//!   `NoMemory` failure leaves the table untouched. Handles leaving in a
//!   message are validated and removed under one lock acquisition
//! - **Locking**: One spin lock per table; every operation is short and
//!   never blocks
//!
//! # Usage
//!
//! ```rust
//! use rustux_ipc::{handle_table_init, KernelObject, KernelObjectId, ObjectType, Rights};
//!
//! let table = handle_table_init(64).unwrap();
//! let vmo = KernelObject::new(ObjectType::Vmo, KernelObjectId::from_raw(7));
//! let h = table.alloc(vmo, Rights::READ | Rights::DUPLICATE).unwrap();
//! let ro = table.duplicate(h, Rights::READ).unwrap();
//! assert_eq!(table.get(ro, Rights::READ).unwrap(), vmo);
//! ```

use crate::kernel::config::{HandleTableConfig, MAX_LOAD_FACTOR};
use crate::kernel::object::message::HandleInfo;
use crate::kernel::object::rights::Rights;
use crate::rustux::{HandleValue, KernelObject, Result, Status, HANDLE_INVALID};
use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use spin::Mutex;

use crate::{log_debug, log_trace, log_warn};

/// ============================================================================
/// Handle Entry
/// ============================================================================

/// Snapshot of a live handle's capability
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandleEntry {
    /// Referenced object
    pub object: KernelObject,

    /// Rights granted through this handle
    pub rights: Rights,

    /// Live handles in this table referencing `object`
    pub ref_count: u32,
}

/// Chain node stored in the arena
#[derive(Debug)]
struct Slot {
    handle: HandleValue,
    object: KernelObject,
    rights: Rights,
    next: Option<u32>,
}

/// ============================================================================
/// Table State
/// ============================================================================

struct TableInner {
    /// Chain heads, indexed by `handle % buckets.len()`
    buckets: Vec<Option<u32>>,

    /// Chain nodes; `None` marks a free node
    arena: Vec<Option<Slot>>,

    /// Indices of free arena nodes. Capacity always covers `arena.len()`,
    /// so pushing never reallocates.
    free: Vec<u32>,

    /// Live handle count per object
    refs: BTreeMap<KernelObject, u32>,

    /// Live handles
    count: usize,

    /// Next handle value to hand out; values are never reused
    next_handle: HandleValue,

    config: HandleTableConfig,
}

impl TableInner {
    fn new(config: HandleTableConfig) -> Result<Self> {
        let bucket_count = config.effective_buckets() as usize;
        let mut buckets = Vec::new();
        buckets
            .try_reserve_exact(bucket_count)
            .map_err(|_| Status::NoMemory)?;
        buckets.resize(bucket_count, None);

        Ok(Self {
            buckets,
            arena: Vec::new(),
            free: Vec::new(),
            refs: BTreeMap::new(),
            count: 0,
            next_handle: HANDLE_INVALID + 1,
            config,
        })
    }

    fn bucket_of(&self, handle: HandleValue) -> usize {
        handle as usize % self.buckets.len()
    }

    fn find(&self, handle: HandleValue) -> Option<u32> {
        if handle == HANDLE_INVALID {
            return None;
        }

        let mut cursor = self.buckets[self.bucket_of(handle)];
        while let Some(idx) = cursor {
            let slot = self.arena[idx as usize].as_ref()?;
            if slot.handle == handle {
                return Some(idx);
            }
            cursor = slot.next;
        }
        None
    }

    fn lookup(&self, handle: HandleValue) -> Result<&Slot> {
        self.find(handle)
            .and_then(|idx| self.arena[idx as usize].as_ref())
            .ok_or(Status::NotFound)
    }

    fn ref_count(&self, object: &KernelObject) -> u32 {
        self.refs.get(object).copied().unwrap_or(0)
    }

    /// Next handle value, without consuming it
    fn claim_handle_value(&self) -> Result<HandleValue> {
        if self.next_handle == HandleValue::MAX {
            log_warn!("handle table: handle values exhausted");
            return Err(Status::NoMemory);
        }
        Ok(self.next_handle)
    }

    /// Make sure `link` can place one more node without allocating
    fn reserve_node(&mut self) -> Result {
        self.reserve_nodes(1)
    }

    /// Make sure `link` can place `n` more nodes without allocating
    fn reserve_nodes(&mut self, n: usize) -> Result {
        let missing = n.saturating_sub(self.free.len());
        if missing == 0 {
            return Ok(());
        }

        self.arena.try_reserve(missing).map_err(|_| Status::NoMemory)?;
        let wanted = self.arena.len() + missing;
        self.free
            .try_reserve(wanted.saturating_sub(self.free.len()))
            .map_err(|_| Status::NoMemory)?;
        Ok(())
    }

    /// Double the bucket array when chains get long
    ///
    /// Best effort: if the new array cannot be allocated the table keeps
    /// working with longer chains.
    fn maybe_grow(&mut self) {
        if !self.config.growable || self.count < self.buckets.len() * MAX_LOAD_FACTOR {
            return;
        }

        let Some(new_len) = self.buckets.len().checked_mul(2) else {
            return;
        };

        let mut buckets: Vec<Option<u32>> = Vec::new();
        if buckets.try_reserve_exact(new_len).is_err() {
            log_warn!("handle table: bucket growth to {} failed", new_len);
            return;
        }
        buckets.resize(new_len, None);

        for (idx, node) in self.arena.iter_mut().enumerate() {
            if let Some(slot) = node {
                let bucket = slot.handle as usize % new_len;
                slot.next = buckets[bucket];
                buckets[bucket] = Some(idx as u32);
            }
        }

        log_debug!(
            "handle table: grew buckets {} -> {} ({} handles)",
            self.buckets.len(),
            new_len,
            self.count
        );
        self.buckets = buckets;
    }

    /// Insert a node; capacity must already be reserved
    fn link(&mut self, handle: HandleValue, object: KernelObject, rights: Rights) {
        let bucket = self.bucket_of(handle);
        let slot = Slot {
            handle,
            object,
            rights,
            next: self.buckets[bucket],
        };

        let idx = match self.free.pop() {
            Some(idx) => {
                self.arena[idx as usize] = Some(slot);
                idx
            }
            None => {
                self.arena.push(Some(slot));
                (self.arena.len() - 1) as u32
            }
        };

        self.buckets[bucket] = Some(idx);
        self.count += 1;
    }

    /// Remove a node from its chain and return it
    fn unlink(&mut self, handle: HandleValue) -> Option<Slot> {
        if handle == HANDLE_INVALID {
            return None;
        }

        let bucket = self.bucket_of(handle);
        let mut prev: Option<u32> = None;
        let mut cursor = self.buckets[bucket];

        while let Some(idx) = cursor {
            let (current, next) = {
                let slot = self.arena[idx as usize].as_ref()?;
                (slot.handle, slot.next)
            };

            if current == handle {
                match prev {
                    None => self.buckets[bucket] = next,
                    Some(p) => {
                        if let Some(prev_slot) = self.arena[p as usize].as_mut() {
                            prev_slot.next = next;
                        }
                    }
                }
                let slot = self.arena[idx as usize].take();
                self.free.push(idx);
                self.count -= 1;
                return slot;
            }

            prev = Some(idx);
            cursor = next;
        }
        None
    }

    /// Allocate a fresh handle for `object`
    fn insert(&mut self, object: KernelObject, rights: Rights) -> Result<HandleValue> {
        if self.count >= self.config.max_handles {
            log_warn!(
                "handle table: limit of {} handles reached",
                self.config.max_handles
            );
            return Err(Status::NoMemory);
        }

        let handle = self.claim_handle_value()?;
        self.reserve_node()?;
        self.maybe_grow();

        self.link(handle, object, rights.difference(Rights::SAME_RIGHTS));
        self.next_handle = handle + 1;
        *self.refs.entry(object).or_insert(0) += 1;

        Ok(handle)
    }

    /// Drop one reference to `object`; true if it was the last
    fn release(&mut self, object: KernelObject) -> bool {
        match self.refs.get_mut(&object) {
            Some(count) if *count > 1 => {
                *count -= 1;
                false
            }
            Some(_) => {
                self.refs.remove(&object);
                true
            }
            None => false,
        }
    }

    fn clear(&mut self) -> usize {
        let released = self.count;
        self.buckets.iter_mut().for_each(|head| *head = None);
        self.arena.clear();
        self.free.clear();
        self.refs.clear();
        self.count = 0;
        released
    }
}

/// ============================================================================
/// Handle Table
/// ============================================================================

/// Capability store
///
/// Owned by whatever component manages capabilities (typically one per
/// process) and shared by reference. All methods take `&self`.
pub struct HandleTable {
    inner: Mutex<TableInner>,
}

/// Create a handle table with `initial_buckets` hash buckets
///
/// Zero selects the default bucket count.
pub fn handle_table_init(initial_buckets: u32) -> Result<HandleTable> {
    HandleTable::with_config(HandleTableConfig::with_buckets(initial_buckets))
}

impl HandleTable {
    /// Create a handle table with the default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(HandleTableConfig::default())
    }

    /// Create a handle table
    pub fn with_config(config: HandleTableConfig) -> Result<Self> {
        Ok(Self {
            inner: Mutex::new(TableInner::new(config)?),
        })
    }

    /// Register `object` and return a new handle to it
    ///
    /// # Errors
    ///
    /// - `InvalidArgs` if `object` is the null reference
    /// - `NoMemory` if the table is full or storage cannot be reserved
    pub fn alloc(&self, object: KernelObject, rights: Rights) -> Result<HandleValue> {
        if !object.is_valid() {
            return Err(Status::InvalidArgs);
        }

        let handle = self.inner.lock().insert(object, rights)?;
        log_trace!("handle alloc: {} -> {} rights={:#x}", handle, object, rights.bits());
        Ok(handle)
    }

    /// Resolve a handle, checking that it carries `required_rights`
    ///
    /// # Errors
    ///
    /// - `NotFound` if the handle is unknown
    /// - `AccessDenied` if the handle lacks any of `required_rights`
    pub fn get(&self, handle: HandleValue, required_rights: Rights) -> Result<KernelObject> {
        let inner = self.inner.lock();
        let slot = inner.lookup(handle)?;
        slot.rights.require(required_rights)?;
        Ok(slot.object)
    }

    /// Snapshot of a handle's entry
    pub fn entry(&self, handle: HandleValue) -> Result<HandleEntry> {
        let inner = self.inner.lock();
        let slot = inner.lookup(handle)?;
        Ok(HandleEntry {
            object: slot.object,
            rights: slot.rights,
            ref_count: inner.ref_count(&slot.object),
        })
    }

    /// Rights of a handle
    pub fn rights(&self, handle: HandleValue) -> Result<Rights> {
        Ok(self.inner.lock().lookup(handle)?.rights)
    }

    /// Check if a handle is live
    pub fn contains(&self, handle: HandleValue) -> bool {
        self.inner.lock().find(handle).is_some()
    }

    /// Duplicate a handle with reduced rights
    ///
    /// The new handle's rights are `requested_rights & source_rights`
    /// (`SAME_RIGHTS` keeps the source rights).
    ///
    /// # Errors
    ///
    /// - `NotFound` if the handle is unknown
    /// - `AccessDenied` if the source lacks `DUPLICATE`
    /// - `NoMemory` as for [`alloc`](Self::alloc)
    pub fn duplicate(&self, handle: HandleValue, requested_rights: Rights) -> Result<HandleValue> {
        let mut inner = self.inner.lock();

        let (object, source_rights) = {
            let slot = inner.lookup(handle)?;
            (slot.object, slot.rights)
        };
        source_rights.require(Rights::DUPLICATE)?;

        let rights = source_rights.reduce(requested_rights);
        let new_handle = inner.insert(object, rights)?;

        log_trace!(
            "handle duplicate: {} -> {} rights={:#x}",
            handle,
            new_handle,
            rights.bits()
        );
        Ok(new_handle)
    }

    /// Replace a handle with a new one carrying reduced rights
    ///
    /// The old handle is invalidated in the same step. Unlike
    /// [`duplicate`](Self::duplicate) no `DUPLICATE` right is needed.
    pub fn replace(&self, handle: HandleValue, requested_rights: Rights) -> Result<HandleValue> {
        let mut inner = self.inner.lock();

        let (object, source_rights) = {
            let slot = inner.lookup(handle)?;
            (slot.object, slot.rights)
        };
        let new_handle = inner.claim_handle_value()?;
        let rights = source_rights.reduce(requested_rights);

        // The unlinked node goes on the free list, so relinking cannot allocate.
        inner.unlink(handle);
        inner.link(new_handle, object, rights);
        inner.next_handle = new_handle + 1;

        log_trace!("handle replace: {} -> {} rights={:#x}", handle, new_handle, rights.bits());
        Ok(new_handle)
    }

    /// Close a handle
    ///
    /// # Returns
    ///
    /// `true` if this dropped the last handle to the object in this table
    ///
    /// # Errors
    ///
    /// - `NotFound` if the handle is unknown (including already closed)
    pub fn close(&self, handle: HandleValue) -> Result<bool> {
        let mut inner = self.inner.lock();
        let slot = inner.unlink(handle).ok_or(Status::NotFound)?;
        let last = inner.release(slot.object);

        log_trace!("handle close: {} ({}) last={}", handle, slot.object, last);
        Ok(last)
    }

    /// Close several handles
    ///
    /// `HANDLE_INVALID` entries are skipped. Every known handle is closed
    /// even if some are unknown; in that case `NotFound` is returned after
    /// the rest were closed.
    ///
    /// # Returns
    ///
    /// Number of handles closed
    pub fn close_many(&self, handles: &[HandleValue]) -> Result<usize> {
        let mut inner = self.inner.lock();
        let mut closed = 0;
        let mut missing = false;

        for &handle in handles {
            if handle == HANDLE_INVALID {
                continue;
            }
            match inner.unlink(handle) {
                Some(slot) => {
                    inner.release(slot.object);
                    closed += 1;
                }
                None => missing = true,
            }
        }

        if missing {
            Err(Status::NotFound)
        } else {
            Ok(closed)
        }
    }

    /// Remove handles that are about to travel in a message
    ///
    /// Every handle is checked before any is removed: all of them leave the
    /// table, or none do. The returned entries keep each handle's rights so
    /// the receiver gets exactly what the sender held.
    ///
    /// # Errors
    ///
    /// - `InvalidArgs` if a handle value appears twice
    /// - `NotFound` if a handle is unknown
    /// - `AccessDenied` if a handle lacks `TRANSFER`
    /// - `NoMemory` if the result cannot be allocated
    pub fn take_for_transfer(&self, handles: &[HandleValue]) -> Result<Vec<HandleInfo>> {
        let mut infos = Vec::new();
        infos
            .try_reserve_exact(handles.len())
            .map_err(|_| Status::NoMemory)?;

        let mut inner = self.inner.lock();
        for (i, &handle) in handles.iter().enumerate() {
            if handles[..i].contains(&handle) {
                return Err(Status::InvalidArgs);
            }
            let slot = inner.lookup(handle)?;
            slot.rights.require(Rights::TRANSFER)?;
            infos.push(HandleInfo::new(slot.object, slot.rights));
        }

        for &handle in handles {
            if let Some(slot) = inner.unlink(handle) {
                inner.release(slot.object);
            }
        }

        log_trace!("handle transfer: took {} handles", handles.len());
        Ok(infos)
    }

    /// Put back handles removed by [`take_for_transfer`](Self::take_for_transfer)
    ///
    /// Each handle returns under its original value with its original
    /// rights. Used when the message carrying them could not be sent.
    ///
    /// # Errors
    ///
    /// - `InvalidArgs` if `handles` and `infos` differ in length
    /// - `NoMemory` if storage cannot be reserved; nothing is restored
    pub fn restore(&self, handles: &[HandleValue], infos: &[HandleInfo]) -> Result {
        if handles.len() != infos.len() {
            return Err(Status::InvalidArgs);
        }

        let mut inner = self.inner.lock();
        inner.reserve_nodes(handles.len())?;

        for (&handle, info) in handles.iter().zip(infos) {
            inner.link(handle, info.object, info.rights);
            *inner.refs.entry(info.object).or_insert(0) += 1;
        }

        log_trace!("handle transfer: restored {} handles", handles.len());
        Ok(())
    }

    /// Live handles referencing `object`
    pub fn object_ref_count(&self, object: &KernelObject) -> u32 {
        self.inner.lock().ref_count(object)
    }

    /// Release every entry
    ///
    /// # Returns
    ///
    /// Number of handles released
    pub fn clear(&self) -> usize {
        let released = self.inner.lock().clear();
        log_debug!("handle table: cleared {} handles", released);
        released
    }

    /// Get handle count
    pub fn count(&self) -> usize {
        self.inner.lock().count
    }

    /// Check if the table holds no handles
    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Current number of hash buckets
    pub fn bucket_count(&self) -> usize {
        self.inner.lock().buckets.len()
    }
}

/// ============================================================================
/// Handle Owner
/// ============================================================================

/// Owned handle that auto-closes on drop
///
/// Used to roll back partially completed multi-handle operations.
pub struct HandleOwner<'a> {
    table: &'a HandleTable,
    handle: HandleValue,
}

impl<'a> HandleOwner<'a> {
    /// Take ownership of `handle` in `table`
    pub fn new(table: &'a HandleTable, handle: HandleValue) -> Self {
        Self { table, handle }
    }

    /// Get the underlying handle value
    pub fn id(&self) -> HandleValue {
        self.handle
    }

    /// Take the handle out (consuming the owner)
    pub fn take(self) -> HandleValue {
        let handle = self.handle;
        core::mem::forget(self);
        handle
    }
}

impl Drop for HandleOwner<'_> {
    fn drop(&mut self) {
        let _ = self.table.close(self.handle);
    }
}

/// ============================================================================
/// Tests
/// ============================================================================
