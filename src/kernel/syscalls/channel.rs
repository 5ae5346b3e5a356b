// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Channel Calls
//!
//! Channel operations addressed by handle value.
//!
//! # Calls Implemented
//!
//! - `sys_channel_create` - Create a channel pair
//! - `sys_channel_write` - Write to a channel, transferring handles
//! - `sys_channel_read` - Read from a channel, receiving handles
//! - `sys_channel_close` - Close an endpoint and its handle
//!
//! # Design
//!
//! - Each endpoint is a kernel object of type `Channel`; its object id is
//!   the endpoint's creation handle value
//! - Transferred handles leave the sender's table in one step before the
//!   write and are put back if the write fails
//! - Received objects are registered with the rights the sender held

use crate::kernel::config::MAX_MSG_HANDLES;
use crate::kernel::object::{
    Channel, Endpoint, HandleInfo, HandleOwner, MessagePacket, MessageSize, Rights,
};
use crate::kernel::sync::SignalObserver;
use crate::kernel::syscalls::{bad_handle, IpcSpace};
use crate::rustux::{
    HandleValue, KernelObject, KernelObjectId, ObjectType, Result, Status, HANDLE_INVALID,
};
use alloc::collections::BTreeMap;
use alloc::sync::Arc;
use spin::Mutex;

use crate::{log_debug, log_error};

/// ============================================================================
/// Channel Registry
/// ============================================================================

/// Resolves channel endpoint objects to channels
///
/// Endpoint object ids are assigned sequentially in pairs, starting at 1.
pub struct ChannelRegistry {
    inner: Mutex<RegistryInner>,
    observer: Option<Arc<dyn SignalObserver>>,
}

struct RegistryInner {
    endpoints: BTreeMap<KernelObjectId, (Arc<Channel>, Endpoint)>,
    next_base: HandleValue,
}

impl ChannelRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(RegistryInner {
                endpoints: BTreeMap::new(),
                next_base: 1,
            }),
            observer: None,
        }
    }

    /// Create a registry whose channels report signal changes to `observer`
    pub fn with_observer(observer: Arc<dyn SignalObserver>) -> Self {
        Self {
            observer: Some(observer),
            ..Self::new()
        }
    }

    /// Create a channel and register both endpoints
    ///
    /// # Returns
    ///
    /// `(channel, endpoint0, endpoint1)` object references
    pub fn create(&self) -> Result<(Arc<Channel>, KernelObject, KernelObject)> {
        let mut inner = self.inner.lock();

        let base = inner.next_base;
        let next = base.checked_add(2).ok_or(Status::NoMemory)?;
        let (channel, h0, h1) = match &self.observer {
            Some(observer) => Channel::create_with_observer(base, observer.clone())?,
            None => Channel::create(base)?,
        };

        let channel = Arc::new(channel);
        let e0 = endpoint_object(h0);
        let e1 = endpoint_object(h1);
        inner.endpoints.insert(e0.id(), (channel.clone(), Endpoint::Zero));
        inner.endpoints.insert(e1.id(), (channel.clone(), Endpoint::One));
        inner.next_base = next;

        Ok((channel, e0, e1))
    }

    /// Resolve an endpoint object
    ///
    /// # Errors
    ///
    /// - `WrongType` if `object` is not a channel endpoint
    /// - `BadHandle` if the endpoint is not registered
    pub fn lookup(&self, object: KernelObject) -> Result<(Arc<Channel>, Endpoint)> {
        if object.kind() != ObjectType::Channel {
            return Err(Status::WrongType);
        }
        self.inner
            .lock()
            .endpoints
            .get(&object.id())
            .map(|(channel, ep)| (channel.clone(), *ep))
            .ok_or(Status::BadHandle)
    }

    /// Unregister an endpoint
    ///
    /// The channel is destroyed once both endpoints are unregistered and no
    /// other reference remains.
    pub fn release(&self, object: KernelObject) -> Option<(Arc<Channel>, Endpoint)> {
        self.inner.lock().endpoints.remove(&object.id())
    }

    /// Number of registered endpoints
    pub fn count(&self) -> usize {
        self.inner.lock().endpoints.len()
    }
}

impl Default for ChannelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn endpoint_object(handle: HandleValue) -> KernelObject {
    KernelObject::new(ObjectType::Channel, KernelObjectId::from_raw(handle as u64))
}

/// ============================================================================
/// Handle to Channel Resolution
/// ============================================================================

struct ChannelRef {
    channel: Arc<Channel>,
    endpoint: Endpoint,
    object: KernelObject,
}

/// Look up a channel from a handle value
///
/// 1. Looks up the handle in the table
/// 2. Validates the object type and rights
/// 3. Resolves the endpoint through the registry
fn lookup_channel(space: &IpcSpace, handle: HandleValue, required: Rights) -> Result<ChannelRef> {
    let entry = space.table().entry(handle).map_err(bad_handle)?;

    if entry.object.kind() != ObjectType::Channel {
        return Err(Status::WrongType);
    }
    entry.rights.require(required)?;

    let (channel, endpoint) = space.channels().lookup(entry.object)?;
    Ok(ChannelRef {
        channel,
        endpoint,
        object: entry.object,
    })
}

/// ============================================================================
/// Channel Create
/// ============================================================================

/// Create a channel pair
///
/// Both handles carry `Rights::CHANNEL_DEFAULT`. Nothing is left behind
/// on failure.
///
/// # Returns
///
/// Handle values of endpoint 0 and endpoint 1
pub fn sys_channel_create(space: &IpcSpace) -> Result<(HandleValue, HandleValue)> {
    let (_channel, e0, e1) = space.channels().create()?;

    let table = space.table();
    let install = || -> Result<(HandleValue, HandleValue)> {
        let h0 = HandleOwner::new(table, table.alloc(e0, Rights::CHANNEL_DEFAULT)?);
        let h1 = HandleOwner::new(table, table.alloc(e1, Rights::CHANNEL_DEFAULT)?);
        Ok((h0.take(), h1.take()))
    };

    match install() {
        Ok((h0, h1)) => {
            log_debug!("sys_channel_create: {} -> {}, {} -> {}", e0, h0, e1, h1);
            Ok((h0, h1))
        }
        Err(err) => {
            log_error!("sys_channel_create: failed to install handles: {}", err);
            space.channels().release(e0);
            space.channels().release(e1);
            Err(err)
        }
    }
}

/// ============================================================================
/// Channel Write
/// ============================================================================

/// Write to a channel
///
/// Requires `WRITE` on `handle`. Every handle in `handles` must carry
/// `TRANSFER`, appear once, and must not name either endpoint of the target
/// channel. The handles leave this space together before the message is
/// queued; if queuing fails they are restored under their original values.
///
/// # Errors
///
/// - `BadHandle` / `WrongType` / `AccessDenied` from resolving `handle`
/// - `OutOfRange` if the message exceeds the limits
/// - `InvalidArgs` if `handles` repeats a value or names the target channel
/// - `BadHandle` / `AccessDenied` for a transferred handle
/// - any status from [`Channel::write`]
pub fn sys_channel_write(
    space: &IpcSpace,
    handle: HandleValue,
    data: &[u8],
    handles: &[HandleValue],
) -> Result {
    let target = lookup_channel(space, handle, Rights::WRITE)?;
    MessagePacket::check_limits(data.len(), handles.len())?;

    if handles.contains(&handle) {
        return Err(Status::InvalidArgs);
    }

    let table = space.table();
    let infos = table.take_for_transfer(handles).map_err(bad_handle)?;

    let result = if infos.iter().any(|info| names_channel(space, info, &target.channel)) {
        Err(Status::InvalidArgs)
    } else {
        target.channel.write(target.endpoint, data, &infos)
    };

    if let Err(err) = result {
        if let Err(restore_err) = table.restore(handles, &infos) {
            log_error!(
                "sys_channel_write: lost {} transferred handles: {}",
                infos.len(),
                restore_err
            );
        }
        return Err(err);
    }
    Ok(())
}

/// Check if `info` refers to an endpoint of `channel`
fn names_channel(space: &IpcSpace, info: &HandleInfo, channel: &Arc<Channel>) -> bool {
    if info.object.kind() != ObjectType::Channel {
        return false;
    }
    match space.channels().lookup(info.object) {
        Ok((other, _)) => Arc::ptr_eq(&other, channel),
        Err(_) => false,
    }
}

/// ============================================================================
/// Channel Read
/// ============================================================================

/// Read from a channel
///
/// Requires `READ` on `handle`. Received objects are registered in this
/// space with the rights their sender held, and the new handle values are
/// written to `handle_buf`.
///
/// # Returns
///
/// Size of the message read
///
/// # Errors
///
/// - `BufferTooSmall` if the message does not fit (dropped if
///   `may_discard`); use `Channel::peek_size` for the required sizes
/// - `NoMemory` if received handles cannot be registered; the message is
///   consumed and any handles already registered are closed
/// - any status from [`Channel::read_into`]
pub fn sys_channel_read(
    space: &IpcSpace,
    handle: HandleValue,
    data_buf: &mut [u8],
    handle_buf: &mut [HandleValue],
    may_discard: bool,
) -> Result<MessageSize> {
    let source = lookup_channel(space, handle, Rights::READ)?;

    let mut infos = [HandleInfo::NULL; MAX_MSG_HANDLES];
    let room = handle_buf.len().min(MAX_MSG_HANDLES);
    let size = source
        .channel
        .read_into(source.endpoint, data_buf, &mut infos[..room], may_discard)?;

    let table = space.table();
    for i in 0..size.handles {
        let info = infos[i];
        match table.alloc(info.object, info.rights) {
            Ok(h) => handle_buf[i] = h,
            Err(err) => {
                log_error!("sys_channel_read: cannot register {}: {}", info.object, err);
                let _ = table.close_many(&handle_buf[..i]);
                handle_buf[..i].fill(HANDLE_INVALID);
                return Err(err);
            }
        }
    }
    Ok(size)
}

/// ============================================================================
/// Channel Close
/// ============================================================================

/// Close a channel endpoint and the handle naming it
///
/// The endpoint is unregistered; other handles to it in any space stop
/// resolving.
pub fn sys_channel_close(space: &IpcSpace, handle: HandleValue) -> Result {
    let target = lookup_channel(space, handle, Rights::NONE)?;
    space.table().close(handle).map_err(bad_handle)?;

    match target.channel.close_endpoint(target.endpoint) {
        Ok(()) | Err(Status::BadState) => {}
        Err(err) => return Err(err),
    }
    space.channels().release(target.object);

    log_debug!("sys_channel_close: {} ({})", handle, target.object);
    Ok(())
}

/// ============================================================================
/// Tests
/// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::config::HandleTableConfig;
    use crate::kernel::object::Signals;
    use crate::kernel::syscalls::sys_handle_duplicate;

    fn vmo(id: u64) -> KernelObject {
        KernelObject::new(ObjectType::Vmo, KernelObjectId::from_raw(id))
    }

    #[test]
    fn test_create() {
        let space = IpcSpace::new().unwrap();
        let (h0, h1) = sys_channel_create(&space).unwrap();

        assert_ne!(h0, h1);
        assert_eq!(space.table().rights(h0).unwrap(), Rights::CHANNEL_DEFAULT);
        assert_eq!(space.channels().count(), 2);

        let e0 = space.table().get(h0, Rights::NONE).unwrap();
        let (channel, ep) = space.channels().lookup(e0).unwrap();
        assert_eq!(ep, Endpoint::Zero);
        assert!(channel.get_signals(Endpoint::Zero).contains(Signals::WRITABLE));
    }

    #[test]
    fn test_create_rolls_back() {
        let space = IpcSpace::with_registry(
            Arc::new(ChannelRegistry::new()),
            HandleTableConfig::default().max_handles(1),
        )
        .unwrap();

        assert_eq!(sys_channel_create(&space), Err(Status::NoMemory));
        assert!(space.table().is_empty());
        assert_eq!(space.channels().count(), 0);
    }

    #[test]
    fn test_write_read() {
        let space = IpcSpace::new().unwrap();
        let (h0, h1) = sys_channel_create(&space).unwrap();

        sys_channel_write(&space, h0, b"ping", &[]).unwrap();

        let mut data = [0u8; 16];
        let mut handles = [HANDLE_INVALID; 4];
        let size = sys_channel_read(&space, h1, &mut data, &mut handles, false).unwrap();
        assert_eq!(size, MessageSize { bytes: 4, handles: 0 });
        assert_eq!(&data[..4], b"ping");

        assert_eq!(
            sys_channel_read(&space, h1, &mut data, &mut handles, false),
            Err(Status::ShouldWait)
        );
    }

    #[test]
    fn test_transfer_handles() {
        let space = IpcSpace::new().unwrap();
        let (h0, h1) = sys_channel_create(&space).unwrap();
        let sent_rights = Rights::READ | Rights::TRANSFER;
        let v = space.table().alloc(vmo(7), sent_rights).unwrap();

        sys_channel_write(&space, h0, &[1], &[v]).unwrap();
        assert!(!space.table().contains(v));

        let mut data = [0u8; 4];
        let mut handles = [HANDLE_INVALID; 4];
        let size = sys_channel_read(&space, h1, &mut data, &mut handles, false).unwrap();
        assert_eq!(size.handles, 1);

        let received = handles[0];
        let rights = space.table().rights(received).unwrap();
        assert_eq!(space.table().get(received, Rights::NONE).unwrap(), vmo(7));
        assert_eq!(rights, sent_rights);
        assert!(sent_rights.contains(rights));
        assert!(!rights.contains(Rights::WRITE));
        assert!(!rights.contains(Rights::DUPLICATE));
    }

    #[test]
    fn test_failed_write_restores_handles() {
        let space = IpcSpace::new().unwrap();
        let (h0, h1) = sys_channel_create(&space).unwrap();
        let v = space.table().alloc(vmo(3), Rights::READ | Rights::TRANSFER).unwrap();

        sys_channel_close(&space, h1).unwrap();
        assert_eq!(sys_channel_write(&space, h0, &[1], &[v]), Err(Status::PeerClosed));

        assert_eq!(space.table().rights(v).unwrap(), Rights::READ | Rights::TRANSFER);
        assert_eq!(space.table().object_ref_count(&vmo(3)), 1);
    }

    #[test]
    fn test_write_rejects_own_channel_under_another_handle() {
        let space = IpcSpace::new().unwrap();
        let (h0, h1) = sys_channel_create(&space).unwrap();
        let other = sys_channel_create(&space).unwrap();

        // A second handle to either endpoint of the target channel.
        let e0 = space.table().get(h0, Rights::NONE).unwrap();
        let e1 = space.table().get(h1, Rights::NONE).unwrap();
        let alias0 = space.table().alloc(e0, Rights::CHANNEL_DEFAULT).unwrap();
        let alias1 = space.table().alloc(e1, Rights::CHANNEL_DEFAULT).unwrap();

        assert_eq!(sys_channel_write(&space, h0, &[], &[alias0]), Err(Status::InvalidArgs));
        assert_eq!(sys_channel_write(&space, h0, &[], &[alias1]), Err(Status::InvalidArgs));
        assert!(space.table().contains(alias0));
        assert!(space.table().contains(alias1));

        let channel = space.channels().lookup(e0).unwrap().0;
        assert!(!channel.has_pending(Endpoint::One));

        // Endpoints of a different channel still travel.
        sys_channel_write(&space, h0, &[], &[other.1]).unwrap();
        assert!(!space.table().contains(other.1));
    }

    #[test]
    fn test_write_rejects_bad_transfers() {
        let space = IpcSpace::new().unwrap();
        let (h0, _h1) = sys_channel_create(&space).unwrap();
        let no_transfer = space.table().alloc(vmo(1), Rights::READ).unwrap();
        let v = space.table().alloc(vmo(2), Rights::TRANSFER).unwrap();

        assert_eq!(sys_channel_write(&space, h0, &[], &[h0]), Err(Status::InvalidArgs));
        assert_eq!(sys_channel_write(&space, h0, &[], &[v, v]), Err(Status::InvalidArgs));
        assert_eq!(
            sys_channel_write(&space, h0, &[], &[v, no_transfer]),
            Err(Status::AccessDenied)
        );
        assert_eq!(sys_channel_write(&space, h0, &[], &[999]), Err(Status::BadHandle));

        // Nothing was sent or removed.
        assert!(space.table().contains(v));
        assert!(space.table().contains(no_transfer));
    }

    #[test]
    fn test_rights_and_types() {
        let space = IpcSpace::new().unwrap();
        let (h0, _h1) = sys_channel_create(&space).unwrap();
        let v = space.table().alloc(vmo(1), Rights::DEFAULT).unwrap();

        assert_eq!(sys_channel_write(&space, v, &[1], &[]), Err(Status::WrongType));
        assert_eq!(sys_channel_write(&space, 12345, &[1], &[]), Err(Status::BadHandle));

        // A read-only view of the endpoint cannot write.
        let endpoint = space.table().get(h0, Rights::NONE).unwrap();
        let read_only = space.table().alloc(endpoint, Rights::READ).unwrap();
        assert_eq!(sys_channel_write(&space, read_only, &[1], &[]), Err(Status::AccessDenied));

        // Channel handles are created without DUPLICATE.
        assert_eq!(
            sys_handle_duplicate(&space, h0, Rights::SAME_RIGHTS.bits()),
            Err(Status::AccessDenied)
        );
    }

    #[test]
    fn test_unregistered_endpoint() {
        let space = IpcSpace::new().unwrap();
        let stray = KernelObject::new(ObjectType::Channel, KernelObjectId::from_raw(4242));
        let h = space.table().alloc(stray, Rights::CHANNEL_DEFAULT).unwrap();
        assert_eq!(sys_channel_write(&space, h, &[1], &[]), Err(Status::BadHandle));
    }

    #[test]
    fn test_close() {
        let space = IpcSpace::new().unwrap();
        let (h0, h1) = sys_channel_create(&space).unwrap();
        sys_channel_write(&space, h0, &[1], &[]).unwrap();

        sys_channel_close(&space, h0).unwrap();
        assert!(!space.table().contains(h0));
        assert_eq!(space.channels().count(), 1);
        assert_eq!(sys_channel_close(&space, h0), Err(Status::BadHandle));

        let mut data = [0u8; 4];
        let mut handles = [HANDLE_INVALID; 1];
        sys_channel_read(&space, h1, &mut data, &mut handles, false).unwrap();
        assert_eq!(
            sys_channel_read(&space, h1, &mut data, &mut handles, false),
            Err(Status::PeerClosed)
        );
        assert_eq!(sys_channel_write(&space, h1, &[1], &[]), Err(Status::PeerClosed));

        sys_channel_close(&space, h1).unwrap();
        assert_eq!(space.channels().count(), 0);
    }

    #[test]
    fn test_shared_registry_between_spaces() {
        let registry = Arc::new(ChannelRegistry::new());
        let a = IpcSpace::with_registry(registry.clone(), HandleTableConfig::default()).unwrap();
        let b = IpcSpace::with_registry(registry, HandleTableConfig::default()).unwrap();

        let (a0, a1) = sys_channel_create(&a).unwrap();
        let (c0, c1) = sys_channel_create(&a).unwrap();

        // Hand endpoint c1 to space b over channel a.
        sys_channel_write(&a, a0, b"endpoint", &[c1]).unwrap();
        let mut data = [0u8; 16];
        let mut handles = [HANDLE_INVALID; 1];
        sys_channel_read(&a, a1, &mut data, &mut handles, false).unwrap();
        let moved = handles[0];

        // Re-registering in b: take the object from a and drop it there.
        let object = a.table().get(moved, Rights::NONE).unwrap();
        let b1 = b.table().alloc(object, Rights::CHANNEL_DEFAULT).unwrap();
        a.table().close(moved).unwrap();

        sys_channel_write(&a, c0, b"hello", &[]).unwrap();
        let size = sys_channel_read(&b, b1, &mut data, &mut handles, false).unwrap();
        assert_eq!(&data[..size.bytes], b"hello");
    }
}
