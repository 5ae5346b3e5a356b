// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Handle Operations
//!
//! # Calls Implemented
//!
//! - `sys_handle_close` - Close a single handle
//! - `sys_handle_close_many` - Close multiple handles
//! - `sys_handle_duplicate` - Duplicate a handle
//! - `sys_handle_replace` - Replace a handle
//!
//! Rights arrive as raw masks; `Rights::SAME_RIGHTS` (bit 31) keeps the
//! source rights.

use crate::kernel::object::Rights;
use crate::kernel::syscalls::{bad_handle, IpcSpace};
use crate::rustux::{HandleValue, Result, Status, HANDLE_INVALID};

use crate::{log_debug, log_trace};

/// Most handles accepted by one `sys_handle_close_many`
pub const MAX_CLOSE_MANY: usize = 1024;

/// Close a single handle
///
/// Closing `HANDLE_INVALID` is not an error. It's like free(NULL).
pub fn sys_handle_close(space: &IpcSpace, handle: HandleValue) -> Result {
    log_trace!("sys_handle_close: handle={:#x}", handle);

    if handle == HANDLE_INVALID {
        return Ok(());
    }
    space.table().close(handle).map_err(bad_handle)?;
    Ok(())
}

/// Close multiple handles
///
/// Keeps closing after an unknown handle and reports `BadHandle` at the
/// end.
///
/// # Returns
///
/// Number of handles closed
pub fn sys_handle_close_many(space: &IpcSpace, handles: &[HandleValue]) -> Result<usize> {
    if handles.len() > MAX_CLOSE_MANY {
        return Err(Status::InvalidArgs);
    }

    let closed = space.table().close_many(handles).map_err(bad_handle)?;
    log_debug!("sys_handle_close_many: closed {} handles", closed);
    Ok(closed)
}

/// Duplicate a handle
///
/// The new handle refers to the same object with `rights & source` (or
/// the source rights for `SAME_RIGHTS`). The source must carry `DUPLICATE`.
pub fn sys_handle_duplicate(space: &IpcSpace, handle: HandleValue, rights: u32) -> Result<HandleValue> {
    let new_handle = space
        .table()
        .duplicate(handle, Rights::from_raw(rights))
        .map_err(bad_handle)?;
    log_debug!("sys_handle_duplicate: {:#x} -> {:#x}", handle, new_handle);
    Ok(new_handle)
}

/// Replace a handle
///
/// Like [`sys_handle_duplicate`], but the source handle is invalidated and
/// no `DUPLICATE` right is needed.
pub fn sys_handle_replace(space: &IpcSpace, handle: HandleValue, rights: u32) -> Result<HandleValue> {
    let new_handle = space
        .table()
        .replace(handle, Rights::from_raw(rights))
        .map_err(bad_handle)?;
    log_debug!("sys_handle_replace: {:#x} -> {:#x}", handle, new_handle);
    Ok(new_handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rustux::{KernelObject, KernelObjectId, ObjectType};

    fn event(id: u64) -> KernelObject {
        KernelObject::new(ObjectType::Event, KernelObjectId::from_raw(id))
    }

    #[test]
    fn test_close() {
        let space = IpcSpace::new().unwrap();
        let h = space.table().alloc(event(1), Rights::BASIC).unwrap();

        assert_eq!(sys_handle_close(&space, HANDLE_INVALID), Ok(()));
        assert_eq!(sys_handle_close(&space, h), Ok(()));
        assert_eq!(sys_handle_close(&space, h), Err(Status::BadHandle));
    }

    #[test]
    fn test_close_many() {
        let space = IpcSpace::new().unwrap();
        let a = space.table().alloc(event(1), Rights::BASIC).unwrap();
        let b = space.table().alloc(event(2), Rights::BASIC).unwrap();

        assert_eq!(sys_handle_close_many(&space, &[a, HANDLE_INVALID, b]), Ok(2));
        assert_eq!(sys_handle_close_many(&space, &[a]), Err(Status::BadHandle));
    }

    #[test]
    fn test_duplicate_and_replace() {
        let space = IpcSpace::new().unwrap();
        let h = space.table().alloc(event(1), Rights::BASIC | Rights::SIGNAL).unwrap();

        let same = sys_handle_duplicate(&space, h, Rights::SAME_RIGHTS.bits()).unwrap();
        assert_eq!(space.table().rights(same).unwrap(), Rights::BASIC | Rights::SIGNAL);

        let narrowed = sys_handle_duplicate(&space, h, (Rights::WAIT | Rights::WRITE).bits()).unwrap();
        assert_eq!(space.table().rights(narrowed).unwrap(), Rights::WAIT);
        assert_eq!(
            sys_handle_duplicate(&space, narrowed, Rights::WAIT.bits()),
            Err(Status::AccessDenied)
        );

        let replaced = sys_handle_replace(&space, narrowed, 0).unwrap();
        assert_eq!(space.table().rights(replaced).unwrap(), Rights::NONE);
        assert_eq!(sys_handle_close(&space, narrowed), Err(Status::BadHandle));
        assert_eq!(space.table().object_ref_count(&event(1)), 3);
    }
}
