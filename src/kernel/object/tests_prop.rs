// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Property tests for the handle table and channels
//!
//! - alloc then get with the granted rights returns the same object
//! - get with rights outside the grant fails with `AccessDenied`
//! - duplicate never widens rights
//! - write then read reproduces data byte-exact, in FIFO order

use super::{handle_table_init, Channel, Endpoint, Rights};
use crate::rustux::{KernelObject, KernelObjectId, ObjectType, Status};
use proptest::collection::vec;
use proptest::prelude::*;
use std::vec::Vec;

fn arb_rights() -> impl Strategy<Value = Rights> {
    (0u32..(1 << 21)).prop_map(Rights::from_raw)
}

fn arb_object() -> impl Strategy<Value = KernelObject> {
    let kinds = prop_oneof![
        Just(ObjectType::Process),
        Just(ObjectType::Thread),
        Just(ObjectType::Vmo),
        Just(ObjectType::Channel),
        Just(ObjectType::Event),
        Just(ObjectType::Port),
    ];
    (kinds, 1u64..u64::MAX)
        .prop_map(|(kind, id)| KernelObject::new(kind, KernelObjectId::from_raw(id)))
}

proptest! {
    #[test]
    fn alloc_get_roundtrip(object in arb_object(), rights in arb_rights()) {
        let table = handle_table_init(8).unwrap();
        let h = table.alloc(object, rights).unwrap();
        prop_assert_eq!(table.get(h, rights).unwrap(), object);
    }

    #[test]
    fn get_rejects_missing_rights(object in arb_object(), rights in arb_rights(), extra in 0u32..21) {
        let extra = Rights::from_raw(1 << extra);
        prop_assume!(!rights.contains(extra));

        let table = handle_table_init(8).unwrap();
        let h = table.alloc(object, rights).unwrap();
        prop_assert_eq!(table.get(h, rights | extra), Err(Status::AccessDenied));
    }

    #[test]
    fn duplicate_never_widens(object in arb_object(), source in arb_rights(), requested in arb_rights()) {
        let table = handle_table_init(8).unwrap();
        let h = table.alloc(object, source | Rights::DUPLICATE).unwrap();
        let granted = table.rights(h).unwrap();

        let dup = table.duplicate(h, requested).unwrap();
        let rights = table.rights(dup).unwrap();
        prop_assert_eq!(rights, requested & granted);
        prop_assert!(granted.contains(rights));
    }

    #[test]
    fn write_read_roundtrip(data in vec(any::<u8>(), 0..4096)) {
        let (ch, _, _) = Channel::create(1).unwrap();
        ch.write(Endpoint::Zero, &data, &[]).unwrap();
        let msg = ch.read(Endpoint::One).unwrap();
        prop_assert_eq!(msg.data(), &data[..]);
    }

    #[test]
    fn fifo_order(messages in vec(vec(any::<u8>(), 0..64), 1..32)) {
        let (ch, _, _) = Channel::create(1).unwrap();
        for m in &messages {
            ch.write(Endpoint::One, m, &[]).unwrap();
        }
        let received: Vec<Vec<u8>> = (0..messages.len())
            .map(|_| ch.read(Endpoint::Zero).unwrap().data().to_vec())
            .collect();
        prop_assert_eq!(received, messages);
    }
}

#[test]
fn write_read_max_size() {
    let data: Vec<u8> = (0..crate::kernel::config::MAX_MSG_BYTES).map(|i| i as u8).collect();
    let (ch, _, _) = Channel::create(1).unwrap();
    ch.write(Endpoint::Zero, &data, &[]).unwrap();
    assert_eq!(ch.read(Endpoint::One).unwrap().data(), &data[..]);
}
