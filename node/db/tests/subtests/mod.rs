// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use veilfs_db::{Error, ObjectStore, Store};
use veilfs_encoding::cid_from_raw;

pub fn write<DB>(db: &DB)
where
    DB: Store,
{
    let key = [1];
    let value = [1];
    db.write(key, value).unwrap();
}

pub fn read<DB>(db: &DB)
where
    DB: Store,
{
    let key = [0];
    let value = [1];
    db.write(key, value).unwrap();
    let res = db.read(key).unwrap().unwrap();
    assert_eq!(value.as_ref(), res.as_slice());
}

pub fn exists<DB>(db: &DB)
where
    DB: Store,
{
    let key = [0];
    let value = [1];
    db.write(key, value).unwrap();
    let res = db.exists(key).unwrap();
    assert!(res);
}

pub fn does_not_exist<DB>(db: &DB)
where
    DB: Store,
{
    let key = [0];
    let res = db.exists(key).unwrap();
    assert!(!res);
}

pub fn delete<DB>(db: &DB)
where
    DB: Store,
{
    let key = [0];
    let value = [1];
    db.write(key, value).unwrap();
    db.delete(key).unwrap();
    assert!(!db.exists(key).unwrap());
}

pub fn bulk_write<DB>(db: &DB)
where
    DB: Store,
{
    let values = [([0], [0]), ([1], [1]), ([2], [2])];
    db.bulk_write(&values).unwrap();
    for (k, _) in values.iter() {
        let res = db.exists(*k).unwrap();
        assert!(res);
    }
}

pub fn bulk_read<DB>(db: &DB)
where
    DB: Store,
{
    let keys = [[0], [1], [2]];
    let values = [[0], [1], [2]];
    let kvs: Vec<_> = keys.iter().zip(values.iter()).map(|(k, v)| (k, v)).collect();
    db.bulk_write(&kvs).unwrap();
    let results = db.bulk_read(&keys).unwrap();
    for (result, value) in results.iter().zip(values.iter()) {
        assert_eq!(result.as_ref().unwrap().as_slice(), value.as_ref());
    }
}

pub fn bulk_delete<DB>(db: &DB)
where
    DB: Store,
{
    let keys = [[0], [1], [2]];
    let kvs: Vec<_> = keys.iter().map(|k| (k, k)).collect();
    db.bulk_write(&kvs).unwrap();
    db.bulk_delete(&keys).unwrap();
    for k in keys.iter() {
        assert!(!db.exists(*k).unwrap());
    }
}

pub fn object_roundtrip<DB>(db: &DB)
where
    DB: ObjectStore,
{
    let payload = b"anonymized payload bytes";
    let cid = db.put_block(payload).unwrap();
    assert_eq!(cid, cid_from_raw(payload));
    assert!(db.has(&cid).unwrap());
    assert_eq!(db.get_block(&cid).unwrap(), payload);
}

pub fn object_put_is_idempotent<DB>(db: &DB)
where
    DB: ObjectStore,
{
    let payload = b"same bytes, same address";
    let first = db.put_block(payload).unwrap();
    let second = db.put_block(payload).unwrap();
    assert_eq!(first, second);
}

pub fn object_missing_address<DB>(db: &DB)
where
    DB: ObjectStore,
{
    let absent = cid_from_raw(b"never stored");
    assert!(!db.has(&absent).unwrap());
    assert_eq!(db.get_block(&absent).unwrap_err(), Error::NotFound(absent));
}

pub fn object_corruption_is_detected<DB>(db: &DB)
where
    DB: ObjectStore,
{
    let cid = db.put_block(b"original bytes").unwrap();
    // Poison the slot behind the adapter's back.
    db.write(cid.to_bytes(), b"tampered bytes").unwrap();
    assert_eq!(db.get_block(&cid).unwrap_err(), Error::Corrupt(cid));
}
