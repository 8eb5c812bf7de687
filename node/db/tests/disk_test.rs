// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

mod subtests;

use tempfile::TempDir;
use veilfs_db::{DiskStore, Store};

fn open_store(dir: &TempDir) -> DiskStore {
    DiskStore::open(dir.path()).unwrap()
}

#[test]
fn disk_db_write() {
    let dir = TempDir::new().unwrap();
    let db = open_store(&dir);
    subtests::write(&db);
}

#[test]
fn disk_db_read() {
    let dir = TempDir::new().unwrap();
    let db = open_store(&dir);
    subtests::read(&db);
}

#[test]
fn disk_db_exists() {
    let dir = TempDir::new().unwrap();
    let db = open_store(&dir);
    subtests::exists(&db);
}

#[test]
fn disk_db_does_not_exist() {
    let dir = TempDir::new().unwrap();
    let db = open_store(&dir);
    subtests::does_not_exist(&db);
}

#[test]
fn disk_db_delete() {
    let dir = TempDir::new().unwrap();
    let db = open_store(&dir);
    subtests::delete(&db);
}

#[test]
fn disk_db_bulk_write() {
    let dir = TempDir::new().unwrap();
    let db = open_store(&dir);
    subtests::bulk_write(&db);
}

#[test]
fn disk_db_bulk_read() {
    let dir = TempDir::new().unwrap();
    let db = open_store(&dir);
    subtests::bulk_read(&db);
}

#[test]
fn disk_db_bulk_delete() {
    let dir = TempDir::new().unwrap();
    let db = open_store(&dir);
    subtests::bulk_delete(&db);
}

#[test]
fn disk_db_object_roundtrip() {
    let dir = TempDir::new().unwrap();
    let db = open_store(&dir);
    subtests::object_roundtrip(&db);
}

#[test]
fn disk_db_object_put_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let db = open_store(&dir);
    subtests::object_put_is_idempotent(&db);
}

#[test]
fn disk_db_object_missing_address() {
    let dir = TempDir::new().unwrap();
    let db = open_store(&dir);
    subtests::object_missing_address(&db);
}

#[test]
fn disk_db_object_corruption_is_detected() {
    let dir = TempDir::new().unwrap();
    let db = open_store(&dir);
    subtests::object_corruption_is_detected(&db);
}

// Store keys are content addresses and never empty; the shortest key the
// fan-out must handle is a single byte, whose two hex characters name both
// the subdirectory and the file.
#[test]
fn disk_db_fans_out_short_and_long_keys() {
    let dir = TempDir::new().unwrap();
    let db = open_store(&dir);
    db.write([0xab], [1]).unwrap();
    assert_eq!(db.read([0xab]).unwrap().unwrap(), vec![1]);
    let key = [0x5a; 36];
    db.write(key, [2]).unwrap();
    assert_eq!(db.read(key).unwrap().unwrap(), vec![2]);
}

#[test]
fn disk_db_values_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let cid = {
        let db = open_store(&dir);
        veilfs_db::ObjectStore::put_block(&db, b"persisted").unwrap()
    };
    let db = open_store(&dir);
    assert_eq!(
        veilfs_db::ObjectStore::get_block(&db, &cid).unwrap(),
        b"persisted"
    );
}
