// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::fs;
use std::path::Path;
use tempfile::TempDir;
use veilfs_client::{
    Config, DirectoryProcessor, EntryKind, Error, VeilFs, WalkOptions,
};
use veilfs_crypto::MasterKey;
use veilfs_db::MemoryDB;

fn client() -> VeilFs<MemoryDB> {
    VeilFs::new(MemoryDB::default(), Config::default().with_block_size(32)).unwrap()
}

/// root/
///   a.txt        "alpha contents"
///   c.txt        "gamma contents"
///   sub/d.bin    64 deterministic bytes
///   .hidden      never indexed
fn sample_tree() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("a.txt"), b"alpha contents").unwrap();
    fs::write(dir.path().join("c.txt"), b"gamma contents").unwrap();
    fs::write(dir.path().join(".hidden"), b"secret").unwrap();
    fs::create_dir(dir.path().join("sub")).unwrap();
    let payload: Vec<u8> = (0..64u32).map(|i| (i * 3) as u8).collect();
    fs::write(dir.path().join("sub").join("d.bin"), payload).unwrap();
    dir
}

#[cfg(unix)]
fn add_dangling_symlink(root: &Path) {
    std::os::unix::fs::symlink(root.join("missing-target"), root.join("b.txt")).unwrap();
}

#[test]
fn directory_tree_roundtrip() {
    let dir = sample_tree();
    let fs_client = client();
    let processor = DirectoryProcessor::new(&fs_client, MasterKey::generate());

    let outcome = processor.process(dir.path()).unwrap();
    assert_eq!(outcome.files.len(), 3);
    assert!(outcome.failures.is_empty());

    let root = processor
        .open_manifest(&outcome.root_manifest, "")
        .unwrap();
    let root_key = MasterKey::generate(); // wrong key must not open names
    assert_eq!(root.entries().len(), 3);

    let mut names = Vec::new();
    let mut sub_manifest = None;
    for entry in root.entries() {
        // Decrypting under an unrelated key fails.
        assert!(entry.name(&root_key.derive_dir_key(b"")).is_err());
        match entry.kind {
            EntryKind::Dir => sub_manifest = Some(entry.target),
            EntryKind::File => {}
        }
    }
    // The processor's own key recovers the plaintext names.
    let reopened = processor
        .open_manifest(&outcome.root_manifest, "")
        .unwrap();
    for entry in reopened.entries() {
        names.push(entry);
    }
    assert_eq!(names.len(), 3);

    // Descend into the child manifest and download its file.
    let sub = processor
        .open_manifest(&sub_manifest.expect("sub entry present"), "sub")
        .unwrap();
    assert_eq!(sub.entries().len(), 1);
    assert_eq!(sub.entries()[0].kind, EntryKind::File);
    let payload: Vec<u8> = (0..64u32).map(|i| (i * 3) as u8).collect();
    assert_eq!(
        fs_client.download(&sub.entries()[0].target).unwrap(),
        payload
    );
}

#[test]
fn manifest_names_decrypt_under_the_walk_key() {
    let dir = sample_tree();
    let fs_client = client();
    let master = MasterKey::generate();
    let processor = DirectoryProcessor::new(&fs_client, master.clone());

    let outcome = processor.process(dir.path()).unwrap();
    let manifest = processor
        .open_manifest(&outcome.root_manifest, "")
        .unwrap();
    let key = master.derive_dir_key(b"");
    let mut names: Vec<String> = manifest
        .entries()
        .iter()
        .map(|e| e.name(&key).unwrap())
        .collect();
    names.sort();
    assert_eq!(names, ["a.txt", "c.txt", "sub"]);
}

#[cfg(unix)]
#[test]
fn bad_entry_is_skipped_when_handler_continues() {
    let dir = sample_tree();
    add_dangling_symlink(dir.path());
    let fs_client = client();
    let processor = DirectoryProcessor::new(&fs_client, MasterKey::generate());

    let mut reported = Vec::new();
    let outcome = processor
        .process_with(dir.path(), |path, _| {
            reported.push(path.to_path_buf());
            true
        })
        .unwrap();

    assert_eq!(outcome.files.len(), 3, "a.txt, c.txt and sub/d.bin indexed");
    assert_eq!(outcome.failures.len(), 1);
    assert!(outcome.failures[0].0.ends_with("b.txt"));
    assert_eq!(reported.len(), 1);

    // The failed entry is absent from the manifest.
    let manifest = processor
        .open_manifest(&outcome.root_manifest, "")
        .unwrap();
    assert_eq!(manifest.entries().len(), 3);
}

#[cfg(unix)]
#[test]
fn bad_entry_aborts_by_default() {
    let dir = sample_tree();
    add_dangling_symlink(dir.path());
    let fs_client = client();
    let processor = DirectoryProcessor::new(&fs_client, MasterKey::generate());
    assert!(processor.process(dir.path()).is_err());
}

#[test]
fn extension_filters_limit_the_walk() {
    let dir = sample_tree();
    let fs_client = client();
    let processor = DirectoryProcessor::new(&fs_client, MasterKey::generate()).with_options(
        WalkOptions {
            recursive: true,
            include: vec!["txt".to_string()],
            ..Default::default()
        },
    );

    let outcome = processor.process(dir.path()).unwrap();
    assert_eq!(outcome.files.len(), 2, "only the txt files are indexed");
    assert!(outcome.failures.is_empty(), "filtered is not failed");
}

#[test]
fn max_size_filter_is_not_a_failure() {
    let dir = sample_tree();
    let fs_client = client();
    let processor = DirectoryProcessor::new(&fs_client, MasterKey::generate()).with_options(
        WalkOptions {
            recursive: true,
            max_size: Some(20),
            ..Default::default()
        },
    );

    let outcome = processor.process(dir.path()).unwrap();
    assert_eq!(outcome.files.len(), 2, "the 64-byte file is filtered");
    assert!(outcome.failures.is_empty());
}

#[test]
fn non_recursive_walk_skips_subdirectories() {
    let dir = sample_tree();
    let fs_client = client();
    let processor = DirectoryProcessor::new(&fs_client, MasterKey::generate()).with_options(
        WalkOptions {
            recursive: false,
            ..Default::default()
        },
    );

    let outcome = processor.process(dir.path()).unwrap();
    assert_eq!(outcome.files.len(), 2);
    let manifest = processor
        .open_manifest(&outcome.root_manifest, "")
        .unwrap();
    assert!(manifest
        .entries()
        .iter()
        .all(|e| e.kind == EntryKind::File));
}

#[test]
fn progress_counters_reach_their_totals() {
    let dir = sample_tree();
    let fs_client = client();
    let processor = DirectoryProcessor::new(&fs_client, MasterKey::generate());
    let progress = processor.progress();

    processor.process(dir.path()).unwrap();
    let (files_done, files_total) = progress.files();
    let (bytes_done, bytes_total) = progress.bytes();
    assert_eq!(files_done, 3);
    assert_eq!(files_done, files_total);
    assert_eq!(bytes_done, bytes_total);
    assert_eq!(bytes_done, 14 + 14 + 64);
}

#[test]
fn cancelled_walk_aborts() {
    let dir = sample_tree();
    let fs_client = client();
    let processor = DirectoryProcessor::new(&fs_client, MasterKey::generate());
    processor.cancel_token().cancel();
    assert!(matches!(
        processor.process(dir.path()),
        Err(Error::Cancelled)
    ));
}
