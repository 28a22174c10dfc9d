// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::lock::{PathLock, Release};
use tempfile::TempDir;
use yare::parameterized;

fn setup() -> (TempDir, LocalFileSystem) {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("existing.txt"), b"old content").unwrap();
    let fs = LocalFileSystem::new(dir.path());
    (dir, fs)
}

#[parameterized(
    overwrite_truncates = { WriteMode::Overwrite, "new" },
    append_extends = { WriteMode::Append, "old contentnew" },
)]
fn write_modes_on_existing_file(mode: WriteMode, expected: &str) {
    let (dir, fs) = setup();

    let written = fs
        .write(Path::new("existing.txt"), &b"new"[..], &WriteOptions::new(mode))
        .unwrap();

    assert_eq!(written, 3);
    let actual = std::fs::read_to_string(dir.path().join("existing.txt")).unwrap();
    assert_eq!(actual, expected);
}

#[test]
fn create_new_refuses_existing_file() {
    let (_dir, fs) = setup();
    let err = fs
        .write(
            Path::new("existing.txt"),
            &b"x"[..],
            &WriteOptions::new(WriteMode::CreateNew),
        )
        .unwrap_err();
    assert!(matches!(err, FileError::AlreadyExists { .. }));
}

#[test]
fn create_new_writes_fresh_file() {
    let (dir, fs) = setup();
    fs.write(
        Path::new("fresh.txt"),
        &b"hi"[..],
        &WriteOptions::new(WriteMode::CreateNew),
    )
    .unwrap();
    assert_eq!(std::fs::read(dir.path().join("fresh.txt")).unwrap(), b"hi");
}

#[test]
fn missing_parent_requires_create_parent_dirs() {
    let (dir, fs) = setup();
    let target = Path::new("a/b/c.txt");

    let err = fs
        .write(target, &b"x"[..], &WriteOptions::new(WriteMode::Overwrite))
        .unwrap_err();
    assert!(matches!(err, FileError::IllegalPath { .. }));

    fs.write(
        target,
        &b"x"[..],
        &WriteOptions::new(WriteMode::Overwrite).create_parent_dirs(),
    )
    .unwrap();
    assert!(dir.path().join("a/b/c.txt").is_file());
}

#[test]
fn writing_to_directory_is_illegal() {
    let (dir, fs) = setup();
    std::fs::create_dir(dir.path().join("sub")).unwrap();
    let err = fs
        .write(Path::new("sub"), &b"x"[..], &WriteOptions::default())
        .unwrap_err();
    assert!(matches!(err, FileError::IllegalPath { .. }));
}

#[test]
fn locked_write_fails_when_file_is_held() {
    let (dir, fs) = setup();
    let path = dir.path().join("existing.txt");
    let mut holder = PathLock::open(&path).unwrap();
    holder.try_acquire().unwrap();

    let err = fs
        .write(
            Path::new("existing.txt"),
            &b"new"[..],
            &WriteOptions::new(WriteMode::Overwrite).locked(),
        )
        .unwrap_err();

    assert!(matches!(err, FileError::Locked { .. }));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "old content");
    holder.release();
}

#[test]
fn locked_write_releases_lock_afterwards() {
    let (dir, fs) = setup();
    fs.write(
        Path::new("existing.txt"),
        &b"new"[..],
        &WriteOptions::new(WriteMode::Overwrite).locked(),
    )
    .unwrap();

    let mut after = PathLock::open(&dir.path().join("existing.txt")).unwrap();
    assert!(after.try_acquire().unwrap());
}
