// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::clock::FakeClock;
use proptest::prelude::*;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Primitive whose lock attempts follow a script; counts unlock calls
#[derive(Clone, Default)]
struct ScriptedPrimitive {
    attempts: Arc<Mutex<VecDeque<io::Result<()>>>>,
    tries: Arc<AtomicUsize>,
    unlocks: Arc<AtomicUsize>,
}

impl ScriptedPrimitive {
    fn with_attempts(attempts: Vec<io::Result<()>>) -> Self {
        Self {
            attempts: Arc::new(Mutex::new(attempts.into())),
            ..Self::default()
        }
    }

    fn always_busy() -> Self {
        Self::default()
    }

    fn unlocks(&self) -> usize {
        self.unlocks.load(Ordering::SeqCst)
    }

    fn tries(&self) -> usize {
        self.tries.load(Ordering::SeqCst)
    }
}

impl LockPrimitive for ScriptedPrimitive {
    fn try_lock_exclusive(&self) -> io::Result<()> {
        self.tries.fetch_add(1, Ordering::SeqCst);
        self.attempts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(io::Error::from(io::ErrorKind::WouldBlock)))
    }

    fn unlock(&self) -> io::Result<()> {
        self.unlocks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn busy() -> io::Result<()> {
    Err(io::Error::from(io::ErrorKind::WouldBlock))
}

#[test]
fn try_acquire_succeeds_on_free_lock() {
    let prim = ScriptedPrimitive::with_attempts(vec![Ok(())]);
    let mut lock = PathLock::new(Path::new("/f"), prim);

    assert!(lock.try_acquire().unwrap());
    assert!(lock.is_locked());
}

#[test]
fn try_acquire_returns_false_when_contended() {
    let prim = ScriptedPrimitive::with_attempts(vec![busy()]);
    let mut lock = PathLock::new(Path::new("/f"), prim);

    assert!(!lock.try_acquire().unwrap());
    assert!(!lock.is_locked());
}

#[test]
fn try_acquire_twice_is_already_locked() {
    let prim = ScriptedPrimitive::with_attempts(vec![Ok(())]);
    let mut lock = PathLock::new(Path::new("/f"), prim);
    lock.try_acquire().unwrap();

    let err = lock.try_acquire().unwrap_err();
    assert!(matches!(err, FileError::AlreadyLocked { .. }));
}

#[test]
fn permission_denied_is_access_denied() {
    let prim = ScriptedPrimitive::with_attempts(vec![Err(io::Error::from(
        io::ErrorKind::PermissionDenied,
    ))]);
    let mut lock = PathLock::new(Path::new("/f"), prim);

    let err = lock.try_acquire().unwrap_err();
    assert!(matches!(err, FileError::AccessDenied { .. }));
}

#[test]
fn unexpected_error_is_treated_as_not_acquired() {
    let prim = ScriptedPrimitive::with_attempts(vec![Err(io::Error::other("odd"))]);
    let mut lock = PathLock::new(Path::new("/f"), prim);

    assert!(!lock.try_acquire().unwrap());
}

#[test]
fn bounded_wait_retries_until_free() {
    let prim = ScriptedPrimitive::with_attempts(vec![busy(), busy(), Ok(())]);
    let clock = FakeClock::new();
    let mut lock = PathLock::new(Path::new("/f"), prim.clone());

    lock.try_acquire_for(Duration::from_secs(2), &clock).unwrap();

    assert!(lock.is_locked());
    assert_eq!(prim.tries(), 3);
    assert_eq!(clock.sleeps(), vec![Duration::from_millis(100); 2]);
}

#[test]
fn bounded_wait_times_out_with_elapsed() {
    let prim = ScriptedPrimitive::always_busy();
    let clock = FakeClock::new();
    let mut lock = PathLock::new(Path::new("/data/x"), prim.clone());

    let err = lock
        .try_acquire_for(Duration::from_secs(1), &clock)
        .unwrap_err();

    match err {
        FileError::LockTimeout {
            path,
            timeout,
            waited,
        } => {
            assert_eq!(path, PathBuf::from("/data/x"));
            assert_eq!(timeout, Duration::from_secs(1));
            assert!(waited >= timeout);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(prim.tries(), 21);
}

#[test]
fn zero_timeout_makes_single_attempt() {
    let prim = ScriptedPrimitive::always_busy();
    let clock = FakeClock::new();
    let mut lock = PathLock::new(Path::new("/f"), prim.clone());

    let err = lock.try_acquire_for(Duration::ZERO, &clock).unwrap_err();

    assert!(matches!(err, FileError::Locked { .. }));
    assert_eq!(prim.tries(), 1);
    assert!(clock.sleeps().is_empty());
}

#[test]
fn release_without_acquire_is_noop() {
    let prim = ScriptedPrimitive::always_busy();
    let mut lock = PathLock::new(Path::new("/f"), prim.clone());
    lock.release();
    drop(lock);
    assert_eq!(prim.unlocks(), 0);
}

proptest! {
    #[test]
    fn release_is_idempotent(n in 1usize..16) {
        let prim = ScriptedPrimitive::with_attempts(vec![Ok(())]);
        let mut lock = PathLock::new(Path::new("/f"), prim.clone());
        lock.try_acquire().unwrap();

        for _ in 0..n {
            lock.release();
        }
        prop_assert!(!lock.is_locked());
        drop(lock);
        prop_assert_eq!(prim.unlocks(), 1);
    }
}

#[test]
fn os_lock_excludes_second_handle() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("shared.txt");
    std::fs::write(&path, b"data").unwrap();

    let mut first = PathLock::open(&path).unwrap();
    let mut second = PathLock::open(&path).unwrap();

    assert!(first.try_acquire().unwrap());
    assert!(!second.try_acquire().unwrap());

    first.release();
    assert!(second.try_acquire().unwrap());
}

#[test]
fn dropping_lock_releases_it() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("shared.txt");
    std::fs::write(&path, b"data").unwrap();

    {
        let mut first = PathLock::open(&path).unwrap();
        assert!(first.try_acquire().unwrap());
    }
    let mut second = PathLock::open(&path).unwrap();
    assert!(second.try_acquire().unwrap());
}

#[test]
fn read_guard_releases_inner_lock() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("g.txt");
    std::fs::write(&path, b"data").unwrap();

    let mut lock = PathLock::open(&path).unwrap();
    lock.try_acquire().unwrap();
    let mut guard = ReadGuard::Locked(lock);
    assert!(guard.is_locked());

    guard.release();
    guard.release();
    assert!(!guard.is_locked());
    assert!(!ReadGuard::NoLock.is_locked());
}
