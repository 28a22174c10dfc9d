// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::store::MemoryStore;
use crate::testing::file_snapshot;
use chrono::TimeZone;
use proptest::prelude::*;
use yare::parameterized;

fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

fn watermark() -> WatermarkStore {
    WatermarkStore::for_directory(Arc::new(MemoryStore::new(16)), Path::new("/in"))
}

#[test]
fn starts_empty_and_advances() {
    let wm = watermark();
    assert_eq!(wm.current().unwrap(), None);

    assert_eq!(wm.advance(at(10)).unwrap(), at(10));
    assert_eq!(wm.current().unwrap(), Some(at(10)));
}

#[test]
fn never_regresses() {
    let wm = watermark();
    wm.advance(at(10)).unwrap();

    assert_eq!(wm.advance(at(5)).unwrap(), at(10));
    assert_eq!(wm.current().unwrap(), Some(at(10)));
}

#[test]
fn directories_are_independent() {
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new(16));
    let a = WatermarkStore::for_directory(store.clone(), Path::new("/a"));
    let b = WatermarkStore::for_directory(store, Path::new("/b"));
    a.advance(at(1)).unwrap();
    assert_eq!(b.current().unwrap(), None);
}

#[test]
fn garbage_value_is_invalid() {
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new(16));
    let wm = WatermarkStore::for_directory(store.clone(), Path::new("/in"));
    store.put(wm.key(), "yesterday".into(), None).unwrap();
    assert!(matches!(wm.current(), Err(StoreError::Invalid { .. })));
}

#[parameterized(
    later_is_admitted = { WatermarkMode::Modified, 11, true },
    equal_is_rejected = { WatermarkMode::Modified, 10, false },
    earlier_is_rejected = { WatermarkMode::Created, 9, false },
    disabled_admits_all = { WatermarkMode::Disabled, 1, true },
)]
fn admits_strictly_later(mode: WatermarkMode, secs: i64, expected: bool) {
    let snap = file_snapshot(Path::new("/in/a"), 1, at(secs));
    assert_eq!(admits(mode, &snap, Some(at(10))), expected);
}

#[test]
fn no_watermark_admits_all() {
    let snap = file_snapshot(Path::new("/in/a"), 1, at(0));
    assert!(admits(WatermarkMode::Modified, &snap, None));
}

proptest! {
    #[test]
    fn stored_value_is_running_maximum(candidates in prop::collection::vec(0i64..10_000, 1..30)) {
        let wm = watermark();
        let mut max = None;
        for c in candidates {
            let before = wm.current().unwrap();
            wm.advance(at(c)).unwrap();
            let after = wm.current().unwrap();
            prop_assert!(after >= before);
            max = max.max(Some(at(c)));
            prop_assert_eq!(after, max);
        }
    }
}
