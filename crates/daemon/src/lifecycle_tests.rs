// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::TempDir;

fn config_for(dir: &Path, listeners: &str) -> DaemonConfig {
    let text = format!(
        "working_dir = {:?}\nstate_dir = {:?}\n{}",
        dir.display().to_string(),
        dir.join("state").display().to_string(),
        listeners
    );
    DaemonConfig::from_toml(&text).unwrap()
}

#[test]
fn startup_takes_lock_and_writes_pid() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir(dir.path().join("in")).unwrap();
    let config = config_for(dir.path(), "[[listener]]\nname = \"a\"\ndirectory = \"in\"\n");
    let paths = Paths::in_dir(dir.path().join("state"));

    let mut daemon = startup(&config, &paths).unwrap();

    let pid = std::fs::read_to_string(&paths.lock_path).unwrap();
    assert_eq!(pid.trim(), std::process::id().to_string());
    assert_eq!(daemon.take_listeners().len(), 1);
    assert!(daemon.take_listeners().is_empty());

    daemon.shutdown();
    assert!(!paths.lock_path.exists());
}

#[test]
fn second_daemon_on_same_state_dir_fails() {
    let dir = TempDir::new().unwrap();
    let config = config_for(dir.path(), "");
    let paths = Paths::in_dir(dir.path().join("state"));
    let _first = startup(&config, &paths).unwrap();

    let err = startup(&config, &paths).err().unwrap();

    assert!(matches!(err, LifecycleError::LockFailed(_)));
    assert!(paths.lock_path.exists());
}

#[test]
fn missing_listener_directory_is_fatal() {
    let dir = TempDir::new().unwrap();
    let config = config_for(dir.path(), "[[listener]]\nname = \"a\"\ndirectory = \"absent\"\n");
    let paths = Paths::in_dir(dir.path().join("state"));

    let err = startup(&config, &paths).err().unwrap();

    assert!(matches!(err, LifecycleError::Listener { ref name, .. } if name == "a"));
    assert!(!paths.lock_path.exists());
}

#[test]
fn bad_pattern_is_fatal() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir(dir.path().join("in")).unwrap();
    let config = config_for(
        dir.path(),
        "[[listener]]\nname = \"a\"\ndirectory = \"in\"\n[listener.matcher]\nname_pattern = \"regex:(\"\n",
    );
    let paths = Paths::in_dir(dir.path().join("state"));

    let err = startup(&config, &paths).err().unwrap();

    assert!(matches!(err, LifecycleError::Listener { .. }));
}

#[test]
fn stop_request_reaches_every_listener() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir(dir.path().join("in")).unwrap();
    let config = config_for(
        dir.path(),
        "[[listener]]\nname = \"a\"\ndirectory = \"in\"\n[[listener]]\nname = \"b\"\ndirectory = \"in\"\n",
    );
    let paths = Paths::in_dir(dir.path().join("state"));
    let mut daemon = startup(&config, &paths).unwrap();
    let listeners = daemon.take_listeners();

    daemon.request_stop();

    assert!(listeners.iter().all(|l| l.listener.is_stopping()));
}

#[test]
fn resolve_uses_explicit_state_dir() {
    let config = DaemonConfig {
        state_dir: Some(PathBuf::from("/var/lib/fpoll")),
        ..DaemonConfig::default()
    };

    let paths = Paths::resolve(&config, Path::new("/nonexistent.toml")).unwrap();

    assert_eq!(paths.lock_path, PathBuf::from("/var/lib/fpoll/fpolld.pid"));
    assert_eq!(paths.wal_path, PathBuf::from("/var/lib/fpoll/state.wal"));
}

#[test]
fn config_hash_is_stable_and_short() {
    let a = config_hash(Path::new("/etc/fpoll.toml"));
    assert_eq!(a, config_hash(Path::new("/etc/fpoll.toml")));
    assert_ne!(a, config_hash(Path::new("/etc/other.toml")));
    assert_eq!(a.len(), 16);
}
