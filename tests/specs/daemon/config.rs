//! Daemon configuration specs
//!
//! Verify startup fails cleanly on bad configuration.

use crate::prelude::*;

#[test]
fn missing_config_fails() {
    let temp = Project::empty();

    temp.fpolld()
        .args(&["run", "--config", "nope.toml"])
        .fails()
        .stderr_has("could not read config");
}

#[test]
fn unknown_key_fails() {
    let temp = Project::empty();
    temp.config("colour = \"blue\"\n");

    temp.fpolld()
        .args(&["run", "--config", "fpoll.toml"])
        .fails()
        .stderr_has("invalid config");
}

#[test]
fn conflicting_post_actions_fail() {
    let temp = Project::empty();
    temp.dir("in");
    temp.config(
        r#"
[[listener]]
name = "inbox"
directory = "in"
auto_delete = true
move_to_directory = "done"
"#,
    );

    temp.fpolld()
        .args(&["run", "--config", "fpoll.toml"])
        .fails()
        .stderr_has("inbox");
}

#[test]
fn missing_listener_directory_fails_startup() {
    let temp = Project::empty();
    temp.config(MOVE_CONFIG);

    temp.fpolld()
        .args(&["run", "--config", "fpoll.toml"])
        .fails()
        .stderr_has("Listener 'inbox' failed to start");

    assert!(!temp.state_path().join("fpolld.pid").exists());
}
