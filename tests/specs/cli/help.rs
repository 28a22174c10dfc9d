//! CLI help specs

use crate::prelude::*;

#[test]
fn help_lists_subcommands() {
    let temp = Project::empty();

    temp.fpolld()
        .args(&["--help"])
        .passes()
        .stdout_has("run")
        .stdout_has("list");
}

#[test]
fn list_help_shows_paging_options() {
    let temp = Project::empty();

    temp.fpolld()
        .args(&["list", "--help"])
        .passes()
        .stdout_has("--offset")
        .stdout_has("--limit")
        .stdout_has("--sort");
}

#[test]
fn unknown_subcommand_fails() {
    let temp = Project::empty();

    temp.fpolld().args(&["frobnicate"]).fails();
}
