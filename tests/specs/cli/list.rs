//! Directory listing specs
//!
//! Verify `fpolld list` filters, sorts and pages entries.

use crate::prelude::*;

fn names(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .filter_map(|line| line.split_whitespace().last())
        .filter_map(|path| path.rsplit('/').next())
        .map(str::to_string)
        .collect()
}

fn project() -> Project {
    let temp = Project::empty();
    temp.file("in/a.txt", "a");
    temp.file("in/b.csv", "bb");
    temp.file("in/c.txt", "ccc");
    temp.file("in/sub/d.txt", "dddd");
    temp
}

#[test]
fn lists_top_level_entries() {
    let temp = project();

    let run = temp.fpolld().args(&["list", "in", "--sort", "name"]).passes();

    assert_eq!(names(&run.stdout()), ["a.txt", "b.csv", "c.txt", "sub"]);
}

#[test]
fn recursive_listing_descends() {
    let temp = project();

    temp.fpolld()
        .args(&["list", "in", "--recursive"])
        .passes()
        .stdout_has("d.txt");
}

#[test]
fn name_pattern_filters() {
    let temp = project();

    let run = temp
        .fpolld()
        .args(&["list", "in", "--name-pattern", "*.txt", "--sort", "name"])
        .passes();

    assert_eq!(names(&run.stdout()), ["a.txt", "c.txt"]);
}

#[test]
fn offset_and_limit_page_sorted_entries() {
    let temp = project();

    let run = temp
        .fpolld()
        .args(&[
            "list", "in", "--sort", "size", "--order", "desc", "--offset", "1", "--limit", "2",
        ])
        .passes();

    // sizes: sub (dir), c=3, b=2, a=1
    assert_eq!(names(&run.stdout()).len(), 2);
}

#[test]
fn missing_directory_fails() {
    let temp = Project::empty();

    temp.fpolld().args(&["list", "absent"]).fails();
}

#[test]
fn working_dir_anchors_relative_paths() {
    let temp = project();
    let base = temp.path().display().to_string();

    temp.fpolld()
        .args(&["list", "in", "--working-dir", &base])
        .passes()
        .stdout_has("a.txt");
}

#[test]
fn bad_sort_criteria_fails() {
    let temp = project();

    temp.fpolld()
        .args(&["list", "in", "--sort", "colour"])
        .fails()
        .stderr_has("unknown sort criteria");
}
