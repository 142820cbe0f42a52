use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use std::process::Command;

fn mason() -> Command {
    Command::cargo_bin("mason-cli").unwrap()
}

fn write_project(dir: &Path, contents: &str) {
    fs::write(dir.join("mason.build"), contents).unwrap();
}

const HELLO: &str = r#"
project "hello" do
  version = "1.0.0"
  lang = :cpp
  std = "c++17"
end

executable "hello" do
  sources = ["src/main.cpp"]
end
"#;

#[test]
fn setup_writes_a_ninja_file() {
    let dir = tempfile::tempdir().unwrap();
    write_project(dir.path(), HELLO);

    mason()
        .arg("setup")
        .current_dir(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("configured project hello"));

    let ninja = fs::read_to_string(dir.path().join("build/build.ninja")).unwrap();
    assert!(ninja.contains("rule compile"));
    assert!(ninja.contains("-std=c++17"));
    assert!(ninja.contains("build hello: link"));
}

#[test]
fn setup_can_emit_a_makefile() {
    let dir = tempfile::tempdir().unwrap();
    write_project(dir.path(), HELLO);

    mason()
        .args(["setup", "--backend", "make"])
        .current_dir(dir.path())
        .assert()
        .success();

    let makefile = fs::read_to_string(dir.path().join("build/Makefile")).unwrap();
    assert!(makefile.contains("all: hello"));
}

#[test]
fn buildtype_seeds_conditional_flags() {
    let dir = tempfile::tempdir().unwrap();
    write_project(
        dir.path(),
        r#"
project "opt" do end
compiler do
  if buildtype == "release" do
    flags = ["-O3"]
  end
end
executable "opt" do
  sources = ["main.c"]
end
"#,
    );

    mason()
        .args(["setup", "--buildtype", "release"])
        .current_dir(dir.path())
        .assert()
        .success();
    let ninja = fs::read_to_string(dir.path().join("build/build.ninja")).unwrap();
    assert!(ninja.contains("-O3"));
}

#[test]
fn graph_export_includes_edges() {
    let dir = tempfile::tempdir().unwrap();
    write_project(
        dir.path(),
        r#"
library "core" do
  sources = ["core.cpp"]
end
executable "app" do
  sources = ["main.cpp"]
  deps = ["core"]
end
"#,
    );

    mason()
        .arg("graph")
        .current_dir(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("\"app\" -> \"core\";"))
        .stdout(predicate::str::contains("rankdir=LR"));

    mason()
        .args(["graph", "--format", "json"])
        .current_dir(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("\"from\": \"app\""))
        .stdout(predicate::str::contains("\"to\": \"core\""));
}

#[test]
fn dependency_cycles_fail_setup() {
    let dir = tempfile::tempdir().unwrap();
    write_project(
        dir.path(),
        r#"
library "x" do
  deps = ["y"]
end
library "y" do
  deps = ["x"]
end
"#,
    );

    mason()
        .arg("setup")
        .current_dir(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("cycle detected among targets"));
}

#[test]
fn parse_error_is_nonzero_with_position() {
    let dir = tempfile::tempdir().unwrap();
    write_project(dir.path(), "executable \"x\" do\n"); // missing end

    mason()
        .arg("setup")
        .current_dir(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Parse error"));
}

#[test]
fn fatal_error_builtin_surfaces_its_message() {
    let dir = tempfile::tempdir().unwrap();
    write_project(
        dir.path(),
        r#"
if not file_exists("required.h") do
  error("required.h missing")
end
"#,
    );

    mason()
        .arg("setup")
        .current_dir(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Runtime error"))
        .stderr(predicate::str::contains("required.h missing"));
}

#[test]
fn tasks_are_listed_and_runnable() {
    let dir = tempfile::tempdir().unwrap();
    write_project(
        dir.path(),
        r#"
project "p" do end
task :gen do
  write_file("generated.txt", "ok")
end
"#,
    );

    mason()
        .arg("tasks")
        .current_dir(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("gen"));

    mason()
        .args(["task", "gen"])
        .current_dir(dir.path())
        .assert()
        .success();
    assert!(dir.path().join("generated.txt").exists());

    mason()
        .args(["task", "missing"])
        .current_dir(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown task: missing"));
}

#[test]
fn missing_build_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    mason()
        .arg("setup")
        .current_dir(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("No mason.build found"));
}

#[test]
fn info_summarizes_the_configuration() {
    let dir = tempfile::tempdir().unwrap();
    write_project(dir.path(), HELLO);

    mason()
        .arg("info")
        .current_dir(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("hello"))
        .stdout(predicate::str::contains("executable"))
        .stdout(predicate::str::contains("1.0.0"));
}
