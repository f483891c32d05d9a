//! The `reharm` binary: flags, prompts on stdin, exit codes.

mod common;

use assert_cmd::Command;
use predicates::prelude::*;

use common::{notes_on, read, workspace, MELODY};

fn reharm(dir: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("reharm").unwrap();
    cmd.current_dir(dir)
        .env_remove("RUST_LOG")
        .env("XDG_CONFIG_HOME", dir);
    cmd
}

#[test]
fn substitutes_from_flags_without_prompting() {
    let ws = workspace();

    reharm(ws.dir.path())
        .arg("--input")
        .arg(&ws.input)
        .arg("--output")
        .arg(&ws.output)
        .arg("--tempo")
        .arg("100")
        .arg("--substitute")
        .arg("F->C")
        .arg("--no-prompt")
        .assert()
        .success()
        .stdout(predicate::str::contains("F-major triad"))
        .stdout(predicate::str::contains("Replaced 'F' with 'C'"))
        .stdout(predicate::str::contains("Tempo: 100 bpm"));

    let written = read(&ws.output);
    assert_eq!(notes_on(&written, MELODY)[0], (0, 480, 64));
}

#[test]
fn answers_prompts_from_stdin() {
    let ws = workspace();

    reharm(ws.dir.path())
        .arg("-i")
        .arg(&ws.input)
        .arg("-o")
        .arg(&ws.output)
        .write_stdin("\n\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Chord change (e.g. F->C"))
        .stdout(predicate::str::contains("Tempo: 120 bpm"));

    assert_eq!(read(&ws.output).instruments, read(&ws.input).instruments);
}

#[test]
fn reads_defaults_from_local_config() {
    let ws = workspace();
    std::fs::write(
        ws.dir.path().join("reharm.toml"),
        "[paths]\ninput = \"song.mid\"\noutput = \"from-config.mid\"\n",
    )
    .unwrap();

    reharm(ws.dir.path())
        .arg("--no-prompt")
        .assert()
        .success()
        .stdout(predicate::str::contains("from-config.mid"));

    assert!(ws.dir.path().join("from-config.mid").exists());
}

#[test]
fn missing_input_fails() {
    let ws = workspace();

    reharm(ws.dir.path())
        .arg("--input")
        .arg("nowhere.mid")
        .arg("--no-prompt")
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn rejects_out_of_range_octave() {
    let ws = workspace();

    reharm(ws.dir.path())
        .arg("--context-octave")
        .arg("12")
        .assert()
        .failure()
        .stderr(predicate::str::contains("context-octave"));
}
