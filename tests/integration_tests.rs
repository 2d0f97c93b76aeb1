//! Integration Tests

extern crate assert_cli;
#[macro_use]
extern crate lazy_static;
extern crate tempdir;

use std::fs;
use std::io;
use std::path::PathBuf;

use assert_cli::Assert;
use tempdir::TempDir;

lazy_static! {
    // Because of a limitation in `assert_cli`, temporary directories must
    // be subdirectories of the directory containing Cargo.toml
    static ref TEMP_ROOT: PathBuf = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests");
}

fn generate_temp_directory() -> io::Result<TempDir> {
    TempDir::new_in(&*TEMP_ROOT, "temp")
}

fn write_script(temp_dir: &TempDir, contents: &str) -> String {
    let path = temp_dir.path().join("script.msh");
    fs::write(&path, contents).expect("unable to write script");
    path.to_str().expect("path should be valid Unicode").to_string()
}

#[test]
fn test_simple_pipeline() {
    Assert::cargo_binary("msh")
        .with_args(&["-c", "echo hello | cat"])
        .stdout()
        .is("hello")
        .unwrap();
}

#[test]
fn test_three_stage_pipeline() {
    Assert::cargo_binary("msh")
        .with_args(&["-c", "printf 'b\\na\\nc\\n' | sort | head -n 1"])
        .stdout()
        .is("a")
        .unwrap();
}

#[test]
fn test_output_redirection() {
    let temp_dir = generate_temp_directory().expect("unable to generate temp dir");
    let out = temp_dir.path().join("out.txt");
    Assert::cargo_binary("msh")
        .with_args(&["-c", &format!("echo redirected > {}", out.display())])
        .succeeds()
        .unwrap();
    assert_eq!(fs::read_to_string(&out).unwrap(), "redirected\n");
}

#[test]
fn test_input_redirection() {
    let temp_dir = generate_temp_directory().expect("unable to generate temp dir");
    let input = temp_dir.path().join("in.txt");
    fs::write(&input, "from a file\n").unwrap();
    Assert::cargo_binary("msh")
        .with_args(&["-c", &format!("cat < {}", input.display())])
        .stdout()
        .is("from a file")
        .unwrap();
}

#[test]
fn test_failed_redirection_keeps_stream_bound() {
    Assert::cargo_binary("msh")
        .with_args(&["-c", "echo hi > /nonexistent_dir_xyz/out"])
        .stdout()
        .is("hi")
        .stderr()
        .contains("/nonexistent_dir_xyz/out")
        .unwrap();
}

#[test]
fn test_command_not_found() {
    Assert::cargo_binary("msh")
        .with_args(&["-c", "definitely_not_a_command_xyz"])
        .stderr()
        .contains("definitely_not_a_command_xyz: Command not found")
        .unwrap();
}

#[test]
fn test_background_job_is_announced() {
    Assert::cargo_binary("msh")
        .with_args(&["-c", "sleep 0.05 &"])
        .stdout()
        .contains("[1]")
        .unwrap();
}

#[test]
fn test_jobs_lists_running_job() {
    let temp_dir = generate_temp_directory().expect("unable to generate temp dir");
    let script = write_script(&temp_dir, "sleep 5 &\njobs\nexit\n");
    Assert::cargo_binary("msh")
        .with_args(&[&script])
        .stdout()
        .contains("Running\tsleep 5 &")
        .unwrap();
}

#[test]
fn test_jobs_lists_finished_job_as_done() {
    let temp_dir = generate_temp_directory().expect("unable to generate temp dir");
    let script = write_script(&temp_dir, "sleep 0.2 &\nsleep 0.6\njobs\nexit\n");
    Assert::cargo_binary("msh")
        .with_args(&[&script])
        .stdout()
        .contains("Done\tsleep 0.2 &")
        .unwrap();
}

#[test]
fn test_fg_with_no_jobs() {
    Assert::cargo_binary("msh")
        .with_args(&["-c", "fg"])
        .stdout()
        .is("fg: no jobs available")
        .unwrap();
}

#[test]
fn test_fg_promotes_background_job() {
    let temp_dir = generate_temp_directory().expect("unable to generate temp dir");
    let script = write_script(&temp_dir, "sleep 0.2 &\nfg 1\nexit\n");
    Assert::cargo_binary("msh")
        .with_args(&[&script])
        .stdout()
        .contains("sleep 0.2 &")
        .succeeds()
        .unwrap();
}
