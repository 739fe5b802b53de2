// Shared test helpers for integration tests.
#![allow(dead_code)]

use std::io::Write;
use std::path::PathBuf;
use std::process::Command;
use tempfile::NamedTempFile;

/// Installation variables stripped from the child environment so the host
/// cannot leak into results.
const INSTALL_VARIABLES: &[&str] = &[
    "SIGMADSP",
    "SIGMADSP_BACKEND",
    "CONFIGURATION_FOLDER",
    "CONFIGURATION_FILE",
    "DSP_TYPE",
    "DSP_PROTOCOL",
    "BUS_NUMBER",
    "DEVICE_ADDRESS",
    "PARAMETER_FILE",
    "TEMP_FOLDER",
];

pub fn binary_path() -> PathBuf {
    let path = PathBuf::from(env!("CARGO_BIN_EXE_sigmadsp-install"));
    assert!(path.exists(), "binary not found at {}", path.display());
    path
}

/// Runs the binary with the given args and extra environment.
/// Returns (stdout, stderr, exit_code).
pub fn run_with_env(args: &[&str], env: &[(&str, &str)]) -> (String, String, i32) {
    let mut cmd = Command::new(binary_path());
    cmd.args(args).env_remove("RUST_LOG");
    for name in INSTALL_VARIABLES {
        cmd.env_remove(name);
    }
    for (name, value) in env {
        cmd.env(name, value);
    }
    let output = cmd.output().expect("failed to execute binary");

    let stdout = String::from_utf8(output.stdout).expect("stdout not valid UTF-8");
    let stderr = String::from_utf8(output.stderr).expect("stderr not valid UTF-8");
    let exit_code = output.status.code().unwrap_or(-1);
    (stdout, stderr, exit_code)
}

pub fn run(args: &[&str]) -> (String, String, i32) {
    run_with_env(args, &[])
}

/// Writes `content` to a temp env script and returns it; keep it alive while
/// the binary runs.
pub fn env_script(content: &str) -> NamedTempFile {
    let mut tmpfile = NamedTempFile::new().expect("failed to create temp env script");
    tmpfile
        .write_all(content.as_bytes())
        .expect("failed to write env script");
    tmpfile
}

pub fn path_str(file: &NamedTempFile) -> String {
    file.path().to_str().unwrap().to_string()
}

/// Parses stdout as JSON.
pub fn parse_json(stdout: &str) -> serde_json::Value {
    serde_json::from_str(stdout.trim()).expect("stdout should be valid JSON")
}
