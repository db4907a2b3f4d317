use std::{
    io::Write,
    process::{Command, Output, Stdio},
};

use tempfile::TempDir;

/// A `bw` binary pointed at its own throwaway state directory.
pub struct Bw {
    dir: TempDir,
}

impl Bw {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("Failed to create temp dir"),
        }
    }

    /// Create a new bw CLI command
    pub fn command(&self) -> Command {
        let mut command = Command::new(env!("CARGO_BIN_EXE_bw"));
        command
            .env("BITWARDENCLI_APPDATA_DIR", self.dir.path())
            .env("BW_NOINTERACTION", "true")
            .env_remove("BW_SESSION")
            .env_remove("BW_RESPONSE")
            .env_remove("BW_RAW")
            .env_remove("BW_QUIET")
            .env_remove("BW_CLEANEXIT")
            .stdin(Stdio::null());
        command
    }

    pub fn run(&self, args: &[&str]) -> Output {
        self.command()
            .args(args)
            .output()
            .expect("Failed to execute bw command")
    }

    /// Run with `input` piped through stdin.
    pub fn run_with_stdin(&self, args: &[&str], input: &str) -> Output {
        let mut child = self
            .command()
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .expect("Failed to spawn bw command");
        child
            .stdin
            .take()
            .expect("stdin is piped")
            .write_all(input.as_bytes())
            .expect("Failed to write stdin");
        child.wait_with_output().expect("Failed to wait for bw")
    }
}

pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}
