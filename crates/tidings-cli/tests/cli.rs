//! End-to-end tests running the `tidings` binary.

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;

/// Test context that sets up a temporary tidings home
struct TestContext {
    temp_dir: TempDir,
    tidings_home: PathBuf,
}

impl TestContext {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let tidings_home = temp_dir.path().join(".tidings");
        std::fs::create_dir_all(&tidings_home).expect("failed to create tidings home");
        Self {
            temp_dir,
            tidings_home,
        }
    }

    fn tidings_cmd(&self) -> Command {
        let bin_path = env!("CARGO_BIN_EXE_tidings");
        let mut cmd = Command::new(bin_path);
        cmd.env("HOME", self.temp_dir.path());
        cmd.env("TIDINGS_HOME", &self.tidings_home);
        cmd.env_remove("TIDINGS_CONFIG");
        cmd.env_remove("RUST_LOG");
        cmd
    }

    fn write_plan(&self, text: &str) -> PathBuf {
        let path = self.temp_dir.path().join("plan.toml");
        std::fs::write(&path, text).expect("failed to write plan");
        path
    }

    /// Run `simulate` on `plan`, feeding `input` on stdin.
    fn simulate(&self, plan: &str, args: &[&str], input: &str) -> Output {
        let plan_path = self.write_plan(plan);
        let mut child = self
            .tidings_cmd()
            .arg("--no-color")
            .args(args)
            .arg("simulate")
            .arg(&plan_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .expect("failed to run tidings");
        // The child may exit without reading stdin (e.g. unattended runs),
        // so a broken pipe here is not an error.
        if let Err(err) = child
            .stdin
            .take()
            .expect("stdin is piped")
            .write_all(input.as_bytes())
        {
            assert_eq!(
                err.kind(),
                std::io::ErrorKind::BrokenPipe,
                "failed to write stdin: {err}"
            );
        }
        child.wait_with_output().expect("failed to wait for tidings")
    }
}

const FLAKY_PLAN: &str = r#"
steps = 2

[[source]]
alias = "oss"
url = "https://download.example.org/oss"
candidates = ["plaindir"]
detected = "rpm-md"

[[source.task]]
name = "Reading index"

[[package]]
name = "vim"
version = "9.1.0-3"
archive_size = 2097152
installed_size = 5242880
failures = ["connection reset"]

[[package]]
name = "jq"
version = "1.7"
"#;

#[test]
fn test_help_command() {
    let ctx = TestContext::new();
    let output = ctx
        .tidings_cmd()
        .arg("--help")
        .output()
        .expect("failed to run tidings");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage:"));
    assert!(stdout.contains("simulate"));
}

#[test]
fn test_clean_run() {
    let ctx = TestContext::new();
    let plan = FLAKY_PLAN.replace("failures = [\"connection reset\"]", "");
    let output = ctx.simulate(&plan, &[], "");
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("2 downloaded, 0 skipped"));
    assert!(stdout.contains("RESULT {"));
    assert!(stdout.contains("\"status\":\"success\""));

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Determining https://download.example.org/oss source type..."));
    assert!(stderr.contains(".. not plaindir"));
    assert!(stderr.contains("Downloading: vim-9.1.0-3, 2.0 MB (5.0 MB unpacked)"));
    assert!(stderr.contains("Downloading vim [100%] [done]"));
    assert!(!stderr.contains("Abort, retry, ignore?"));
}

#[test]
fn test_interactive_retry() {
    let ctx = TestContext::new();
    let output = ctx.simulate(FLAKY_PLAN, &[], "r\n");
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("2 downloaded, 0 skipped"));

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(stderr.matches("Abort, retry, ignore? [a/r/i] (a): ").count(), 1);
    assert!(stderr.contains("i/o error: connection reset"));
    assert_eq!(stderr.matches("Downloading vim [100%] [done]").count(), 1);
}

#[test]
fn test_closed_input_aborts() {
    let ctx = TestContext::new();
    let output = ctx.simulate(FLAKY_PLAN, &[], "");
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("0 downloaded, 0 skipped, aborted"));
    assert!(stdout.contains("\"status\":\"aborted\""));

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!stderr.contains("Downloading jq"));
}

#[test]
fn test_unattended_ignore() {
    let ctx = TestContext::new();
    let output = ctx.simulate(FLAKY_PLAN, &["--non-interactive", "--decision", "ignore"], "r\n");
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("1 downloaded, 1 skipped"));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!stderr.contains("Abort, retry, ignore?"));
}

#[test]
fn test_config_file_makes_run_unattended() {
    let ctx = TestContext::new();
    std::fs::write(
        ctx.tidings_home.join("config.toml"),
        "interactive = false\nunattended_decision = \"ignore\"\n",
    )
    .expect("failed to write config");

    let output = ctx.simulate(FLAKY_PLAN, &[], "r\n");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("1 downloaded, 1 skipped"));
}

#[test]
fn test_failed_probe_is_fatal() {
    let ctx = TestContext::new();
    let plan = r#"
[[source]]
alias = "bad"
url = "https://example.org/nothing"
candidates = ["rpm-md", "plaindir"]
reason = "no metadata found"

[[package]]
name = "vim"
version = "9.1"
"#;
    let output = ctx.simulate(plan, &[], "r\n");
    assert!(!output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"status\":\"fatal\""));
    assert!(!stdout.contains("downloaded"));

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid format: no metadata found"));
    assert!(!stderr.contains("Abort, retry, ignore?"));
    assert!(!stderr.contains("Downloading vim"));
}

#[test]
fn test_missing_plan_fails() {
    let ctx = TestContext::new();
    let output = ctx
        .tidings_cmd()
        .arg("simulate")
        .arg(ctx.temp_dir.path().join("nope.toml"))
        .output()
        .expect("failed to run tidings");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Failed to read plan"));
}

#[test]
fn test_config_command() {
    let ctx = TestContext::new();
    let output = ctx
        .tidings_cmd()
        .args(["--non-interactive", "--no-color", "config"])
        .output()
        .expect("failed to run tidings");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("interactive = false"));
    assert!(stdout.contains("color = false"));
}
