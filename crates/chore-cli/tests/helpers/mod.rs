use assert_cmd::Command;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Test harness for running CLI commands against a temporary database.
///
/// Commands run inside the temp directory so no stray `chore.toml` is picked
/// up, and push credentials are stripped from the environment.
pub struct CliTestHarness {
    temp_dir: TempDir,
    db_path: PathBuf,
}

impl CliTestHarness {
    pub fn new() -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("test.db");

        Self { temp_dir, db_path }
    }

    /// Get a Command instance configured for testing
    pub fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("chore").expect("Failed to find chore binary");
        cmd.current_dir(self.temp_dir.path())
            .env("CHORE_DATABASE_PATH", &self.db_path)
            .env("CHORE_DEFAULT_TIMEZONE", "UTC")
            .env_remove("CHORE_PUSH__API_KEY")
            .env_remove("RUST_LOG");
        cmd
    }

    pub fn dir(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn run_success(&self, args: &[&str]) -> assert_cmd::assert::Assert {
        self.command().args(args).assert().success()
    }

    pub fn run_failure(&self, args: &[&str]) -> assert_cmd::assert::Assert {
        self.command().args(args).assert().failure()
    }

    /// Runs a creating command and returns the ID it printed.
    pub fn create(&self, args: &[&str]) -> String {
        let output = self.run_success(args).get_output().stdout.clone();
        extract_id(&String::from_utf8_lossy(&output))
    }
}

/// Pulls the UUID out of "... with ID <uuid>".
pub fn extract_id(stdout: &str) -> String {
    stdout
        .lines()
        .find_map(|line| line.split("with ID ").nth(1))
        .map(|id| id.trim().to_string())
        .unwrap_or_else(|| panic!("no ID in output: {stdout}"))
}

/// A household with two members and a weekly task, created through the CLI.
pub struct Flat {
    pub household: String,
    pub alice: String,
    pub bob: String,
    pub bins: String,
}

impl Flat {
    pub fn create(harness: &CliTestHarness) -> Self {
        let household = harness.create(&["household", "add", "Flat", "--timezone", "Europe/Zurich"]);
        let alice = harness.create(&["member", "add", &household, "Alice"]);
        let bob = harness.create(&["member", "add", &household, "Bob"]);
        let bins = harness.create(&[
            "task", "add", &household, "Bins",
            "--due", "2024-03-01",
            "--every", "weekly",
            "--primary", &alice,
            "--secondary", &bob,
        ]);

        Self { household, alice, bob, bins }
    }
}
