//! Shared test infrastructure for integration tests.
//!
//! Provides `TestContext`, which handles:
//! - XDG directory setup with proper environment variables
//! - Running commands against the compiled binary in `--mock` mode
//! - Mock store state, seeded before a run and read back after it
//! - Optional JSON trace capture
//!
//! # Example
//!
//! ```ignore
//! let ctx = TestContext::new("");
//! ctx.seed(TOKEN, &[("owner/repo", "notes.md", "a\nb")]);
//!
//! let out = ctx.run(&["--token", TOKEN, "get-line", "owner/repo", "notes.md", "2"]);
//! assert!(out.status.success());
//! ```

use std::{
	io::Write as _,
	path::PathBuf,
	process::{Command, ExitStatus, Stdio},
};

use serde_json::{Value, json};
use v_fixtures::{Fixture, fs_standards::xdg::Xdg};

use crate::tracing_utils::TraceLog;

pub const TOKEN: &str = "ghp_test_token";
pub const REPO: &str = "owner/repo";

pub struct RunOutput {
	pub status: ExitStatus,
	pub stdout: String,
	pub stderr: String,
}

pub struct TestContext {
	/// The Xdg wrapper managing temp directories
	pub xdg: Xdg,
	/// Path to mock store state, shared by every run in this context
	pub mock_state_path: PathBuf,
	/// JSON trace output of the most recent run
	pub trace_file: PathBuf,
}

impl TestContext {
	/// Create a new test context from a fixture string.
	///
	/// Files in the fixture should use XDG category prefixes, e.g.
	/// `/state/token` → `XDG_STATE_HOME/ghedit/token`.
	pub fn new(fixture_str: &str) -> Self {
		let fixture = Fixture::parse(fixture_str);
		let xdg = Xdg::new(fixture.write_to_tempdir(), env!("CARGO_PKG_NAME"));

		let mock_state_path = xdg.inner.root.join("mock_state.json");
		let trace_file = xdg.inner.root.join("trace.jsonl");

		Self { xdg, mock_state_path, trace_file }
	}

	/// Seed the mock store. `token` becomes the only token it accepts.
	pub fn seed(&self, token: &str, files: &[(&str, &str, &str)]) {
		let files: Vec<Value> = files.iter().map(|(repo, path, content)| json!({ "repo": repo, "path": path, "content": content })).collect();
		self.setup_mock_state(&json!({ "token": token, "files": files }));
	}

	pub fn setup_mock_state(&self, state: &Value) {
		std::fs::write(&self.mock_state_path, serde_json::to_string_pretty(state).unwrap()).unwrap();
	}

	/// Current content of a file in the mock store
	pub fn remote_content(&self, repo: &str, path: &str) -> Option<String> {
		let state: Value = serde_json::from_str(&std::fs::read_to_string(&self.mock_state_path).ok()?).ok()?;
		state["files"]
			.as_array()?
			.iter()
			.find(|f| f["repo"] == repo && f["path"] == path)
			.and_then(|f| f["content"].as_str())
			.map(str::to_owned)
	}

	pub fn write_config(&self, toml: &str) -> PathBuf {
		let path = self.xdg.inner.root.join("custom_config.toml");
		std::fs::write(&path, toml).unwrap();
		path
	}

	fn command(&self, args: &[&str]) -> Command {
		let mut cmd = Command::new(env!("CARGO_BIN_EXE_ghedit"));
		cmd.arg("--mock").args(args);
		for (key, value) in self.xdg.env_vars() {
			cmd.env(key, value);
		}
		cmd.env("GHEDIT_MOCK_STATE", &self.mock_state_path);
		cmd.env("GHEDIT_TRACE_FILE", &self.trace_file);
		cmd.env_remove("GHEDIT_GITHUB_TOKEN");
		cmd.env_remove("GHEDIT_API_URL");
		cmd.env_remove("RUST_LOG");
		cmd
	}

	/// Run a command against the mock store with proper XDG environment.
	pub fn run(&self, args: &[&str]) -> RunOutput {
		self.run_with(args, &[], None)
	}

	/// Same as `run`, with extra environment and optional stdin
	pub fn run_with(&self, args: &[&str], env: &[(&str, &str)], stdin: Option<&str>) -> RunOutput {
		let mut cmd = self.command(args);
		for (key, value) in env {
			cmd.env(key, value);
		}
		cmd.stdin(Stdio::piped());
		cmd.stdout(Stdio::piped());
		cmd.stderr(Stdio::piped());

		let mut child = cmd.spawn().unwrap();
		{
			let mut pipe = child.stdin.take().unwrap();
			if let Some(input) = stdin {
				pipe.write_all(input.as_bytes()).unwrap();
			}
		}
		let output = child.wait_with_output().unwrap();
		RunOutput {
			status: output.status,
			stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
			stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
		}
	}

	/// Trace log of the most recent run
	pub fn trace(&self) -> TraceLog {
		TraceLog::from_file(&self.trace_file)
	}
}
