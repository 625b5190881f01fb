//! Utilities for capturing and verifying tracing output in integration tests.
//!
//! When tests spawn the binary with `GHEDIT_TRACE_FILE` set, trace events are
//! written in JSON format to that file. The mock store emits `tracing::info!` events
//! with target "mock_github" naming the request and the file it touched.

use std::{fs, path::PathBuf};

use serde::Deserialize;

/// A single trace event from the JSON log
#[derive(Debug, Deserialize)]
pub struct TraceEvent {
	pub level: String,
	/// The target module (e.g., "mock_github")
	pub target: String,
	pub fields: TraceFields,
}

#[derive(Debug, Deserialize)]
pub struct TraceFields {
	pub message: Option<String>,
	pub repo: Option<String>,
	pub path: Option<String>,
	/// Revision a write was based on
	pub sha: Option<String>,
	/// Set on block failures
	pub opcode: Option<String>,
	pub error: Option<String>,
}

/// Parsed trace log that provides verification methods
pub struct TraceLog {
	events: Vec<TraceEvent>,
}

impl TraceLog {
	pub fn from_file(path: &PathBuf) -> Self {
		let content = fs::read_to_string(path).unwrap_or_default();
		let events: Vec<TraceEvent> = content.lines().filter(|line| !line.is_empty()).filter_map(|line| serde_json::from_str(line).ok()).collect();

		Self { events }
	}

	/// How many times the mock served `method` for `repo`/`path`
	pub fn count_mock_calls(&self, method: &str, repo: &str, path: &str) -> usize {
		self.mock_calls()
			.into_iter()
			.filter(|e| {
				e.fields.message.as_deref() == Some(method) && e.fields.repo.as_deref() == Some(repo) && e.fields.path.as_deref() == Some(path)
			})
			.count()
	}

	pub fn has_mock_call(&self, method: &str, repo: &str, path: &str) -> bool {
		self.count_mock_calls(method, repo, path) > 0
	}

	/// Revision the most recent write to `repo`/`path` was based on
	pub fn last_write_sha(&self, repo: &str, path: &str) -> Option<String> {
		self.mock_calls()
			.into_iter()
			.rev()
			.find(|e| e.fields.message.as_deref() == Some("put_contents") && e.fields.repo.as_deref() == Some(repo) && e.fields.path.as_deref() == Some(path))
			.and_then(|e| e.fields.sha.clone())
	}

	pub fn mock_calls(&self) -> Vec<&TraceEvent> {
		self.events.iter().filter(|e| e.target == "mock_github").collect()
	}

	/// Failed blocks, as `(opcode, error)`
	pub fn block_failures(&self) -> Vec<(String, String)> {
		self.events
			.iter()
			.filter(|e| e.level == "ERROR" && e.fields.message.as_deref() == Some("block failed"))
			.map(|e| (e.fields.opcode.clone().unwrap_or_default(), e.fields.error.clone().unwrap_or_default()))
			.collect()
	}
}

/// Assert that the mock served a request for the given file
#[macro_export]
macro_rules! assert_traced {
	($log:expr, $method:expr, $repo:expr, $path:expr) => {
		assert!(
			$log.has_mock_call($method, $repo, $path),
			"Expected mock call '{}' for {}/{} to be traced, but it wasn't. Mock calls:\n{:#?}",
			$method,
			$repo,
			$path,
			$log.mock_calls()
		);
	};
}

/// Assert that the mock never served a request of this kind for the given file
#[macro_export]
macro_rules! assert_not_traced {
	($log:expr, $method:expr, $repo:expr, $path:expr) => {
		assert!(
			!$log.has_mock_call($method, $repo, $path),
			"Expected no '{}' call for {}/{}, got:\n{:#?}",
			$method,
			$repo,
			$path,
			$log.mock_calls()
		);
	};
}
