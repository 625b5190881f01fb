//! Mock contents store for testing purposes.
//!
//! This module provides a mock implementation of the ContentsClient trait that keeps
//! all files in memory and can be used for integration testing without hitting the real API.
//!
//! When `GHEDIT_MOCK_STATE` points at a JSON file, the initial state is loaded from it and
//! every successful write is saved back, so a test can inspect the result after the binary exits.

use std::{
	collections::HashMap,
	path::PathBuf,
	sync::{
		Mutex,
		atomic::{AtomicU64, Ordering},
	},
};

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use color_eyre::eyre::{Result as EyreResult, WrapErr as _};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::{
	error::{EditorError, Result},
	github::{BlobRef, CommitRef, ContentsClient, ContentsFile, Credential, FileLocator, PutContentsRequest, PutContentsResponse, Revision},
};

pub const MOCK_STATE_ENV: &str = "GHEDIT_MOCK_STATE";

/// Internal representation of a stored file
#[derive(Clone, Debug)]
struct MockFileData {
	bytes: Vec<u8>,
	sha: Revision,
}

/// On-disk shape of the mock state
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct MockState {
	/// Token every request must carry. Any token is accepted when absent.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub token: Option<String>,
	#[serde(default)]
	pub files: Vec<MockStateFile>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct MockStateFile {
	pub repo: String,
	pub path: String,
	pub content: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub sha: Option<String>,
}

/// Mock contents store that keeps all state in memory.
/// Thread-safe for use in async contexts.
pub struct MockGitHubClient {
	/// Token requests must present; `None` accepts anything
	required_token: Mutex<Option<String>>,

	/// Counter for generating revision tags
	next_revision: AtomicU64,

	/// Counter for generating commit shas
	next_commit: AtomicU64,

	/// All files, keyed by locator
	files: Mutex<HashMap<FileLocator, MockFileData>>,

	/// Status to answer the next request with, instead of serving it
	fail_next: Mutex<Option<u16>>,

	/// Where to persist state after writes
	state_file: Option<PathBuf>,

	/// Call log for debugging
	call_log: Mutex<Vec<String>>,
}

impl Default for MockGitHubClient {
	fn default() -> Self {
		Self::new()
	}
}

impl MockGitHubClient {
	pub fn new() -> Self {
		Self {
			required_token: Mutex::new(None),
			next_revision: AtomicU64::new(1),
			next_commit: AtomicU64::new(1),
			files: Mutex::new(HashMap::new()),
			fail_next: Mutex::new(None),
			state_file: None,
			call_log: Mutex::new(Vec::new()),
		}
	}

	/// Create a mock backed by the file named in `GHEDIT_MOCK_STATE`, if set.
	pub fn from_env() -> EyreResult<Self> {
		match std::env::var(MOCK_STATE_ENV) {
			Ok(path) => Self::with_state_file(PathBuf::from(path)),
			Err(_) => Ok(Self::new()),
		}
	}

	/// Load state from `path` (a missing file is an empty store) and save back to it after each write.
	pub fn with_state_file(path: PathBuf) -> EyreResult<Self> {
		let mut client = Self::new();
		if path.exists() {
			let content = std::fs::read_to_string(&path).wrap_err_with(|| format!("Failed to read mock state from {}", path.display()))?;
			let state: MockState = serde_json::from_str(&content).wrap_err("Mock state is not valid JSON")?;
			client.load_state(state);
			tracing::debug!(path = %path.display(), "loaded mock state");
		}
		client.state_file = Some(path);
		Ok(client)
	}

	fn load_state(&self, state: MockState) {
		*self.required_token.lock().unwrap() = state.token;
		// Revisions must stay unique across runs sharing one state file
		let highest = state.files.iter().filter_map(|f| f.sha.as_deref().and_then(|s| u64::from_str_radix(s, 16).ok())).max();
		if let Some(n) = highest {
			self.next_revision.fetch_max(n.saturating_add(1), Ordering::SeqCst);
		}
		for file in state.files {
			let locator = FileLocator::new(file.repo, file.path);
			let sha = file.sha.map(Revision).unwrap_or_else(|| self.new_revision());
			self.files.lock().unwrap().insert(locator, MockFileData { bytes: file.content.into_bytes(), sha });
		}
	}

	/// Snapshot of the current state, in the same shape `with_state_file` reads
	pub fn snapshot(&self) -> MockState {
		let files = self.files.lock().unwrap();
		let mut entries: Vec<MockStateFile> = files
			.iter()
			.map(|(locator, data)| MockStateFile {
				repo: locator.repo.clone(),
				path: locator.path.clone(),
				content: String::from_utf8_lossy(&data.bytes).into_owned(),
				sha: Some(data.sha.0.clone()),
			})
			.collect();
		entries.sort_by(|a, b| (&a.repo, &a.path).cmp(&(&b.repo, &b.path)));

		MockState {
			token: self.required_token.lock().unwrap().clone(),
			files: entries,
		}
	}

	fn persist(&self) {
		let Some(path) = &self.state_file else { return };
		let state = self.snapshot();
		match serde_json::to_string_pretty(&state) {
			Ok(json) => {
				if let Err(e) = std::fs::write(path, json) {
					tracing::error!(path = %path.display(), error = %e, "failed to save mock state");
				}
			}
			Err(e) => tracing::error!(error = %e, "failed to serialize mock state"),
		}
	}

	/// Add a file to the mock state. Returns its revision.
	pub fn add_file(&self, repo: &str, path: &str, content: impl Into<Vec<u8>>) -> Revision {
		let sha = self.new_revision();
		let data = MockFileData { bytes: content.into(), sha: sha.clone() };
		self.files.lock().unwrap().insert(FileLocator::new(repo, path), data);
		sha
	}

	/// Change a file behind the editor's back, as a concurrent writer would
	pub fn overwrite_file(&self, repo: &str, path: &str, content: impl Into<Vec<u8>>) -> Revision {
		self.add_file(repo, path, content)
	}

	/// Current text of a file, if it exists
	pub fn file_content(&self, repo: &str, path: &str) -> Option<String> {
		let files = self.files.lock().unwrap();
		files.get(&FileLocator::new(repo, path)).map(|f| String::from_utf8_lossy(&f.bytes).into_owned())
	}

	pub fn file_revision(&self, repo: &str, path: &str) -> Option<Revision> {
		let files = self.files.lock().unwrap();
		files.get(&FileLocator::new(repo, path)).map(|f| f.sha.clone())
	}

	/// Reject every request whose token differs from `token`
	pub fn require_token(&self, token: &str) {
		*self.required_token.lock().unwrap() = Some(token.to_string());
	}

	/// Answer the next request with `status` instead of serving it
	pub fn fail_next_request(&self, status: u16) {
		*self.fail_next.lock().unwrap() = Some(status);
	}

	/// Get the call log for debugging
	pub fn get_call_log(&self) -> Vec<String> {
		self.call_log.lock().unwrap().clone()
	}

	/// Clear the call log
	pub fn clear_call_log(&self) {
		self.call_log.lock().unwrap().clear();
	}

	fn log_call(&self, call: &str) {
		self.call_log.lock().unwrap().push(call.to_string());
	}

	fn new_revision(&self) -> Revision {
		Revision(format!("{:040x}", self.next_revision.fetch_add(1, Ordering::SeqCst)))
	}

	/// Shared gate for every request: injected failures first, then auth.
	fn check_request(&self, credential: &Credential) -> Result<()> {
		if let Some(status) = self.fail_next.lock().unwrap().take() {
			return Err(EditorError::Remote {
				status,
				body: "injected failure".to_string(),
			});
		}
		if let Some(required) = self.required_token.lock().unwrap().as_deref()
			&& required != credential.expose()
		{
			return Err(EditorError::Remote {
				status: 401,
				body: r#"{"message":"Bad credentials"}"#.to_string(),
			});
		}
		Ok(())
	}
}

/// Base64 broken into 60-column lines, the way GitHub serves it
fn wrap_base64(bytes: &[u8]) -> String {
	let encoded = STANDARD.encode(bytes);
	let mut wrapped = String::with_capacity(encoded.len() + encoded.len() / 60 + 1);
	for chunk in encoded.as_bytes().chunks(60) {
		wrapped.push_str(std::str::from_utf8(chunk).unwrap_or_default());
		wrapped.push('\n');
	}
	wrapped
}

#[async_trait]
impl ContentsClient for MockGitHubClient {
	#[instrument(skip(self, credential), name = "MockGitHubClient::get_contents")]
	async fn get_contents(&self, credential: &Credential, locator: &FileLocator) -> Result<ContentsFile> {
		tracing::info!(target: "mock_github", repo = %locator.repo, path = %locator.path, "get_contents");
		self.log_call(&format!("get_contents({}, {})", locator.repo, locator.path));
		self.check_request(credential)?;

		let files = self.files.lock().unwrap();
		let file = files.get(locator).ok_or_else(|| EditorError::Remote {
			status: 404,
			body: r#"{"message":"Not Found"}"#.to_string(),
		})?;

		Ok(ContentsFile {
			content: wrap_base64(&file.bytes),
			sha: file.sha.clone(),
		})
	}

	#[instrument(skip(self, credential, request), name = "MockGitHubClient::put_contents")]
	async fn put_contents(&self, credential: &Credential, locator: &FileLocator, request: &PutContentsRequest) -> Result<PutContentsResponse> {
		tracing::info!(
			target: "mock_github",
			repo = %locator.repo,
			path = %locator.path,
			sha = request.sha.as_ref().map(|s| s.0.as_str()),
			"put_contents"
		);
		self.log_call(&format!("put_contents({}, {}, <content>)", locator.repo, locator.path));
		self.check_request(credential)?;

		let bytes = STANDARD.decode(&request.content).map_err(|_| EditorError::Remote {
			status: 422,
			body: r#"{"message":"content is not valid Base64"}"#.to_string(),
		})?;

		let sha = {
			let mut files = self.files.lock().unwrap();
			let current = files.get(locator).map(|f| &f.sha);
			// Existing files need the current sha; new files must not claim one
			if current != request.sha.as_ref() {
				return Err(EditorError::Remote {
					status: 409,
					body: format!(r#"{{"message":"{} does not match"}}"#, request.sha.as_ref().map(|s| s.0.as_str()).unwrap_or("sha")),
				});
			}

			let sha = self.new_revision();
			files.insert(locator.clone(), MockFileData { bytes, sha: sha.clone() });
			sha
		};
		self.persist();

		let commit = format!("{:040x}", 0xc0ffee_u64 + self.next_commit.fetch_add(1, Ordering::SeqCst));
		Ok(PutContentsResponse {
			content: BlobRef { sha },
			commit: CommitRef { sha: Some(commit) },
		})
	}
}
