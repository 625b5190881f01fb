//! Errors returned by remote-file operations.
//!
//! Uses miette so the binary can render them with codes and help text.

use miette::Diagnostic;

/// Error type for every operation against the contents store.
#[derive(Debug, Diagnostic, thiserror::Error)]
pub enum EditorError {
	#[error("GitHub token not set")]
	#[diagnostic(
		code(ghedit::unauthenticated),
		help("pass --token, set GHEDIT_GITHUB_TOKEN, add `github_token` to the config file, or run `ghedit set-token <TOKEN>`")
	)]
	Unauthenticated,

	#[error("GitHub API error: {status}")]
	#[diagnostic(code(ghedit::remote))]
	Remote { status: u16, body: String },

	#[error("file content is not valid base64")]
	#[diagnostic(code(ghedit::decode))]
	Decode(#[from] base64::DecodeError),

	#[error("file content is not valid UTF-8")]
	#[diagnostic(code(ghedit::decode::utf8), help("only text files can be read and edited line by line"))]
	NotUtf8(#[from] std::string::FromUtf8Error),

	#[error("request to GitHub failed")]
	#[diagnostic(code(ghedit::transport))]
	Transport(#[from] reqwest::Error),
}

impl EditorError {
	/// HTTP status of a rejected request, if the store answered at all.
	pub fn status(&self) -> Option<u16> {
		match self {
			EditorError::Remote { status, .. } => Some(*status),
			EditorError::Transport(e) => e.status().map(|s| s.as_u16()),
			_ => None,
		}
	}

	/// The store rejected a write because the revision tag was stale or missing.
	pub fn is_conflict(&self) -> bool {
		self.status() == Some(409)
	}

	pub fn is_not_found(&self) -> bool {
		self.status() == Some(404)
	}
}

pub type Result<T, E = EditorError> = std::result::Result<T, E>;
