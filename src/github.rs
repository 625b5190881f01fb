use std::{fmt, sync::Arc, time::Duration};

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use color_eyre::eyre::{Result as EyreResult, WrapErr as _};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::{
	config::AppConfig,
	error::{EditorError, Result},
};

pub const ACCEPT_HEADER: &str = "application/vnd.github.v3+json";

/// A file in a repository: `owner/name` plus a path inside it.
/// Neither part is validated; malformed values surface as errors from the store.
#[derive(Clone, Debug, Eq, Hash, PartialEq, derive_new::new)]
pub struct FileLocator {
	#[new(into)]
	pub repo: String,
	#[new(into)]
	pub path: String,
}

impl fmt::Display for FileLocator {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}/{}", self.repo, self.path)
	}
}

/// Personal access token, sent as `Authorization: token <credential>`.
#[derive(Clone, Eq, PartialEq, derive_more::From)]
pub struct Credential(String);

impl Credential {
	pub fn new(token: impl Into<String>) -> Self {
		Self(token.into())
	}

	pub fn expose(&self) -> &str {
		&self.0
	}

	pub fn auth_header(&self) -> String {
		format!("token {}", self.0)
	}
}

impl fmt::Debug for Credential {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("Credential(<redacted>)")
	}
}

/// Opaque revision tag (blob sha) the store hands out on read and checks on write.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize, derive_more::Display, derive_more::From)]
#[serde(transparent)]
pub struct Revision(pub String);

impl From<&str> for Revision {
	fn from(s: &str) -> Self {
		Self(s.to_string())
	}
}

/// Response of `GET /repos/{repo}/contents/{path}` for a file
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ContentsFile {
	/// Base64, possibly broken into lines
	pub content: String,
	pub sha: Revision,
}

/// Body of `PUT /repos/{repo}/contents/{path}`
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct PutContentsRequest {
	pub message: String,
	/// Base64 of the UTF-8 bytes
	pub content: String,
	/// Absent when creating a file
	#[serde(skip_serializing_if = "Option::is_none", default)]
	pub sha: Option<Revision>,
}

impl PutContentsRequest {
	pub fn new(message: impl Into<String>, text: &str, sha: Option<Revision>) -> Self {
		Self {
			message: message.into(),
			content: encode_content(text),
			sha,
		}
	}
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PutContentsResponse {
	pub content: BlobRef,
	pub commit: CommitRef,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct BlobRef {
	pub sha: Revision,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CommitRef {
	pub sha: Option<String>,
}

/// Decoded file fetched from the store
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RemoteFile {
	pub content: String,
	pub revision: Revision,
}

impl TryFrom<ContentsFile> for RemoteFile {
	type Error = EditorError;

	fn try_from(file: ContentsFile) -> Result<Self> {
		Ok(Self {
			content: decode_content(&file.content)?,
			revision: file.sha,
		})
	}
}

/// What a successful write left behind
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct WriteReceipt {
	/// Revision of the newly written blob; pass it to the next write to chain edits
	pub revision: Revision,
	pub commit: Option<String>,
}

impl From<PutContentsResponse> for WriteReceipt {
	fn from(r: PutContentsResponse) -> Self {
		Self {
			revision: r.content.sha,
			commit: r.commit.sha,
		}
	}
}

/// Decode the transport encoding. Whitespace (GitHub wraps at 60 columns) is ignored.
pub fn decode_content(encoded: &str) -> Result<String> {
	let compact: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();
	let bytes = STANDARD.decode(compact)?;
	Ok(String::from_utf8(bytes)?)
}

pub fn encode_content(text: &str) -> String {
	STANDARD.encode(text.as_bytes())
}

//==============================================================================
// Contents Client Trait
//==============================================================================

/// The two calls of the GitHub Contents API the editor relies on.
/// Implemented by the real HTTP client and by an in-memory mock.
#[async_trait]
pub trait ContentsClient: Send + Sync {
	/// Fetch a file's encoded content and revision
	async fn get_contents(&self, credential: &Credential, locator: &FileLocator) -> Result<ContentsFile>;

	/// Create or update a file. The store rejects a stale or missing `sha` for an existing file with 409.
	async fn put_contents(&self, credential: &Credential, locator: &FileLocator, request: &PutContentsRequest) -> Result<PutContentsResponse>;
}

//==============================================================================
// Real GitHub Client Implementation
//==============================================================================

/// Real GitHub API client that makes HTTP requests
pub struct RealGitHubClient {
	http_client: Client,
	api_url: String,
}

impl RealGitHubClient {
	pub fn new(config: &AppConfig) -> EyreResult<Self> {
		let mut builder = Client::builder().user_agent(config.user_agent.clone());
		if let Some(secs) = config.timeout_secs {
			builder = builder.timeout(Duration::from_secs(secs));
		}
		let http_client = builder.build().wrap_err("Failed to create HTTP client")?;

		Ok(Self {
			http_client,
			api_url: config.api_url.trim_end_matches('/').to_string(),
		})
	}

	fn contents_url(&self, locator: &FileLocator) -> String {
		format!("{}/repos/{}/contents/{}", self.api_url, locator.repo, locator.path)
	}
}

async fn remote_error(res: reqwest::Response) -> EditorError {
	let status = res.status().as_u16();
	let body = res.text().await.unwrap_or_default();
	EditorError::Remote { status, body }
}

#[async_trait]
impl ContentsClient for RealGitHubClient {
	#[instrument(skip(self, credential, locator), fields(%locator))]
	async fn get_contents(&self, credential: &Credential, locator: &FileLocator) -> Result<ContentsFile> {
		let api_url = self.contents_url(locator);
		debug!(%api_url, "fetching file");

		let res = self
			.http_client
			.get(&api_url)
			.header("Accept", ACCEPT_HEADER)
			.header("Authorization", credential.auth_header())
			.send()
			.await?;

		if !res.status().is_success() {
			return Err(remote_error(res).await);
		}

		let file = res.json::<ContentsFile>().await?;
		Ok(file)
	}

	#[instrument(skip(self, credential, locator, request), fields(%locator, has_sha = request.sha.is_some()))]
	async fn put_contents(&self, credential: &Credential, locator: &FileLocator, request: &PutContentsRequest) -> Result<PutContentsResponse> {
		let api_url = self.contents_url(locator);
		debug!(%api_url, "writing file");

		let res = self
			.http_client
			.put(&api_url)
			.header("Accept", ACCEPT_HEADER)
			.header("Authorization", credential.auth_header())
			.header("Content-Type", "application/json")
			.json(request)
			.send()
			.await?;

		if !res.status().is_success() {
			return Err(remote_error(res).await);
		}

		let written = res.json::<PutContentsResponse>().await?;
		Ok(written)
	}
}

//==============================================================================
// Convenience type alias for boxed client
//==============================================================================

pub type BoxedContentsClient = Arc<dyn ContentsClient>;

/// Create the HTTP-backed client from config.
pub fn create_client(config: &AppConfig) -> EyreResult<BoxedContentsClient> {
	Ok(Arc::new(RealGitHubClient::new(config)?))
}
