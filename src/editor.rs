//! Read-modify-write editing of single files in a remote repository.
//!
//! Every operation is one linear request/transform/request sequence. Writes are guarded by the
//! store's revision tag: the editor never retries, a concurrent change comes back as a 409.

use tracing::{debug, info, instrument};

use crate::{
	error::{EditorError, Result},
	github::{BoxedContentsClient, Credential, FileLocator, PutContentsRequest, RemoteFile, Revision, WriteReceipt},
	lines::{self, LineEdit},
};

/// Result of a line-level edit
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum EditOutcome {
	/// The edit changed the content and was committed
	Applied(WriteReceipt),
	/// The line number was out of range; nothing was written
	Skipped,
}

impl EditOutcome {
	pub fn is_applied(&self) -> bool {
		matches!(self, EditOutcome::Applied(_))
	}
}

/// A session against the contents store: the client plus the token used on every call.
pub struct RepositoryFileEditor {
	client: BoxedContentsClient,
	credential: Option<Credential>,
}

impl RepositoryFileEditor {
	pub fn new(client: BoxedContentsClient, credential: Option<Credential>) -> Self {
		Self { client, credential }
	}

	/// Replace the token used by all subsequent calls.
	pub fn set_credential(&mut self, token: impl Into<String>) {
		self.credential = Some(Credential::new(token));
	}

	pub fn clear_credential(&mut self) {
		self.credential = None;
	}

	pub fn has_credential(&self) -> bool {
		self.credential.is_some()
	}

	fn credential(&self) -> Result<&Credential> {
		self.credential.as_ref().ok_or(EditorError::Unauthenticated)
	}

	/// Fetch and decode a file along with its revision tag.
	#[instrument(skip(self, locator), fields(%locator))]
	pub async fn fetch_file(&self, locator: &FileLocator) -> Result<RemoteFile> {
		let credential = self.credential()?;
		let file = self.client.get_contents(credential, locator).await?;
		RemoteFile::try_from(file)
	}

	/// Decoded text of a file, verbatim (trailing newline included).
	pub async fn fetch_content(&self, locator: &FileLocator) -> Result<String> {
		Ok(self.fetch_file(locator).await?.content)
	}

	/// Text of one line. `line_number` is clamped into `[1, count]`.
	pub async fn fetch_line(&self, locator: &FileLocator, line_number: i64) -> Result<String> {
		let content = self.fetch_content(locator).await?;
		Ok(lines::line_at(&content, line_number))
	}

	/// Create or overwrite a file.
	///
	/// Reads the current revision first; if that read fails for any reason (most commonly 404), the write is
	/// sent without one, which the store treats as a create. Not atomic: a writer slipping in between the
	/// two requests is only caught by the store's revision check.
	#[instrument(skip(self, locator, content), fields(%locator))]
	pub async fn write_content(&self, locator: &FileLocator, content: &str, message: &str) -> Result<WriteReceipt> {
		let credential = self.credential()?;

		let revision = match self.client.get_contents(credential, locator).await {
			Ok(file) => Some(file.sha),
			Err(e) => {
				debug!(error = %e, "no current revision, writing without one");
				None
			}
		};

		self.write_content_at(locator, content, message, revision.as_ref()).await
	}

	/// Conditional write: succeeds only if `revision` is the store's current one (`None` = file must not exist).
	#[instrument(skip(self, locator, content), fields(%locator, revision = revision.map(|r| r.0.as_str())))]
	pub async fn write_content_at(&self, locator: &FileLocator, content: &str, message: &str, revision: Option<&Revision>) -> Result<WriteReceipt> {
		let credential = self.credential()?;
		let request = PutContentsRequest::new(message, content, revision.cloned());
		let written = self.client.put_contents(credential, locator, &request).await?;
		let receipt = WriteReceipt::from(written);
		info!(revision = %receipt.revision, "file written");
		Ok(receipt)
	}

	/// Fetch, transform the lines, and write back under the revision that was read.
	///
	/// `transform` returns whether it changed anything; if not, no write is issued.
	pub async fn apply_line_transform<F>(&self, locator: &FileLocator, message: &str, transform: F) -> Result<EditOutcome>
	where
		F: FnOnce(&mut Vec<String>) -> bool,
	{
		let file = self.fetch_file(locator).await?;
		let mut lines = lines::split_lines(&file.content);

		if !transform(&mut lines) {
			return Ok(EditOutcome::Skipped);
		}

		let joined = lines::join_lines(&lines);
		let receipt = self.write_content_at(locator, &joined, message, Some(&file.revision)).await?;
		Ok(EditOutcome::Applied(receipt))
	}

	#[instrument(skip(self, locator, message), fields(%locator, op = edit.verb(), line = edit.line()))]
	pub async fn apply_edit(&self, locator: &FileLocator, message: &str, edit: &LineEdit) -> Result<EditOutcome> {
		let outcome = self.apply_line_transform(locator, message, |lines| edit.apply(lines)).await?;
		if !outcome.is_applied() {
			debug!("line out of range, nothing written");
		}
		Ok(outcome)
	}

	pub async fn replace_line(&self, locator: &FileLocator, line_number: i64, text: &str, message: &str) -> Result<EditOutcome> {
		let edit = LineEdit::Replace {
			line: line_number,
			text: text.to_string(),
		};
		self.apply_edit(locator, message, &edit).await
	}

	pub async fn insert_line(&self, locator: &FileLocator, line_number: i64, text: &str, message: &str) -> Result<EditOutcome> {
		let edit = LineEdit::Insert {
			line: line_number,
			text: text.to_string(),
		};
		self.apply_edit(locator, message, &edit).await
	}

	pub async fn delete_line(&self, locator: &FileLocator, line_number: i64, message: &str) -> Result<EditOutcome> {
		self.apply_edit(locator, message, &LineEdit::Delete { line: line_number }).await
	}
}
