//! Block-programming surface.
//!
//! Declares the blocks a visual host registers (opcodes, labels, argument types and defaults), and
//! `GitHubBlocks`, the adapter the host calls into. The adapter is the only layer that swallows errors:
//! a block never fails the host's script, it logs and hands back an empty value instead.

use std::{collections::BTreeMap, fmt, str::FromStr};

use serde::Serialize;
use serde_json::{Map, Value, json};
use tracing::{debug, error, info, instrument};

use crate::{
	editor::{EditOutcome, RepositoryFileEditor},
	error::Result,
	github::FileLocator,
};

pub const EXTENSION_ID: &str = "githubAdvanced";
pub const EXTENSION_NAME: &str = "GitHub Advanced";

/// Arguments of one block invocation, keyed by argument name (`REPO`, `LINE`, ...)
pub type BlockArgs = Map<String, Value>;

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Opcode {
	SetToken,
	GetFileContent,
	GetLineFromFile,
	UpdateFile,
	UpdateLineInFile,
	InsertLineInFile,
	DeleteLineFromFile,
}

impl Opcode {
	pub const ALL: [Opcode; 7] = [
		Opcode::SetToken,
		Opcode::GetFileContent,
		Opcode::GetLineFromFile,
		Opcode::UpdateFile,
		Opcode::UpdateLineInFile,
		Opcode::InsertLineInFile,
		Opcode::DeleteLineFromFile,
	];

	pub fn as_str(&self) -> &'static str {
		match self {
			Opcode::SetToken => "setToken",
			Opcode::GetFileContent => "getFileContent",
			Opcode::GetLineFromFile => "getLineFromFile",
			Opcode::UpdateFile => "updateFile",
			Opcode::UpdateLineInFile => "updateLineInFile",
			Opcode::InsertLineInFile => "insertLineInFile",
			Opcode::DeleteLineFromFile => "deleteLineFromFile",
		}
	}

	pub fn block_type(&self) -> BlockType {
		match self {
			Opcode::GetFileContent | Opcode::GetLineFromFile => BlockType::Reporter,
			_ => BlockType::Command,
		}
	}
}

impl fmt::Display for Opcode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

#[derive(Debug, thiserror::Error)]
#[error("unknown block opcode: {0}")]
pub struct UnknownOpcode(pub String);

impl FromStr for Opcode {
	type Err = UnknownOpcode;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Opcode::ALL.into_iter().find(|op| op.as_str() == s).ok_or_else(|| UnknownOpcode(s.to_string()))
	}
}

/// Commands run for effect, reporters return a value
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockType {
	Command,
	Reporter,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArgumentType {
	String,
	Number,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArgumentInfo {
	#[serde(rename = "type")]
	pub kind: ArgumentType,
	pub default_value: Value,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockInfo {
	pub opcode: Opcode,
	pub block_type: BlockType,
	pub text: &'static str,
	pub arguments: BTreeMap<&'static str, ArgumentInfo>,
}

impl BlockInfo {
	pub fn default_value(&self, name: &str) -> Option<&Value> {
		self.arguments.get(name).map(|a| &a.default_value)
	}
}

#[derive(Clone, Debug, Serialize)]
pub struct ExtensionInfo {
	pub id: &'static str,
	pub name: &'static str,
	pub blocks: Vec<BlockInfo>,
}

impl ExtensionInfo {
	pub fn block(&self, opcode: Opcode) -> Option<&BlockInfo> {
		self.blocks.iter().find(|b| b.opcode == opcode)
	}
}

fn string_arg(default: &str) -> ArgumentInfo {
	ArgumentInfo {
		kind: ArgumentType::String,
		default_value: json!(default),
	}
}

fn line_arg() -> ArgumentInfo {
	ArgumentInfo {
		kind: ArgumentType::Number,
		default_value: json!(1),
	}
}

/// Label and arguments of every block, in registration order
pub fn extension_info() -> ExtensionInfo {
	let repo = || ("REPO", string_arg("username/repo"));
	let path = || ("PATH", string_arg("file.txt"));

	let block = |opcode: Opcode, text: &'static str, args: Vec<(&'static str, ArgumentInfo)>| BlockInfo {
		opcode,
		block_type: opcode.block_type(),
		text,
		arguments: args.into_iter().collect(),
	};

	ExtensionInfo {
		id: EXTENSION_ID,
		name: EXTENSION_NAME,
		blocks: vec![
			block(Opcode::SetToken, "set GitHub token to [TOKEN]", vec![("TOKEN", string_arg(""))]),
			block(Opcode::GetFileContent, "get content of [REPO]/[PATH]", vec![repo(), path()]),
			block(Opcode::GetLineFromFile, "get line [LINE] from [REPO]/[PATH]", vec![("LINE", line_arg()), repo(), path()]),
			block(
				Opcode::UpdateFile,
				"update file [REPO]/[PATH] with content [CONTENT] commit message [MESSAGE]",
				vec![repo(), path(), ("CONTENT", string_arg("Hello World!")), ("MESSAGE", string_arg("Update from Scratch"))],
			),
			block(
				Opcode::UpdateLineInFile,
				"update line [LINE] in [REPO]/[PATH] to [NEW_CONTENT] commit message [MESSAGE]",
				vec![
					("LINE", line_arg()),
					repo(),
					path(),
					("NEW_CONTENT", string_arg("New line content")),
					("MESSAGE", string_arg("Update line from Scratch")),
				],
			),
			block(
				Opcode::InsertLineInFile,
				"insert at line [LINE] in [REPO]/[PATH] content [NEW_CONTENT] commit message [MESSAGE]",
				vec![
					("LINE", line_arg()),
					repo(),
					path(),
					("NEW_CONTENT", string_arg("New line content")),
					("MESSAGE", string_arg("Insert line from Scratch")),
				],
			),
			block(
				Opcode::DeleteLineFromFile,
				"delete line [LINE] from [REPO]/[PATH] commit message [MESSAGE]",
				vec![("LINE", line_arg()), repo(), path(), ("MESSAGE", string_arg("Delete line from Scratch"))],
			),
		],
	}
}

//==============================================================================
// Argument coercion
//==============================================================================

/// Coerce a host value to a line number: numbers truncate toward zero, numeric strings parse, anything else is 0.
pub fn to_line_number(value: &Value) -> i64 {
	let n = match value {
		Value::Number(n) => n.as_f64().unwrap_or(0.0),
		Value::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
		Value::Bool(b) => f64::from(u8::from(*b)),
		_ => 0.0,
	};
	if n.is_nan() { 0 } else { n.trunc() as i64 }
}

/// Text form of a host value. Strings are taken as-is, not JSON-quoted.
pub fn to_text(value: &Value) -> String {
	match value {
		Value::String(s) => s.clone(),
		Value::Null => String::new(),
		other => other.to_string(),
	}
}

/// Argument lookup with the block's declared defaults filling the gaps
struct ArgReader<'a> {
	args: &'a BlockArgs,
	info: Option<&'a BlockInfo>,
}

impl ArgReader<'_> {
	fn value(&self, name: &str) -> Value {
		match self.args.get(name) {
			Some(v) if !v.is_null() => v.clone(),
			_ => self.info.and_then(|i| i.default_value(name)).cloned().unwrap_or(Value::Null),
		}
	}

	fn text(&self, name: &str) -> String {
		to_text(&self.value(name))
	}

	fn line(&self) -> i64 {
		to_line_number(&self.value("LINE"))
	}
}

//==============================================================================
// Host adapter
//==============================================================================

/// Log a failed block and fall back to the default value
fn soft<T: Default>(opcode: Opcode, result: Result<T>) -> T {
	match result {
		Ok(v) => v,
		Err(e) => {
			error!(%opcode, error = %e, "block failed");
			T::default()
		}
	}
}

fn report_edit(opcode: Opcode, locator: &FileLocator, line: i64, result: Result<EditOutcome>) {
	match soft(opcode, result.map(Some)) {
		Some(EditOutcome::Applied(receipt)) => info!(%opcode, %locator, revision = %receipt.revision, "file updated"),
		Some(EditOutcome::Skipped) => debug!(%opcode, %locator, line, "line out of range, file left as is"),
		None => {}
	}
}

/// The adapter a block host calls into. Owns the editor session and with it the token.
pub struct GitHubBlocks {
	editor: RepositoryFileEditor,
	info: ExtensionInfo,
}

impl GitHubBlocks {
	pub fn new(editor: RepositoryFileEditor) -> Self {
		Self { editor, info: extension_info() }
	}

	pub fn info(&self) -> &ExtensionInfo {
		&self.info
	}

	/// An empty token counts as no token.
	pub fn set_token(&mut self, token: &str) {
		if token.is_empty() {
			self.editor.clear_credential();
		} else {
			self.editor.set_credential(token);
		}
	}

	pub async fn get_file_content(&self, repo: &str, path: &str) -> String {
		soft(Opcode::GetFileContent, self.editor.fetch_content(&FileLocator::new(repo, path)).await)
	}

	pub async fn get_line_from_file(&self, line: i64, repo: &str, path: &str) -> String {
		soft(Opcode::GetLineFromFile, self.editor.fetch_line(&FileLocator::new(repo, path), line).await)
	}

	pub async fn update_file(&self, repo: &str, path: &str, content: &str, message: &str) {
		let locator = FileLocator::new(repo, path);
		if let Some(receipt) = soft(Opcode::UpdateFile, self.editor.write_content(&locator, content, message).await.map(Some)) {
			info!(%locator, revision = %receipt.revision, "file updated");
		}
	}

	pub async fn update_line_in_file(&self, line: i64, repo: &str, path: &str, new_content: &str, message: &str) {
		let locator = FileLocator::new(repo, path);
		let result = self.editor.replace_line(&locator, line, new_content, message).await;
		report_edit(Opcode::UpdateLineInFile, &locator, line, result);
	}

	pub async fn insert_line_in_file(&self, line: i64, repo: &str, path: &str, new_content: &str, message: &str) {
		let locator = FileLocator::new(repo, path);
		let result = self.editor.insert_line(&locator, line, new_content, message).await;
		report_edit(Opcode::InsertLineInFile, &locator, line, result);
	}

	pub async fn delete_line_from_file(&self, line: i64, repo: &str, path: &str, message: &str) {
		let locator = FileLocator::new(repo, path);
		let result = self.editor.delete_line(&locator, line, message).await;
		report_edit(Opcode::DeleteLineFromFile, &locator, line, result);
	}

	/// Run a block by opcode name. Reporters produce a string, commands and unknown opcodes `Value::Null`.
	#[instrument(skip(self, args))]
	pub async fn invoke(&mut self, opcode: &str, args: &BlockArgs) -> Value {
		let opcode = match opcode.parse::<Opcode>() {
			Ok(op) => op,
			Err(e) => {
				error!(error = %e, "block failed");
				return Value::Null;
			}
		};

		let info = self.info.block(opcode).cloned();
		let a = ArgReader { args, info: info.as_ref() };

		match opcode {
			Opcode::SetToken => {
				self.set_token(&a.text("TOKEN"));
				Value::Null
			}
			Opcode::GetFileContent => Value::String(self.get_file_content(&a.text("REPO"), &a.text("PATH")).await),
			Opcode::GetLineFromFile => Value::String(self.get_line_from_file(a.line(), &a.text("REPO"), &a.text("PATH")).await),
			Opcode::UpdateFile => {
				self.update_file(&a.text("REPO"), &a.text("PATH"), &a.text("CONTENT"), &a.text("MESSAGE")).await;
				Value::Null
			}
			Opcode::UpdateLineInFile => {
				self.update_line_in_file(a.line(), &a.text("REPO"), &a.text("PATH"), &a.text("NEW_CONTENT"), &a.text("MESSAGE"))
					.await;
				Value::Null
			}
			Opcode::InsertLineInFile => {
				self.insert_line_in_file(a.line(), &a.text("REPO"), &a.text("PATH"), &a.text("NEW_CONTENT"), &a.text("MESSAGE"))
					.await;
				Value::Null
			}
			Opcode::DeleteLineFromFile => {
				self.delete_line_from_file(a.line(), &a.text("REPO"), &a.text("PATH"), &a.text("MESSAGE")).await;
				Value::Null
			}
		}
	}
}
