//! Line-indexed views over file content.
//!
//! Content is split on `\n` into an ordered list of lines and joined back with `\n` before writing.
//! Line numbers are 1-based everywhere. A trailing newline shows up as a trailing empty line.

/// Split content into lines. Never returns an empty vec: `""` is one empty line.
pub fn split_lines(content: &str) -> Vec<String> {
	content.split('\n').map(str::to_owned).collect()
}

pub fn join_lines(lines: &[String]) -> String {
	lines.join("\n")
}

/// Clamp a 1-based line number into `[1, count]` and return the 0-based index.
///
/// Out-of-range requests resolve to the nearest boundary line instead of failing.
pub fn clamp_line_index(line_number: i64, count: usize) -> usize {
	if count == 0 {
		return 0;
	}
	let clamped = line_number.clamp(1, count as i64);
	(clamped - 1) as usize
}

/// Text of the (clamped) line `line_number` in `content`.
pub fn line_at(content: &str, line_number: i64) -> String {
	let lines = split_lines(content);
	let idx = clamp_line_index(line_number, lines.len());
	lines.get(idx).cloned().unwrap_or_default()
}

/// 0-based index of `line_number` if it lies within `[1, upper]`.
fn index_within(line_number: i64, upper: usize) -> Option<usize> {
	(line_number >= 1 && line_number <= upper as i64).then(|| (line_number - 1) as usize)
}

/// A single edit over a line collection.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum LineEdit {
	/// Replace line `line` with `text`. Valid for `1..=count`.
	Replace { line: i64, text: String },
	/// Insert `text` before line `line`. Valid for `1..=count+1`; `count+1` appends.
	Insert { line: i64, text: String },
	/// Remove line `line`. Valid for `1..=count`.
	Delete { line: i64 },
}

impl LineEdit {
	/// Apply the edit in place. Returns `false` (and leaves `lines` untouched) when the line number is out of range.
	pub fn apply(&self, lines: &mut Vec<String>) -> bool {
		match self {
			LineEdit::Replace { line, text } => match index_within(*line, lines.len()) {
				Some(idx) => {
					lines[idx] = text.clone();
					true
				}
				None => false,
			},
			LineEdit::Insert { line, text } => match index_within(*line, lines.len() + 1) {
				Some(idx) => {
					lines.insert(idx, text.clone());
					true
				}
				None => false,
			},
			LineEdit::Delete { line } => match index_within(*line, lines.len()) {
				Some(idx) => {
					lines.remove(idx);
					true
				}
				None => false,
			},
		}
	}

	pub fn line(&self) -> i64 {
		match self {
			LineEdit::Replace { line, .. } | LineEdit::Insert { line, .. } | LineEdit::Delete { line } => *line,
		}
	}

	pub fn verb(&self) -> &'static str {
		match self {
			LineEdit::Replace { .. } => "replace",
			LineEdit::Insert { .. } => "insert",
			LineEdit::Delete { .. } => "delete",
		}
	}
}
