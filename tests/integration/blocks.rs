//! The block host surface: metadata dump and soft-failure dispatch.

use crate::common::{REPO, TOKEN, TestContext};

#[test]
fn test_blocks_prints_metadata() {
	let ctx = TestContext::new("");

	let out = ctx.run(&["blocks"]);
	assert!(out.status.success(), "stderr: {}", out.stderr);

	let info: serde_json::Value = serde_json::from_str(&out.stdout).unwrap();
	assert_eq!(info["id"], "githubAdvanced");
	assert_eq!(info["name"], "GitHub Advanced");
	let opcodes: Vec<&str> = info["blocks"].as_array().unwrap().iter().map(|b| b["opcode"].as_str().unwrap()).collect();
	assert_eq!(
		opcodes,
		["setToken", "getFileContent", "getLineFromFile", "updateFile", "updateLineInFile", "insertLineInFile", "deleteLineFromFile"]
	);
}

#[test]
fn test_reporter_block_prints_value() {
	let ctx = TestContext::new("");
	ctx.seed(TOKEN, &[(REPO, "f.txt", "a\nb\nc")]);

	let out = ctx.run(&["--token", TOKEN, "block", "getLineFromFile", &format!("REPO={REPO}"), "PATH=f.txt", "LINE=2"]);
	assert!(out.status.success(), "stderr: {}", out.stderr);
	assert_eq!(out.stdout, "b\n");
}

#[test]
fn test_line_argument_is_truncated() {
	let ctx = TestContext::new("");
	ctx.seed(TOKEN, &[(REPO, "f.txt", "a\nb\nc")]);

	let out = ctx.run(&["--token", TOKEN, "block", "getLineFromFile", &format!("REPO={REPO}"), "PATH=f.txt", "LINE=2.9"]);
	assert!(out.status.success(), "stderr: {}", out.stderr);
	assert_eq!(out.stdout, "b\n");
}

#[test]
fn test_command_block_edits_file() {
	let ctx = TestContext::new("");
	ctx.seed(TOKEN, &[(REPO, "f.txt", "a\nb\nc")]);

	let out = ctx.run(&[
		"--token",
		TOKEN,
		"block",
		"updateLineInFile",
		"LINE=1",
		&format!("REPO={REPO}"),
		"PATH=f.txt",
		"NEW_CONTENT=z",
	]);
	assert!(out.status.success(), "stderr: {}", out.stderr);
	assert!(out.stdout.is_empty());
	assert_eq!(ctx.remote_content(REPO, "f.txt").as_deref(), Some("z\nb\nc"));
}

#[test]
fn test_block_without_token_fails_softly() {
	let ctx = TestContext::new("");
	ctx.seed(TOKEN, &[(REPO, "f.txt", "hi")]);

	let out = ctx.run(&["block", "getFileContent", &format!("REPO={REPO}"), "PATH=f.txt"]);
	assert!(out.status.success());
	assert_eq!(out.stdout, "\n");
	let failures = ctx.trace().block_failures();
	assert_eq!(failures.len(), 1, "{failures:?}");
	assert_eq!(failures[0].0, "getFileContent");
	assert!(failures[0].1.contains("token not set"), "{failures:?}");
}

#[test]
fn test_failing_block_exits_zero_with_empty_output() {
	let ctx = TestContext::new("");
	ctx.seed(TOKEN, &[]);

	let out = ctx.run(&["--token", TOKEN, "block", "getFileContent", &format!("REPO={REPO}"), "PATH=missing.txt"]);
	assert!(out.status.success(), "stderr: {}", out.stderr);
	assert_eq!(out.stdout, "\n");
	assert!(ctx.trace().block_failures().iter().any(|(op, err)| op == "getFileContent" && err.contains("404")));
}

#[test]
fn test_unknown_opcode_is_ignored() {
	let ctx = TestContext::new("");

	let out = ctx.run(&["block", "launchRockets"]);
	assert!(out.status.success(), "stderr: {}", out.stderr);
	assert!(out.stdout.is_empty());
	assert_eq!(ctx.trace().block_failures().len(), 1);
}

#[test]
fn test_defaults_fill_missing_arguments() {
	let ctx = TestContext::new("");
	ctx.seed(TOKEN, &[("username/repo", "file.txt", "default target")]);

	let out = ctx.run(&["--token", TOKEN, "block", "getFileContent"]);
	assert!(out.status.success(), "stderr: {}", out.stderr);
	assert_eq!(out.stdout, "default target\n");
}
