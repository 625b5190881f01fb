//! Where the token and API settings come from, and in which order they win.

use crate::common::{REPO, TOKEN, TestContext};

fn ctx() -> TestContext {
	let ctx = TestContext::new("");
	ctx.seed(TOKEN, &[(REPO, "f.txt", "x\ny")]);
	ctx
}

#[test]
fn test_saved_token_is_used_by_later_runs() {
	let ctx = ctx();

	let saved = ctx.run(&["set-token", TOKEN]);
	assert!(saved.status.success(), "stderr: {}", saved.stderr);
	assert!(saved.stderr.contains("Token saved to"));

	let out = ctx.run(&["get-line", REPO, "f.txt", "2"]);
	assert!(out.status.success(), "stderr: {}", out.stderr);
	assert_eq!(out.stdout, "y\n");
}

#[test]
fn test_flag_beats_saved_token() {
	let ctx = ctx();
	assert!(ctx.run(&["set-token", TOKEN]).status.success());

	let out = ctx.run(&["--token", "stale", "get", REPO, "f.txt"]);
	assert!(!out.status.success());
	assert!(out.stderr.contains("401"), "stderr: {}", out.stderr);
}

#[test]
fn test_token_from_config_file() {
	let ctx = ctx();
	let config = ctx.write_config(&format!("github_token = \"{TOKEN}\"\n"));

	let out = ctx.run(&["--config", config.to_str().unwrap(), "get", REPO, "f.txt"]);
	assert!(out.status.success(), "stderr: {}", out.stderr);
	assert_eq!(out.stdout, "x\ny");
}

#[test]
fn test_environment_beats_config_file() {
	let ctx = ctx();
	let config = ctx.write_config("github_token = \"wrong\"\n");

	let out = ctx.run_with(&["--config", config.to_str().unwrap(), "get", REPO, "f.txt"], &[("GHEDIT_GITHUB_TOKEN", TOKEN)], None);
	assert!(out.status.success(), "stderr: {}", out.stderr);
}

#[test]
fn test_invalid_api_url_is_reported() {
	let ctx = ctx();
	let config = ctx.write_config("api_url = \"not a url\"\n");

	let out = ctx.run(&["--token", TOKEN, "--config", config.to_str().unwrap(), "get", REPO, "f.txt"]);
	assert!(!out.status.success());
	assert!(out.stderr.contains("api_url is not a valid URL"), "stderr: {}", out.stderr);
}

#[test]
fn test_missing_explicit_config_is_an_error() {
	let ctx = ctx();
	let missing = ctx.xdg.inner.root.join("does_not_exist.toml");

	let out = ctx.run(&["--token", TOKEN, "--config", missing.to_str().unwrap(), "get", REPO, "f.txt"]);
	assert!(!out.status.success());
}

#[test]
fn test_completions() {
	let ctx = TestContext::new("");

	let out = ctx.run(&["completions", "bash"]);
	assert!(out.status.success(), "stderr: {}", out.stderr);
	assert!(out.stdout.contains("ghedit"));
}
