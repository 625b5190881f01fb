use std::path::{Path, PathBuf};

use clap::Args;
use color_eyre::eyre::{Result, WrapErr as _, eyre};
use serde::Deserialize;
use smart_default::SmartDefault;

use crate::github::Credential;

pub const APP_NAME: &str = "ghedit";
pub const DEFAULT_API_URL: &str = "https://api.github.com";
pub const USER_AGENT: &str = concat!("ghedit/", env!("CARGO_PKG_VERSION"));
/// Environment variables are read as `GHEDIT_<KEY>`, e.g. `GHEDIT_GITHUB_TOKEN`
pub const ENV_PREFIX: &str = "GHEDIT";

static TOKEN_STATE_FILE: &str = "token";
static CONFIG_FILE: &str = "config.toml";

/// Flags shared by every subcommand that affect how settings are resolved.
#[derive(Args, Clone, Debug, Default)]
pub struct SettingsFlags {
	/// Config file to use instead of $XDG_CONFIG_HOME/ghedit/config.toml
	#[arg(long, global = true)]
	pub config: Option<PathBuf>,

	/// GitHub token. Takes precedence over config, environment and the token saved with `set-token`
	#[arg(long, global = true)]
	pub token: Option<String>,
}

#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct AppConfig {
	/// Base of the REST API; point at `https://<host>/api/v3` for GitHub Enterprise
	#[default(_code = "DEFAULT_API_URL.to_string()")]
	pub api_url: String,
	pub github_token: Option<String>,
	#[default(_code = "USER_AGENT.to_string()")]
	pub user_agent: String,
	/// No timeout when unset
	pub timeout_secs: Option<u64>,
}

impl AppConfig {
	/// Resolve settings: config file, then `GHEDIT_*` environment, then flags.
	/// Falls back to the saved token when nothing else provides one.
	pub fn load(flags: &SettingsFlags) -> Result<Self> {
		let mut config = Self::from_sources(flags.config.as_deref(), default_config_path())?;

		if let Some(token) = &flags.token {
			config.github_token = Some(token.clone());
		} else if config.github_token.is_none() {
			config.github_token = load_saved_token()?;
		}

		Ok(config)
	}

	fn from_sources(explicit: Option<&Path>, fallback: Option<PathBuf>) -> Result<Self> {
		let mut builder = config::Config::builder();
		match (explicit, fallback) {
			(Some(path), _) => {
				builder = builder.add_source(config::File::from(path.to_path_buf()));
			}
			(None, Some(path)) => {
				builder = builder.add_source(config::File::from(path).required(false));
			}
			(None, None) => {}
		}
		builder = builder.add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true));

		let config: AppConfig = builder
			.build()
			.wrap_err("Failed to read configuration")?
			.try_deserialize()
			.wrap_err("The config file is not correctly formatted TOML and/or has fields of the wrong type")?;

		url::Url::parse(&config.api_url).wrap_err_with(|| format!("api_url is not a valid URL: {}", config.api_url))?;
		Ok(config)
	}

	/// Token to authenticate with, if any source provided one. Empty tokens count as unset.
	pub fn credential(&self) -> Option<Credential> {
		self.github_token.as_deref().filter(|t| !t.is_empty()).map(Credential::new)
	}
}

fn xdg_dirs() -> xdg::BaseDirectories {
	xdg::BaseDirectories::with_prefix(APP_NAME)
}

fn default_config_path() -> Option<PathBuf> {
	xdg_dirs().find_config_file(CONFIG_FILE)
}

/// Token persisted by `set-token`, if any
pub fn load_saved_token() -> Result<Option<String>> {
	let Some(path) = xdg_dirs().find_state_file(TOKEN_STATE_FILE) else {
		return Ok(None);
	};
	read_token_file(&path)
}

fn read_token_file(path: &Path) -> Result<Option<String>> {
	let token = std::fs::read_to_string(path).wrap_err_with(|| format!("Failed to read saved token at {}", path.display()))?;
	let token = token.trim();
	Ok((!token.is_empty()).then(|| token.to_string()))
}

/// Persist the token to the XDG state dir. Returns where it was written.
pub fn save_token(token: &str) -> Result<PathBuf> {
	let path = xdg_dirs()
		.place_state_file(TOKEN_STATE_FILE)
		.map_err(|e| eyre!("Failed to create state directory for {APP_NAME}: {e}"))?;
	write_token_file(&path, token)?;
	Ok(path)
}

fn write_token_file(path: &Path, token: &str) -> Result<()> {
	std::fs::write(path, token).wrap_err_with(|| format!("Failed to write token to {}", path.display()))?;
	#[cfg(unix)]
	{
		use std::os::unix::fs::PermissionsExt as _;
		std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
	}
	Ok(())
}
