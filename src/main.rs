use std::{io::Write as _, sync::Arc};

use clap::{Args, CommandFactory as _, Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr as _};
use ghedit::{
	BlockArgs, EditOutcome, EditorError, FileLocator, GitHubBlocks, RepositoryFileEditor,
	config::{AppConfig, SettingsFlags, save_token},
	extension_info,
	github::{self, BoxedContentsClient},
	mock_github::MockGitHubClient,
};
use tokio::io::AsyncReadExt as _;
use tracing_subscriber::EnvFilter;

/// When set, trace events are written as JSON lines to this file instead of stderr
const TRACE_FILE_ENV: &str = "GHEDIT_TRACE_FILE";

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(long_version = concat!(env!("CARGO_PKG_VERSION"), " ", env!("GIT_HASH")))]
#[command(propagate_version = true)]
struct Cli {
	#[command(subcommand)]
	command: Commands,

	#[clap(flatten)]
	settings: SettingsFlags,

	/// Use an in-memory store instead of GitHub. Loads and saves its state from GHEDIT_MOCK_STATE if set
	#[arg(long, global = true)]
	mock: bool,
}

#[derive(Subcommand)]
enum Commands {
	/// Print the content of a file
	Get(TargetArgs),
	/// Print one line of a file. Out-of-range numbers resolve to the first or last line
	GetLine(LineArgs),
	/// Create or overwrite a file
	Update(UpdateArgs),
	/// Replace one line
	UpdateLine(LineTextArgs),
	/// Insert a line before LINE (one past the last line appends)
	InsertLine(LineTextArgs),
	/// Delete one line
	DeleteLine(LineEditArgs),
	/// Save a token for later invocations
	SetToken {
		token: String,
	},
	/// Print the block definitions as JSON
	Blocks,
	/// Run a block the way a block host would: failures are logged, never returned
	Block {
		/// e.g. getLineFromFile
		opcode: String,
		/// Block arguments as KEY=VALUE, e.g. REPO=owner/repo PATH=notes.md LINE=2
		args: Vec<String>,
	},
	/// Generate shell completions
	Completions {
		shell: clap_complete::Shell,
	},
}

#[derive(Args)]
struct TargetArgs {
	/// Repository as owner/name
	repo: String,
	/// Path of the file inside the repository
	path: String,
}

impl TargetArgs {
	fn locator(&self) -> FileLocator {
		FileLocator::new(&self.repo, &self.path)
	}
}

#[derive(Args)]
struct LineArgs {
	#[clap(flatten)]
	target: TargetArgs,
	/// 1-based line number
	#[arg(allow_negative_numbers = true)]
	line: i64,
}

#[derive(Args)]
struct UpdateArgs {
	#[clap(flatten)]
	target: TargetArgs,
	/// New content of the file; `-` reads it from stdin
	content: String,
	#[arg(short, long, default_value = "Update from ghedit")]
	message: String,
}

#[derive(Args)]
struct LineTextArgs {
	#[clap(flatten)]
	target: TargetArgs,
	#[arg(allow_negative_numbers = true)]
	line: i64,
	text: String,
	#[arg(short, long, default_value = "Update line from ghedit")]
	message: String,
}

#[derive(Args)]
struct LineEditArgs {
	#[clap(flatten)]
	target: TargetArgs,
	#[arg(allow_negative_numbers = true)]
	line: i64,
	#[arg(short, long, default_value = "Delete line from ghedit")]
	message: String,
}

fn init_tracing() -> Result<()> {
	if let Ok(path) = std::env::var(TRACE_FILE_ENV) {
		let file = std::fs::File::create(&path).wrap_err_with(|| format!("Failed to create trace file at {path}"))?;
		let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
		tracing_subscriber::fmt().json().with_env_filter(filter).with_writer(std::sync::Mutex::new(file)).init();
	} else {
		let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(option_env!("LOG_DIRECTIVES").unwrap_or("warn")));
		tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
	}
	Ok(())
}

fn create_client(config: &AppConfig, mock: bool) -> Result<BoxedContentsClient> {
	if mock {
		return Ok(Arc::new(MockGitHubClient::from_env()?));
	}
	github::create_client(config)
}

fn editor(cli: &Cli) -> Result<RepositoryFileEditor> {
	let config = AppConfig::load(&cli.settings)?;
	let client = create_client(&config, cli.mock)?;
	Ok(RepositoryFileEditor::new(client, config.credential()))
}

/// Malformed pairs are logged and skipped, like any other block failure
fn parse_block_args(raw: &[String]) -> BlockArgs {
	let mut args = BlockArgs::new();
	for pair in raw {
		match pair.split_once('=') {
			Some((key, value)) => {
				args.insert(key.to_string(), serde_json::Value::String(value.to_string()));
			}
			None => tracing::error!(argument = %pair, "block argument must look like KEY=VALUE, ignoring it"),
		}
	}
	args
}

fn report_outcome(outcome: EditOutcome, line: i64) {
	match outcome {
		EditOutcome::Applied(receipt) => tracing::info!(revision = %receipt.revision, "committed"),
		EditOutcome::Skipped => eprintln!("Line {line} is out of range; file left unchanged"),
	}
}

async fn run(cli: Cli) -> Result<()> {
	match &cli.command {
		Commands::Get(target) => {
			let content = editor(&cli)?.fetch_content(&target.locator()).await?;
			let mut stdout = std::io::stdout();
			stdout.write_all(content.as_bytes())?;
			stdout.flush()?;
		}
		Commands::GetLine(args) => {
			let line = editor(&cli)?.fetch_line(&args.target.locator(), args.line).await?;
			println!("{line}");
		}
		Commands::Update(args) => {
			let content = if args.content == "-" {
				let mut buf = String::new();
				tokio::io::stdin().read_to_string(&mut buf).await.wrap_err("Failed to read content from stdin")?;
				buf
			} else {
				args.content.clone()
			};
			let receipt = editor(&cli)?.write_content(&args.target.locator(), &content, &args.message).await?;
			tracing::info!(revision = %receipt.revision, "committed");
		}
		Commands::UpdateLine(args) => {
			let outcome = editor(&cli)?.replace_line(&args.target.locator(), args.line, &args.text, &args.message).await?;
			report_outcome(outcome, args.line);
		}
		Commands::InsertLine(args) => {
			let outcome = editor(&cli)?.insert_line(&args.target.locator(), args.line, &args.text, &args.message).await?;
			report_outcome(outcome, args.line);
		}
		Commands::DeleteLine(args) => {
			let outcome = editor(&cli)?.delete_line(&args.target.locator(), args.line, &args.message).await?;
			report_outcome(outcome, args.line);
		}
		Commands::SetToken { token } => {
			let path = save_token(token)?;
			eprintln!("Token saved to {}", path.display());
		}
		Commands::Blocks => {
			println!("{}", serde_json::to_string_pretty(&extension_info())?);
		}
		Commands::Block { opcode, args } => {
			let args = parse_block_args(args);
			let mut blocks = GitHubBlocks::new(editor(&cli)?);
			match blocks.invoke(opcode, &args).await {
				serde_json::Value::String(s) => println!("{s}"),
				serde_json::Value::Null => {}
				other => println!("{other}"),
			}
		}
		Commands::Completions { shell } => {
			clap_complete::generate(*shell, &mut Cli::command(), env!("CARGO_PKG_NAME"), &mut std::io::stdout());
		}
	}
	Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;
	init_tracing()?;

	let cli = Cli::parse();
	match run(cli).await {
		Ok(()) => Ok(()),
		Err(e) => match e.downcast::<EditorError>() {
			Ok(editor_error) => {
				eprintln!("{:?}", miette::Report::new(editor_error));
				std::process::exit(1);
			}
			Err(e) => Err(e),
		},
	}
}
