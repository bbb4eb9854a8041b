use clap::Parser;
use eyre::{Context, Result, eyre};
use issue_to_markdown::github;
use issue_to_markdown::pipeline;
use issue_to_markdown::resolve::{ProcessStdin, UsageError};
use issue_to_markdown::utils::{DEFAULT_USER_AGENT, ExportConfig, Mode};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Exit code for malformed flags. Kept apart from the [`UsageError`] codes.
const BAD_FLAGS_EXIT: i32 = 64;

const USAGE: &str = "usage: cat issue.json | issue-to-markdown [OUTPUT]\n       issue-to-markdown <INPUT.json> [OUTPUT]";

/// Convert a GitHub issue (JSON) into Markdown, optionally zipped with its images.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input `.json` file and/or output path.
    /// With piped input, only the output path.
    #[arg(value_name = "PATH")]
    paths: Vec<PathBuf>,

    /// Where images go: embedded in one `.md` (inline) or zipped beside it (package).
    /// Defaults to package if not set in config.
    #[arg(long, value_enum)]
    mode: Option<Mode>,

    /// Read the issue JSON from stdin instead of probing for it.
    /// Without a `.json` argument, any non-terminal stdin is read to the end,
    /// so an idle inherited pipe blocks; redirect from /dev/null to avoid it.
    #[arg(long)]
    stdin: bool,

    /// Path to a specific configuration file.
    /// Defaults to $XDG_CONFIG_HOME/issue-to-markdown/config.toml
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log every request and resolved path.
    #[arg(short, long)]
    verbose: bool,

    /// Only log warnings and errors.
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Deserialize, Default)]
struct FileConfig {
    mode: Option<Mode>,
    user_agent: Option<String>,
    timeout_secs: Option<u64>,
}

fn load_file_config(explicit_path: Option<&Path>) -> Result<FileConfig> {
    let path = if let Some(p) = explicit_path {
        if !p.exists() {
            return Err(eyre!("Config file not found: {}", p.display()));
        }
        Some(p.to_path_buf())
    } else {
        dirs::config_dir()
            .map(|d| d.join("issue-to-markdown/config.toml"))
            .filter(|p| p.exists())
    };

    match path {
        None => Ok(FileConfig::default()),
        Some(p) => {
            let content = fs::read_to_string(&p)
                .wrap_err_with(|| format!("Failed to read config: {}", p.display()))?;
            toml::from_str(&content)
                .wrap_err_with(|| format!("Failed to parse config: {}", p.display()))
        }
    }
}

fn init_logging(verbose: bool, quiet: bool) {
    let level = if verbose {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

/// Merges CLI flags over file settings over defaults.
fn build_config(cli: Cli, file_cfg: FileConfig, token: Option<String>) -> ExportConfig {
    ExportConfig {
        mode: cli.mode.or(file_cfg.mode).unwrap_or_default(),
        paths: cli.paths,
        force_stdin: cli.stdin,
        user_agent: file_cfg
            .user_agent
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
        token,
        timeout: file_cfg.timeout_secs.map(Duration::from_secs),
    }
}

fn run(cli: Cli) -> Result<()> {
    // 1. Load config file (CLI path > default path)
    let file_cfg = load_file_config(cli.config.as_deref())?;

    // 2. Resolve settings (CLI > Config > Default)
    let config = build_config(cli, file_cfg, github::token_from_env());

    // 3. Run the conversion
    let output = pipeline::execute(&config, &mut ProcessStdin)?;
    tracing::info!("Done. Wrote {}", output.display());
    Ok(())
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if err.use_stderr() => {
            let _ = err.print();
            std::process::exit(BAD_FLAGS_EXIT);
        }
        // --help and --version
        Err(err) => err.exit(),
    };
    init_logging(cli.verbose, cli.quiet);

    if let Err(report) = run(cli) {
        if let Some(usage) = report.downcast_ref::<UsageError>() {
            eprintln!("{usage}");
            eprintln!("{USAGE}");
            std::process::exit(usage.exit_code());
        }
        eprintln!("Error: {report:?}");
        std::process::exit(1);
    }
}
