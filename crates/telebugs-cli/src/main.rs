#![forbid(unsafe_code)]

mod cmd;
mod credentials;
mod output;
mod session;

use clap::{CommandFactory, Parser, Subcommand};
use output::OutputMode;
use std::env;
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "telebugs-mcp: access-scoped error-tracking tools over a Telebugs database",
    long_about = None
)]
struct Cli {
    /// Enable debug logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the Telebugs SQLite database (overrides TELEBUGS_DB_PATH).
    #[arg(long, global = true, value_name = "PATH")]
    db: Option<PathBuf>,

    /// Config file [default: <config_dir>/telebugs-mcp/config.toml].
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// API key for `call` (overrides TELEBUGS_API_KEY).
    #[arg(long, global = true, value_name = "KEY")]
    api_key: Option<String>,

    /// Emit single-line JSON.
    #[arg(long, global = true)]
    compact: bool,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    const fn output_mode(&self) -> OutputMode {
        OutputMode::from_compact_flag(self.compact)
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Tools",
        about = "Run one tool and print its reply",
        long_about = "Resolve the API key, run one tool against the database, and print the reply document.",
        after_help = "EXAMPLES:\n    # List accessible projects\n    telebugs-mcp --api-key $KEY call list_projects\n\n    # Resolved groups in one project\n    telebugs-mcp call list_error_groups --params '{\"project_id\": 3, \"status\": \"resolved\"}'\n\n    # Single-line output\n    telebugs-mcp call get_report --params '{\"report_id\": 42}' --compact"
    )]
    Call(cmd::call::CallArgs),

    #[command(
        next_help_heading = "Tools",
        about = "Serve tool calls as line-delimited JSON",
        long_about = "Read one JSON request per line on stdin and write one JSON reply per line on stdout.",
        after_help = "EXAMPLES:\n    # Start the loop\n    telebugs-mcp --db ./production.sqlite3 serve\n\n    # Requests\n    {\"id\": 1, \"op\": \"open\", \"api_key\": \"...\"}\n    {\"id\": 2, \"op\": \"call\", \"session\": \"...\", \"tool\": \"list_projects\"}\n    {\"id\": 3, \"op\": \"close\", \"session\": \"...\"}"
    )]
    Serve,

    #[command(
        next_help_heading = "Tools",
        about = "List available tools",
        after_help = "EXAMPLES:\n    # Human-readable catalogue\n    telebugs-mcp tools\n\n    # JSON catalogue\n    telebugs-mcp tools --compact"
    )]
    Tools,

    #[command(
        next_help_heading = "Maintenance",
        about = "Generate shell completion scripts",
        after_help = "EXAMPLES:\n    # Generate bash completions\n    telebugs-mcp completions bash"
    )]
    Completions(cmd::completions::CompletionsArgs),
}

/// Logs always go to stderr; stdout carries reply documents only.
fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("TELEBUGS_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "telebugs=debug,info"
        } else {
            "telebugs=info,warn"
        })
    });

    let format = env::var("TELEBUGS_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let output = cli.output_mode();
    let open_store = || cmd::open_store(cli.config.as_deref(), cli.db.clone());

    match cli.command {
        Commands::Call(ref args) => {
            cmd::call::run_call(args, cli.api_key.as_deref(), output, open_store)
        }
        Commands::Serve => cmd::serve::run_serve(&open_store()?),
        Commands::Tools => cmd::tools::run_tools(output),
        Commands::Completions(ref args) => {
            let mut command = Cli::command();
            cmd::completions::run_completions(args.shell, &mut command)
        }
    }
}
