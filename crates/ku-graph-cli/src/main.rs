#![forbid(unsafe_code)]

mod cmd;
mod manifest;
mod output;

use clap::{Parser, Subcommand};
use output::{OutputMode, resolve_output_mode};
use std::env;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "kugraph: dependency graph resolution",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, hide = true)]
    verbose: bool,

    /// Output format (defaults to pretty on a terminal, text when piped).
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    /// Shorthand for `--format json`.
    #[arg(long, global = true, hide = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn output_mode(&self) -> OutputMode {
        resolve_output_mode(self.format, self.json)
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        about = "Rank entities into cohorts",
        long_about = "Split the graph into components, collapse dependency cycles into \
                      clusters and list entities by rank. Rank 0 holds entities without \
                      dependencies.",
        after_help = "EXAMPLES:\n    # Rank a manifest\n    kugraph resolve graph.toml\n\n    # Fail on any cycle\n    kugraph resolve graph.toml --mode strict-acyclic\n\n    # Emit machine-readable output\n    kugraph resolve graph.toml --format json"
    )]
    Resolve(cmd::resolve::ResolveArgs),

    #[command(
        about = "Report a dependency cycle",
        long_about = "Search the graph for a dependency cycle and print its links. \
                      Exits non-zero when a cycle is found.",
        after_help = "EXAMPLES:\n    # Check a manifest\n    kugraph cycle graph.toml\n\n    # Emit machine-readable output\n    kugraph cycle graph.toml --format json"
    )]
    Cycle(cmd::cycle::CycleArgs),

    #[command(
        about = "List entities that can be skipped",
        long_about = "List entities that no public entity needs. By default whole \
                      components without a public entity are dropped; --reachable keeps \
                      only what public entities transitively depend on.",
        after_help = "EXAMPLES:\n    # Drop components without public entities\n    kugraph prune graph.toml\n\n    # Keep only what main depends on\n    kugraph prune graph.toml --reachable --public main"
    )]
    Prune(cmd::prune::PruneArgs),
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("KUGRAPH_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if env::var("DEBUG").is_ok() {
            "ku_graph=debug,kugraph=debug,info"
        } else {
            "ku_graph=info,kugraph=info,warn"
        })
    });

    let format = env::var("KUGRAPH_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

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
    init_tracing();

    let cli = Cli::parse();
    let output = cli.output_mode();
    if cli.verbose {
        debug!(?output, "verbose mode enabled");
    }

    match cli.command {
        Commands::Resolve(ref args) => cmd::resolve::run_resolve(args, output),
        Commands::Cycle(ref args) => cmd::cycle::run_cycle(args, output),
        Commands::Prune(ref args) => cmd::prune::run_prune(args, output),
    }
}
