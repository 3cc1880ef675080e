//! Trellis CLI - page tree resolution engine.
//!
//! Provides commands for:
//! - `resolve`: Resolve a request path to a page
//! - `render`: Resolve and render a request path
//! - `tree`: Print the page tree outline

mod commands;
mod error;
mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{RenderArgs, ResolveArgs, TreeArgs};
use output::Output;

/// Trellis - page tree resolution engine.
#[derive(Parser)]
#[command(name = "trellis", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a request path to a page.
    Resolve(ResolveArgs),
    /// Resolve a request path and render the page.
    Render(RenderArgs),
    /// Print the page tree.
    Tree(TreeArgs),
}

impl Commands {
    fn verbose(&self) -> bool {
        match self {
            Self::Resolve(args) => args.site.verbose,
            Self::Render(args) => args.site.verbose,
            Self::Tree(args) => args.site.verbose,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    // --verbose enables INFO level, otherwise use RUST_LOG or default to WARN
    let filter = if cli.command.verbose() {
        EnvFilter::new("info")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Resolve(args) => args.execute(),
        Commands::Render(args) => args.execute(),
        Commands::Tree(args) => args.execute(),
    };

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}
