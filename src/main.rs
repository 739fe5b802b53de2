use clap::Parser;
use sigmadsp_install::cli::{self, Commands};

/// Installation settings and SigmaStudio header tools for the SigmaDSP backend.
#[derive(Debug, Parser)]
#[command(name = "sigmadsp-install", version, about)]
struct Cli {
    /// More log output on stderr; repeat for more detail
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

fn main() -> miette::Result<()> {
    let cli = Cli::parse();
    cli::init_logging(cli.verbose);
    cli::run(cli.command)
}
