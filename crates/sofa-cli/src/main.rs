//! sofa - Simple Organized Feed for Apple.

use anyhow::Result;
use clap::{CommandFactory, Parser};
use sofa_cli::{cmd, init_logging, Cli, Commands, RunArgs};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let exit_code = match &cli.command {
        Some(Commands::Gather(args)) | Some(Commands::Fetch(args)) => cmd::run_stage::gather(&cli, args).await?,
        Some(Commands::Build(args)) => cmd::run_stage::build(&cli, args).await?,
        Some(Commands::Bulletin(args)) => cmd::bulletin::bulletin(&cli, args).await?,
        Some(Commands::Rss(_)) => cmd::run_stage::rss_only(&cli).await?,
        Some(Commands::Cve(args)) => cmd::bulletin::cve(&cli, args).await?,
        Some(Commands::All(args)) => cmd::run_stage::all(&cli, args).await?,
        Some(Commands::Completions { shell }) => {
            clap_complete::generate(
                *shell,
                &mut Cli::command(),
                "sofa",
                &mut std::io::stdout(),
            );
            0
        }
        None => cmd::run_stage::all(&cli, &RunArgs::default()).await?,
    };

    std::process::exit(exit_code);
}
