use clap::Parser;
use tracing_subscriber::EnvFilter;

use lims_liquid::cli::{self, Cli, Commands};
use lims_liquid::report::EXIT_FAILURE;

fn main() {
    let cli = Cli::parse();

    // Initialize logging based on verbosity flag
    let filter = if cli.verbose {
        EnvFilter::new("lims_liquid=debug,info")
    } else {
        EnvFilter::new("lims_liquid=warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Manifest(args) => cli::manifest::run(args, cli.format),
        Commands::Pool(args) => cli::pool::run(args, cli.format),
        Commands::Norm(args) => cli::norm::run(args, cli.format),
        Commands::CheckIndices(args) => cli::check::run(args, cli.format, cli.verbose),
    };

    let code = match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            EXIT_FAILURE
        }
    };
    std::process::exit(code);
}
