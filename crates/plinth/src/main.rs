mod cli;
mod commands;
mod error;
mod output;
mod server;
mod watch;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};
use crate::error::CliError;

const LEVELS: [&str; 4] = ["warn", "info", "debug", "trace"];

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // The server is chattier by default than the one-shot commands.
    let baseline = usize::from(matches!(cli.command, Command::Run(_)));
    init_tracing(baseline + usize::from(cli.global.verbose), cli.global.log_json);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

/// Logs go to stderr so `dump` and `check` output stays machine-readable.
fn init_tracing(verbosity: usize, json: bool) {
    let level = LEVELS[verbosity.min(LEVELS.len() - 1)];
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "plinth", &mut std::io::stdout());
            Ok(())
        }

        cmd => {
            tracing::debug!(command = ?cmd, "dispatching command");
            commands::dispatch(cmd, &cli.global).await
        }
    }
}
