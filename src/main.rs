use clap::Parser;
use std::process;

use fms::cli;
use fms::cli::commands::{Cli, Commands};
use fms::config::Config;
use fms::logging;

fn bootstrap() -> anyhow::Result<Config> {
    let config = Config::load()?;
    logging::init(&config.log_level)?;
    Ok(config)
}

fn main() {
    let cli_args = Cli::parse();
    let json_output = cli_args.json;
    let user = cli_args.user.clone();

    let config = match bootstrap() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e:#}");
            process::exit(1);
        }
    };

    let exit_code = match cli_args.command {
        Commands::Init => cli::init::run(json_output),
        Commands::User(cmd) => cli::user::run(cmd, json_output),
        Commands::Template(cmd) => cli::template::run(cmd, json_output),
        Commands::Project(cmd) => cli::project::run(cmd, json_output, user.as_deref(), &config),
        Commands::Task(cmd) => cli::task::run(cmd, json_output, user.as_deref(), &config),
        Commands::Objection(cmd) => cli::objection::run(cmd, json_output, user.as_deref()),
        Commands::Score(cmd) => cli::score::run(cmd, json_output),
        Commands::Outbox(cmd) => cli::outbox::run(cmd, json_output, &config),
    };

    process::exit(exit_code);
}
