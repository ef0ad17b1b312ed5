pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "chatrelay",
    about = "Chatrelay operator CLI",
    long_about = "Inspect configuration and check readiness of the chatrelay Telegram relay.",
    after_help = "Examples:\n  chatrelay doctor --json\n  chatrelay doctor --online\n  chatrelay config\n  chatrelay start"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Run startup preflight checks and return structured status output")]
    Start,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, token shape and endpoint readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
        #[arg(long, help = "Also call Telegram getMe to verify the bot token")]
        online: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Start => commands::start::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json, online } => commands::doctor::run(json, online),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
