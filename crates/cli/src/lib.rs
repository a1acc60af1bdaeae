pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "staffbot",
    about = "Staffbot operator CLI",
    long_about = "Operate staffbot readiness checks, migrations, config inspection, and activity log review.",
    after_help = "Examples:\n  staffbot doctor --json\n  staffbot config\n  staffbot activity --limit 20"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Run startup preflight checks and return structured status output")]
    Start,
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, database schema, and content asset readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Show the most recent activity log entries as JSON")]
    Activity {
        #[arg(long, default_value_t = 20, help = "Number of entries to show")]
        limit: u32,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Start => commands::start::run(),
        Command::Migrate => commands::migrate::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            let outcome = commands::doctor::run(json);
            commands::CommandResult { exit_code: if outcome.passed { 0 } else { 1 }, output: outcome.output }
        }
        Command::Activity { limit } => commands::activity::run(limit),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
