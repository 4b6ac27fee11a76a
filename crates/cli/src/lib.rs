pub mod bootstrap;
pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use aquabill_core::config::{AppConfig, ConfigOverrides, LoadOptions, LogFormat};
use clap::{Parser, Subcommand};

use crate::commands::{
    bill::BillCommand, customer::CustomerCommand, export::ExportCommand, invoice::InvoiceArgs,
    report::ReportArgs, statement::StatementArgs, supply::SupplyCommand,
};

#[derive(Debug, Parser)]
#[command(
    name = "aquabill",
    about = "Water supply registry and billing CLI",
    long_about = "Register customers, record water supply windows, settle bills and print invoices.",
    after_help = "Examples:\n  aquabill customer add --id C-001 --name \"Ramesh Kumar\"\n  aquabill supply add --customer C-001 --date 2026-06-01 --start 06:00 --end 08:30\n  aquabill invoice --customer C-001 --from 2026-06-01 --to 2026-06-30 --output june.pdf"
)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        help = "Config file (defaults to aquabill.toml or config/aquabill.toml)"
    )]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Override database.url")]
    database_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Validate config, database, templates and PDF converter readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Manage customers")]
    Customer {
        #[command(subcommand)]
        command: CustomerCommand,
    },
    #[command(about = "Record and correct water supply")]
    Supply {
        #[command(subcommand)]
        command: SupplyCommand,
    },
    #[command(about = "Inspect and settle bills")]
    Bill {
        #[command(subcommand)]
        command: BillCommand,
    },
    #[command(about = "Supply report over a date range with its total")]
    Report(ReportArgs),
    #[command(about = "Statement of a customer's bills over a date range")]
    Statement(StatementArgs),
    #[command(about = "Render a bill or a statement as a printable document")]
    Invoice(InvoiceArgs),
    #[command(about = "Export statements and reports as CSV")]
    Export {
        #[command(subcommand)]
        command: ExportCommand,
    },
}

impl Cli {
    fn load_options(&self) -> LoadOptions {
        LoadOptions {
            config_path: self.config.clone(),
            require_file: self.config.is_some(),
            overrides: ConfigOverrides {
                database_url: self.database_url.clone(),
                ..ConfigOverrides::default()
            },
        }
    }
}

/// Installs the stderr subscriber; stdout carries command output only.
pub fn init_logging(config: &AppConfig) {
    use tracing::Level;
    use LogFormat::*;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    match config.logging.format {
        Compact => builder.compact().init(),
        Pretty => builder.pretty().init(),
        Json => builder.json().init(),
    }
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let options = cli.load_options();

    let logging_config = AppConfig::load(options.clone()).unwrap_or_else(|_| {
        let mut fallback = AppConfig::default();
        fallback.logging.level = "warn".to_string();
        fallback
    });
    init_logging(&logging_config);

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(options),
        Command::Config => commands::config::run(options),
        Command::Doctor { json } => commands::doctor::run(options, json),
        Command::Customer { command } => commands::customer::run(options, command),
        Command::Supply { command } => commands::supply::run(options, command),
        Command::Bill { command } => commands::bill::run(options, command),
        Command::Report(args) => commands::report::run(options, args),
        Command::Statement(args) => commands::statement::run(options, args),
        Command::Invoice(args) => commands::invoice::run(options, args),
        Command::Export { command } => commands::export::run(options, command),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
