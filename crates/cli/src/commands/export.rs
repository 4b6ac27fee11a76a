use std::path::PathBuf;

use aquabill_core::config::LoadOptions;
use aquabill_core::domain::customer::CustomerId;
use aquabill_db::BillingDesk;
use clap::{Args, Subcommand};
use serde_json::json;

use crate::commands::report::ReportArgs;
use crate::commands::statement::StatementArgs;
use crate::commands::{file_name_part, output_path, run_with_application, CommandResult, Outcome};

#[derive(Debug, Subcommand)]
pub enum ExportCommand {
    #[command(about = "Export a customer statement as CSV")]
    Statement {
        #[command(flatten)]
        args: StatementArgs,
        #[arg(long, help = "Target file; `.csv` is appended when missing")]
        output: Option<PathBuf>,
    },
    #[command(about = "Export a supply report as CSV")]
    Report {
        #[command(flatten)]
        args: ReportArgs,
        #[arg(long, help = "Target file; `.csv` is appended when missing")]
        output: Option<PathBuf>,
    },
}

pub fn run(options: LoadOptions, command: ExportCommand) -> CommandResult {
    match command {
        ExportCommand::Statement { args, output } => statement(options, args, output),
        ExportCommand::Report { args, output } => report(options, args, output),
    }
}

fn statement(options: LoadOptions, args: StatementArgs, output: Option<PathBuf>) -> CommandResult {
    run_with_application("export statement", options, |app| async move {
        let desk = BillingDesk::new(app.db_pool, app.config.billing.rate_per_hour)?;
        let statement = desk.statement(&CustomerId(args.customer), args.from, args.to).await?;
        let file_name = format!(
            "statement-{}-{}-{}.csv",
            file_name_part(&statement.customer.id.0),
            args.from.format("%Y%m%d"),
            args.to.format("%Y%m%d")
        );

        let path = aquabill_invoice::export_statement(
            &statement,
            &output_path(&app.config, output, file_name),
        )?;
        Outcome::new(
            format!("{} row(s) exported to {}", statement.lines.len(), path.display()),
            &json!({ "path": path, "rows": statement.lines.len() }),
        )
    })
}

fn report(options: LoadOptions, args: ReportArgs, output: Option<PathBuf>) -> CommandResult {
    run_with_application("export report", options, |app| async move {
        let desk = BillingDesk::new(app.db_pool, app.config.billing.rate_per_hour)?;
        let report = desk.report(args.filter()?).await?;
        let file_name =
            format!("report-{}-{}.csv", args.from.format("%Y%m%d"), args.to.format("%Y%m%d"));

        let path =
            aquabill_invoice::export_report(&report, &output_path(&app.config, output, file_name))?;
        Outcome::new(
            format!("{} row(s) exported to {}", report.lines.len(), path.display()),
            &json!({ "path": path, "rows": report.lines.len() }),
        )
    })
}
