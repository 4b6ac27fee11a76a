use std::path::PathBuf;

use aquabill_core::config::LoadOptions;
use aquabill_core::domain::bill::BillId;
use aquabill_core::domain::customer::CustomerId;
use aquabill_db::BillingDesk;
use aquabill_invoice::{DocumentWriter, InvoiceFormatter};
use chrono::NaiveDate;
use clap::Args;

use crate::commands::{
    file_name_part, output_path, run_with_application, CommandError, CommandResult, Outcome,
};

/// Either `--bill` alone, or `--customer` with `--from` and `--to`.
#[derive(Debug, Clone, Args)]
pub struct InvoiceArgs {
    #[arg(
        long,
        conflicts_with_all = ["customer", "from", "to"],
        required_unless_present = "customer"
    )]
    pub bill: Option<String>,
    #[arg(long, requires_all = ["from", "to"])]
    pub customer: Option<String>,
    #[arg(long)]
    pub from: Option<NaiveDate>,
    #[arg(long)]
    pub to: Option<NaiveDate>,
    #[arg(long, help = "Target file; `.pdf` targets fall back to `.html` without wkhtmltopdf")]
    pub output: Option<PathBuf>,
}

pub fn run(options: LoadOptions, args: InvoiceArgs) -> CommandResult {
    run_with_application("invoice", options, |app| async move {
        let formatter = InvoiceFormatter::from_config(&app.config)?;
        let desk = BillingDesk::new(app.db_pool.clone(), app.config.billing.rate_per_hour)?;

        let (document, file_name) = match (args.bill, args.customer, args.from, args.to) {
            (Some(bill_id), _, _, _) => {
                let detail = desk.bill(&BillId(bill_id)).await?;
                let file_name = format!("bill-{}.html", detail.bill.id);
                (formatter.render(&detail)?, file_name)
            }
            (None, Some(customer_id), Some(from), Some(to)) => {
                let statement = desk.statement(&CustomerId(customer_id), from, to).await?;
                let file_name = format!(
                    "statement-{}-{}-{}.html",
                    file_name_part(&statement.customer.id.0),
                    from.format("%Y%m%d"),
                    to.format("%Y%m%d")
                );
                (formatter.render_statement(&statement)?, file_name)
            }
            _ => {
                return Err(CommandError {
                    error_class: "validation",
                    message: "pass --bill, or --customer with --from and --to".to_string(),
                    exit_code: 6,
                });
            }
        };

        let target = output_path(&app.config, args.output, file_name);
        let written = DocumentWriter::detect().write(&document, &target).await?;
        Outcome::new(
            format!("{} written to {}", document.title, written.path().display()),
            &written,
        )
    })
}
