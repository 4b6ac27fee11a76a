use aquabill_core::config::LoadOptions;
use aquabill_core::domain::customer::CustomerId;
use aquabill_db::BillingDesk;
use chrono::NaiveDate;
use clap::Args;

use crate::commands::{run_with_application, CommandResult, Outcome};

#[derive(Debug, Clone, Args)]
pub struct StatementArgs {
    #[arg(long)]
    pub customer: String,
    #[arg(long, help = "First supply date (YYYY-MM-DD), inclusive")]
    pub from: NaiveDate,
    #[arg(long, help = "Last supply date (YYYY-MM-DD), inclusive")]
    pub to: NaiveDate,
}

pub fn run(options: LoadOptions, args: StatementArgs) -> CommandResult {
    run_with_application("statement", options, |app| async move {
        let symbol = app.config.billing.currency_symbol.clone();
        let desk = BillingDesk::new(app.db_pool, app.config.billing.rate_per_hour)?;
        let statement = desk.statement(&CustomerId(args.customer), args.from, args.to).await?;
        Outcome::new(
            format!(
                "{} line(s), total {symbol}{:.2}, outstanding {symbol}{:.2}",
                statement.lines.len(),
                statement.total,
                statement.outstanding
            ),
            &statement,
        )
    })
}
