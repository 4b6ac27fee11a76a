use aquabill_core::config::LoadOptions;
use aquabill_core::domain::customer::CustomerId;
use aquabill_core::report::{Period, SupplyFilter};
use aquabill_db::BillingDesk;
use chrono::NaiveDate;
use clap::Args;

use crate::commands::{run_with_application, CommandResult, Outcome};

#[derive(Debug, Clone, Args)]
pub struct ReportArgs {
    #[arg(long, help = "First supply date (YYYY-MM-DD), inclusive")]
    pub from: NaiveDate,
    #[arg(long, help = "Last supply date (YYYY-MM-DD), inclusive")]
    pub to: NaiveDate,
    #[arg(long)]
    pub customer: Option<String>,
    #[arg(long, help = "Case-insensitive crop substring")]
    pub crop: Option<String>,
}

impl ReportArgs {
    pub(crate) fn filter(&self) -> Result<SupplyFilter, aquabill_core::DomainError> {
        Ok(SupplyFilter {
            period: Period::new(self.from, self.to)?,
            customer_id: self.customer.clone().map(CustomerId),
            crop: self.crop.clone(),
        })
    }
}

pub fn run(options: LoadOptions, args: ReportArgs) -> CommandResult {
    run_with_application("report", options, |app| async move {
        let desk = BillingDesk::new(app.db_pool, app.config.billing.rate_per_hour)?;
        let report = desk.report(args.filter()?).await?;
        Outcome::new(
            format!(
                "{} supply record(s), total {}{:.2}",
                report.lines.len(),
                app.config.billing.currency_symbol,
                report.total
            ),
            &report,
        )
    })
}
