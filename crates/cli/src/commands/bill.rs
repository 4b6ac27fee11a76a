use aquabill_core::config::LoadOptions;
use aquabill_core::domain::bill::{BillId, BillStatus};
use aquabill_core::domain::customer::CustomerId;
use aquabill_core::report::BillFilter;
use aquabill_db::BillingDesk;
use clap::{Args, Subcommand};

use crate::commands::{run_with_application, CommandResult, Outcome};

#[derive(Debug, Subcommand)]
pub enum BillCommand {
    #[command(about = "Show a bill with its customer and supply record")]
    Show(IdArgs),
    #[command(about = "List bills in issue order")]
    List(ListArgs),
    #[command(about = "Mark an outstanding bill as settled")]
    Settle(IdArgs),
}

#[derive(Debug, Clone, Args)]
pub struct IdArgs {
    pub id: String,
}

#[derive(Debug, Clone, Default, Args)]
pub struct ListArgs {
    #[arg(long)]
    pub customer: Option<String>,
    #[arg(long, help = "outstanding or settled")]
    pub status: Option<BillStatus>,
}

pub fn run(options: LoadOptions, command: BillCommand) -> CommandResult {
    match command {
        BillCommand::Show(args) => show(options, args),
        BillCommand::List(args) => list(options, args),
        BillCommand::Settle(args) => settle(options, args),
    }
}

fn show(options: LoadOptions, args: IdArgs) -> CommandResult {
    run_with_application("bill show", options, |app| async move {
        let desk = BillingDesk::new(app.db_pool, app.config.billing.rate_per_hour)?;
        let detail = desk.bill(&BillId(args.id)).await?;
        Outcome::new(
            format!("bill `{}` is {}", detail.bill.id, detail.bill.status.as_str()),
            &detail,
        )
    })
}

fn list(options: LoadOptions, args: ListArgs) -> CommandResult {
    run_with_application("bill list", options, |app| async move {
        let desk = BillingDesk::new(app.db_pool, app.config.billing.rate_per_hour)?;
        let filter = BillFilter { customer_id: args.customer.map(CustomerId), status: args.status };
        let bills = desk.bills(&filter).await?;
        Outcome::new(format!("{} bill(s)", bills.len()), &bills)
    })
}

fn settle(options: LoadOptions, args: IdArgs) -> CommandResult {
    run_with_application("bill settle", options, |app| async move {
        let desk = BillingDesk::new(app.db_pool, app.config.billing.rate_per_hour)?;
        let bill = desk.settle(&BillId(args.id)).await?;
        Outcome::new(format!("bill `{}` settled", bill.id), &bill)
    })
}
