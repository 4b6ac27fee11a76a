use aquabill_core::config::LoadOptions;
use aquabill_core::domain::customer::CustomerId;
use aquabill_core::domain::supply::{NewSupply, SupplyChanges, SupplyRecordId, SupplyWindow};
use aquabill_core::report::{Period, SupplyFilter};
use aquabill_db::BillingDesk;
use chrono::{Datelike, Local, NaiveDate};
use clap::{Args, Subcommand};

use crate::commands::{run_with_application, CommandError, CommandResult, Outcome};

const CLOCK_FORMAT: &str = "%H:%M";

#[derive(Debug, Subcommand)]
pub enum SupplyCommand {
    #[command(about = "Record a supply window and issue its bill at the configured rate")]
    Add(AddArgs),
    #[command(about = "Correct a supply record and recompute its outstanding bill")]
    Update(UpdateArgs),
    #[command(about = "Delete a supply record whose bill is settled")]
    Delete(IdArgs),
    #[command(about = "Show one supply record with its bill")]
    Show(IdArgs),
    #[command(about = "List supply records, by default for the current month")]
    List(ListArgs),
}

#[derive(Debug, Clone, Args)]
pub struct AddArgs {
    #[arg(long)]
    pub customer: String,
    #[arg(long, help = "Supply date (YYYY-MM-DD)")]
    pub date: NaiveDate,
    #[arg(long, help = "Start clock, HH:MM or hh:MM AM/PM")]
    pub start: String,
    #[arg(long, help = "End clock; earlier than start means the next morning")]
    pub end: String,
    #[arg(long)]
    pub crop: Option<String>,
    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct UpdateArgs {
    pub id: String,
    #[arg(long)]
    pub date: Option<NaiveDate>,
    #[arg(long)]
    pub start: Option<String>,
    #[arg(long)]
    pub end: Option<String>,
    #[arg(long)]
    pub crop: Option<String>,
    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct IdArgs {
    pub id: String,
}

#[derive(Debug, Clone, Default, Args)]
pub struct ListArgs {
    #[arg(long)]
    pub from: Option<NaiveDate>,
    #[arg(long)]
    pub to: Option<NaiveDate>,
    #[arg(long)]
    pub customer: Option<String>,
    #[arg(long, help = "Case-insensitive crop substring")]
    pub crop: Option<String>,
}

pub fn run(options: LoadOptions, command: SupplyCommand) -> CommandResult {
    match command {
        SupplyCommand::Add(args) => add(options, args),
        SupplyCommand::Update(args) => update(options, args),
        SupplyCommand::Delete(args) => delete(options, args),
        SupplyCommand::Show(args) => show(options, args),
        SupplyCommand::List(args) => list(options, args),
    }
}

fn add(options: LoadOptions, args: AddArgs) -> CommandResult {
    run_with_application("supply add", options, |app| async move {
        let desk = BillingDesk::new(app.db_pool, app.config.billing.rate_per_hour)?;
        let window = SupplyWindow::from_clock(args.date, &args.start, &args.end)?;
        let line = desk
            .record_supply(NewSupply {
                customer_id: CustomerId(args.customer),
                window,
                crop: args.crop,
                notes: args.notes,
            })
            .await?;
        Outcome::new(
            format!("supply `{}` recorded, bill `{}` issued", line.record.id, line.bill.id),
            &line,
        )
    })
}

fn update(options: LoadOptions, args: UpdateArgs) -> CommandResult {
    run_with_application("supply update", options, |app| async move {
        let desk = BillingDesk::new(app.db_pool, app.config.billing.rate_per_hour)?;
        let id = SupplyRecordId(args.id);

        let window = if args.date.is_some() || args.start.is_some() || args.end.is_some() {
            let current = desk.supply(&id).await?.record.window;
            let date = args.date.unwrap_or_else(|| current.supply_date());
            let start =
                args.start.unwrap_or_else(|| current.start().format(CLOCK_FORMAT).to_string());
            let end = args.end.unwrap_or_else(|| current.end().format(CLOCK_FORMAT).to_string());
            Some(SupplyWindow::from_clock(date, &start, &end)?)
        } else {
            None
        };

        let line = desk
            .update_supply(&id, SupplyChanges { window, crop: args.crop, notes: args.notes })
            .await?;
        Outcome::new(format!("supply `{}` updated", line.record.id), &line)
    })
}

fn delete(options: LoadOptions, args: IdArgs) -> CommandResult {
    run_with_application("supply delete", options, |app| async move {
        let desk = BillingDesk::new(app.db_pool, app.config.billing.rate_per_hour)?;
        let id = SupplyRecordId(args.id);
        desk.delete_supply(&id).await?;
        Ok::<_, CommandError>(Outcome::message(format!("supply `{id}` deleted")))
    })
}

fn show(options: LoadOptions, args: IdArgs) -> CommandResult {
    run_with_application("supply show", options, |app| async move {
        let desk = BillingDesk::new(app.db_pool, app.config.billing.rate_per_hour)?;
        let line = desk.supply(&SupplyRecordId(args.id)).await?;
        Outcome::new(format!("supply `{}` for {}", line.record.id, line.customer_name), &line)
    })
}

fn list(options: LoadOptions, args: ListArgs) -> CommandResult {
    run_with_application("supply list", options, |app| async move {
        let desk = BillingDesk::new(app.db_pool, app.config.billing.rate_per_hour)?;
        let today = Local::now().date_naive();
        let from = args.from.unwrap_or_else(|| today.with_day(1).unwrap_or(today));
        let to = args.to.unwrap_or(today);

        let filter = SupplyFilter {
            period: Period::new(from, to)?,
            customer_id: args.customer.map(CustomerId),
            crop: args.crop,
        };
        let report = desk.report(filter).await?;
        Outcome::new(format!("{} supply record(s)", report.lines.len()), &report.lines)
    })
}
