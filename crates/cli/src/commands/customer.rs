use aquabill_core::config::LoadOptions;
use aquabill_core::domain::customer::{CustomerId, CustomerUpdate, NewCustomer};
use aquabill_db::CustomerRegistry;
use chrono::NaiveDate;
use clap::{Args, Subcommand};

use crate::commands::{run_with_application, CommandError, CommandResult, Outcome};

#[derive(Debug, Subcommand)]
pub enum CustomerCommand {
    #[command(about = "Register a new customer under a caller-chosen identifier")]
    Add(AddArgs),
    #[command(about = "Change customer details; an empty value clears address or phone")]
    Update(UpdateArgs),
    #[command(
        about = "Delete a customer with its supply history (refused while bills are outstanding)"
    )]
    Delete(IdArgs),
    #[command(about = "Show one customer")]
    Show(IdArgs),
    #[command(about = "List customers ordered by name")]
    List,
}

#[derive(Debug, Clone, Args)]
pub struct AddArgs {
    #[arg(long)]
    pub id: String,
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub address: Option<String>,
    #[arg(long)]
    pub phone: Option<String>,
    #[arg(long, help = "Connection date (YYYY-MM-DD), defaults to today")]
    pub connected_on: Option<NaiveDate>,
}

#[derive(Debug, Clone, Args)]
pub struct UpdateArgs {
    pub id: String,
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub address: Option<String>,
    #[arg(long)]
    pub phone: Option<String>,
    #[arg(long)]
    pub connected_on: Option<NaiveDate>,
}

#[derive(Debug, Clone, Args)]
pub struct IdArgs {
    pub id: String,
}

pub fn run(options: LoadOptions, command: CustomerCommand) -> CommandResult {
    match command {
        CustomerCommand::Add(args) => add(options, args),
        CustomerCommand::Update(args) => update(options, args),
        CustomerCommand::Delete(args) => delete(options, args),
        CustomerCommand::Show(args) => show(options, args),
        CustomerCommand::List => list(options),
    }
}

fn add(options: LoadOptions, args: AddArgs) -> CommandResult {
    run_with_application("customer add", options, |app| async move {
        let registry = CustomerRegistry::new(app.db_pool);
        let customer = registry
            .add(NewCustomer {
                id: args.id,
                name: args.name,
                address: args.address,
                phone: args.phone,
                connected_on: args.connected_on,
            })
            .await?;
        Outcome::new(format!("customer `{}` registered", customer.id), &customer)
    })
}

fn update(options: LoadOptions, args: UpdateArgs) -> CommandResult {
    run_with_application("customer update", options, |app| async move {
        let registry = CustomerRegistry::new(app.db_pool);
        let id = CustomerId(args.id);
        let customer = registry
            .update(
                &id,
                CustomerUpdate {
                    name: args.name,
                    address: args.address,
                    phone: args.phone,
                    connected_on: args.connected_on,
                },
            )
            .await?;
        Outcome::new(format!("customer `{}` updated", customer.id), &customer)
    })
}

fn delete(options: LoadOptions, args: IdArgs) -> CommandResult {
    run_with_application("customer delete", options, |app| async move {
        let registry = CustomerRegistry::new(app.db_pool);
        let id = CustomerId(args.id);
        registry.delete(&id).await?;
        Ok::<_, CommandError>(Outcome::message(format!("customer `{id}` deleted")))
    })
}

fn show(options: LoadOptions, args: IdArgs) -> CommandResult {
    run_with_application("customer show", options, |app| async move {
        let registry = CustomerRegistry::new(app.db_pool);
        let customer = registry.get(&CustomerId(args.id)).await?;
        Outcome::new(customer.name.clone(), &customer)
    })
}

fn list(options: LoadOptions) -> CommandResult {
    run_with_application("customer list", options, |app| async move {
        let customers = CustomerRegistry::new(app.db_pool).list().await?;
        Outcome::new(format!("{} customer(s)", customers.len()), &customers)
    })
}
