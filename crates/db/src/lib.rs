pub mod billing_desk;
pub mod connection;
pub mod migrations;
pub mod registry;
pub mod repositories;

pub use billing_desk::BillingDesk;
pub use connection::{connect, connect_with_config, connect_with_settings, DbPool};
pub use registry::CustomerRegistry;
pub use repositories::RepositoryError;
