use async_trait::async_trait;
use thiserror::Error;

use aquabill_core::domain::bill::{Bill, BillId};
use aquabill_core::domain::customer::{Customer, CustomerId};
use aquabill_core::domain::supply::{SupplyRecord, SupplyRecordId};
use aquabill_core::errors::DomainError;
use aquabill_core::report::{BillFilter, SupplyFilter, SupplyLine};

pub mod bill;
mod columns;
pub mod customer;
pub mod supply;

pub use bill::SqlBillRepository;
pub use customer::SqlCustomerRepository;
pub use supply::SqlSupplyRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl RepositoryError {
    /// Error class reported to callers: the domain class for business rule
    /// failures, `database` for everything raised by the store itself.
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::Domain(error) => error.class().as_str(),
            Self::Database(_) | Self::Decode(_) => "database",
        }
    }
}

#[async_trait]
pub trait CustomerRepository: Send + Sync {
    async fn insert(&self, customer: &Customer) -> Result<(), RepositoryError>;
    async fn update(&self, customer: &Customer) -> Result<(), RepositoryError>;
    /// Removes the customer with its settled bills and supply records.
    async fn delete(&self, id: &CustomerId) -> Result<(), RepositoryError>;
    async fn find_by_id(&self, id: &CustomerId) -> Result<Option<Customer>, RepositoryError>;
    async fn list(&self) -> Result<Vec<Customer>, RepositoryError>;
}

#[async_trait]
pub trait SupplyRepository: Send + Sync {
    /// Stores a supply record together with the bill issued for it.
    async fn insert(&self, record: &SupplyRecord, bill: &Bill) -> Result<(), RepositoryError>;
    async fn update(&self, record: &SupplyRecord, bill: &Bill) -> Result<(), RepositoryError>;
    async fn delete(&self, id: &SupplyRecordId) -> Result<(), RepositoryError>;
    async fn find_by_id(&self, id: &SupplyRecordId)
        -> Result<Option<SupplyLine>, RepositoryError>;
    async fn list(&self, filter: &SupplyFilter) -> Result<Vec<SupplyLine>, RepositoryError>;
}

#[async_trait]
pub trait BillRepository: Send + Sync {
    async fn find_by_id(&self, id: &BillId) -> Result<Option<Bill>, RepositoryError>;
    async fn list(&self, filter: &BillFilter) -> Result<Vec<Bill>, RepositoryError>;
    async fn save_settlement(&self, bill: &Bill) -> Result<(), RepositoryError>;
}
