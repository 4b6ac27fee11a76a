//! Supply recording and bill lifecycle.
//!
//! Every supply record carries exactly one bill. The bill is issued at the
//! desk's rate when the supply is recorded, recomputed at its own rate while it
//! is outstanding, and frozen once settled.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use tracing::info;

use aquabill_core::billing::{BillingCalculator, HourlyBillingCalculator};
use aquabill_core::domain::bill::{Bill, BillId};
use aquabill_core::domain::customer::CustomerId;
use aquabill_core::domain::supply::{NewSupply, SupplyChanges, SupplyRecordId};
use aquabill_core::errors::DomainError;
use aquabill_core::report::{
    BillDetail, BillFilter, Period, Statement, StatementLine, SupplyFilter, SupplyLine,
    SupplyReport,
};

use crate::repositories::{
    BillRepository, CustomerRepository, RepositoryError, SqlBillRepository, SqlCustomerRepository,
    SqlSupplyRepository, SupplyRepository,
};
use crate::DbPool;

#[derive(Clone)]
pub struct BillingDesk {
    customers: Arc<dyn CustomerRepository>,
    supplies: Arc<dyn SupplyRepository>,
    bills: Arc<dyn BillRepository>,
    calculator: Arc<dyn BillingCalculator>,
    rate: Decimal,
}

impl BillingDesk {
    pub fn new(pool: DbPool, rate: Decimal) -> Result<Self, DomainError> {
        if rate <= Decimal::ZERO {
            return Err(DomainError::InvalidRate(rate));
        }

        Ok(Self {
            customers: Arc::new(SqlCustomerRepository::new(pool.clone())),
            supplies: Arc::new(SqlSupplyRepository::new(pool.clone())),
            bills: Arc::new(SqlBillRepository::new(pool)),
            calculator: Arc::new(HourlyBillingCalculator),
            rate,
        })
    }

    pub fn with_calculator(mut self, calculator: Arc<dyn BillingCalculator>) -> Self {
        self.calculator = calculator;
        self
    }

    /// Rate applied to newly issued bills.
    pub fn rate(&self) -> Decimal {
        self.rate
    }

    pub async fn record_supply(&self, supply: NewSupply) -> Result<SupplyLine, RepositoryError> {
        let customer = self
            .customers
            .find_by_id(&supply.customer_id)
            .await?
            .ok_or_else(|| DomainError::CustomerNotFound(supply.customer_id.clone()))?;

        let now = Utc::now();
        let record = supply.into_record(now);
        let bill = Bill::issue(&record, self.rate, self.calculator.as_ref(), now)?;
        self.supplies.insert(&record, &bill).await?;

        info!(
            event_name = "billing.supply.recorded",
            customer_id = %record.customer_id,
            supply_id = %record.id,
            bill_id = %bill.id,
            amount = %bill.amount(),
            "supply recorded and bill issued"
        );
        Ok(SupplyLine { customer_name: customer.name, record, bill })
    }

    pub async fn update_supply(
        &self,
        id: &SupplyRecordId,
        changes: SupplyChanges,
    ) -> Result<SupplyLine, RepositoryError> {
        let SupplyLine { customer_name, mut record, mut bill } = self.supply(id).await?;
        if !bill.is_outstanding() {
            return Err(DomainError::SettledBillLocked(bill.id).into());
        }

        changes.apply(&mut record);
        bill.recompute(&record, self.calculator.as_ref())?;
        self.supplies.update(&record, &bill).await?;

        info!(
            event_name = "billing.supply.updated",
            supply_id = %record.id,
            bill_id = %bill.id,
            amount = %bill.amount(),
            "supply updated and bill recomputed"
        );
        Ok(SupplyLine { customer_name, record, bill })
    }

    pub async fn delete_supply(&self, id: &SupplyRecordId) -> Result<(), RepositoryError> {
        let line = self.supply(id).await?;
        if line.bill.is_outstanding() {
            return Err(DomainError::SupplyHasOutstandingBill(line.bill.id).into());
        }

        self.supplies.delete(id).await?;

        info!(event_name = "billing.supply.deleted", supply_id = %id, "supply deleted");
        Ok(())
    }

    pub async fn supply(&self, id: &SupplyRecordId) -> Result<SupplyLine, RepositoryError> {
        self.supplies
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::SupplyRecordNotFound(id.clone()).into())
    }

    pub async fn settle(&self, id: &BillId) -> Result<Bill, RepositoryError> {
        let mut bill = self.find_bill(id).await?;
        bill.settle(Utc::now())?;
        self.bills.save_settlement(&bill).await?;

        info!(
            event_name = "billing.bill.settled",
            bill_id = %bill.id,
            customer_id = %bill.customer_id,
            amount = %bill.amount(),
            "bill settled"
        );
        Ok(bill)
    }

    /// A bill together with the customer and supply record it was issued for.
    pub async fn bill(&self, id: &BillId) -> Result<BillDetail, RepositoryError> {
        let bill = self.find_bill(id).await?;
        let line = self.supplies.find_by_id(&bill.supply_id).await?.ok_or_else(|| {
            DomainError::InvariantViolation(format!(
                "bill `{}` references missing supply `{}`",
                bill.id, bill.supply_id
            ))
        })?;
        let customer = self
            .customers
            .find_by_id(&bill.customer_id)
            .await?
            .ok_or_else(|| DomainError::CustomerNotFound(bill.customer_id.clone()))?;

        Ok(BillDetail { customer, record: line.record, bill: line.bill })
    }

    pub async fn bills(&self, filter: &BillFilter) -> Result<Vec<Bill>, RepositoryError> {
        self.bills.list(filter).await
    }

    pub async fn statement(
        &self,
        customer_id: &CustomerId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Statement, RepositoryError> {
        let period = Period::new(from, to)?;
        let customer = self
            .customers
            .find_by_id(customer_id)
            .await?
            .ok_or_else(|| DomainError::CustomerNotFound(customer_id.clone()))?;

        let filter = SupplyFilter { period, customer_id: Some(customer_id.clone()), crop: None };
        let lines = self
            .supplies
            .list(&filter)
            .await?
            .into_iter()
            .map(|line| StatementLine { record: line.record, bill: line.bill })
            .collect();

        Ok(Statement::new(customer, period, lines)?)
    }

    pub async fn report(&self, filter: SupplyFilter) -> Result<SupplyReport, RepositoryError> {
        let lines = self.supplies.list(&filter).await?;
        Ok(SupplyReport::new(filter, lines)?)
    }

    async fn find_bill(&self, id: &BillId) -> Result<Bill, RepositoryError> {
        self.bills
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::BillNotFound(id.clone()).into())
    }
}
