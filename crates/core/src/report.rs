use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::billing;
use crate::domain::bill::{Bill, BillStatus};
use crate::domain::customer::{Customer, CustomerId};
use crate::domain::supply::SupplyRecord;
use crate::errors::DomainError;

/// Inclusive supply-date range.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Period {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl Period {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Result<Self, DomainError> {
        if to < from {
            return Err(DomainError::InvariantViolation(format!(
                "period ends ({to}) before it starts ({from})"
            )));
        }
        Ok(Self { from, to })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from <= date && date <= self.to
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SupplyFilter {
    pub period: Period,
    pub customer_id: Option<CustomerId>,
    /// Case-insensitive substring match on the crop.
    pub crop: Option<String>,
}

impl SupplyFilter {
    pub fn for_period(period: Period) -> Self {
        Self { period, customer_id: None, crop: None }
    }

    pub fn matches(&self, record: &SupplyRecord) -> bool {
        if !self.period.contains(record.supply_date()) {
            return false;
        }
        if let Some(customer_id) = &self.customer_id {
            if &record.customer_id != customer_id {
                return false;
            }
        }
        match self.crop_needle() {
            Some(needle) => record
                .crop
                .as_deref()
                .map(|crop| crop.to_lowercase().contains(&needle))
                .unwrap_or(false),
            None => true,
        }
    }

    pub fn crop_needle(&self) -> Option<String> {
        self.crop
            .as_deref()
            .map(str::trim)
            .filter(|crop| !crop.is_empty())
            .map(str::to_lowercase)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BillFilter {
    pub customer_id: Option<CustomerId>,
    pub status: Option<BillStatus>,
}

/// One bill with the customer and supply record it was issued for.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BillDetail {
    pub customer: Customer,
    pub record: SupplyRecord,
    pub bill: Bill,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StatementLine {
    pub record: SupplyRecord,
    pub bill: Bill,
}

/// Everything a customer was billed for over a period.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Statement {
    pub customer: Customer,
    pub period: Period,
    pub lines: Vec<StatementLine>,
    pub total: Decimal,
    pub outstanding: Decimal,
}

impl Statement {
    pub fn new(
        customer: Customer,
        period: Period,
        lines: Vec<StatementLine>,
    ) -> Result<Self, DomainError> {
        for line in &lines {
            if line.record.customer_id != customer.id || line.bill.customer_id != customer.id {
                return Err(DomainError::InvariantViolation(format!(
                    "statement for `{}` contains supply `{}` of another customer",
                    customer.id, line.record.id
                )));
            }
        }

        let total = billing::total(lines.iter().map(|line| line.bill.amount()))?;
        let outstanding = billing::total(
            lines.iter().filter(|line| line.bill.is_outstanding()).map(|line| line.bill.amount()),
        )?;
        Ok(Self { customer, period, lines, total, outstanding })
    }
}

/// A supply record joined with its bill and the customer's name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SupplyLine {
    pub customer_name: String,
    pub record: SupplyRecord,
    pub bill: Bill,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SupplyReport {
    pub filter: SupplyFilter,
    pub lines: Vec<SupplyLine>,
    pub total: Decimal,
}

impl SupplyReport {
    pub fn new(filter: SupplyFilter, lines: Vec<SupplyLine>) -> Result<Self, DomainError> {
        let total = billing::total(lines.iter().map(|line| line.bill.amount()))?;
        Ok(Self { filter, lines, total })
    }
}
