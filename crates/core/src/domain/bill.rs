use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::billing::{self, BillingCalculator};
use crate::domain::customer::CustomerId;
use crate::domain::supply::{SupplyRecord, SupplyRecordId, SupplyWindow};
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BillId(pub String);

impl BillId {
    pub fn generate() -> Self {
        Self(format!("BILL-{}", Uuid::new_v4().simple()))
    }
}

impl fmt::Display for BillId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillStatus {
    Outstanding,
    Settled,
}

impl BillStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Outstanding => "outstanding",
            Self::Settled => "settled",
        }
    }
}

impl std::str::FromStr for BillStatus {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "outstanding" => Ok(Self::Outstanding),
            "settled" => Ok(Self::Settled),
            other => Err(DomainError::InvariantViolation(format!(
                "unknown bill status `{other}` (expected outstanding|settled)"
            ))),
        }
    }
}

/// A charge for one supply record.
///
/// The amount is never set directly: it is derived from billed hours and rate
/// when the bill is issued, recomputed when its supply record changes, and
/// re-checked when a stored bill is restored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Bill {
    pub id: BillId,
    pub customer_id: CustomerId,
    pub supply_id: SupplyRecordId,
    rate: Decimal,
    hours: Decimal,
    amount: Decimal,
    pub status: BillStatus,
    pub issued_at: DateTime<Utc>,
    pub settled_at: Option<DateTime<Utc>>,
}

/// Stored representation of a bill, as read back from persistence.
#[derive(Clone, Debug)]
pub struct BillParts {
    pub id: BillId,
    pub customer_id: CustomerId,
    pub supply_id: SupplyRecordId,
    pub rate: Decimal,
    pub hours: Decimal,
    pub amount: Decimal,
    pub status: BillStatus,
    pub issued_at: DateTime<Utc>,
    pub settled_at: Option<DateTime<Utc>>,
}

impl Bill {
    pub fn issue(
        record: &SupplyRecord,
        rate: Decimal,
        calculator: &dyn BillingCalculator,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let charge = calculator.charge(record.duration(), rate)?;
        billing::verify_charge(&charge, record.duration(), rate)?;
        Ok(Self {
            id: BillId::generate(),
            customer_id: record.customer_id.clone(),
            supply_id: record.id.clone(),
            rate: charge.rate,
            hours: charge.hours,
            amount: charge.amount,
            status: BillStatus::Outstanding,
            issued_at: now,
            settled_at: None,
        })
    }

    pub fn restore(parts: BillParts) -> Result<Self, DomainError> {
        let expected = billing::amount_for(parts.hours, parts.rate)?;
        if expected != parts.amount {
            return Err(DomainError::InvariantViolation(format!(
                "bill `{}` stores amount {} but {} h at {} is {}",
                parts.id, parts.amount, parts.hours, parts.rate, expected
            )));
        }
        if (parts.status == BillStatus::Settled) != parts.settled_at.is_some() {
            return Err(DomainError::InvariantViolation(format!(
                "bill `{}` has status {} with settled_at {:?}",
                parts.id,
                parts.status.as_str(),
                parts.settled_at
            )));
        }

        Ok(Self {
            id: parts.id,
            customer_id: parts.customer_id,
            supply_id: parts.supply_id,
            rate: parts.rate,
            hours: parts.hours,
            amount: parts.amount,
            status: parts.status,
            issued_at: parts.issued_at,
            settled_at: parts.settled_at,
        })
    }

    /// Fails when the billed hours of the supply `window` are not the hours
    /// this bill was charged for.
    pub fn check_hours(&self, window: &SupplyWindow) -> Result<(), DomainError> {
        let expected = billing::billed_hours(window.duration());
        if expected != self.hours {
            return Err(DomainError::InvariantViolation(format!(
                "bill `{}` stores {} h but supply `{}` lasts {} h",
                self.id, self.hours, self.supply_id, expected
            )));
        }
        Ok(())
    }

    pub fn rate(&self) -> Decimal {
        self.rate
    }

    pub fn hours(&self) -> Decimal {
        self.hours
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn is_outstanding(&self) -> bool {
        self.status == BillStatus::Outstanding
    }

    /// Re-derives hours and amount from `record` at the bill's own rate.
    pub fn recompute(
        &mut self,
        record: &SupplyRecord,
        calculator: &dyn BillingCalculator,
    ) -> Result<(), DomainError> {
        if record.id != self.supply_id {
            return Err(DomainError::InvariantViolation(format!(
                "bill `{}` belongs to supply `{}`, not `{}`",
                self.id, self.supply_id, record.id
            )));
        }
        if !self.is_outstanding() {
            return Err(DomainError::SettledBillLocked(self.id.clone()));
        }

        let charge = calculator.charge(record.duration(), self.rate)?;
        billing::verify_charge(&charge, record.duration(), self.rate)?;
        self.hours = charge.hours;
        self.amount = charge.amount;
        self.customer_id = record.customer_id.clone();
        Ok(())
    }

    pub fn settle(&mut self, now: DateTime<Utc>) -> Result<(), DomainError> {
        if !self.is_outstanding() {
            return Err(DomainError::InvalidBillTransition {
                from: self.status,
                to: BillStatus::Settled,
            });
        }
        self.status = BillStatus::Settled;
        self.settled_at = Some(now);
        Ok(())
    }
}
