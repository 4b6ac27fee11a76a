//! Hourly water billing.
//!
//! A charge is `billed_hours × rate`, where billed hours are the supply
//! duration in hours rounded to two decimals and the amount is rounded to two
//! decimals as well. Both roundings are half away from zero.

use chrono::Duration;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::domain::supply::SupplyRecord;
use crate::errors::DomainError;

const SECONDS_PER_HOUR: i64 = 3_600;
const MONEY_SCALE: u32 = 2;
const HOURS_SCALE: u32 = 2;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Charge {
    pub hours: Decimal,
    pub rate: Decimal,
    pub amount: Decimal,
}

/// Prices a supply duration at an hourly rate.
///
/// Bills only accept a charge whose hours are the billed hours of the duration
/// and whose amount is those hours at the requested rate. Stored bills are
/// re-checked against the same rule when they are loaded.
pub trait BillingCalculator: Send + Sync {
    fn charge(&self, duration: Duration, rate: Decimal) -> Result<Charge, DomainError>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct HourlyBillingCalculator;

impl BillingCalculator for HourlyBillingCalculator {
    fn charge(&self, duration: Duration, rate: Decimal) -> Result<Charge, DomainError> {
        charge(duration, rate)
    }
}

/// Amount owed for a supply record at `rate` per hour.
pub fn compute(record: &SupplyRecord, rate: Decimal) -> Result<Decimal, DomainError> {
    charge(record.duration(), rate).map(|charge| charge.amount)
}

pub fn charge(duration: Duration, rate: Decimal) -> Result<Charge, DomainError> {
    if rate <= Decimal::ZERO {
        return Err(DomainError::InvalidRate(rate));
    }
    if duration < Duration::zero() {
        return Err(DomainError::NegativeDuration { minutes: duration.num_minutes() });
    }

    let hours = billed_hours(duration);
    Ok(Charge { hours, rate, amount: amount_for(hours, rate)? })
}

/// Checks that `charge` is the billed hours of `duration` at `rate`.
pub fn verify_charge(
    charge: &Charge,
    duration: Duration,
    rate: Decimal,
) -> Result<(), DomainError> {
    let hours = billed_hours(duration);
    if charge.rate != rate || charge.hours != hours {
        return Err(DomainError::InvariantViolation(format!(
            "charge of {} h at {} does not match {} h at {}",
            charge.hours, charge.rate, hours, rate
        )));
    }
    let expected = amount_for(hours, rate)?;
    if charge.amount != expected {
        return Err(DomainError::InvariantViolation(format!(
            "charge amount {} does not match {} h at {} = {}",
            charge.amount, hours, rate, expected
        )));
    }
    Ok(())
}

pub fn billed_hours(duration: Duration) -> Decimal {
    (Decimal::from(duration.num_seconds()) / Decimal::from(SECONDS_PER_HOUR))
        .round_dp_with_strategy(HOURS_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

pub fn amount_for(hours: Decimal, rate: Decimal) -> Result<Decimal, DomainError> {
    hours
        .checked_mul(rate)
        .map(round_money)
        .ok_or(DomainError::AmountOverflow { hours, rate })
}

/// Sum of `amounts` rounded to money scale.
pub fn total(amounts: impl IntoIterator<Item = Decimal>) -> Result<Decimal, DomainError> {
    amounts
        .into_iter()
        .try_fold(Decimal::ZERO, |sum, amount| sum.checked_add(amount))
        .map(round_money)
        .ok_or(DomainError::TotalOverflow)
}

pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}
