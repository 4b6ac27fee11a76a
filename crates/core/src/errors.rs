use rust_decimal::Decimal;
use thiserror::Error;

use crate::domain::bill::{BillId, BillStatus};
use crate::domain::customer::CustomerId;
use crate::domain::supply::SupplyRecordId;

/// Coarse grouping of domain failures, used by callers to pick a response.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorClass {
    Validation,
    NotFound,
    Conflict,
}

impl ErrorClass {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid customer: {0}")]
    InvalidCustomer(String),
    #[error("customer `{0}` already exists")]
    DuplicateCustomer(CustomerId),
    #[error("customer `{0}` was not found")]
    CustomerNotFound(CustomerId),
    #[error("customer `{id}` has {outstanding} outstanding bill(s)")]
    CustomerHasOutstandingBills { id: CustomerId, outstanding: u32 },
    #[error("invalid supply window: {0}")]
    InvalidSupplyWindow(String),
    #[error("supply record `{0}` was not found")]
    SupplyRecordNotFound(SupplyRecordId),
    #[error("supply record is locked by settled bill `{0}`")]
    SettledBillLocked(BillId),
    #[error("supply record is referenced by outstanding bill `{0}`")]
    SupplyHasOutstandingBill(BillId),
    #[error("bill `{0}` was not found")]
    BillNotFound(BillId),
    #[error("invalid bill transition from {from:?} to {to:?}")]
    InvalidBillTransition { from: BillStatus, to: BillStatus },
    #[error("rate must be greater than zero, got {0}")]
    InvalidRate(Decimal),
    #[error("supply duration must not be negative, got {minutes} minute(s)")]
    NegativeDuration { minutes: i64 },
    #[error("{hours} h at {rate} overflows the amount range")]
    AmountOverflow { hours: Decimal, rate: Decimal },
    #[error("total of bill amounts overflows the amount range")]
    TotalOverflow,
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

impl DomainError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::CustomerNotFound(_) | Self::SupplyRecordNotFound(_) | Self::BillNotFound(_) => {
                ErrorClass::NotFound
            }
            Self::DuplicateCustomer(_)
            | Self::CustomerHasOutstandingBills { .. }
            | Self::SettledBillLocked(_)
            | Self::SupplyHasOutstandingBill(_)
            | Self::InvalidBillTransition { .. } => ErrorClass::Conflict,
            Self::InvalidCustomer(_)
            | Self::InvalidSupplyWindow(_)
            | Self::InvalidRate(_)
            | Self::NegativeDuration { .. }
            | Self::AmountOverflow { .. }
            | Self::TotalOverflow
            | Self::InvariantViolation(_) => ErrorClass::Validation,
        }
    }
}
