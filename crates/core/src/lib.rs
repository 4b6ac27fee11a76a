pub mod billing;
pub mod config;
pub mod domain;
pub mod errors;
pub mod report;

pub use billing::{BillingCalculator, Charge, HourlyBillingCalculator};
pub use domain::bill::{Bill, BillId, BillStatus};
pub use domain::customer::{Customer, CustomerId, CustomerUpdate, NewCustomer};
pub use domain::supply::{NewSupply, SupplyChanges, SupplyRecord, SupplyRecordId, SupplyWindow};
pub use errors::{DomainError, ErrorClass};
pub use report::{
    BillDetail, BillFilter, Period, Statement, StatementLine, SupplyFilter, SupplyLine,
    SupplyReport,
};
