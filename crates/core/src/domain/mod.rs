pub mod bill;
pub mod customer;
pub mod supply;
