//! Printable invoices, statements and CSV exports.
//!
//! Rendering is pure: the formatter turns domain values into HTML documents.
//! Files are only touched by [`DocumentWriter`] and the [`export`] functions.

pub mod error;
pub mod export;
pub mod formatter;
pub mod pdf;
mod views;

pub use error::InvoiceError;
pub use export::{export_report, export_statement};
pub use formatter::{Document, InvoiceFormatter, InvoiceSettings};
pub use pdf::{DocumentWriter, WrittenDocument};
