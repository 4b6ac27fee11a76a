use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{sqlite::SqliteRow, Row};

use aquabill_core::domain::bill::{Bill, BillId, BillParts, BillStatus};
use aquabill_core::domain::customer::CustomerId;
use aquabill_core::domain::supply::{SupplyRecord, SupplyRecordId, SupplyWindow};

use super::RepositoryError;

const DATE_FORMAT: &str = "%Y-%m-%d";
const LOCAL_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

pub fn format_date(value: NaiveDate) -> String {
    value.format(DATE_FORMAT).to_string()
}

pub fn format_local_time(value: NaiveDateTime) -> String {
    value.format(LOCAL_TIME_FORMAT).to_string()
}

pub fn format_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339()
}

pub fn parse_date(column: &str, value: String) -> Result<NaiveDate, RepositoryError> {
    NaiveDate::parse_from_str(&value, DATE_FORMAT).map_err(|error| {
        RepositoryError::Decode(format!("invalid date in `{column}`: `{value}` ({error})"))
    })
}

pub fn parse_local_time(column: &str, value: String) -> Result<NaiveDateTime, RepositoryError> {
    NaiveDateTime::parse_from_str(&value, LOCAL_TIME_FORMAT).map_err(|error| {
        RepositoryError::Decode(format!("invalid time in `{column}`: `{value}` ({error})"))
    })
}

pub fn parse_timestamp(column: &str, value: String) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(&value).map(|timestamp| timestamp.with_timezone(&Utc)).map_err(
        |error| {
            RepositoryError::Decode(format!("invalid timestamp in `{column}`: `{value}` ({error})"))
        },
    )
}

pub fn parse_optional_timestamp(
    column: &str,
    value: Option<String>,
) -> Result<Option<DateTime<Utc>>, RepositoryError> {
    value.map(|timestamp| parse_timestamp(column, timestamp)).transpose()
}

pub fn parse_decimal(column: &str, value: String) -> Result<Decimal, RepositoryError> {
    Decimal::from_str(&value).map_err(|error| {
        RepositoryError::Decode(format!("invalid decimal in `{column}`: `{value}` ({error})"))
    })
}

/// Expects the bill columns of a row, with the bill id aliased to `bill_id`.
pub fn bill_from_row(row: &SqliteRow) -> Result<Bill, RepositoryError> {
    let status_raw = row.try_get::<String, _>("status")?;
    let status = BillStatus::from_str(&status_raw)
        .map_err(|_| RepositoryError::Decode(format!("unknown bill status `{status_raw}`")))?;

    let parts = BillParts {
        id: BillId(row.try_get("bill_id")?),
        customer_id: CustomerId(row.try_get("customer_id")?),
        supply_id: SupplyRecordId(row.try_get("supply_id")?),
        rate: parse_decimal("rate", row.try_get("rate")?)?,
        hours: parse_decimal("hours", row.try_get("hours")?)?,
        amount: parse_decimal("amount", row.try_get("amount")?)?,
        status,
        issued_at: parse_timestamp("issued_at", row.try_get("issued_at")?)?,
        settled_at: parse_optional_timestamp("settled_at", row.try_get("settled_at")?)?,
    };

    Bill::restore(parts).map_err(|error| RepositoryError::Decode(error.to_string()))
}

/// A bill whose billed hours are re-derived from the supply window columns
/// (`started_at`, `ended_at`) of the same row.
pub fn checked_bill_from_row(row: &SqliteRow) -> Result<Bill, RepositoryError> {
    let bill = bill_from_row(row)?;
    bill.check_hours(&window_from_row(row)?)
        .map_err(|error| RepositoryError::Decode(error.to_string()))?;
    Ok(bill)
}

fn window_from_row(row: &SqliteRow) -> Result<SupplyWindow, RepositoryError> {
    let start = parse_local_time("started_at", row.try_get("started_at")?)?;
    let end = parse_local_time("ended_at", row.try_get("ended_at")?)?;
    SupplyWindow::new(start, end).map_err(|error| RepositoryError::Decode(error.to_string()))
}

/// Expects the supply columns of a row, with the record id aliased to
/// `supply_id` and its creation time to `supply_created_at`.
pub fn supply_from_row(row: &SqliteRow) -> Result<SupplyRecord, RepositoryError> {
    let window = window_from_row(row)?;

    Ok(SupplyRecord {
        id: SupplyRecordId(row.try_get("supply_id")?),
        customer_id: CustomerId(row.try_get("customer_id")?),
        window,
        crop: row.try_get("crop")?,
        notes: row.try_get("notes")?,
        created_at: parse_timestamp("supply_created_at", row.try_get("supply_created_at")?)?,
    })
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{format_local_time, parse_decimal, parse_local_time};
    use crate::repositories::RepositoryError;

    #[test]
    fn local_time_keeps_fractional_seconds() {
        let day = NaiveDate::from_ymd_opt(2026, 2, 1).unwrap();
        let precise = day.and_hms_milli_opt(6, 15, 0, 250).unwrap();
        let whole = day.and_hms_opt(6, 15, 0).unwrap();

        assert_eq!(format_local_time(precise), "2026-02-01T06:15:00.250");
        assert_eq!(format_local_time(whole), "2026-02-01T06:15:00");
        assert_eq!(parse_local_time("started_at", format_local_time(precise)).unwrap(), precise);
        assert_eq!(parse_local_time("started_at", format_local_time(whole)).unwrap(), whole);
    }

    #[test]
    fn bad_decimal_is_a_decode_error() {
        assert!(matches!(
            parse_decimal("amount", "ten".to_string()),
            Err(RepositoryError::Decode(message)) if message.contains("amount")
        ));
    }
}
