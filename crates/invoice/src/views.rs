use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use aquabill_core::billing;
use aquabill_core::domain::bill::Bill;
use aquabill_core::domain::customer::Customer;
use aquabill_core::domain::supply::SupplyRecord;

const DISPLAY_DATE_FORMAT: &str = "%d/%m/%Y";
const CLOCK_FORMAT: &str = "%H:%M";

pub fn display_date(date: NaiveDate) -> String {
    date.format(DISPLAY_DATE_FORMAT).to_string()
}

pub fn display_day(timestamp: DateTime<Utc>) -> String {
    display_date(timestamp.date_naive())
}

pub fn plain_amount(amount: Decimal) -> String {
    format!("{:.2}", billing::round_money(amount))
}

pub fn money(symbol: &str, amount: Decimal) -> String {
    format!("{symbol}{}", plain_amount(amount))
}

/// Start and end clock of a record. An end on a later day is suffixed `(+N)`.
pub fn clocks(record: &SupplyRecord) -> (String, String) {
    let start = record.window.start();
    let end = record.window.end();
    let mut end_clock = end.format(CLOCK_FORMAT).to_string();
    let days_later = (end.date() - start.date()).num_days();
    if days_later > 0 {
        end_clock.push_str(&format!(" (+{days_later})"));
    }
    (start.format(CLOCK_FORMAT).to_string(), end_clock)
}

#[derive(Debug, Serialize)]
pub struct CustomerView {
    pub id: String,
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
}

impl CustomerView {
    pub fn new(customer: &Customer) -> Self {
        Self {
            id: customer.id.to_string(),
            name: customer.name.clone(),
            address: customer.address.clone(),
            phone: customer.phone.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LineView {
    pub bill_id: String,
    pub date: String,
    pub crop: String,
    pub start: String,
    pub end: String,
    pub hours: i64,
    pub minutes: i64,
    pub amount: String,
    pub notes: String,
    pub status: &'static str,
}

impl LineView {
    pub fn new(record: &SupplyRecord, bill: &Bill, currency_symbol: &str) -> Self {
        let (start, end) = clocks(record);
        let (hours, minutes) = record.window.hours_and_minutes();
        Self {
            bill_id: bill.id.to_string(),
            date: display_date(record.supply_date()),
            crop: record.crop.clone().unwrap_or_default(),
            start,
            end,
            hours,
            minutes,
            amount: money(currency_symbol, bill.amount()),
            notes: record.notes.clone().unwrap_or_default(),
            status: bill.status.as_str(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BillView {
    pub id: String,
    pub status: &'static str,
    pub issued_on: String,
    pub settled_on: Option<String>,
    pub rate: String,
    pub hours: String,
}

impl BillView {
    pub fn new(bill: &Bill, currency_symbol: &str) -> Self {
        Self {
            id: bill.id.to_string(),
            status: bill.status.as_str(),
            issued_on: display_day(bill.issued_at),
            settled_on: bill.settled_at.map(display_day),
            rate: money(currency_symbol, bill.rate()),
            hours: plain_amount(bill.hours()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PeriodView {
    pub from: String,
    pub to: String,
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};
    use rust_decimal::Decimal;

    use aquabill_core::domain::customer::CustomerId;
    use aquabill_core::domain::supply::{NewSupply, SupplyWindow};

    use super::{clocks, display_date, money};

    #[test]
    fn dates_and_money_use_display_formats() {
        assert_eq!(display_date(NaiveDate::from_ymd_opt(2026, 1, 9).unwrap()), "09/01/2026");
        assert_eq!(money("₹", Decimal::from(30)), "₹30.00");
        assert_eq!(money("$", Decimal::new(41125, 3)), "$41.13");
    }

    #[test]
    fn overnight_end_is_marked() {
        let record = NewSupply {
            customer_id: CustomerId::from("C-1"),
            window: SupplyWindow::from_clock(
                NaiveDate::from_ymd_opt(2026, 1, 9).unwrap(),
                "10:30 PM",
                "01:15",
            )
            .unwrap(),
            crop: None,
            notes: None,
        }
        .into_record(Utc::now());

        assert_eq!(clocks(&record), ("22:30".to_string(), "01:15 (+1)".to_string()));
    }
}
