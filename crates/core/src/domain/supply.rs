use std::fmt;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::customer::CustomerId;
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SupplyRecordId(pub String);

impl SupplyRecordId {
    pub fn generate() -> Self {
        Self(format!("SUP-{}", Uuid::new_v4().simple()))
    }
}

impl fmt::Display for SupplyRecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A delivery interval. `end >= start` always holds for a constructed window.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplyWindow {
    start: NaiveDateTime,
    end: NaiveDateTime,
}

impl SupplyWindow {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Result<Self, DomainError> {
        if end < start {
            return Err(DomainError::InvalidSupplyWindow(format!(
                "end time {end} is before start time {start}"
            )));
        }
        Ok(Self { start, end })
    }

    /// Builds a window from wall-clock entries on `date`.
    ///
    /// Accepts `HH:MM` or `hh:MM AM/PM`. An end clock earlier than the start
    /// clock is read as the next morning, so `22:00`..`02:00` spans four hours.
    pub fn from_clock(date: NaiveDate, start: &str, end: &str) -> Result<Self, DomainError> {
        let start_time = parse_clock(start)?;
        let end_time = parse_clock(end)?;

        let start = date.and_time(start_time);
        let mut end = date.and_time(end_time);
        if end < start {
            end += Duration::days(1);
        }
        Self::new(start, end)
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    pub fn end(&self) -> NaiveDateTime {
        self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    pub fn supply_date(&self) -> NaiveDate {
        self.start.date()
    }

    /// Whole hours and leftover minutes, as shown on invoices.
    pub fn hours_and_minutes(&self) -> (i64, i64) {
        let minutes = self.duration().num_minutes();
        (minutes / 60, minutes % 60)
    }
}

pub fn parse_clock(value: &str) -> Result<NaiveTime, DomainError> {
    let value = value.trim();
    let upper = value.to_ascii_uppercase();
    let format = if upper.ends_with("AM") || upper.ends_with("PM") { "%I:%M %p" } else { "%H:%M" };

    NaiveTime::parse_from_str(&upper, format).map_err(|_| {
        DomainError::InvalidSupplyWindow(format!(
            "`{value}` is not a clock time (expected HH:MM or hh:MM AM/PM)"
        ))
    })
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplyRecord {
    pub id: SupplyRecordId,
    pub customer_id: CustomerId,
    pub window: SupplyWindow,
    pub crop: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl SupplyRecord {
    pub fn duration(&self) -> Duration {
        self.window.duration()
    }

    pub fn supply_date(&self) -> NaiveDate {
        self.window.supply_date()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSupply {
    pub customer_id: CustomerId,
    pub window: SupplyWindow,
    pub crop: Option<String>,
    pub notes: Option<String>,
}

impl NewSupply {
    pub fn into_record(self, now: DateTime<Utc>) -> SupplyRecord {
        SupplyRecord {
            id: SupplyRecordId::generate(),
            customer_id: self.customer_id,
            window: self.window,
            crop: optional_text(self.crop),
            notes: optional_text(self.notes),
            created_at: now,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplyChanges {
    pub window: Option<SupplyWindow>,
    pub crop: Option<String>,
    pub notes: Option<String>,
}

impl SupplyChanges {
    pub fn apply(self, record: &mut SupplyRecord) {
        if let Some(window) = self.window {
            record.window = window;
        }
        if let Some(crop) = self.crop {
            record.crop = optional_text(Some(crop));
        }
        if let Some(notes) = self.notes {
            record.notes = optional_text(Some(notes));
        }
    }
}

fn optional_text(value: Option<String>) -> Option<String> {
    value.map(|text| text.trim().to_string()).filter(|text| !text.is_empty())
}
