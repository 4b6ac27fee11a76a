use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CustomerId(pub String);

impl CustomerId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CustomerId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for CustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub connected_on: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Registration payload. The identifier is chosen by the caller and must be unique.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCustomer {
    pub id: String,
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub connected_on: Option<NaiveDate>,
}

impl NewCustomer {
    /// Trims every field, drops empty optionals and stamps the record at `now`.
    pub fn into_customer(self, now: DateTime<Utc>) -> Result<Customer, DomainError> {
        let id = self.id.trim();
        if id.is_empty() {
            return Err(DomainError::InvalidCustomer("identifier is required".to_string()));
        }
        let name = required_name(&self.name)?;

        Ok(Customer {
            id: CustomerId(id.to_string()),
            name,
            address: optional_text(self.address),
            phone: optional_text(self.phone),
            connected_on: self.connected_on.unwrap_or_else(|| now.date_naive()),
            created_at: now,
            updated_at: now,
        })
    }
}

/// Partial update. `None` leaves a field untouched; `Some("")` clears an optional field.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerUpdate {
    pub name: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub connected_on: Option<NaiveDate>,
}

impl CustomerUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.address.is_none()
            && self.phone.is_none()
            && self.connected_on.is_none()
    }

    pub fn apply(self, customer: &mut Customer, now: DateTime<Utc>) -> Result<(), DomainError> {
        if let Some(name) = self.name {
            customer.name = required_name(&name)?;
        }
        if let Some(address) = self.address {
            customer.address = optional_text(Some(address));
        }
        if let Some(phone) = self.phone {
            customer.phone = optional_text(Some(phone));
        }
        if let Some(connected_on) = self.connected_on {
            customer.connected_on = connected_on;
        }
        customer.updated_at = now;
        Ok(())
    }
}

fn required_name(name: &str) -> Result<String, DomainError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DomainError::InvalidCustomer("name is required".to_string()));
    }
    Ok(name.to_string())
}

fn optional_text(value: Option<String>) -> Option<String> {
    value.map(|text| text.trim().to_string()).filter(|text| !text.is_empty())
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};

    use super::{CustomerId, CustomerUpdate, NewCustomer};
    use crate::errors::DomainError;

    fn registration() -> NewCustomer {
        NewCustomer {
            id: "  C-001 ".to_string(),
            name: " Ramesh Kumar ".to_string(),
            address: Some("Rampur".to_string()),
            phone: Some("   ".to_string()),
            connected_on: None,
        }
    }

    #[test]
    fn registration_trims_fields_and_defaults_connection_date() {
        let now = Utc.with_ymd_and_hms(2026, 3, 14, 9, 30, 0).unwrap();
        let customer = registration().into_customer(now).expect("valid registration");

        assert_eq!(customer.id, CustomerId::from("C-001"));
        assert_eq!(customer.name, "Ramesh Kumar");
        assert_eq!(customer.address.as_deref(), Some("Rampur"));
        assert_eq!(customer.phone, None);
        assert_eq!(customer.connected_on, NaiveDate::from_ymd_opt(2026, 3, 14).unwrap());
    }

    #[test]
    fn registration_rejects_blank_identifier_and_name() {
        let now = Utc::now();

        let mut blank_id = registration();
        blank_id.id = " ".to_string();
        assert!(matches!(blank_id.into_customer(now), Err(DomainError::InvalidCustomer(_))));

        let mut blank_name = registration();
        blank_name.name = String::new();
        assert!(matches!(blank_name.into_customer(now), Err(DomainError::InvalidCustomer(_))));
    }

    #[test]
    fn update_touches_only_provided_fields() {
        let created = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let later = Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap();
        let mut customer = registration().into_customer(created).expect("valid registration");

        CustomerUpdate {
            phone: Some("98765 43210".to_string()),
            address: Some(String::new()),
            ..CustomerUpdate::default()
        }
        .apply(&mut customer, later)
        .expect("apply update");

        assert_eq!(customer.name, "Ramesh Kumar");
        assert_eq!(customer.phone.as_deref(), Some("98765 43210"));
        assert_eq!(customer.address, None);
        assert_eq!(customer.updated_at, later);
        assert_eq!(customer.created_at, created);
    }

    #[test]
    fn update_rejects_blank_name() {
        let mut customer = registration().into_customer(Utc::now()).expect("valid registration");
        let result = CustomerUpdate { name: Some("  ".to_string()), ..CustomerUpdate::default() }
            .apply(&mut customer, Utc::now());

        assert!(matches!(result, Err(DomainError::InvalidCustomer(_))));
        assert_eq!(customer.name, "Ramesh Kumar");
    }
}
