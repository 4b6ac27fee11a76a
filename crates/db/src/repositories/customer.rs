use sqlx::{sqlite::SqliteRow, Row};

use aquabill_core::domain::bill::BillStatus;
use aquabill_core::domain::customer::{Customer, CustomerId};
use aquabill_core::errors::DomainError;

use super::columns::{format_date, format_timestamp, parse_date, parse_timestamp};
use super::{CustomerRepository, RepositoryError};
use crate::DbPool;

pub struct SqlCustomerRepository {
    pool: DbPool,
}

impl SqlCustomerRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl CustomerRepository for SqlCustomerRepository {
    async fn insert(&self, customer: &Customer) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO customer (id, name, address, phone, connected_on, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(customer.id.as_str())
        .bind(&customer.name)
        .bind(&customer.address)
        .bind(&customer.phone)
        .bind(format_date(customer.connected_on))
        .bind(format_timestamp(customer.created_at))
        .bind(format_timestamp(customer.updated_at))
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(error)) if error.is_unique_violation() => {
                Err(DomainError::DuplicateCustomer(customer.id.clone()).into())
            }
            Err(error) => Err(error.into()),
        }
    }

    async fn update(&self, customer: &Customer) -> Result<(), RepositoryError> {
        let updated = sqlx::query(
            "UPDATE customer
             SET name = ?, address = ?, phone = ?, connected_on = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(&customer.name)
        .bind(&customer.address)
        .bind(&customer.phone)
        .bind(format_date(customer.connected_on))
        .bind(format_timestamp(customer.updated_at))
        .bind(customer.id.as_str())
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(DomainError::CustomerNotFound(customer.id.clone()).into());
        }
        Ok(())
    }

    async fn delete(&self, id: &CustomerId) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let exists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM customer WHERE id = ?")
            .bind(id.as_str())
            .fetch_one(&mut *tx)
            .await?;
        if exists == 0 {
            return Err(DomainError::CustomerNotFound(id.clone()).into());
        }

        let outstanding: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM bill WHERE customer_id = ? AND status = ?")
                .bind(id.as_str())
                .bind(BillStatus::Outstanding.as_str())
                .fetch_one(&mut *tx)
                .await?;
        if outstanding > 0 {
            return Err(DomainError::CustomerHasOutstandingBills {
                id: id.clone(),
                outstanding: u32::try_from(outstanding).unwrap_or(u32::MAX),
            }
            .into());
        }

        sqlx::query("DELETE FROM customer WHERE id = ?")
            .bind(id.as_str())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn find_by_id(&self, id: &CustomerId) -> Result<Option<Customer>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, name, address, phone, connected_on, created_at, updated_at
             FROM customer
             WHERE id = ?",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(customer_from_row).transpose()
    }

    async fn list(&self) -> Result<Vec<Customer>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, name, address, phone, connected_on, created_at, updated_at
             FROM customer
             ORDER BY name ASC, id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(customer_from_row).collect()
    }
}

fn customer_from_row(row: &SqliteRow) -> Result<Customer, RepositoryError> {
    Ok(Customer {
        id: CustomerId(row.try_get("id")?),
        name: row.try_get("name")?,
        address: row.try_get("address")?,
        phone: row.try_get("phone")?,
        connected_on: parse_date("connected_on", row.try_get("connected_on")?)?,
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
        updated_at: parse_timestamp("updated_at", row.try_get("updated_at")?)?,
    })
}
