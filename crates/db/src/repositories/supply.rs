use sqlx::{sqlite::SqliteRow, QueryBuilder, Row, Sqlite};

use aquabill_core::domain::bill::{Bill, BillId, BillStatus};
use aquabill_core::domain::supply::{SupplyRecord, SupplyRecordId};
use aquabill_core::errors::DomainError;
use aquabill_core::report::{SupplyFilter, SupplyLine};

use super::columns::{
    checked_bill_from_row, format_date, format_local_time, format_timestamp, supply_from_row,
};
use super::{RepositoryError, SupplyRepository};
use crate::DbPool;

const SUPPLY_LINE_SELECT: &str = "SELECT
        s.id AS supply_id,
        s.customer_id,
        s.started_at,
        s.ended_at,
        s.crop,
        s.notes,
        s.created_at AS supply_created_at,
        c.name AS customer_name,
        b.id AS bill_id,
        b.rate,
        b.hours,
        b.amount,
        b.status,
        b.issued_at,
        b.settled_at
     FROM supply_record s
     JOIN customer c ON c.id = s.customer_id
     JOIN bill b ON b.supply_id = s.id";

pub struct SqlSupplyRepository {
    pool: DbPool,
}

impl SqlSupplyRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl SupplyRepository for SqlSupplyRepository {
    async fn insert(&self, record: &SupplyRecord, bill: &Bill) -> Result<(), RepositoryError> {
        ensure_bill_matches(record, bill)?;
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            "INSERT INTO supply_record (
                id, customer_id, supply_date, started_at, ended_at, crop, notes, created_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&record.id.0)
        .bind(record.customer_id.as_str())
        .bind(format_date(record.supply_date()))
        .bind(format_local_time(record.window.start()))
        .bind(format_local_time(record.window.end()))
        .bind(&record.crop)
        .bind(&record.notes)
        .bind(format_timestamp(record.created_at))
        .execute(&mut *tx)
        .await;

        match inserted {
            Ok(_) => {}
            Err(sqlx::Error::Database(error)) if error.is_foreign_key_violation() => {
                return Err(DomainError::CustomerNotFound(record.customer_id.clone()).into());
            }
            Err(error) => return Err(error.into()),
        }

        sqlx::query(
            "INSERT INTO bill (
                id, customer_id, supply_id, rate, hours, amount, status, issued_at, settled_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&bill.id.0)
        .bind(bill.customer_id.as_str())
        .bind(&bill.supply_id.0)
        .bind(bill.rate().to_string())
        .bind(bill.hours().to_string())
        .bind(bill.amount().to_string())
        .bind(bill.status.as_str())
        .bind(format_timestamp(bill.issued_at))
        .bind(bill.settled_at.map(format_timestamp))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn update(&self, record: &SupplyRecord, bill: &Bill) -> Result<(), RepositoryError> {
        ensure_bill_matches(record, bill)?;
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE supply_record
             SET supply_date = ?, started_at = ?, ended_at = ?, crop = ?, notes = ?
             WHERE id = ?",
        )
        .bind(format_date(record.supply_date()))
        .bind(format_local_time(record.window.start()))
        .bind(format_local_time(record.window.end()))
        .bind(&record.crop)
        .bind(&record.notes)
        .bind(&record.id.0)
        .execute(&mut *tx)
        .await?;
        if updated.rows_affected() == 0 {
            return Err(DomainError::SupplyRecordNotFound(record.id.clone()).into());
        }

        let recomputed = sqlx::query(
            "UPDATE bill
             SET hours = ?, amount = ?
             WHERE id = ? AND supply_id = ? AND status = ?",
        )
        .bind(bill.hours().to_string())
        .bind(bill.amount().to_string())
        .bind(&bill.id.0)
        .bind(&record.id.0)
        .bind(BillStatus::Outstanding.as_str())
        .execute(&mut *tx)
        .await?;
        if recomputed.rows_affected() == 0 {
            return Err(DomainError::SettledBillLocked(bill.id.clone()).into());
        }

        tx.commit().await?;
        Ok(())
    }

    async fn delete(&self, id: &SupplyRecordId) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let outstanding: Option<String> =
            sqlx::query_scalar("SELECT id FROM bill WHERE supply_id = ? AND status = ?")
                .bind(&id.0)
                .bind(BillStatus::Outstanding.as_str())
                .fetch_optional(&mut *tx)
                .await?;
        if let Some(bill_id) = outstanding {
            return Err(DomainError::SupplyHasOutstandingBill(BillId(bill_id)).into());
        }

        let deleted = sqlx::query("DELETE FROM supply_record WHERE id = ?")
            .bind(&id.0)
            .execute(&mut *tx)
            .await?;
        if deleted.rows_affected() == 0 {
            return Err(DomainError::SupplyRecordNotFound(id.clone()).into());
        }

        tx.commit().await?;
        Ok(())
    }

    async fn find_by_id(
        &self,
        id: &SupplyRecordId,
    ) -> Result<Option<SupplyLine>, RepositoryError> {
        let row = sqlx::query(&format!("{SUPPLY_LINE_SELECT} WHERE s.id = ?"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(supply_line_from_row).transpose()
    }

    async fn list(&self, filter: &SupplyFilter) -> Result<Vec<SupplyLine>, RepositoryError> {
        let mut query = QueryBuilder::<Sqlite>::new(SUPPLY_LINE_SELECT);
        query.push(" WHERE s.supply_date BETWEEN ");
        query.push_bind(format_date(filter.period.from));
        query.push(" AND ");
        query.push_bind(format_date(filter.period.to));

        if let Some(customer_id) = &filter.customer_id {
            query.push(" AND s.customer_id = ");
            query.push_bind(customer_id.0.clone());
        }
        if filter.crop_needle().is_some() {
            query.push(" AND s.crop IS NOT NULL");
        }

        query.push(" ORDER BY s.supply_date ASC, s.started_at ASC, s.rowid ASC");

        let rows = query.build().fetch_all(&self.pool).await?;
        let lines = rows.iter().map(supply_line_from_row).collect::<Result<Vec<_>, _>>()?;

        // SQLite's LOWER only folds ASCII, so the crop match runs here.
        Ok(lines.into_iter().filter(|line| filter.matches(&line.record)).collect())
    }
}

fn ensure_bill_matches(record: &SupplyRecord, bill: &Bill) -> Result<(), RepositoryError> {
    if bill.supply_id != record.id || bill.customer_id != record.customer_id {
        return Err(DomainError::InvariantViolation(format!(
            "bill `{}` does not belong to supply `{}`",
            bill.id, record.id
        ))
        .into());
    }
    Ok(())
}

fn supply_line_from_row(row: &SqliteRow) -> Result<SupplyLine, RepositoryError> {
    Ok(SupplyLine {
        customer_name: row.try_get("customer_name")?,
        record: supply_from_row(row)?,
        bill: checked_bill_from_row(row)?,
    })
}
