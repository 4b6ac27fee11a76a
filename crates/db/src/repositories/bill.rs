use sqlx::{QueryBuilder, Sqlite};

use aquabill_core::domain::bill::{Bill, BillId, BillStatus};
use aquabill_core::errors::DomainError;
use aquabill_core::report::BillFilter;

use super::columns::{checked_bill_from_row, format_timestamp};
use super::{BillRepository, RepositoryError};
use crate::DbPool;

const BILL_SELECT: &str = "SELECT
        b.id AS bill_id,
        b.customer_id,
        b.supply_id,
        b.rate,
        b.hours,
        b.amount,
        b.status,
        b.issued_at,
        b.settled_at,
        s.started_at,
        s.ended_at
     FROM bill b
     JOIN supply_record s ON s.id = b.supply_id";

pub struct SqlBillRepository {
    pool: DbPool,
}

impl SqlBillRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl BillRepository for SqlBillRepository {
    async fn find_by_id(&self, id: &BillId) -> Result<Option<Bill>, RepositoryError> {
        let row = sqlx::query(&format!("{BILL_SELECT} WHERE b.id = ?"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(checked_bill_from_row).transpose()
    }

    async fn list(&self, filter: &BillFilter) -> Result<Vec<Bill>, RepositoryError> {
        let mut query = QueryBuilder::<Sqlite>::new(BILL_SELECT);
        query.push(" WHERE 1=1");

        if let Some(customer_id) = &filter.customer_id {
            query.push(" AND b.customer_id = ");
            query.push_bind(customer_id.0.clone());
        }
        if let Some(status) = filter.status {
            query.push(" AND b.status = ");
            query.push_bind(status.as_str());
        }

        query.push(" ORDER BY b.issued_at ASC, b.rowid ASC");

        let rows = query.build().fetch_all(&self.pool).await?;
        rows.iter().map(checked_bill_from_row).collect()
    }

    async fn save_settlement(&self, bill: &Bill) -> Result<(), RepositoryError> {
        let settled_at = bill.settled_at.ok_or_else(|| {
            DomainError::InvariantViolation(format!("bill `{}` has no settlement time", bill.id))
        })?;

        let updated = sqlx::query(
            "UPDATE bill
             SET status = ?, settled_at = ?
             WHERE id = ? AND status = ?",
        )
        .bind(BillStatus::Settled.as_str())
        .bind(format_timestamp(settled_at))
        .bind(&bill.id.0)
        .bind(BillStatus::Outstanding.as_str())
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            return match self.find_by_id(&bill.id).await? {
                Some(stored) => Err(DomainError::InvalidBillTransition {
                    from: stored.status,
                    to: BillStatus::Settled,
                }
                .into()),
                None => Err(DomainError::BillNotFound(bill.id.clone()).into()),
            };
        }
        Ok(())
    }
}
