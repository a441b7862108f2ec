//! SurrealDB implementation of [`ActivityLogRepository`].

use chrono::{DateTime, Utc};
use gullin_core::error::GullinResult;
use gullin_core::models::activity::{ActivityLogEntry, CreateActivityLogEntry};
use gullin_core::repository::{ActivityLogRepository, PaginatedResult, Pagination};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::{CountRow, parse_uuid};
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct ActivityRowWithId {
    record_id: String,
    account_id: String,
    action: String,
    ip: Option<String>,
    device: Option<String>,
    created_at: DateTime<Utc>,
}

impl ActivityRowWithId {
    fn try_into_entry(self) -> Result<ActivityLogEntry, DbError> {
        Ok(ActivityLogEntry {
            id: parse_uuid(&self.record_id, "activity_log")?,
            account_id: parse_uuid(&self.account_id, "account")?,
            action: self.action,
            ip: self.ip,
            device: self.device,
            created_at: self.created_at,
        })
    }
}

/// SurrealDB implementation of the ActivityLog repository.
pub struct SurrealActivityLogRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> Clone for SurrealActivityLogRepository<C> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
        }
    }
}

impl<C: Connection> SurrealActivityLogRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> ActivityLogRepository for SurrealActivityLogRepository<C> {
    async fn append(&self, input: CreateActivityLogEntry) -> GullinResult<ActivityLogEntry> {
        let id = Uuid::new_v4();
        let created_at = Utc::now();

        self.db
            .query(
                "CREATE type::record('activity_log', $id) SET \
                 account_id = $account_id, action = $action, \
                 ip = $ip, device = $device, created_at = $created_at",
            )
            .bind(("id", id.to_string()))
            .bind(("account_id", input.account_id.to_string()))
            .bind(("action", input.action.clone()))
            .bind(("ip", input.ip.clone()))
            .bind(("device", input.device.clone()))
            .bind(("created_at", created_at))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        Ok(ActivityLogEntry {
            id,
            account_id: input.account_id,
            action: input.action,
            ip: input.ip,
            device: input.device,
            created_at,
        })
    }

    async fn list_for_account(
        &self,
        account_id: Uuid,
        pagination: Pagination,
    ) -> GullinResult<PaginatedResult<ActivityLogEntry>> {
        let account_id_str = account_id.to_string();

        let mut count_result = self
            .db
            .query(
                "SELECT count() AS total FROM activity_log \
                 WHERE account_id = $account_id GROUP ALL",
            )
            .bind(("account_id", account_id_str.clone()))
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM activity_log \
                 WHERE account_id = $account_id \
                 ORDER BY created_at DESC \
                 LIMIT $limit START $offset",
            )
            .bind(("account_id", account_id_str))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ActivityRowWithId> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(|row| row.try_into_entry())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
