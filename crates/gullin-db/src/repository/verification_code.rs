//! SurrealDB implementation of [`VerificationCodeRepository`].
//!
//! The record id of a code is its account id, so `store` always
//! overwrites the single live code.

use chrono::{DateTime, Duration, Utc};
use gullin_core::error::GullinResult;
use gullin_core::models::verification_code::{CodeConsumption, VerificationCode};
use gullin_core::repository::VerificationCodeRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct CodeRow {
    code: String,
    expires_at: DateTime<Utc>,
}

impl CodeRow {
    fn into_code(self, account_id: Uuid) -> VerificationCode {
        VerificationCode {
            account_id,
            code: self.code,
            expires_at: self.expires_at,
        }
    }
}

/// Instant strictly before `now`, so an expired code reads as expired
/// at `now` itself.
fn expired_at(now: DateTime<Utc>) -> DateTime<Utc> {
    now - Duration::milliseconds(1)
}

/// SurrealDB implementation of the VerificationCode repository.
pub struct SurrealVerificationCodeRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> Clone for SurrealVerificationCodeRepository<C> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
        }
    }
}

impl<C: Connection> SurrealVerificationCodeRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> VerificationCodeRepository for SurrealVerificationCodeRepository<C> {
    async fn get(&self, account_id: Uuid) -> GullinResult<VerificationCode> {
        let id_str = account_id.to_string();

        let mut result = self
            .db
            .query("SELECT code, expires_at FROM type::record('verification_code', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CodeRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "verification_code".into(),
            id: id_str,
        })?;

        Ok(row.into_code(account_id))
    }

    async fn store(
        &self,
        account_id: Uuid,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> GullinResult<VerificationCode> {
        let id_str = account_id.to_string();

        let mut result = self
            .db
            .query(
                "UPDATE type::record('verification_code', $id) SET \
                 code = $code, expires_at = $expires_at",
            )
            .bind(("id", id_str.clone()))
            .bind(("code", code.to_string()))
            .bind(("expires_at", expires_at))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<CodeRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "verification_code".into(),
            id: id_str,
        })?;

        Ok(row.into_code(account_id))
    }

    async fn expire(&self, account_id: Uuid, now: DateTime<Utc>) -> GullinResult<()> {
        self.db
            .query(
                "UPDATE type::record('verification_code', $id) SET \
                 expires_at = $expired_at",
            )
            .bind(("id", account_id.to_string()))
            .bind(("expired_at", expired_at(now)))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        Ok(())
    }

    async fn consume(
        &self,
        account_id: Uuid,
        submitted: &str,
        now: DateTime<Utc>,
    ) -> GullinResult<CodeConsumption> {
        // Single conditional update: only one concurrent caller can match
        // a live code. The code is cleared so a late caller can never
        // match it again, whatever its clock reads.
        let mut result = self
            .db
            .query(
                "UPDATE type::record('verification_code', $id) SET \
                 code = '', expires_at = $expired_at \
                 WHERE code != '' AND code = $code AND expires_at >= $now",
            )
            .bind(("id", account_id.to_string()))
            .bind(("code", submitted.to_string()))
            .bind(("now", now))
            .bind(("expired_at", expired_at(now)))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<CodeRow> = result.take(0).map_err(DbError::from)?;
        if !rows.is_empty() {
            return Ok(CodeConsumption::Consumed);
        }

        let current = self.get(account_id).await?;
        if current.code.is_empty() || current.is_expired_at(now) {
            Ok(CodeConsumption::Expired)
        } else {
            Ok(CodeConsumption::Mismatch)
        }
    }
}
