//! SurrealDB implementation of [`IdentityVerificationRepository`].
//!
//! The record id is the investor profile id; a resubmission overwrites
//! the documents in place and keeps the note trail.

use chrono::{DateTime, Utc};
use gullin_core::error::GullinResult;
use gullin_core::models::identity::{
    IdentityDocuments, IdentityState, IdentityVerificationRecord, OfficialIdType,
};
use gullin_core::repository::IdentityVerificationRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct IdentityRow {
    id_type: String,
    document_front: String,
    document_back: Option<String>,
    document_holding: Option<String>,
    document_nationality: String,
    transaction_id: Option<String>,
    state: String,
    stage: u32,
    processed: bool,
    notes: Vec<String>,
    submitted_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn parse_id_type(s: &str) -> Result<OfficialIdType, DbError> {
    match s {
        "DriverLicense" => Ok(OfficialIdType::DriverLicense),
        "PhotoId" => Ok(OfficialIdType::PhotoId),
        "Passport" => Ok(OfficialIdType::Passport),
        other => Err(DbError::Corrupt(format!("unknown id type: {other}"))),
    }
}

fn id_type_to_string(t: OfficialIdType) -> &'static str {
    match t {
        OfficialIdType::DriverLicense => "DriverLicense",
        OfficialIdType::PhotoId => "PhotoId",
        OfficialIdType::Passport => "Passport",
    }
}

fn parse_state(s: &str) -> Result<IdentityState, DbError> {
    match s {
        "Pending" => Ok(IdentityState::Pending),
        "UnderReview" => Ok(IdentityState::UnderReview),
        "Accepted" => Ok(IdentityState::Accepted),
        "Rejected" => Ok(IdentityState::Rejected),
        other => Err(DbError::Corrupt(format!("unknown identity state: {other}"))),
    }
}

fn state_to_string(s: IdentityState) -> &'static str {
    match s {
        IdentityState::Pending => "Pending",
        IdentityState::UnderReview => "UnderReview",
        IdentityState::Accepted => "Accepted",
        IdentityState::Rejected => "Rejected",
    }
}

impl IdentityRow {
    fn into_record(self, profile_id: Uuid) -> Result<IdentityVerificationRecord, DbError> {
        Ok(IdentityVerificationRecord {
            profile_id,
            documents: IdentityDocuments {
                id_type: parse_id_type(&self.id_type)?,
                front: self.document_front,
                back: self.document_back,
                holding: self.document_holding,
                nationality: self.document_nationality,
            },
            transaction_id: self.transaction_id,
            state: parse_state(&self.state)?,
            stage: self.stage,
            processed: self.processed,
            notes: self.notes,
            submitted_at: self.submitted_at,
            updated_at: self.updated_at,
        })
    }
}

/// SurrealDB implementation of the IdentityVerification repository.
pub struct SurrealIdentityVerificationRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> Clone for SurrealIdentityVerificationRepository<C> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
        }
    }
}

impl<C: Connection> SurrealIdentityVerificationRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    fn expect_record(
        rows: Vec<IdentityRow>,
        profile_id: Uuid,
    ) -> GullinResult<IdentityVerificationRecord> {
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "identity_verification".into(),
            id: profile_id.to_string(),
        })?;
        Ok(row.into_record(profile_id)?)
    }
}

impl<C: Connection> IdentityVerificationRepository for SurrealIdentityVerificationRepository<C> {
    async fn get_by_profile(
        &self,
        profile_id: Uuid,
    ) -> GullinResult<Option<IdentityVerificationRecord>> {
        let mut result = self
            .db
            .query("SELECT * FROM type::record('identity_verification', $id)")
            .bind(("id", profile_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<IdentityRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .next()
            .map(|row| row.into_record(profile_id))
            .transpose()?)
    }

    async fn submit(
        &self,
        profile_id: Uuid,
        documents: IdentityDocuments,
        note: String,
    ) -> GullinResult<IdentityVerificationRecord> {
        let mut result = self
            .db
            .query(
                "UPSERT type::record('identity_verification', $id) SET \
                 profile_id = $id, id_type = $id_type, \
                 document_front = $front, document_back = $back, \
                 document_holding = $holding, \
                 document_nationality = $nationality, \
                 transaction_id = NONE, state = 'Pending', \
                 stage = 1, processed = false, \
                 notes = array::append(notes ?? [], $note), \
                 submitted_at = $now, updated_at = $now",
            )
            .bind(("id", profile_id.to_string()))
            .bind(("id_type", id_type_to_string(documents.id_type).to_string()))
            .bind(("front", documents.front))
            .bind(("back", documents.back))
            .bind(("holding", documents.holding))
            .bind(("nationality", documents.nationality))
            .bind(("note", note))
            .bind(("now", Utc::now()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<IdentityRow> = result.take(0).map_err(DbError::from)?;
        Self::expect_record(rows, profile_id)
    }

    async fn record_provider_response(
        &self,
        profile_id: Uuid,
        transaction_id: String,
        state: IdentityState,
        note: String,
    ) -> GullinResult<IdentityVerificationRecord> {
        let mut result = self
            .db
            .query(
                "UPDATE type::record('identity_verification', $id) SET \
                 transaction_id = $transaction_id, state = $state, \
                 notes += $note, updated_at = time::now()",
            )
            .bind(("id", profile_id.to_string()))
            .bind(("transaction_id", transaction_id))
            .bind(("state", state_to_string(state).to_string()))
            .bind(("note", note))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<IdentityRow> = result.take(0).map_err(DbError::from)?;
        Self::expect_record(rows, profile_id)
    }

    async fn set_verdict(
        &self,
        profile_id: Uuid,
        state: IdentityState,
        note: String,
    ) -> GullinResult<IdentityVerificationRecord> {
        let mut result = self
            .db
            .query(
                "UPDATE type::record('identity_verification', $id) SET \
                 state = $state, processed = true, \
                 notes += $note, updated_at = time::now()",
            )
            .bind(("id", profile_id.to_string()))
            .bind(("state", state_to_string(state).to_string()))
            .bind(("note", note))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<IdentityRow> = result.take(0).map_err(DbError::from)?;
        Self::expect_record(rows, profile_id)
    }

    async fn append_note(
        &self,
        profile_id: Uuid,
        note: String,
    ) -> GullinResult<IdentityVerificationRecord> {
        let mut result = self
            .db
            .query(
                "UPDATE type::record('identity_verification', $id) SET \
                 notes += $note, updated_at = time::now()",
            )
            .bind(("id", profile_id.to_string()))
            .bind(("note", note))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<IdentityRow> = result.take(0).map_err(DbError::from)?;
        Self::expect_record(rows, profile_id)
    }
}
