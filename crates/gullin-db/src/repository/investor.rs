//! SurrealDB implementation of [`InvestorProfileRepository`].

use chrono::{DateTime, NaiveDate, Utc};
use gullin_core::error::GullinResult;
use gullin_core::models::investor::{
    Address, InvestorProfile, UpdateInvestorProfile, VerificationLevel,
};
use gullin_core::repository::{InvestorProfileRepository, LevelTransition};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::{IdRow, parse_uuid};
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct ProfileRow {
    account_id: String,
    first_name: String,
    last_name: String,
    birthday: Option<String>,
    nationality: Option<String>,
    verification_level: i64,
    wallet_address: Option<String>,
    address1: Option<String>,
    address2: Option<String>,
    city: Option<String>,
    state: Option<String>,
    zipcode: Option<String>,
    country: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ProfileRow {
    fn into_profile(self, id: Uuid) -> Result<InvestorProfile, DbError> {
        let account_id = parse_uuid(&self.account_id, "account")?;
        let verification_level = VerificationLevel::from_i64(self.verification_level)
            .ok_or_else(|| {
                DbError::Corrupt(format!(
                    "unknown verification level: {}",
                    self.verification_level
                ))
            })?;
        let birthday = self
            .birthday
            .as_deref()
            .map(|raw| {
                NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                    .map_err(|e| DbError::Corrupt(format!("invalid birthday: {e}")))
            })
            .transpose()?;
        let address = match (self.address1, self.city, self.state, self.zipcode, self.country) {
            (Some(address1), Some(city), Some(state), Some(zipcode), Some(country)) => {
                Some(Address {
                    address1,
                    address2: self.address2,
                    city,
                    state,
                    zipcode,
                    country,
                })
            }
            _ => None,
        };

        Ok(InvestorProfile {
            id,
            account_id,
            first_name: self.first_name,
            last_name: self.last_name,
            birthday,
            nationality: self.nationality,
            verification_level,
            wallet_address: self.wallet_address,
            address,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// SurrealDB implementation of the InvestorProfile repository.
pub struct SurrealInvestorProfileRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> Clone for SurrealInvestorProfileRepository<C> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
        }
    }
}

impl<C: Connection> SurrealInvestorProfileRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    fn first_profile(
        rows: Vec<ProfileRow>,
        id: Uuid,
    ) -> Result<Option<InvestorProfile>, DbError> {
        rows.into_iter()
            .next()
            .map(|row| row.into_profile(id))
            .transpose()
    }
}

impl<C: Connection> InvestorProfileRepository for SurrealInvestorProfileRepository<C> {
    async fn get_by_id(&self, id: Uuid) -> GullinResult<InvestorProfile> {
        let mut result = self
            .db
            .query("SELECT * FROM type::record('investor_profile', $id)")
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ProfileRow> = result.take(0).map_err(DbError::from)?;
        Self::first_profile(rows, id)?.ok_or_else(|| {
            DbError::NotFound {
                entity: "investor_profile".into(),
                id: id.to_string(),
            }
            .into()
        })
    }

    async fn get_by_account(&self, account_id: Uuid) -> GullinResult<InvestorProfile> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id FROM investor_profile \
                 WHERE account_id = $account_id",
            )
            .bind(("account_id", account_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<IdRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "investor_profile".into(),
            id: format!("account_id={account_id}"),
        })?;

        self.get_by_id(parse_uuid(&row.record_id, "investor_profile")?)
            .await
    }

    async fn update(&self, id: Uuid, input: UpdateInvestorProfile) -> GullinResult<InvestorProfile> {
        let mut sets = Vec::new();
        if input.first_name.is_some() {
            sets.push("first_name = $first_name");
        }
        if input.last_name.is_some() {
            sets.push("last_name = $last_name");
        }
        if input.birthday.is_some() {
            sets.push("birthday = $birthday");
        }
        if input.nationality.is_some() {
            sets.push("nationality = $nationality");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('investor_profile', $id) SET {}",
            sets.join(", ")
        );

        let mut builder = self.db.query(&query).bind(("id", id.to_string()));
        if let Some(first_name) = input.first_name {
            builder = builder.bind(("first_name", first_name));
        }
        if let Some(last_name) = input.last_name {
            builder = builder.bind(("last_name", last_name));
        }
        if let Some(birthday) = input.birthday {
            builder = builder.bind(("birthday", birthday.format("%Y-%m-%d").to_string()));
        }
        if let Some(nationality) = input.nationality {
            builder = builder.bind(("nationality", nationality));
        }

        let mut result = builder
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<ProfileRow> = result.take(0).map_err(DbError::from)?;
        Self::first_profile(rows, id)?.ok_or_else(|| {
            DbError::NotFound {
                entity: "investor_profile".into(),
                id: id.to_string(),
            }
            .into()
        })
    }

    async fn set_address(&self, id: Uuid, address: Address) -> GullinResult<InvestorProfile> {
        let mut result = self
            .db
            .query(
                "UPDATE type::record('investor_profile', $id) SET \
                 address1 = $address1, address2 = $address2, \
                 city = $city, state = $state, \
                 zipcode = $zipcode, country = $country, \
                 updated_at = time::now()",
            )
            .bind(("id", id.to_string()))
            .bind(("address1", address.address1))
            .bind(("address2", address.address2))
            .bind(("city", address.city))
            .bind(("state", address.state))
            .bind(("zipcode", address.zipcode))
            .bind(("country", address.country))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<ProfileRow> = result.take(0).map_err(DbError::from)?;
        Self::first_profile(rows, id)?.ok_or_else(|| {
            DbError::NotFound {
                entity: "investor_profile".into(),
                id: id.to_string(),
            }
            .into()
        })
    }

    async fn transition_level(
        &self,
        id: Uuid,
        transition: LevelTransition,
    ) -> GullinResult<Option<InvestorProfile>> {
        let mut sets = vec!["verification_level = $to"];
        if transition.nationality.is_some() {
            sets.push("nationality = $nationality");
        }
        if transition.wallet_address.is_some() {
            sets.push("wallet_address = $wallet_address");
        }
        sets.push("updated_at = time::now()");

        // Guarded on the current level so concurrent transitions cannot
        // both apply.
        let query = format!(
            "UPDATE type::record('investor_profile', $id) SET {} \
             WHERE verification_level = $from",
            sets.join(", ")
        );

        let mut builder = self
            .db
            .query(&query)
            .bind(("id", id.to_string()))
            .bind(("from", transition.from.as_i64()))
            .bind(("to", transition.to.as_i64()));
        if let Some(nationality) = transition.nationality {
            builder = builder.bind(("nationality", nationality));
        }
        if let Some(wallet_address) = transition.wallet_address {
            builder = builder.bind(("wallet_address", wallet_address));
        }

        let mut result = builder
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<ProfileRow> = result.take(0).map_err(DbError::from)?;
        match Self::first_profile(rows, id)? {
            Some(profile) => Ok(Some(profile)),
            None => {
                // Distinguish a lost race from a missing profile.
                self.get_by_id(id).await?;
                Ok(None)
            }
        }
    }
}
