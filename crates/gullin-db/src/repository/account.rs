//! SurrealDB implementation of [`AccountRepository`].
//!
//! Account creation writes the account, its verification code and the
//! optional investor profile inside one `BEGIN/COMMIT` block, so every
//! account always has exactly one code.

use chrono::{DateTime, Utc};
use gullin_core::error::GullinResult;
use gullin_core::models::account::{Account, CreateAccount, UpdateAccount};
use gullin_core::repository::AccountRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::debug;
use uuid::Uuid;

use super::{IdRow, parse_uuid};
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct AccountRow {
    email: String,
    phone_country_code: Option<String>,
    phone: Option<String>,
    password_hash: String,
    last_login_at: DateTime<Utc>,
    last_login_ip: Option<String>,
    totp_enabled: bool,
    totp_secret: Option<String>,
    is_investor: bool,
    is_company: bool,
    is_analyst: bool,
    is_staff: bool,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl AccountRow {
    fn into_account(self, id: Uuid) -> Account {
        Account {
            id,
            email: self.email,
            phone_country_code: self.phone_country_code,
            phone: self.phone,
            password_hash: self.password_hash,
            last_login_at: self.last_login_at,
            last_login_ip: self.last_login_ip,
            totp_enabled: self.totp_enabled,
            totp_secret: self.totp_secret,
            is_investor: self.is_investor,
            is_company: self.is_company,
            is_analyst: self.is_analyst,
            is_staff: self.is_staff,
            is_active: self.is_active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, SurrealValue)]
struct PhoneClaimRow {
    account_id: String,
}

fn phone_claim_key(country_code: &str, phone: &str) -> String {
    format!("{country_code}:{phone}")
}

/// Every (country code, national number) split of an E.164 number.
/// Country codes are one to four digits.
fn e164_splits(e164: &str) -> Vec<(String, String)> {
    let Some(digits) = e164.strip_prefix('+') else {
        return Vec::new();
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Vec::new();
    }
    (1..=4.min(digits.len() - 1))
        .map(|n| (format!("+{}", &digits[..n]), digits[n..].to_string()))
        .collect()
}

/// SurrealDB implementation of the Account repository.
pub struct SurrealAccountRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> Clone for SurrealAccountRepository<C> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
        }
    }
}

impl<C: Connection> SurrealAccountRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn find_ids(&self, field: &'static str, value: &str) -> Result<Vec<Uuid>, DbError> {
        let query = format!("SELECT meta::id(id) AS record_id FROM account WHERE {field} = $value");
        let mut result = self
            .db
            .query(query)
            .bind(("value", value.to_string()))
            .await?;
        let rows: Vec<IdRow> = result.take(0)?;
        rows.iter()
            .map(|row| parse_uuid(&row.record_id, "account"))
            .collect()
    }

    /// Account holding the claim on `(country_code, phone)`, if any.
    async fn claim_holder(&self, country_code: &str, phone: &str) -> Result<Option<Uuid>, DbError> {
        let mut result = self
            .db
            .query("SELECT account_id FROM type::record('phone_claim', $key)")
            .bind(("key", phone_claim_key(country_code, phone)))
            .await?;
        let rows: Vec<PhoneClaimRow> = result.take(0)?;
        rows.into_iter()
            .next()
            .map(|row| parse_uuid(&row.account_id, "account"))
            .transpose()
    }

    /// Resolve to the single matching account. No match and an ambiguous
    /// match are both `NotFound`.
    async fn get_unique(&self, ids: Vec<Uuid>, lookup: String) -> GullinResult<Account> {
        match ids.as_slice() {
            [id] => self.get_by_id(*id).await,
            _ => Err(DbError::NotFound {
                entity: "account".into(),
                id: lookup,
            }
            .into()),
        }
    }
}

impl<C: Connection> AccountRepository for SurrealAccountRepository<C> {
    async fn create(&self, input: CreateAccount) -> GullinResult<Account> {
        if !self.find_ids("email", &input.email).await?.is_empty() {
            return Err(DbError::Conflict {
                entity: "email".into(),
            }
            .into());
        }

        let id = Uuid::new_v4();
        let now = Utc::now();

        let mut statements = vec![
            "BEGIN TRANSACTION",
            "CREATE type::record('account', $id) SET \
             email = $email, \
             password_hash = $password_hash, \
             last_login_at = $now, \
             last_login_ip = $last_login_ip, \
             totp_enabled = false, \
             is_investor = $is_investor, \
             is_company = $is_company, \
             is_analyst = $is_analyst, \
             is_staff = false, \
             is_active = true, \
             created_at = $now, \
             updated_at = $now",
            "CREATE type::record('verification_code', $id) SET \
             account_id = $id, code = '', expires_at = $now",
        ];
        if input.investor.is_some() {
            statements.push(
                "CREATE type::record('investor_profile', $profile_id) SET \
                 account_id = $id, \
                 first_name = $first_name, \
                 last_name = $last_name, \
                 verification_level = -1, \
                 created_at = $now, \
                 updated_at = $now",
            );
        }
        statements.push("COMMIT TRANSACTION");
        let query = statements.join(";\n");

        let (first_name, last_name) = input
            .investor
            .map(|p| (p.first_name, p.last_name))
            .unwrap_or_default();

        self.db
            .query(query)
            .bind(("id", id.to_string()))
            .bind(("profile_id", Uuid::new_v4().to_string()))
            .bind(("email", input.email))
            .bind(("password_hash", input.password_hash))
            .bind(("last_login_ip", input.last_login_ip))
            .bind(("is_investor", input.is_investor))
            .bind(("is_company", input.is_company))
            .bind(("is_analyst", input.is_analyst))
            .bind(("first_name", first_name))
            .bind(("last_name", last_name))
            .bind(("now", now))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::from_check(e, "email"))?;

        debug!(account_id = %id, "Account created");
        self.get_by_id(id).await
    }

    async fn get_by_id(&self, id: Uuid) -> GullinResult<Account> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('account', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AccountRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "account".into(),
            id: id_str,
        })?;

        Ok(row.into_account(id))
    }

    async fn get_by_email(&self, email: &str) -> GullinResult<Account> {
        let ids = self.find_ids("email", email).await?;
        self.get_unique(ids, format!("email={email}")).await
    }

    async fn get_by_phone(&self, phone: &str) -> GullinResult<Account> {
        let phone = phone.trim();
        let mut ids = Vec::new();
        if phone.starts_with('+') {
            for (country_code, national) in e164_splits(phone) {
                if let Some(id) = self.claim_holder(&country_code, &national).await? {
                    ids.push(id);
                }
            }
        } else {
            ids = self.find_ids("phone", phone).await?;
        }
        self.get_unique(ids, format!("phone={phone}")).await
    }

    async fn update(&self, id: Uuid, input: UpdateAccount) -> GullinResult<Account> {
        let id_str = id.to_string();

        let mut sets = Vec::new();
        if input.last_login_at.is_some() {
            sets.push("last_login_at = $last_login_at");
        }
        if input.last_login_ip.is_some() {
            sets.push("last_login_ip = $last_login_ip");
        }
        if input.password_hash.is_some() {
            sets.push("password_hash = $password_hash");
        }
        if input.totp_enabled.is_some() {
            sets.push("totp_enabled = $totp_enabled");
        }
        if input.totp_secret.is_some() {
            sets.push("totp_secret = $totp_secret");
        }
        if input.is_active.is_some() {
            sets.push("is_active = $is_active");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('account', $id) SET {}",
            sets.join(", ")
        );

        let mut builder = self.db.query(&query).bind(("id", id_str.clone()));

        if let Some(last_login_at) = input.last_login_at {
            builder = builder.bind(("last_login_at", last_login_at));
        }
        if let Some(last_login_ip) = input.last_login_ip {
            builder = builder.bind(("last_login_ip", last_login_ip));
        }
        if let Some(password_hash) = input.password_hash {
            builder = builder.bind(("password_hash", password_hash));
        }
        if let Some(totp_enabled) = input.totp_enabled {
            builder = builder.bind(("totp_enabled", totp_enabled));
        }
        if let Some(totp_secret) = input.totp_secret {
            // Some(Some(v)) = set, Some(None) = clear
            builder = builder.bind(("totp_secret", totp_secret));
        }
        if let Some(is_active) = input.is_active {
            builder = builder.bind(("is_active", is_active));
        }

        let mut result = builder
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<AccountRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "account".into(),
            id: id_str,
        })?;

        Ok(row.into_account(id))
    }

    async fn set_phone(&self, id: Uuid, country_code: &str, phone: &str) -> GullinResult<Account> {
        let current = self.get_by_id(id).await?;
        let held = current
            .phone_country_code
            .as_deref()
            .zip(current.phone.as_deref());
        if held == Some((country_code, phone)) {
            return Ok(current);
        }
        if self
            .claim_holder(country_code, phone)
            .await?
            .is_some_and(|holder| holder != id)
        {
            return Err(DbError::Conflict {
                entity: "phone".into(),
            }
            .into());
        }
        let old_key = held.map(|(cc, p)| phone_claim_key(cc, p));

        // The claim record id is the pair itself, so a racing CREATE for
        // the same pair fails and rolls the whole block back.
        let mut statements = vec![
            "BEGIN TRANSACTION",
            "CREATE type::record('phone_claim', $new_key) SET account_id = $id",
            "UPDATE type::record('account', $id) SET \
             phone_country_code = $country_code, phone = $phone, \
             updated_at = time::now()",
        ];
        if old_key.is_some() {
            statements.push("DELETE type::record('phone_claim', $old_key)");
        }
        statements.push("COMMIT TRANSACTION");

        self.db
            .query(statements.join(";\n"))
            .bind(("id", id.to_string()))
            .bind(("new_key", phone_claim_key(country_code, phone)))
            .bind(("old_key", old_key))
            .bind(("country_code", country_code.to_string()))
            .bind(("phone", phone.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::from_check(e, "phone"))?;

        debug!(account_id = %id, "Phone number claimed");
        self.get_by_id(id).await
    }

    async fn deactivate(&self, id: Uuid) -> GullinResult<()> {
        self.db
            .query(
                "UPDATE type::record('account', $id) SET \
                 is_active = false, updated_at = time::now()",
            )
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?;

        Ok(())
    }
}
