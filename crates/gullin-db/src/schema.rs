//! SurrealDB schema for accounts, investor profiles and identity checks.
//!
//! Every table is SCHEMAFULL. Ids are UUID strings; closed sets such as
//! the document type are strings guarded by `ASSERT`. The verification
//! level is stored as its integer rank so CAS updates compare numbers.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::error::DbError;

/// Bookkeeping table: one row per applied schema version.
const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct MigrationRecord {
    version: u32,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "investor_onboarding",
    sql: SCHEMA_V1,
}];

const SCHEMA_V1: &str = "\
-- Accounts
DEFINE TABLE account SCHEMAFULL;
DEFINE FIELD email ON TABLE account TYPE string;
DEFINE FIELD phone_country_code ON TABLE account TYPE option<string>;
DEFINE FIELD phone ON TABLE account TYPE option<string>;
DEFINE FIELD password_hash ON TABLE account TYPE string;
DEFINE FIELD last_login_at ON TABLE account TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD last_login_ip ON TABLE account TYPE option<string>;
DEFINE FIELD totp_enabled ON TABLE account TYPE bool DEFAULT false;
DEFINE FIELD totp_secret ON TABLE account TYPE option<string>;
DEFINE FIELD is_investor ON TABLE account TYPE bool DEFAULT false;
DEFINE FIELD is_company ON TABLE account TYPE bool DEFAULT false;
DEFINE FIELD is_analyst ON TABLE account TYPE bool DEFAULT false;
DEFINE FIELD is_staff ON TABLE account TYPE bool DEFAULT false;
DEFINE FIELD is_active ON TABLE account TYPE bool DEFAULT true;
DEFINE FIELD created_at ON TABLE account TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE account TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_account_email ON TABLE account \
    COLUMNS email UNIQUE;
DEFINE INDEX idx_account_phone ON TABLE account \
    COLUMNS phone;

-- Phone claims: record id is `<country_code>:<phone>`, so CREATE
-- fails when the pair is already held by another account.
DEFINE TABLE phone_claim SCHEMAFULL;
DEFINE FIELD account_id ON TABLE phone_claim TYPE string;

-- Verification codes (record id = account id)
DEFINE TABLE verification_code SCHEMAFULL;
DEFINE FIELD account_id ON TABLE verification_code TYPE string;
DEFINE FIELD code ON TABLE verification_code TYPE string;
DEFINE FIELD expires_at ON TABLE verification_code TYPE datetime;

-- Investor profiles
DEFINE TABLE investor_profile SCHEMAFULL;
DEFINE FIELD account_id ON TABLE investor_profile TYPE string;
DEFINE FIELD first_name ON TABLE investor_profile TYPE string;
DEFINE FIELD last_name ON TABLE investor_profile TYPE string;
DEFINE FIELD birthday ON TABLE investor_profile TYPE option<string>;
DEFINE FIELD nationality ON TABLE investor_profile TYPE option<string>;
DEFINE FIELD verification_level ON TABLE investor_profile TYPE int \
    DEFAULT -1 ASSERT $value >= -1 AND $value <= 6;
DEFINE FIELD wallet_address ON TABLE investor_profile TYPE option<string>;
DEFINE FIELD address1 ON TABLE investor_profile TYPE option<string>;
DEFINE FIELD address2 ON TABLE investor_profile TYPE option<string>;
DEFINE FIELD city ON TABLE investor_profile TYPE option<string>;
DEFINE FIELD state ON TABLE investor_profile TYPE option<string>;
DEFINE FIELD zipcode ON TABLE investor_profile TYPE option<string>;
DEFINE FIELD country ON TABLE investor_profile TYPE option<string>;
DEFINE FIELD created_at ON TABLE investor_profile TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE investor_profile TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_investor_profile_account ON TABLE investor_profile \
    COLUMNS account_id UNIQUE;

-- Identity verification (record id = investor profile id)
DEFINE TABLE identity_verification SCHEMAFULL;
DEFINE FIELD profile_id ON TABLE identity_verification TYPE string;
DEFINE FIELD id_type ON TABLE identity_verification TYPE string \
    ASSERT $value IN ['DriverLicense', 'PhotoId', 'Passport'];
DEFINE FIELD document_front ON TABLE identity_verification TYPE string;
DEFINE FIELD document_back ON TABLE identity_verification \
    TYPE option<string>;
DEFINE FIELD document_holding ON TABLE identity_verification \
    TYPE option<string>;
DEFINE FIELD document_nationality ON TABLE identity_verification \
    TYPE string;
DEFINE FIELD transaction_id ON TABLE identity_verification \
    TYPE option<string>;
DEFINE FIELD state ON TABLE identity_verification TYPE string \
    ASSERT $value IN ['Pending', 'UnderReview', 'Accepted', 'Rejected'];
DEFINE FIELD stage ON TABLE identity_verification TYPE int DEFAULT 1;
DEFINE FIELD processed ON TABLE identity_verification TYPE bool \
    DEFAULT false;
DEFINE FIELD notes ON TABLE identity_verification TYPE array<string> \
    DEFAULT [];
DEFINE FIELD submitted_at ON TABLE identity_verification TYPE datetime;
DEFINE FIELD updated_at ON TABLE identity_verification TYPE datetime \
    DEFAULT time::now();

-- Activity log (append-only)
DEFINE TABLE activity_log SCHEMAFULL
    PERMISSIONS
        FOR create FULL
        FOR select FULL
        FOR update NONE
        FOR delete NONE;
DEFINE FIELD account_id ON TABLE activity_log TYPE string;
DEFINE FIELD action ON TABLE activity_log TYPE string;
DEFINE FIELD ip ON TABLE activity_log TYPE option<string>;
DEFINE FIELD device ON TABLE activity_log TYPE option<string>;
DEFINE FIELD created_at ON TABLE activity_log TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_activity_log_account ON TABLE activity_log \
    COLUMNS account_id, created_at;
";

/// Bring the database up to the latest schema version.
///
/// Safe to call on every start: versions already listed in `_migration`
/// are skipped.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(format!("bookkeeping table: {e}")))?;

    let applied = applied_version(db).await?;
    let pending = MIGRATIONS.iter().filter(|m| m.version > applied);
    for migration in pending {
        apply(db, migration).await?;
    }
    Ok(())
}

async fn applied_version<C: Connection>(db: &Surreal<C>) -> Result<u32, DbError> {
    let rows: Vec<MigrationRecord> = db
        .query("SELECT version FROM _migration ORDER BY version DESC LIMIT 1")
        .await?
        .take(0)?;
    Ok(rows.into_iter().next().map_or(0, |row| row.version))
}

async fn apply<C: Connection>(db: &Surreal<C>, migration: &Migration) -> Result<(), DbError> {
    let Migration { version, name, sql } = *migration;
    info!(version, migration = name, "Migrating schema");

    db.query(sql)
        .await?
        .check()
        .map_err(|e| DbError::Migration(format!("v{version} ({name}): {e}")))?;
    db.query("CREATE _migration SET version = $version, name = $name")
        .bind(("version", version))
        .bind(("name", name))
        .await?
        .check()
        .map_err(|e| DbError::Migration(format!("v{version} ({name}) not recorded: {e}")))?;

    info!(version, "Schema migrated");
    Ok(())
}

/// DDL of the first schema version.
pub fn schema_v1() -> &'static str {
    SCHEMA_V1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_v1_defines_every_table() {
        for table in [
            "account",
            "phone_claim",
            "verification_code",
            "investor_profile",
            "identity_verification",
            "activity_log",
        ] {
            assert!(
                SCHEMA_V1.contains(&format!("DEFINE TABLE {table} SCHEMAFULL")),
                "missing table {table}"
            );
        }
    }

    #[test]
    fn migrations_are_ordered() {
        assert!(
            MIGRATIONS.windows(2).all(|pair| pair[0].version < pair[1].version),
            "versions must strictly increase"
        );
        assert_eq!(MIGRATIONS[0].version, 1);
    }
}
