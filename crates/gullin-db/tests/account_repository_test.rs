//! Integration tests for the Account repository using in-memory SurrealDB.

use gullin_core::error::GullinError;
use gullin_core::models::account::{CreateAccount, UpdateAccount};
use gullin_core::models::investor::{CreateInvestorProfile, VerificationLevel};
use gullin_core::repository::{
    AccountRepository, InvestorProfileRepository, VerificationCodeRepository,
};
use gullin_db::repository::{
    SurrealAccountRepository, SurrealInvestorProfileRepository, SurrealVerificationCodeRepository,
};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};

async fn setup() -> Surreal<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    gullin_db::run_migrations(&db).await.unwrap();
    db
}

fn investor(email: &str) -> CreateAccount {
    CreateAccount {
        email: email.into(),
        password_hash: "$argon2id$stub".into(),
        last_login_ip: Some("1.1.1.1".into()),
        is_investor: true,
        is_company: false,
        is_analyst: false,
        investor: Some(CreateInvestorProfile {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
        }),
    }
}

#[tokio::test]
async fn create_writes_account_code_and_profile() {
    let db = setup().await;
    let accounts = SurrealAccountRepository::new(db.clone());
    let codes = SurrealVerificationCodeRepository::new(db.clone());
    let profiles = SurrealInvestorProfileRepository::new(db.clone());

    let account = accounts.create(investor("ada@example.com")).await.unwrap();
    assert_eq!(account.email, "ada@example.com");
    assert_eq!(account.last_login_ip.as_deref(), Some("1.1.1.1"));
    assert!(account.is_investor);
    assert!(account.is_active);
    assert!(!account.totp_enabled);

    let code = codes.get(account.id).await.unwrap();
    assert_eq!(code.account_id, account.id);
    assert!(code.is_expired_at(chrono::Utc::now() + chrono::Duration::seconds(1)));

    let profile = profiles.get_by_account(account.id).await.unwrap();
    assert_eq!(profile.first_name, "Ada");
    assert_eq!(profile.verification_level, VerificationLevel::NotVerified);
    assert!(profile.address.is_none());
}

#[tokio::test]
async fn create_rejects_duplicate_email() {
    let db = setup().await;
    let accounts = SurrealAccountRepository::new(db);

    accounts.create(investor("dup@example.com")).await.unwrap();
    let err = accounts.create(investor("dup@example.com")).await.unwrap_err();
    assert!(matches!(err, GullinError::AlreadyExists { .. }), "got {err:?}");
}

#[tokio::test]
async fn lookup_by_email_and_phone() {
    let db = setup().await;
    let accounts = SurrealAccountRepository::new(db);

    let created = accounts.create(investor("find@example.com")).await.unwrap();
    let by_email = accounts.get_by_email("find@example.com").await.unwrap();
    assert_eq!(by_email.id, created.id);

    accounts.set_phone(created.id, "+1", "5551234567").await.unwrap();
    let by_phone = accounts.get_by_phone("5551234567").await.unwrap();
    assert_eq!(by_phone.id, created.id);
    assert_eq!(by_phone.phone_e164().as_deref(), Some("+15551234567"));
    let by_e164 = accounts.get_by_phone("+15551234567").await.unwrap();
    assert_eq!(by_e164.id, created.id);

    let missing = accounts.get_by_email("nobody@example.com").await.unwrap_err();
    assert!(matches!(missing, GullinError::NotFound { .. }));
}

#[tokio::test]
async fn set_phone_rejects_pair_held_by_another_account() {
    let db = setup().await;
    let accounts = SurrealAccountRepository::new(db);

    let a = accounts.create(investor("a@example.com")).await.unwrap();
    let b = accounts.create(investor("b@example.com")).await.unwrap();

    accounts.set_phone(a.id, "+44", "7700900123").await.unwrap();
    let err = accounts.set_phone(b.id, "+44", "7700900123").await.unwrap_err();
    assert!(
        matches!(err, GullinError::AlreadyExists { ref entity } if entity == "phone"),
        "got {err:?}"
    );

    // Re-setting the same pair on the owner is a no-op, not a conflict.
    accounts.set_phone(a.id, "+44", "7700900123").await.unwrap();

    // Releasing the old pair lets another account claim it.
    accounts.set_phone(a.id, "+44", "7700900999").await.unwrap();
    let b = accounts.set_phone(b.id, "+44", "7700900123").await.unwrap();
    assert_eq!(b.phone.as_deref(), Some("7700900123"));
    assert_eq!(accounts.get_by_phone("+447700900123").await.unwrap().id, b.id);
    assert_eq!(accounts.get_by_phone("+447700900999").await.unwrap().id, a.id);
}

#[tokio::test]
async fn phone_lookup_respects_country_code() {
    let db = setup().await;
    let accounts = SurrealAccountRepository::new(db);

    let us = accounts.create(investor("us@example.com")).await.unwrap();
    let uk = accounts.create(investor("uk@example.com")).await.unwrap();
    accounts.set_phone(us.id, "+1", "5550100").await.unwrap();
    accounts.set_phone(uk.id, "+44", "5550100").await.unwrap();

    assert_eq!(accounts.get_by_phone("+15550100").await.unwrap().id, us.id);
    assert_eq!(accounts.get_by_phone(" +445550100 ").await.unwrap().id, uk.id);

    // The bare number belongs to two accounts.
    let err = accounts.get_by_phone("5550100").await.unwrap_err();
    assert!(matches!(err, GullinError::NotFound { .. }), "got {err:?}");

    for unknown in ["+335550100", "+", "+44abc", "5550199"] {
        let err = accounts.get_by_phone(unknown).await.unwrap_err();
        assert!(matches!(err, GullinError::NotFound { .. }), "{unknown}: {err:?}");
    }
}

#[tokio::test]
async fn country_code_boundary_is_part_of_the_claim() {
    let db = setup().await;
    let accounts = SurrealAccountRepository::new(db);

    let x = accounts.create(investor("x@example.com")).await.unwrap();
    let y = accounts.create(investor("y@example.com")).await.unwrap();
    accounts.set_phone(x.id, "+1", "2345550100").await.unwrap();
    accounts.set_phone(y.id, "+12", "345550100").await.unwrap();

    // Both pairs spell the same digits, so the E.164 form is ambiguous.
    let err = accounts.get_by_phone("+12345550100").await.unwrap_err();
    assert!(matches!(err, GullinError::NotFound { .. }), "got {err:?}");
    assert_eq!(accounts.get_by_phone("2345550100").await.unwrap().id, x.id);
    assert_eq!(accounts.get_by_phone("345550100").await.unwrap().id, y.id);
}

#[tokio::test]
async fn racing_claims_leave_the_loser_untouched() {
    let db = setup().await;
    let accounts = SurrealAccountRepository::new(db);

    let a = accounts.create(investor("race-a@example.com")).await.unwrap();
    let b = accounts.create(investor("race-b@example.com")).await.unwrap();
    accounts.set_phone(a.id, "+1", "5550111").await.unwrap();
    accounts.set_phone(b.id, "+1", "5550222").await.unwrap();

    let (ra, rb) = tokio::join!(
        accounts.set_phone(a.id, "+44", "7700900333"),
        accounts.set_phone(b.id, "+44", "7700900333"),
    );
    assert_eq!(ra.is_ok() as u8 + rb.is_ok() as u8, 1, "{ra:?} / {rb:?}");

    let (winner, loser, loser_number) = if ra.is_ok() {
        (a.id, b.id, "+15550222")
    } else {
        (b.id, a.id, "+15550111")
    };
    assert_eq!(accounts.get_by_phone("+447700900333").await.unwrap().id, winner);
    let loser_account = accounts.get_by_phone(loser_number).await.unwrap();
    assert_eq!(loser_account.id, loser);
    assert_eq!(loser_account.phone_e164().as_deref(), Some(loser_number));
}

#[tokio::test]
async fn update_changes_only_given_fields() {
    let db = setup().await;
    let accounts = SurrealAccountRepository::new(db);

    let created = accounts.create(investor("upd@example.com")).await.unwrap();
    let updated = accounts
        .update(
            created.id,
            UpdateAccount {
                last_login_ip: Some("2.2.2.2".into()),
                totp_secret: Some(Some("enc".into())),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.last_login_ip.as_deref(), Some("2.2.2.2"));
    assert_eq!(updated.totp_secret.as_deref(), Some("enc"));
    assert_eq!(updated.password_hash, created.password_hash);

    let cleared = accounts
        .update(
            created.id,
            UpdateAccount {
                totp_secret: Some(None),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(cleared.totp_secret.is_none());
}

#[tokio::test]
async fn deactivate_clears_active_flag() {
    let db = setup().await;
    let accounts = SurrealAccountRepository::new(db);

    let created = accounts.create(investor("gone@example.com")).await.unwrap();
    accounts.deactivate(created.id).await.unwrap();
    assert!(!accounts.get_by_id(created.id).await.unwrap().is_active);
}
