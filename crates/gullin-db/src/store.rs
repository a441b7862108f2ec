//! [`Store`] implementation bundling every SurrealDB repository over one
//! connection.

use gullin_core::repository::Store;
use surrealdb::{Connection, Surreal};

use crate::repository::{
    SurrealAccountRepository, SurrealActivityLogRepository, SurrealIdentityVerificationRepository,
    SurrealInvestorProfileRepository, SurrealVerificationCodeRepository,
};

pub struct SurrealStore<C: Connection> {
    accounts: SurrealAccountRepository<C>,
    codes: SurrealVerificationCodeRepository<C>,
    profiles: SurrealInvestorProfileRepository<C>,
    identities: SurrealIdentityVerificationRepository<C>,
    activity: SurrealActivityLogRepository<C>,
}

impl<C: Connection> Clone for SurrealStore<C> {
    fn clone(&self) -> Self {
        Self {
            accounts: self.accounts.clone(),
            codes: self.codes.clone(),
            profiles: self.profiles.clone(),
            identities: self.identities.clone(),
            activity: self.activity.clone(),
        }
    }
}

impl<C: Connection> SurrealStore<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self {
            accounts: SurrealAccountRepository::new(db.clone()),
            codes: SurrealVerificationCodeRepository::new(db.clone()),
            profiles: SurrealInvestorProfileRepository::new(db.clone()),
            identities: SurrealIdentityVerificationRepository::new(db.clone()),
            activity: SurrealActivityLogRepository::new(db),
        }
    }
}

impl<C: Connection> Store for SurrealStore<C> {
    type Accounts = SurrealAccountRepository<C>;
    type Codes = SurrealVerificationCodeRepository<C>;
    type Profiles = SurrealInvestorProfileRepository<C>;
    type Identities = SurrealIdentityVerificationRepository<C>;
    type Activity = SurrealActivityLogRepository<C>;

    fn accounts(&self) -> &Self::Accounts {
        &self.accounts
    }

    fn codes(&self) -> &Self::Codes {
        &self.codes
    }

    fn profiles(&self) -> &Self::Profiles {
        &self.profiles
    }

    fn identities(&self) -> &Self::Identities {
        &self.identities
    }

    fn activity(&self) -> &Self::Activity {
        &self.activity
    }
}
