//! Settings for sign-up, login, tokens and second factors.

/// Everything [`AuthService`](crate::AuthService) needs besides its stores.
///
/// `Debug` redacts the signing key, the pepper and the TOTP key.
#[derive(Clone)]
pub struct AuthConfig {
    /// Ed25519 signing key in PEM form.
    pub jwt_private_key_pem: String,
    /// Matching Ed25519 verification key in PEM form.
    pub jwt_public_key_pem: String,
    /// Seconds an access token stays valid (default 900).
    pub access_token_lifetime_secs: u64,
    /// How long after the original login a token may still be refreshed
    /// (default: 604_800 = 7 days).
    pub refresh_window_secs: u64,
    /// JWT issuer (`iss` claim).
    pub jwt_issuer: String,
    /// Optional pepper prepended to passwords before Argon2id hashing.
    pub pepper: Option<String>,
    /// Shortest password accepted at sign-up and reset.
    pub min_password_length: usize,
    /// AES-256-GCM key sealing stored TOTP secrets.
    /// `None` disables TOTP enrollment.
    pub totp_encryption_key: Option<[u8; 32]>,
    /// Label authenticator apps show next to the code.
    pub totp_issuer: String,
    /// Lifetime of a pending login or reset challenge (default: 300 s).
    pub challenge_lifetime_secs: u64,
    /// Verification code lifetime (default: 300 s).
    pub code_lifetime_secs: u64,
    /// Number of digits in a verification code.
    pub code_length: usize,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_private_key_pem", &"[REDACTED]")
            .field("jwt_public_key_pem", &self.jwt_public_key_pem)
            .field("access_token_lifetime_secs", &self.access_token_lifetime_secs)
            .field("refresh_window_secs", &self.refresh_window_secs)
            .field("jwt_issuer", &self.jwt_issuer)
            .field("pepper", &self.pepper.as_ref().map(|_| "[REDACTED]"))
            .field("min_password_length", &self.min_password_length)
            .field(
                "totp_encryption_key",
                &self.totp_encryption_key.map(|_| "[REDACTED]"),
            )
            .field("totp_issuer", &self.totp_issuer)
            .field("challenge_lifetime_secs", &self.challenge_lifetime_secs)
            .field("code_lifetime_secs", &self.code_lifetime_secs)
            .field("code_length", &self.code_length)
            .finish()
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_private_key_pem: String::new(),
            jwt_public_key_pem: String::new(),
            access_token_lifetime_secs: 900,
            refresh_window_secs: 604_800,
            jwt_issuer: "gullin".into(),
            pepper: None,
            min_password_length: 8,
            totp_encryption_key: None,
            totp_issuer: "Gullin".into(),
            challenge_lifetime_secs: 300,
            code_lifetime_secs: 300,
            code_length: 6,
        }
    }
}
