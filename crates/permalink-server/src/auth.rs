use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use permalink_core::Principal;
use rand::distributions::Alphanumeric;
use rand::rngs::OsRng;
use rand::{Rng, thread_rng};

const KEY_PREFIX: &str = "permalink";
const KEY_ID_LEN: usize = 8;
const SECRET_LEN: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid api key format")]
    InvalidKeyFormat,

    #[error("unknown api key")]
    UnknownKey,

    #[error("api key has been revoked")]
    RevokedKey,

    #[error("internal authentication error: {0}")]
    Internal(String),
}

#[derive(Debug, Clone)]
pub struct ApiKeyRecord {
    pub key_id: String,
    pub key_hash: String,
    pub principal: Principal,
    pub revoked: bool,
}

/// The caller behind a verified API key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedCaller {
    pub principal: Principal,
    pub key_id: String,
}

/// Splits `permalink_<key_id>_<secret>` into its key id and secret.
pub fn parse_api_key(raw_key: &str) -> Result<(&str, &str), AuthError> {
    let mut parts = raw_key.splitn(3, '_');
    let (Some(prefix), Some(key_id), Some(secret)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(AuthError::InvalidKeyFormat);
    };
    if prefix != KEY_PREFIX || key_id.is_empty() || secret.is_empty() {
        return Err(AuthError::InvalidKeyFormat);
    }
    Ok((key_id, secret))
}

pub fn hash_secret(secret: &str) -> Result<String, AuthError> {
    let salt = argon2::password_hash::SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(secret.as_bytes(), &salt)
        .map_err(|e| AuthError::Internal(e.to_string()))?;
    Ok(hash.to_string())
}

pub fn verify_secret(secret: &str, hash: &str) -> Result<bool, AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|e| AuthError::Internal(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(secret.as_bytes(), &parsed_hash)
        .is_ok())
}

fn random_token(len: usize) -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect()
}

/// Returns `(full_key, key_id, secret)`. Only the secret's hash is stored.
pub fn generate_api_key() -> (String, String, String) {
    let key_id = random_token(KEY_ID_LEN);
    let secret = random_token(SECRET_LEN);
    let full_key = format!("{KEY_PREFIX}_{key_id}_{secret}");
    (full_key, key_id, secret)
}

pub fn authenticate(
    raw_key: &str,
    lookup: impl FnOnce(&str) -> Option<ApiKeyRecord>,
) -> Result<AuthenticatedCaller, AuthError> {
    let (key_id, secret) = parse_api_key(raw_key)?;

    let record = lookup(key_id).ok_or(AuthError::UnknownKey)?;

    if record.revoked {
        return Err(AuthError::RevokedKey);
    }

    if !verify_secret(secret, &record.key_hash)? {
        return Err(AuthError::UnknownKey);
    }

    Ok(AuthenticatedCaller {
        principal: record.principal,
        key_id: record.key_id,
    })
}
