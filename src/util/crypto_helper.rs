use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use derive_more::{Display, Error};
use hmac::{Hmac, Mac};
use rand::distributions::Alphanumeric;
use rand::Rng;
use sha2::Sha512;

type HmacSha512 = Hmac<Sha512>;

#[derive(Debug, Display, Error)]
pub enum CryptoError {
    #[display("password hashing failed: {message}")]
    Hash { message: String },
    #[display("invalid HMAC key")]
    HmacKey,
}

/// Hashes a password with Argon2id and signs the resulting hash with HMAC-SHA512.
///
/// The signature lets a login detect a hash that was swapped directly in the database.
///
/// # Errors
///
/// Returns a `CryptoError` if hashing fails or the HMAC key is unusable.
pub fn hash_password_sign_with_hmac(
    hmac_key: &str,
    password: &str,
) -> Result<(String, Vec<u8>), CryptoError> {
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| CryptoError::Hash {
            message: e.to_string(),
        })?
        .to_string();

    let password_hmac = sign(hmac_key, &password_hash)?;
    Ok((password_hash, password_hmac))
}

/// Checks a password against the stored hash and the hash against its HMAC signature.
///
/// Returns `Ok(false)` on any mismatch, including a stored hash that cannot be parsed.
pub fn verify_password_hash_hmac(
    hmac_key: &str,
    password: &str,
    password_hash: &str,
    password_hmac: &[u8],
) -> Result<bool, CryptoError> {
    let mut mac = <HmacSha512 as Mac>::new_from_slice(hmac_key.as_bytes())
        .map_err(|_| CryptoError::HmacKey)?;
    mac.update(password_hash.as_bytes());
    if mac.verify_slice(password_hmac).is_err() {
        return Ok(false);
    }

    let Ok(parsed) = PasswordHash::new(password_hash) else {
        return Ok(false);
    };
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Runs a throwaway verification against `dummy_hash` so unknown accounts cost the same
/// time as known ones.
pub fn run_fake_password_hash_check(dummy_hash: &str) {
    if let Ok(parsed) = PasswordHash::new(dummy_hash) {
        let _ = Argon2::default().verify_password(b"dummy", &parsed);
    }
}

/// Argon2 hash of a random password, used by [`run_fake_password_hash_check`].
pub fn generate_dummy_password_hash() -> Result<String, CryptoError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(generate_random_password(32).as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| CryptoError::Hash {
            message: e.to_string(),
        })
}

/// Random ASCII letters and digits.
pub fn generate_random_password(length: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

fn sign(hmac_key: &str, password_hash: &str) -> Result<Vec<u8>, CryptoError> {
    let mut mac = <HmacSha512 as Mac>::new_from_slice(hmac_key.as_bytes())
        .map_err(|_| CryptoError::HmacKey)?;
    mac.update(password_hash.as_bytes());
    Ok(mac.finalize().into_bytes().to_vec())
}
