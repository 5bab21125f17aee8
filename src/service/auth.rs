//! Password hashing and login checks.

use std::num::NonZeroU32;

use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine;
use ring::pbkdf2;
use ring::rand::{SecureRandom, SystemRandom};

use super::{ServiceError, ServiceResult};
use crate::config::ControllerCredentials;
use crate::storage::models::{Teacher, TeacherStatus};
use crate::storage::Database;

const SCHEME: &str = "pbkdf2-sha256";
const ITERATIONS: u32 = 100_000;
const SALT_LEN: usize = 16;
const HASH_LEN: usize = 32;

pub const MIN_PASSWORD_LEN: usize = 6;

/// Hash a password as `pbkdf2-sha256$<iterations>$<salt>$<hash>`.
pub fn hash_password(password: &str) -> ServiceResult<String> {
    let mut salt = [0u8; SALT_LEN];
    SystemRandom::new()
        .fill(&mut salt)
        .map_err(|_| ServiceError::Internal("Failed to generate password salt".into()))?;

    let iterations = NonZeroU32::new(ITERATIONS)
        .ok_or_else(|| ServiceError::Internal("iteration count must be non-zero".into()))?;

    let mut hash = [0u8; HASH_LEN];
    pbkdf2::derive(
        pbkdf2::PBKDF2_HMAC_SHA256,
        iterations,
        &salt,
        password.as_bytes(),
        &mut hash,
    );

    Ok(format!(
        "{SCHEME}${ITERATIONS}${}${}",
        STANDARD_NO_PAD.encode(salt),
        STANDARD_NO_PAD.encode(hash)
    ))
}

/// Check a password against a stored hash. Malformed hashes never verify.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let mut parts = stored.split('$');
    let (Some(scheme), Some(iterations), Some(salt), Some(hash), None) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) else {
        return false;
    };
    if scheme != SCHEME {
        return false;
    }

    let Some(iterations) = iterations.parse().ok().and_then(NonZeroU32::new) else {
        return false;
    };
    let (Ok(salt), Ok(hash)) = (STANDARD_NO_PAD.decode(salt), STANDARD_NO_PAD.decode(hash)) else {
        return false;
    };

    pbkdf2::verify(
        pbkdf2::PBKDF2_HMAC_SHA256,
        iterations,
        &salt,
        password.as_bytes(),
        &hash,
    )
    .is_ok()
}

/// Verify teacher credentials. Blocked teachers cannot log in.
pub fn teacher_login(db: &Database, email: &str, password: &str) -> ServiceResult<Teacher> {
    if email.trim().is_empty() || password.is_empty() {
        return Err(ServiceError::Invalid("Please fill in all fields.".into()));
    }

    let teacher = db
        .get_teacher_by_email(email.trim())?
        .filter(|t| verify_password(password, &t.password_hash))
        .ok_or_else(|| ServiceError::Unauthorized("Invalid email or password.".into()))?;

    if teacher.status == TeacherStatus::Blocked {
        return Err(ServiceError::Unauthorized(
            "This account has been blocked by the exam controller.".into(),
        ));
    }

    Ok(teacher)
}

pub fn controller_login(
    credentials: &ControllerCredentials,
    email: &str,
    password: &str,
) -> ServiceResult<()> {
    if email.trim().is_empty() || password.is_empty() {
        return Err(ServiceError::Invalid("Please fill in all fields.".into()));
    }

    if email.trim().eq_ignore_ascii_case(&credentials.email) && password == credentials.password {
        Ok(())
    } else {
        Err(ServiceError::Unauthorized("Invalid admin credentials.".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("secret1").unwrap();
        assert!(hash.starts_with("pbkdf2-sha256$100000$"));
        assert!(verify_password("secret1", &hash));
        assert!(!verify_password("secret2", &hash));
    }

    #[test]
    fn test_hashes_are_salted() {
        let a = hash_password("same-password").unwrap();
        let b = hash_password("same-password").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_malformed_hash_never_verifies() {
        assert!(!verify_password("x", ""));
        assert!(!verify_password("x", "plaintext"));
        assert!(!verify_password("x", "pbkdf2-sha256$0$AAAA$AAAA"));
        assert!(!verify_password("x", "md5$1$AAAA$AAAA"));
    }

    #[test]
    fn test_controller_login() {
        let creds = ControllerCredentials {
            email: "admin@oes.edu".into(),
            password: "admin123".into(),
        };
        assert!(controller_login(&creds, "ADMIN@oes.edu", "admin123").is_ok());
        assert!(matches!(
            controller_login(&creds, "admin@oes.edu", "wrong"),
            Err(ServiceError::Unauthorized(_))
        ));
        assert!(matches!(
            controller_login(&creds, "", ""),
            Err(ServiceError::Invalid(_))
        ));
    }
}
