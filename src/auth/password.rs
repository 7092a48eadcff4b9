use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tracing::error;

pub const MIN_PASSWORD_LEN: usize = 8;

pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            anyhow::anyhow!(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

/// Comparison goes through argon2's verifier, never string equality.
pub fn verify_password(plain: &str, hash: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| {
        error!(error = %e, "argon2 parse hash error");
        anyhow::anyhow!(e.to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

/// Both fields arrive explicitly; the check carries no document context.
pub fn validate_new_password(password: &str, password_confirm: &str) -> Result<(), String> {
    if password.len() < MIN_PASSWORD_LEN {
        return Err(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        ));
    }
    if password != password_confirm {
        return Err("Passwords are not the same".into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_roundtrip() {
        let password = "Secur3P@ssw0rd!";
        let hash = hash_password(password).expect("hashing should succeed");
        assert!(verify_password(password, &hash).expect("verify should succeed"));
    }

    #[test]
    fn verify_rejects_wrong_password() {
        let password = "correct-horse-battery-staple";
        let hash = hash_password(password).expect("hashing should succeed");
        assert!(!verify_password("wrong-password", &hash).expect("verify should not error"));
    }

    #[test]
    fn verify_errors_on_malformed_hash() {
        let err = verify_password("anything", "not-a-valid-hash").unwrap_err();
        assert!(!err.to_string().is_empty());
    }

    #[test]
    fn hash_never_contains_plaintext() {
        let password = "secretpw";
        let hash = hash_password(password).expect("hashing should succeed");
        assert!(!hash.contains(password));
        assert!(hash.starts_with("$argon2"));
    }

    #[test]
    fn policy_rejects_short_password() {
        let err = validate_new_password("short", "short").unwrap_err();
        assert!(err.contains("at least 8"));
    }

    #[test]
    fn policy_rejects_mismatched_confirmation() {
        let err = validate_new_password("secretpw", "secretpw2").unwrap_err();
        assert_eq!(err, "Passwords are not the same");
    }

    #[test]
    fn policy_accepts_matching_pair() {
        assert!(validate_new_password("secretpw", "secretpw").is_ok());
    }
}
