use rand::RngCore;
use sha2::{Digest, Sha256};
use time::Duration;

/// Fixed redemption window for an outstanding reset token.
pub const RESET_TOKEN_TTL: Duration = Duration::minutes(10);

/// 32 random bytes, hex-encoded. The raw value goes into the reset email
/// and is never persisted.
pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Only this digest is stored; redemption re-digests the presented token
/// and looks the user up by it.
pub fn digest(raw: &str) -> String {
    hex::encode(Sha256::digest(raw.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_high_entropy_and_distinct() {
        let a = generate_token();
        let b = generate_token();
        assert_eq!(a.len(), 64);
        assert_ne!(a, b);
    }

    #[test]
    fn digest_is_deterministic() {
        let raw = generate_token();
        assert_eq!(digest(&raw), digest(&raw));
    }

    #[test]
    fn digest_differs_from_raw_token() {
        let raw = generate_token();
        let d = digest(&raw);
        assert_eq!(d.len(), 64);
        assert_ne!(d, raw);
    }

    #[test]
    fn digest_matches_known_vector() {
        // sha-256("abc"), hex
        assert_eq!(
            digest("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
