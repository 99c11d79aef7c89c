//! Public wallet identifiers.
//!
//! A member shares `PREFIX-XXXX-XXXX-XXXX` instead of their internal id. The
//! id is the first 12 upper-hex digits of HMAC-SHA256(secret, "{id}:{member_no}"),
//! so it is stable, not guessable and recomputable from the account row.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

#[derive(Clone, Debug)]
pub struct PublicIdGenerator {
    secret: String,
    prefix: String,
}

impl PublicIdGenerator {
    pub fn new(secret: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            prefix: prefix.into(),
        }
    }

    /// Wallet id of an account; `None` when the account has no member number.
    #[must_use]
    pub fn wallet_id(&self, account_id: &str, member_no: Option<i64>) -> Option<String> {
        let member_no = member_no?;
        self.derive(&format!("{account_id}:{member_no}"))
    }

    fn derive(&self, value: &str) -> Option<String> {
        if value.is_empty() {
            return None;
        }
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes()).ok()?;
        mac.update(value.as_bytes());
        let digest = hex::encode_upper(mac.finalize().into_bytes());
        Some(format!(
            "{}-{}-{}-{}",
            self.prefix,
            &digest[0..4],
            &digest[4..8],
            &digest[8..12]
        ))
    }
}

/// Upper-cases and strips everything but ASCII alphanumerics, so
/// `mdbx 1a2b-3c4d-5e6f` matches `MDBX-1A2B-3C4D-5E6F`.
#[must_use]
pub fn normalize_wallet_token(value: &str) -> String {
    value
        .trim()
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generator() -> PublicIdGenerator {
        PublicIdGenerator::new("test-secret", "MDBX")
    }

    #[test]
    fn wallet_id_has_prefix_and_three_groups() {
        let id = generator().wallet_id("acc-1", Some(42)).unwrap();
        let parts: Vec<&str> = id.split('-').collect();
        assert_eq!(parts.len(), 4);
        assert_eq!(parts[0], "MDBX");
        for group in &parts[1..] {
            assert_eq!(group.len(), 4);
            assert!(group.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
        }
    }

    #[test]
    fn wallet_id_is_deterministic_and_secret_dependent() {
        let a = generator().wallet_id("acc-1", Some(42));
        assert_eq!(a, generator().wallet_id("acc-1", Some(42)));
        assert_ne!(a, generator().wallet_id("acc-1", Some(43)));
        assert_ne!(
            a,
            PublicIdGenerator::new("other", "MDBX").wallet_id("acc-1", Some(42))
        );
    }

    #[test]
    fn no_member_number_means_no_wallet_id() {
        assert_eq!(generator().wallet_id("acc-1", None), None);
    }

    #[test]
    fn normalization_ignores_case_and_separators() {
        assert_eq!(normalize_wallet_token(" mdbx 1a2b-3c4d_5e6f "), "MDBX1A2B3C4D5E6F");
    }
}
