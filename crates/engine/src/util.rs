//! Internal helpers for validation and conversion.
//!
//! These utilities are **not** part of the public API. They centralize
//! validation and mapping logic so every settlement path enforces the same
//! rules.

use chrono::{Datelike, NaiveDate};
use sea_orm::{DbErr, SqlErr};

use crate::{EngineError, ResultEngine, accounts};

/// Reject zero and negative amounts before any lock is taken.
pub(crate) fn ensure_positive_amount(amount_minor: i64) -> ResultEngine<()> {
    if amount_minor <= 0 {
        return Err(EngineError::InvalidAmount(
            "amount must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

pub(crate) fn normalize_required_text(value: &str, label: &str) -> ResultEngine<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::InvalidInput(format!("{label} must not be empty")));
    }
    Ok(trimmed.to_string())
}

pub(crate) fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// Stable payer identity handed to the gateway: the email when present, else
/// an address synthesized from the mobile number or the account id.
pub(crate) fn payer_identity(account: &accounts::Model, payer_domain: &str) -> String {
    if let Some(email) = normalize_optional_text(account.email.as_deref()) {
        return email;
    }
    let mobile_digits: String = account
        .mobile
        .as_deref()
        .unwrap_or_default()
        .chars()
        .filter(char::is_ascii_digit)
        .collect();
    if !mobile_digits.is_empty() {
        return format!("{mobile_digits}@{payer_domain}");
    }
    let id_token: String = account
        .id
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .take(24)
        .collect();
    format!("{id_token}@{payer_domain}")
}

/// `true` when the store rejected a row because of a value constraint on a
/// column (SQLite/PostgreSQL `CHECK`, MySQL enum truncation).
pub(crate) fn is_kind_constraint_violation(err: &DbErr) -> bool {
    let message = err.to_string().to_ascii_lowercase();
    message.contains("check constraint")
        || message.contains("violates check")
        || message.contains("data truncated for column")
}

pub(crate) fn is_unique_violation(err: &DbErr) -> bool {
    if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
        return true;
    }
    let message = err.to_string().to_ascii_lowercase();
    message.contains("unique constraint failed") || message.contains("duplicate key value")
}

/// Calendar month preceding `date`, as `(year, month)`.
pub(crate) fn previous_month(date: NaiveDate) -> (i32, u32) {
    if date.month() == 1 {
        (date.year() - 1, 12)
    } else {
        (date.year(), date.month() - 1)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn account(email: Option<&str>, mobile: Option<&str>, id: &str) -> accounts::Model {
        accounts::Model {
            id: id.to_string(),
            name: "Ada".to_string(),
            email: email.map(ToString::to_string),
            mobile: mobile.map(ToString::to_string),
            member_no: None,
            password_hash: String::new(),
            wallet_balance: 0,
            ica_balance: 0,
            piggy_balance: 0,
            contribution_mode: "auto".to_string(),
            esusu_member: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn payer_identity_prefers_email_then_mobile_then_id() {
        assert_eq!(
            payer_identity(&account(Some(" ada@x.io "), Some("0803"), "a"), "pay.io"),
            "ada@x.io"
        );
        assert_eq!(
            payer_identity(&account(None, Some("+234 803-111"), "a"), "pay.io"),
            "234803111@pay.io"
        );
        assert_eq!(
            payer_identity(
                &account(Some(" "), None, "6f1c0a2e-0b7d-4c55-9d5e-8f2b3c4d5e6f"),
                "pay.io"
            ),
            "6f1c0a2e0b7d4c559d5e8f2b@pay.io"
        );
    }

    #[test]
    fn previous_month_wraps_the_year() {
        let jan = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let jul = NaiveDate::from_ymd_opt(2026, 7, 1).unwrap();
        assert_eq!(previous_month(jan), (2025, 12));
        assert_eq!(previous_month(jul), (2026, 6));
    }

    #[test]
    fn constraint_messages_are_recognised() {
        let check = DbErr::Custom("CHECK constraint failed: kind".to_string());
        let mysql = DbErr::Custom("Data truncated for column 'kind' at row 1".to_string());
        let other = DbErr::Custom("no such table: transactions".to_string());
        assert!(is_kind_constraint_violation(&check));
        assert!(is_kind_constraint_violation(&mysql));
        assert!(!is_kind_constraint_violation(&other));
    }

    #[test]
    fn zero_amount_is_invalid() {
        assert!(ensure_positive_amount(0).is_err());
        assert!(ensure_positive_amount(-5).is_err());
        assert!(ensure_positive_amount(1).is_ok());
    }
}
