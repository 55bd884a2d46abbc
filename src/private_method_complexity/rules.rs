use crate::providers::TimeProvider;
use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;

static USERNAME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_]+$").expect("USERNAME_REGEX is invalid"));

static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("EMAIL_REGEX is invalid")
});

static DOMAIN_NAME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9-]+(\.[a-zA-Z0-9-]+)*$").expect("DOMAIN_NAME_REGEX is invalid")
});

static ZIP_CODE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{5}(-\d{4})?$").expect("ZIP_CODE_REGEX is invalid"));

const PASSWORD_SPECIAL_CHARS: &str = "!@#$%^&*()_+-=[]{}|;:,.<>?";
const PASSWORD_MAX_AGE_DAYS: i64 = 90;
const ADDRESS_FIELDS: [&str; 5] = ["street", "city", "state", "zip_code", "country"];

/// The first rule a value broke.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleViolation {
    #[error("Username cannot be empty")]
    UsernameEmpty,
    #[error("Username must be 3-20 characters")]
    UsernameLength,
    #[error("Username can only contain letters, numbers, and underscores")]
    UsernameCharacters,
    #[error("Username cannot start with a number")]
    UsernameLeadingDigit,

    #[error("Password cannot be empty")]
    PasswordEmpty,
    #[error("Password must be at least 8 characters")]
    PasswordTooShort,
    #[error("Password must contain at least one uppercase letter")]
    PasswordMissingUppercase,
    #[error("Password must contain at least one lowercase letter")]
    PasswordMissingLowercase,
    #[error("Password must contain at least one number")]
    PasswordMissingDigit,
    #[error("Password must contain at least one special character")]
    PasswordMissingSpecial,
    #[error("Password cannot be reused")]
    PasswordReused,
    #[error("Password must be changed every 90 days")]
    PasswordExpired,

    #[error("Email cannot be empty")]
    EmailEmpty,
    #[error("Invalid email format")]
    EmailFormat,
    #[error("Invalid domain")]
    EmailDomain,

    #[error("Age must be a number")]
    AgeNotNumber,
    #[error("Age must be positive")]
    AgeNotPositive,
    #[error("Age must be between 0 and 150")]
    AgeOutOfRange,

    #[error("Missing required address fields")]
    AddressMissingFields,
    #[error("Invalid street address")]
    AddressStreet,
    #[error("Invalid city")]
    AddressCity,
    #[error("Invalid state")]
    AddressState,
    #[error("Invalid zip code")]
    AddressZipCode,
    #[error("Invalid country")]
    AddressCountry,

    /// Any failure that is not a rule violation, e.g. a malformed document.
    #[error("{0}")]
    Other(String),
}

pub trait ValidationRule<T: ?Sized>: Send + Sync {
    fn validate(&self, value: &T) -> Result<(), RuleViolation>;
}

// ============================================================================
// Username
// ============================================================================

#[derive(Debug, Default, Clone, Copy)]
pub struct UsernameRule;

impl ValidationRule<str> for UsernameRule {
    fn validate(&self, username: &str) -> Result<(), RuleViolation> {
        if username.is_empty() {
            return Err(RuleViolation::UsernameEmpty);
        }
        if !(3..=20).contains(&username.chars().count()) {
            return Err(RuleViolation::UsernameLength);
        }
        if !USERNAME_REGEX.is_match(username) {
            return Err(RuleViolation::UsernameCharacters);
        }
        if username.starts_with(|c: char| c.is_ascii_digit()) {
            return Err(RuleViolation::UsernameLeadingDigit);
        }
        Ok(())
    }
}

// ============================================================================
// Password
// ============================================================================

/// Strength, reuse and expiry checks. Expiry is measured on the injected
/// clock.
pub struct PasswordRule {
    history: Vec<String>,
    last_change: Option<NaiveDateTime>,
    clock: Arc<dyn TimeProvider>,
}

impl PasswordRule {
    pub fn new(
        history: Vec<String>,
        last_change: Option<NaiveDateTime>,
        clock: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            history,
            last_change,
            clock,
        }
    }
}

impl ValidationRule<str> for PasswordRule {
    fn validate(&self, password: &str) -> Result<(), RuleViolation> {
        if password.is_empty() {
            return Err(RuleViolation::PasswordEmpty);
        }
        if password.chars().count() < 8 {
            return Err(RuleViolation::PasswordTooShort);
        }
        if !password.chars().any(char::is_uppercase) {
            return Err(RuleViolation::PasswordMissingUppercase);
        }
        if !password.chars().any(char::is_lowercase) {
            return Err(RuleViolation::PasswordMissingLowercase);
        }
        if !password.chars().any(|c| c.is_ascii_digit()) {
            return Err(RuleViolation::PasswordMissingDigit);
        }
        if !password.chars().any(|c| PASSWORD_SPECIAL_CHARS.contains(c)) {
            return Err(RuleViolation::PasswordMissingSpecial);
        }
        if self.history.iter().any(|old| old == password) {
            return Err(RuleViolation::PasswordReused);
        }
        if let Some(changed) = self.last_change {
            let days = (self.clock.now() - changed).num_days();
            if days > PASSWORD_MAX_AGE_DAYS {
                return Err(RuleViolation::PasswordExpired);
            }
        }
        Ok(())
    }
}

// ============================================================================
// Email
// ============================================================================

#[derive(Debug, Clone)]
pub struct EmailRule {
    valid_tlds: HashSet<String>,
}

impl EmailRule {
    pub fn new<I, S>(valid_tlds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            valid_tlds: valid_tlds.into_iter().map(Into::into).collect(),
        }
    }

    fn is_valid_domain(&self, domain: &str) -> bool {
        let Some((name, tld)) = domain.rsplit_once('.') else {
            return false;
        };
        self.valid_tlds.contains(&tld.to_lowercase()) && DOMAIN_NAME_REGEX.is_match(name)
    }
}

impl ValidationRule<str> for EmailRule {
    fn validate(&self, email: &str) -> Result<(), RuleViolation> {
        if email.is_empty() {
            return Err(RuleViolation::EmailEmpty);
        }
        if !EMAIL_REGEX.is_match(email) {
            return Err(RuleViolation::EmailFormat);
        }
        let domain = email.split('@').nth(1).unwrap_or_default();
        if !self.is_valid_domain(domain) {
            return Err(RuleViolation::EmailDomain);
        }
        Ok(())
    }
}

// ============================================================================
// Age
// ============================================================================

/// Accepts JSON integers only; `25.0` and `"25"` are not ages.
#[derive(Debug, Default, Clone, Copy)]
pub struct AgeRule;

impl ValidationRule<Value> for AgeRule {
    fn validate(&self, age: &Value) -> Result<(), RuleViolation> {
        let age = match age {
            Value::Number(n) if n.is_i64() || n.is_u64() => n.as_i64().unwrap_or(i64::MAX),
            _ => return Err(RuleViolation::AgeNotNumber),
        };
        if age <= 0 {
            return Err(RuleViolation::AgeNotPositive);
        }
        if age > 150 {
            return Err(RuleViolation::AgeOutOfRange);
        }
        Ok(())
    }
}

// ============================================================================
// Address
// ============================================================================

#[derive(Debug, Clone)]
pub struct AddressRule {
    valid_states: HashSet<String>,
    valid_countries: HashSet<String>,
}

impl AddressRule {
    pub fn new<S, C>(valid_states: S, valid_countries: C) -> Self
    where
        S: IntoIterator,
        S::Item: Into<String>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        Self {
            valid_states: valid_states.into_iter().map(Into::into).collect(),
            valid_countries: valid_countries.into_iter().map(Into::into).collect(),
        }
    }
}

fn text_field<'a>(address: &'a Value, field: &str) -> Option<&'a str> {
    address.get(field).and_then(Value::as_str)
}

impl ValidationRule<Value> for AddressRule {
    /// Every field must be present; each is then checked in turn. A field of
    /// the wrong JSON type fails that field's check.
    fn validate(&self, address: &Value) -> Result<(), RuleViolation> {
        let Some(fields) = address.as_object() else {
            return Err(RuleViolation::AddressMissingFields);
        };
        if !ADDRESS_FIELDS.iter().all(|f| fields.contains_key(*f)) {
            return Err(RuleViolation::AddressMissingFields);
        }

        match text_field(address, "street") {
            Some(street) if street.chars().count() >= 5 => {}
            _ => return Err(RuleViolation::AddressStreet),
        }
        match text_field(address, "city") {
            Some(city) if city.chars().count() >= 2 => {}
            _ => return Err(RuleViolation::AddressCity),
        }
        match text_field(address, "state") {
            Some(state) if self.valid_states.contains(&state.to_uppercase()) => {}
            _ => return Err(RuleViolation::AddressState),
        }
        match text_field(address, "zip_code") {
            Some(zip) if ZIP_CODE_REGEX.is_match(zip) => {}
            _ => return Err(RuleViolation::AddressZipCode),
        }
        match text_field(address, "country") {
            Some(country) if self.valid_countries.contains(country) => {}
            _ => return Err(RuleViolation::AddressCountry),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::FixedClock;
    use chrono::{NaiveDate, TimeDelta};
    use serde_json::json;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn password_rule(history: &[&str], days_since_change: i64) -> PasswordRule {
        PasswordRule::new(
            history.iter().map(|p| p.to_string()).collect(),
            Some(now() - TimeDelta::days(days_since_change)),
            Arc::new(FixedClock::new(now())),
        )
    }

    fn address(overrides: Value) -> Value {
        let mut address = json!({
            "street": "123 Main St",
            "city": "San Francisco",
            "state": "CA",
            "zip_code": "94105",
            "country": "USA"
        });
        if let (Some(base), Some(changes)) = (address.as_object_mut(), overrides.as_object()) {
            for (key, value) in changes {
                base.insert(key.clone(), value.clone());
            }
        }
        address
    }

    fn address_rule() -> AddressRule {
        AddressRule::new(["CA", "NY"], ["USA", "Canada"])
    }

    // =========================================================================
    // UsernameRule
    // =========================================================================

    #[test]
    fn test_valid_username() {
        assert_eq!(UsernameRule.validate("valid_user123"), Ok(()));
    }

    #[test]
    fn test_username_violations() {
        let too_long = "a".repeat(21);
        let cases = [
            ("", RuleViolation::UsernameEmpty),
            ("ab", RuleViolation::UsernameLength),
            (too_long.as_str(), RuleViolation::UsernameLength),
            ("user@name", RuleViolation::UsernameCharacters),
            ("1username", RuleViolation::UsernameLeadingDigit),
        ];
        for (username, expected) in cases {
            assert_eq!(
                UsernameRule.validate(username),
                Err(expected),
                "username {username:?}"
            );
        }
    }

    #[test]
    fn test_username_messages() {
        assert_eq!(
            UsernameRule.validate("user@name").unwrap_err().to_string(),
            "Username can only contain letters, numbers, and underscores"
        );
        assert_eq!(
            UsernameRule.validate("ab").unwrap_err().to_string(),
            "Username must be 3-20 characters"
        );
    }

    // =========================================================================
    // PasswordRule
    // =========================================================================

    #[test]
    fn test_valid_password() {
        let rule = password_rule(&["old_password123"], 30);
        assert_eq!(rule.validate("ValidPass123!"), Ok(()));
    }

    #[test]
    fn test_password_violations() {
        let rule = password_rule(&["Old_password123"], 30);
        let cases = [
            ("", RuleViolation::PasswordEmpty),
            ("Pass1!", RuleViolation::PasswordTooShort),
            ("password123!", RuleViolation::PasswordMissingUppercase),
            ("PASSWORD123!", RuleViolation::PasswordMissingLowercase),
            ("Password!", RuleViolation::PasswordMissingDigit),
            ("Password123", RuleViolation::PasswordMissingSpecial),
            ("Old_password123", RuleViolation::PasswordReused),
        ];
        for (password, expected) in cases {
            assert_eq!(rule.validate(password), Err(expected), "password {password:?}");
        }
    }

    #[test]
    fn test_password_expired() {
        let rule = password_rule(&[], 91);
        assert_eq!(
            rule.validate("ValidPass123!").unwrap_err().to_string(),
            "Password must be changed every 90 days"
        );
    }

    #[test]
    fn test_password_at_ninety_days_is_still_valid() {
        assert_eq!(password_rule(&[], 90).validate("ValidPass123!"), Ok(()));
    }

    #[test]
    fn test_password_without_change_date_never_expires() {
        let rule = PasswordRule::new(Vec::new(), None, Arc::new(FixedClock::new(now())));
        assert_eq!(rule.validate("ValidPass123!"), Ok(()));
    }

    // =========================================================================
    // EmailRule
    // =========================================================================

    #[test]
    fn test_email_rule() {
        let rule = EmailRule::new(["com", "org", "net"]);

        assert_eq!(rule.validate("user@example.com"), Ok(()));
        assert_eq!(rule.validate("user@mail.example.ORG"), Ok(()));
        assert_eq!(rule.validate(""), Err(RuleViolation::EmailEmpty));
        assert_eq!(rule.validate("invalid-email"), Err(RuleViolation::EmailFormat));
        assert_eq!(
            rule.validate("user@example.invalid").unwrap_err().to_string(),
            "Invalid domain"
        );
    }

    #[test]
    fn test_email_rejects_malformed_domain_labels() {
        let rule = EmailRule::new(["com"]);
        assert_eq!(rule.validate("user@example..com"), Err(RuleViolation::EmailDomain));
    }

    // =========================================================================
    // AgeRule
    // =========================================================================

    #[test]
    fn test_age_rule() {
        assert_eq!(AgeRule.validate(&json!(25)), Ok(()));
        assert_eq!(AgeRule.validate(&json!(150)), Ok(()));
        assert_eq!(AgeRule.validate(&json!("25")), Err(RuleViolation::AgeNotNumber));
        assert_eq!(AgeRule.validate(&json!(25.5)), Err(RuleViolation::AgeNotNumber));
        assert_eq!(AgeRule.validate(&json!(-1)), Err(RuleViolation::AgeNotPositive));
        assert_eq!(AgeRule.validate(&json!(0)), Err(RuleViolation::AgeNotPositive));
        assert_eq!(
            AgeRule.validate(&json!(151)).unwrap_err().to_string(),
            "Age must be between 0 and 150"
        );
    }

    #[test]
    fn test_age_rule_huge_unsigned_is_out_of_range() {
        assert_eq!(
            AgeRule.validate(&json!(u64::MAX)),
            Err(RuleViolation::AgeOutOfRange)
        );
    }

    // =========================================================================
    // AddressRule
    // =========================================================================

    #[test]
    fn test_valid_address() {
        assert_eq!(address_rule().validate(&address(json!({}))), Ok(()));
        assert_eq!(
            address_rule().validate(&address(json!({"state": "ny", "zip_code": "10001-1234"}))),
            Ok(())
        );
    }

    #[test]
    fn test_missing_fields() {
        let partial = json!({"street": "123 Main St", "city": "San Francisco"});
        assert_eq!(
            address_rule().validate(&partial),
            Err(RuleViolation::AddressMissingFields)
        );
        assert_eq!(
            address_rule().validate(&json!("123 Main St")),
            Err(RuleViolation::AddressMissingFields)
        );
    }

    #[test]
    fn test_address_field_violations() {
        let cases = [
            (json!({"street": "123"}), "Invalid street address"),
            (json!({"city": "S"}), "Invalid city"),
            (json!({"state": "INVALID"}), "Invalid state"),
            (json!({"zip_code": "invalid"}), "Invalid zip code"),
            (json!({"country": "Invalid"}), "Invalid country"),
            (json!({"street": 12345}), "Invalid street address"),
        ];
        for (overrides, expected) in cases {
            let err = address_rule()
                .validate(&address(overrides.clone()))
                .unwrap_err();
            assert_eq!(err.to_string(), expected, "overrides {overrides}");
        }
    }
}
