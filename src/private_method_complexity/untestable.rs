use chrono::{Local, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static USERNAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_]+$").expect("USERNAME is invalid"));
static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("EMAIL is invalid")
});
static DOMAIN_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9-]+(\.[a-zA-Z0-9-]+)*$").expect("DOMAIN_NAME is invalid"));
static ZIP_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{5}(-\d{4})?$").expect("ZIP_CODE is invalid"));

/// All rules are private helpers. Callers only ever learn which field
/// failed, never which rule.
#[derive(Debug, Default)]
pub struct UserValidator {
    password_history: Vec<String>,
    last_password_change: Option<NaiveDateTime>,
}

impl UserValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn validate_user(&self, user: &Value) -> (bool, Option<String>) {
        let text = |name: &str| user[name].as_str().unwrap_or_default();
        let fail = |message: &str| (false, Some(message.to_string()));

        if !self.validate_username(text("username")) {
            return fail("Invalid username format");
        }
        if !self.validate_password(text("password")) {
            return fail("Password does not meet requirements");
        }
        if !self.validate_email(text("email")) {
            return fail("Invalid email format");
        }
        if !self.validate_age(user.get("age").unwrap_or(&Value::from(0))) {
            return fail("Invalid age");
        }
        if !self.validate_address(&user["address"]) {
            return fail("Invalid address");
        }
        (true, None)
    }

    fn validate_username(&self, username: &str) -> bool {
        !username.is_empty()
            && (3..=20).contains(&username.chars().count())
            && USERNAME.is_match(username)
            && !username.starts_with(|c: char| c.is_ascii_digit())
    }

    fn validate_password(&self, password: &str) -> bool {
        if password.chars().count() < 8
            || !password.chars().any(char::is_uppercase)
            || !password.chars().any(char::is_lowercase)
            || !password.chars().any(|c| c.is_ascii_digit())
            || !password.chars().any(|c| "!@#$%^&*()_+-=[]{}|;:,.<>?".contains(c))
        {
            return false;
        }
        if self.password_history.iter().any(|old| old == password) {
            return false;
        }
        match self.last_password_change {
            Some(changed) => (Local::now().naive_local() - changed).num_days() <= 90,
            None => true,
        }
    }

    fn validate_email(&self, email: &str) -> bool {
        if !EMAIL.is_match(email) {
            return false;
        }
        let domain = email.split('@').nth(1).unwrap_or_default();
        self.is_valid_domain(domain)
    }

    fn is_valid_domain(&self, domain: &str) -> bool {
        let Some((name, tld)) = domain.rsplit_once('.') else {
            return false;
        };
        ["com", "org", "net", "edu", "gov", "io"].contains(&tld.to_lowercase().as_str())
            && DOMAIN_NAME.is_match(name)
    }

    fn validate_age(&self, age: &Value) -> bool {
        match age.as_i64() {
            Some(age) => age > 0 && age <= 150,
            None => false,
        }
    }

    fn validate_address(&self, address: &Value) -> bool {
        let field = |name: &str| address.get(name).and_then(Value::as_str);
        let (Some(street), Some(city), Some(state), Some(zip), Some(country)) = (
            field("street"),
            field("city"),
            field("state"),
            field("zip_code"),
            field("country"),
        ) else {
            return false;
        };
        street.chars().count() >= 5
            && city.chars().count() >= 2
            && super::validator::US_STATES.contains(&state.to_uppercase().as_str())
            && ZIP_CODE.is_match(zip)
            && super::validator::DEFAULT_COUNTRIES.contains(&country)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // Only the public entry point is reachable, so each case has to build a
    // whole user and can only observe the generic message.

    #[test]
    fn test_generic_messages_hide_the_failing_rule() {
        let validator = UserValidator::new();
        let user = json!({
            "username": "test_user",
            "password": "short",
            "email": "test@example.com",
            "age": 25,
            "address": {}
        });

        assert_eq!(
            validator.validate_user(&user),
            (false, Some("Password does not meet requirements".to_string()))
        );
    }
}
