use super::rules::{
    AddressRule, AgeRule, EmailRule, PasswordRule, RuleViolation, UsernameRule, ValidationRule,
};
use crate::providers::TimeProvider;
use chrono::NaiveDateTime;
use serde_json::{Map, Value};
use std::sync::Arc;

pub const DEFAULT_TLDS: [&str; 6] = ["com", "org", "net", "edu", "gov", "io"];

pub const US_STATES: [&str; 50] = [
    "AL", "AK", "AZ", "AR", "CA", "CO", "CT", "DE", "FL", "GA", "HI", "ID", "IL", "IN", "IA",
    "KS", "KY", "LA", "ME", "MD", "MA", "MI", "MN", "MS", "MO", "MT", "NE", "NV", "NH", "NJ",
    "NM", "NY", "NC", "ND", "OH", "OK", "OR", "PA", "RI", "SC", "SD", "TN", "TX", "UT", "VT",
    "VA", "WA", "WV", "WI", "WY",
];

pub const DEFAULT_COUNTRIES: [&str; 6] = ["USA", "Canada", "Mexico", "UK", "France", "Germany"];

/// Runs the username, password, email, age and address rules, in that order,
/// over a JSON user document and stops at the first violation.
pub struct UserValidator {
    username: Arc<dyn ValidationRule<str>>,
    password: Arc<dyn ValidationRule<str>>,
    email: Arc<dyn ValidationRule<str>>,
    age: Arc<dyn ValidationRule<Value>>,
    address: Arc<dyn ValidationRule<Value>>,
}

impl UserValidator {
    pub fn new(
        username: Arc<dyn ValidationRule<str>>,
        password: Arc<dyn ValidationRule<str>>,
        email: Arc<dyn ValidationRule<str>>,
        age: Arc<dyn ValidationRule<Value>>,
        address: Arc<dyn ValidationRule<Value>>,
    ) -> Self {
        Self {
            username,
            password,
            email,
            age,
            address,
        }
    }

    /// Missing text fields are validated as `""`, a missing age as `0` and a
    /// missing address as `{}`. Text fields holding a non-string value are
    /// treated as empty.
    pub fn validate_user(&self, user: &Value) -> Result<(), RuleViolation> {
        let Some(fields) = user.as_object() else {
            return Err(RuleViolation::Other(
                "User data must be a JSON object".to_string(),
            ));
        };
        let text = |name: &str| fields.get(name).and_then(Value::as_str).unwrap_or_default();

        self.username.validate(text("username"))?;
        self.password.validate(text("password"))?;
        self.email.validate(text("email"))?;

        let zero = Value::from(0);
        self.age.validate(fields.get("age").unwrap_or(&zero))?;

        let empty = Value::Object(Map::new());
        self.address
            .validate(fields.get("address").unwrap_or(&empty))?;
        Ok(())
    }
}

/// Validator with the stock rule set: the common TLDs, the 50 US state codes
/// and six supported countries.
pub fn create_user_validator(
    password_history: Vec<String>,
    last_password_change: Option<NaiveDateTime>,
    clock: Arc<dyn TimeProvider>,
) -> UserValidator {
    UserValidator::new(
        Arc::new(UsernameRule),
        Arc::new(PasswordRule::new(
            password_history,
            last_password_change,
            clock,
        )),
        Arc::new(EmailRule::new(DEFAULT_TLDS)),
        Arc::new(AgeRule),
        Arc::new(AddressRule::new(US_STATES, DEFAULT_COUNTRIES)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::FixedClock;
    use chrono::{NaiveDate, TimeDelta};
    use parking_lot::Mutex;
    use serde_json::json;

    type CallLog = Arc<Mutex<Vec<(&'static str, Value)>>>;

    /// Records what it was asked to validate and answers with a fixed result.
    struct ScriptedRule {
        name: &'static str,
        result: Result<(), RuleViolation>,
        calls: CallLog,
    }

    impl ValidationRule<str> for ScriptedRule {
        fn validate(&self, value: &str) -> Result<(), RuleViolation> {
            self.calls.lock().push((self.name, Value::from(value)));
            self.result.clone()
        }
    }

    impl ValidationRule<Value> for ScriptedRule {
        fn validate(&self, value: &Value) -> Result<(), RuleViolation> {
            self.calls.lock().push((self.name, value.clone()));
            self.result.clone()
        }
    }

    fn scripted(
        calls: &CallLog,
        failing: Option<(&'static str, RuleViolation)>,
    ) -> UserValidator {
        let rule = |name: &'static str| {
            let result = match &failing {
                Some((failing_name, violation)) if *failing_name == name => Err(violation.clone()),
                _ => Ok(()),
            };
            Arc::new(ScriptedRule {
                name,
                result,
                calls: calls.clone(),
            })
        };
        UserValidator::new(
            rule("username"),
            rule("password"),
            rule("email"),
            rule("age"),
            rule("address"),
        )
    }

    fn user_data() -> Value {
        json!({
            "username": "test_user",
            "password": "TestPass123!",
            "email": "test@example.com",
            "age": 25,
            "address": {
                "street": "123 Main St",
                "city": "San Francisco",
                "state": "CA",
                "zip_code": "94105",
                "country": "USA"
            }
        })
    }

    #[test]
    fn test_valid_user_calls_every_rule_in_order() {
        let calls = CallLog::default();
        let validator = scripted(&calls, None);

        assert_eq!(validator.validate_user(&user_data()), Ok(()));

        let user = user_data();
        assert_eq!(
            *calls.lock(),
            vec![
                ("username", json!("test_user")),
                ("password", json!("TestPass123!")),
                ("email", json!("test@example.com")),
                ("age", json!(25)),
                ("address", user["address"].clone()),
            ]
        );
    }

    #[test]
    fn test_invalid_username_stops_validation() {
        let calls = CallLog::default();
        let validator = scripted(
            &calls,
            Some(("username", RuleViolation::Other("Invalid username".to_string()))),
        );

        let err = validator.validate_user(&user_data()).unwrap_err();

        assert_eq!(err.to_string(), "Invalid username");
        assert_eq!(calls.lock().len(), 1, "only the username rule may run");
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let calls = CallLog::default();
        let validator = scripted(&calls, None);

        validator.validate_user(&json!({})).unwrap();

        let recorded: Vec<Value> = calls.lock().iter().map(|(_, v)| v.clone()).collect();
        assert_eq!(recorded, vec![json!(""), json!(""), json!(""), json!(0), json!({})]);
    }

    #[test]
    fn test_non_object_document_is_reported() {
        let calls = CallLog::default();
        let validator = scripted(&calls, None);

        let err = validator.validate_user(&json!(["not", "a", "user"])).unwrap_err();

        assert_eq!(err.to_string(), "User data must be a JSON object");
        assert!(calls.lock().is_empty());
    }

    // =========================================================================
    // Default rule set
    // =========================================================================

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_create_user_validator_accepts_valid_user() {
        let validator = create_user_validator(
            vec!["old_password123".to_string()],
            Some(now() - TimeDelta::days(30)),
            Arc::new(FixedClock::new(now())),
        );
        assert_eq!(validator.validate_user(&user_data()), Ok(()));
    }

    #[test]
    fn test_create_user_validator_reports_first_violation() {
        let validator =
            create_user_validator(Vec::new(), None, Arc::new(FixedClock::new(now())));
        let mut user = user_data();
        user["email"] = json!("someone@example.xyz");
        user["age"] = json!(200);

        assert_eq!(validator.validate_user(&user), Err(RuleViolation::EmailDomain));
    }

    #[test]
    fn test_create_user_validator_country_set() {
        let validator =
            create_user_validator(Vec::new(), None, Arc::new(FixedClock::new(now())));
        let mut user = user_data();
        user["address"]["country"] = json!("Spain");

        assert_eq!(
            validator.validate_user(&user).unwrap_err().to_string(),
            "Invalid country"
        );
    }
}
