use crate::error::Result;
use crate::providers::TimeProvider;
use chrono::NaiveDateTime;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A stored user. `created_at` is written as an ISO-8601 timestamp or null.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserData {
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
}

impl UserData {
    pub fn new(username: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            created_at: None,
        }
    }

    pub fn to_json(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn from_json(value: Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }
}

// ============================================================================
// Storage
// ============================================================================

/// Keyed JSON record store.
pub trait Storage: Send + Sync {
    fn save(&self, key: &str, data: &Value) -> Result<()>;
    fn load(&self, key: &str) -> Result<Option<Value>>;
    /// Returns whether a record was removed.
    fn delete(&self, key: &str) -> Result<bool>;
    fn exists(&self, key: &str) -> bool;
}

/// One `{key}.json` file per record under a directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    data_dir: PathBuf,
}

impl FileStorage {
    /// Creates `data_dir` if needed. This is the only place the directory is
    /// touched outside of the trait methods.
    pub fn open(data_dir: impl Into<PathBuf>) -> Result<Self> {
        let data_dir = data_dir.into();
        fs::create_dir_all(&data_dir)?;
        Ok(Self { data_dir })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.data_dir.join(format!("{key}.json"))
    }
}

impl Storage for FileStorage {
    fn save(&self, key: &str, data: &Value) -> Result<()> {
        fs::write(self.path_for(key), serde_json::to_vec(data)?)?;
        Ok(())
    }

    fn load(&self, key: &str) -> Result<Option<Value>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&contents)?))
    }

    fn delete(&self, key: &str) -> Result<bool> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(path)?;
        Ok(true)
    }

    fn exists(&self, key: &str) -> bool {
        self.path_for(key).exists()
    }
}

#[derive(Debug, Default)]
pub struct MemoryStorage {
    records: Mutex<HashMap<String, Value>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl Storage for MemoryStorage {
    fn save(&self, key: &str, data: &Value) -> Result<()> {
        self.records.lock().insert(key.to_string(), data.clone());
        Ok(())
    }

    fn load(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.records.lock().get(key).cloned())
    }

    fn delete(&self, key: &str) -> Result<bool> {
        Ok(self.records.lock().remove(key).is_some())
    }

    fn exists(&self, key: &str) -> bool {
        self.records.lock().contains_key(key)
    }
}

// ============================================================================
// Event log
// ============================================================================

pub trait EventLog: Send + Sync {
    fn info(&self, message: &str);
    fn warning(&self, message: &str);
}

/// Forwards to `tracing` under the `user_events` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventLog;

impl EventLog for TracingEventLog {
    fn info(&self, message: &str) {
        tracing::info!(target: "user_events", "{message}");
    }

    fn warning(&self, message: &str) {
        tracing::warn!(target: "user_events", "{message}");
    }
}

// ============================================================================
// Manager and validator
// ============================================================================

pub struct UserManager {
    storage: Arc<dyn Storage>,
    log: Arc<dyn EventLog>,
    clock: Arc<dyn TimeProvider>,
}

impl UserManager {
    pub fn new(
        storage: Arc<dyn Storage>,
        log: Arc<dyn EventLog>,
        clock: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            storage,
            log,
            clock,
        }
    }

    /// Stamps `created_at` and stores the user under its username.
    pub fn create_user(&self, mut user: UserData) -> Result<UserData> {
        self.log.info(&format!("Creating user: {}", user.username));
        user.created_at = Some(self.clock.now());
        self.storage.save(&user.username, &user.to_json()?)?;
        Ok(user)
    }

    pub fn get_user(&self, username: &str) -> Result<Option<UserData>> {
        self.log.info(&format!("Fetching user: {username}"));
        self.storage
            .load(username)?
            .map(UserData::from_json)
            .transpose()
    }

    pub fn delete_user(&self, username: &str) -> Result<bool> {
        self.log.info(&format!("Deleting user: {username}"));
        self.storage.delete(username)
    }
}

pub struct UserValidator {
    log: Arc<dyn EventLog>,
}

impl UserValidator {
    pub fn new(log: Arc<dyn EventLog>) -> Self {
        Self { log }
    }

    /// Collects every problem with `user` rather than stopping at the first.
    pub fn validate_user(&self, user: &UserData) -> std::result::Result<(), Vec<String>> {
        self.log
            .info(&format!("Validating user: {}", user.username));

        let mut errors = Vec::new();
        if user.username.is_empty() {
            errors.push("Username is required".to_string());
        }
        if user.email.is_empty() {
            errors.push("Email is required".to_string());
        } else if !user.email.contains('@') {
            errors.push("Invalid email format".to_string());
        }

        if errors.is_empty() {
            self.log.info("Validation successful");
            Ok(())
        } else {
            self.log.warning(&format!("Validation failed: {errors:?}"));
            Err(errors)
        }
    }
}
