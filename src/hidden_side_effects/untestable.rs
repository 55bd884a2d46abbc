use crate::error::Result;
use chrono::Local;
use serde_json::{Value, json};
use std::fs;
use std::path::{Path, PathBuf};

const DATA_DIR: &str = "user_data";

/// Creates `user_data/` and a `users.json` metadata file on construction and
/// rewrites that file after every create or delete.
pub struct UserManager {
    data_dir: PathBuf,
}

impl UserManager {
    pub fn new() -> Result<Self> {
        let data_dir = PathBuf::from(DATA_DIR);
        fs::create_dir_all(&data_dir)?;
        let manager = Self { data_dir };
        manager.write_metadata(&json!({ "last_updated": Local::now().to_string() }))?;
        Ok(manager)
    }

    fn metadata_path(&self) -> PathBuf {
        self.data_dir.join("users.json")
    }

    fn user_path(&self, username: &str) -> PathBuf {
        self.data_dir.join(format!("{username}.json"))
    }

    fn write_metadata(&self, metadata: &Value) -> Result<()> {
        fs::write(self.metadata_path(), serde_json::to_vec(metadata)?)?;
        Ok(())
    }

    fn update_metadata(&self) -> Result<()> {
        let mut metadata: Value = serde_json::from_str(&fs::read_to_string(self.metadata_path())?)?;
        metadata["last_updated"] = Value::String(Local::now().to_string());
        self.write_metadata(&metadata)
    }

    pub fn create_user(&self, user_data: &Value) -> Result<Value> {
        let username = user_data["username"].as_str().unwrap_or_default();
        tracing::info!("Creating user: {username}");
        fs::write(self.user_path(username), serde_json::to_vec(user_data)?)?;
        self.update_metadata()?;
        Ok(user_data.clone())
    }

    pub fn get_user(&self, username: &str) -> Result<Option<Value>> {
        tracing::info!("Fetching user: {username}");
        let path = self.user_path(username);
        if !Path::new(&path).exists() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&fs::read_to_string(path)?)?))
    }

    pub fn delete_user(&self, username: &str) -> Result<bool> {
        tracing::info!("Deleting user: {username}");
        let path = self.user_path(username);
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(path)?;
        self.update_metadata()?;
        Ok(true)
    }
}

/// Logs straight to the global subscriber.
#[derive(Debug, Default)]
pub struct UserValidator;

impl UserValidator {
    pub fn validate_user(&self, user_data: &Value) -> (bool, Vec<String>) {
        let username = user_data["username"].as_str().unwrap_or_default();
        let email = user_data["email"].as_str().unwrap_or_default();
        tracing::info!("Validating user: {username}");

        let mut errors = Vec::new();
        if username.is_empty() {
            errors.push("Username is required".to_string());
        }
        if email.is_empty() {
            errors.push("Email is required".to_string());
        } else if !email.contains('@') {
            errors.push("Invalid email format".to_string());
        }

        if errors.is_empty() {
            tracing::info!("Validation successful");
        } else {
            tracing::warn!("Validation failed: {errors:?}");
        }
        (errors.is_empty(), errors)
    }
}
