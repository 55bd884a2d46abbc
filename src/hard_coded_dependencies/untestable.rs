use crate::error::Result;
use reqwest::blocking::Client;
use serde_json::Value;

/// Talks to the production API through a client it builds itself. There is
/// no seam to substitute a fake, so every test would hit the network.
pub struct UserService {
    session: Client,
}

impl UserService {
    pub fn new() -> Self {
        Self {
            session: Client::new(),
        }
    }

    pub fn get_user(&self, user_id: i64) -> Result<Option<Value>> {
        let response = self
            .session
            .get(format!("https://api.example.com/users/{user_id}"))
            .send()?;
        if response.status().as_u16() == 200 {
            return Ok(Some(response.json()?));
        }
        Ok(None)
    }

    pub fn create_user(&self, user_data: &Value) -> Result<Option<Value>> {
        let response = self
            .session
            .post("https://api.example.com/users")
            .json(user_data)
            .send()?;
        if response.status().as_u16() == 201 {
            return Ok(Some(response.json()?));
        }
        Ok(None)
    }
}

impl Default for UserService {
    fn default() -> Self {
        Self::new()
    }
}
