use crate::error::Result;
use reqwest::blocking::Client;
use serde_json::Value;
use std::sync::Arc;

pub const DEFAULT_BASE_URL: &str = "https://api.example.com";

/// Status and decoded JSON body of a completed request.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Value,
}

impl HttpResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    pub fn json(&self) -> &Value {
        &self.body
    }
}

/// Minimal HTTP surface the user service depends on.
pub trait HttpSession: Send + Sync {
    fn get(&self, url: &str) -> Result<HttpResponse>;
    fn post(&self, url: &str, json: &Value) -> Result<HttpResponse>;
}

/// Blocking `reqwest` session.
#[derive(Debug, Clone, Default)]
pub struct ReqwestSession {
    client: Client,
}

impl ReqwestSession {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn into_response(response: reqwest::blocking::Response) -> Result<HttpResponse> {
        let status = response.status().as_u16();
        let text = response.text()?;
        let body = match serde_json::from_str(&text) {
            Ok(body) => body,
            Err(error) if (200..300).contains(&status) => return Err(error.into()),
            // Error pages are frequently not JSON; keep the status and drop the body.
            Err(_) => Value::Null,
        };
        Ok(HttpResponse { status, body })
    }
}

impl HttpSession for ReqwestSession {
    fn get(&self, url: &str) -> Result<HttpResponse> {
        let response = self.client.get(url).send()?;
        Self::into_response(response)
    }

    fn post(&self, url: &str, json: &Value) -> Result<HttpResponse> {
        let response = self.client.post(url).json(json).send()?;
        Self::into_response(response)
    }
}

/// Remote user directory client with an injected session.
pub struct UserService {
    session: Arc<dyn HttpSession>,
    base_url: String,
}

impl Default for UserService {
    fn default() -> Self {
        Self::new(Arc::new(ReqwestSession::default()))
    }
}

impl UserService {
    pub fn new(session: Arc<dyn HttpSession>) -> Self {
        Self {
            session,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the user document on `200 OK`, `None` on any other status.
    pub fn get_user(&self, user_id: i64) -> Result<Option<Value>> {
        let url = format!("{}/users/{}", self.base_url, user_id);
        let response = self.session.get(&url)?;
        tracing::debug!(url = %url, status = response.status, "fetched user");
        if response.status == 200 {
            Ok(Some(response.body))
        } else {
            Ok(None)
        }
    }

    /// Returns the created user on `201 Created`, `None` on any other status.
    pub fn create_user(&self, user_data: &Value) -> Result<Option<Value>> {
        let url = format!("{}/users", self.base_url);
        let response = self.session.post(&url, user_data)?;
        tracing::debug!(url = %url, status = response.status, "created user");
        if response.status == 201 {
            Ok(Some(response.body))
        } else {
            Ok(None)
        }
    }
}
