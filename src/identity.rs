use std::env;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("email already registered")]
    EmailTaken,
    #[error("identity request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("identity provider error: {0}")]
    Backend(String),
}

#[derive(Debug, Clone)]
pub struct VerifiedUser {
    pub uid: String,
    pub email: String,
}

/// Hosted identity service. Owns account creation and credential checks;
/// everything else about a user lives in the document store.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn create_user(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<String, IdentityError>;

    async fn verify_password(&self, email: &str, password: &str)
        -> Result<VerifiedUser, IdentityError>;
}

/// Firebase Auth via the Identity Toolkit REST API.
pub struct FirebaseAuth {
    client: Client,
    api_key: String,
}

impl FirebaseAuth {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
        }
    }

    pub fn from_env() -> Self {
        let api_key = env::var("FIREBASE_WEB_API_KEY").expect("FIREBASE_WEB_API_KEY must be set");
        Self::new(api_key)
    }

    fn endpoint(&self, action: &str) -> String {
        format!(
            "https://identitytoolkit.googleapis.com/v1/accounts:{}?key={}",
            action, self.api_key
        )
    }

    async fn call(&self, action: &str, body: Value) -> Result<Value, IdentityError> {
        let response = self
            .client
            .post(self.endpoint(action))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let payload: Value = response.json().await?;
        if status.is_success() {
            return Ok(payload);
        }

        let message = payload["error"]["message"].as_str().unwrap_or_default();
        match message {
            "EMAIL_EXISTS" => Err(IdentityError::EmailTaken),
            "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" => {
                Err(IdentityError::InvalidCredentials)
            }
            other => Err(IdentityError::Backend(other.to_string())),
        }
    }
}

#[async_trait]
impl IdentityProvider for FirebaseAuth {
    async fn create_user(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<String, IdentityError> {
        let payload = self
            .call(
                "signUp",
                json!({
                    "email": email,
                    "password": password,
                    "displayName": display_name,
                    "returnSecureToken": true,
                }),
            )
            .await?;

        payload["localId"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| IdentityError::Backend("signUp response missing localId".to_string()))
    }

    async fn verify_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<VerifiedUser, IdentityError> {
        let payload = self
            .call(
                "signInWithPassword",
                json!({
                    "email": email,
                    "password": password,
                    "returnSecureToken": true,
                }),
            )
            .await?;

        let uid = payload["localId"]
            .as_str()
            .ok_or_else(|| IdentityError::Backend("signIn response missing localId".to_string()))?;
        let email = payload["email"].as_str().unwrap_or(email);

        Ok(VerifiedUser {
            uid: uid.to_string(),
            email: email.to_string(),
        })
    }
}
