use std::collections::BTreeMap;
use std::env;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use super::{DocumentStore, StoreError};

/// Firebase Realtime Database client speaking the REST surface: every node is
/// addressable as `{base}/{path}.json`, `POST` generates a chronologically
/// ordered child key, and shallow queries run via `orderBy` / `equalTo`.
pub struct FirebaseRtdb {
    client: Client,
    base_url: String,
    auth_token: Option<String>,
}

impl FirebaseRtdb {
    pub fn new(base_url: String, auth_token: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_token,
        }
    }

    pub fn from_env() -> Self {
        let base_url = env::var("FIREBASE_DATABASE_URL").expect("FIREBASE_DATABASE_URL must be set");
        let auth_token = env::var("FIREBASE_DATABASE_SECRET").ok();
        Self::new(base_url, auth_token)
    }

    fn node_url(&self, path: &str) -> String {
        format!("{}/{}.json", self.base_url, path.trim_matches('/'))
    }

    fn auth_query(&self) -> Vec<(String, String)> {
        match &self.auth_token {
            Some(token) => vec![("auth".to_string(), token.clone())],
            None => vec![],
        }
    }

    async fn parse_body(response: reqwest::Response) -> Result<Value, StoreError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Backend {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl DocumentStore for FirebaseRtdb {
    async fn read(&self, path: &str) -> Result<Option<Value>, StoreError> {
        let response = self
            .client
            .get(self.node_url(path))
            .query(&self.auth_query())
            .send()
            .await?;

        let body = Self::parse_body(response).await?;
        Ok(if body.is_null() { None } else { Some(body) })
    }

    async fn write(&self, path: &str, value: Value) -> Result<(), StoreError> {
        if value.is_null() {
            // PUT null and DELETE are equivalent; DELETE is the clearer intent.
            let response = self
                .client
                .delete(self.node_url(path))
                .query(&self.auth_query())
                .send()
                .await?;
            Self::parse_body(response).await?;
            return Ok(());
        }

        let response = self
            .client
            .put(self.node_url(path))
            .query(&self.auth_query())
            .json(&value)
            .send()
            .await?;
        Self::parse_body(response).await?;
        Ok(())
    }

    async fn update(&self, path: &str, fields: Value) -> Result<(), StoreError> {
        let response = self
            .client
            .patch(self.node_url(path))
            .query(&self.auth_query())
            .json(&fields)
            .send()
            .await?;
        Self::parse_body(response).await?;
        Ok(())
    }

    async fn push(&self, parent_path: &str, value: Value) -> Result<String, StoreError> {
        let response = self
            .client
            .post(self.node_url(parent_path))
            .query(&self.auth_query())
            .json(&value)
            .send()
            .await?;

        let body = Self::parse_body(response).await?;
        body["name"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| StoreError::Malformed {
                path: parent_path.to_string(),
                reason: "push response missing generated key".to_string(),
            })
    }

    async fn query_children_equal(
        &self,
        path: &str,
        field: &str,
        value: Value,
        limit: Option<usize>,
    ) -> Result<BTreeMap<String, Value>, StoreError> {
        let mut query = self.auth_query();
        // orderBy and equalTo both take JSON-encoded values on the wire.
        query.push(("orderBy".to_string(), format!("\"{}\"", field)));
        query.push(("equalTo".to_string(), value.to_string()));
        if let Some(limit) = limit {
            query.push(("limitToLast".to_string(), limit.to_string()));
        }

        let response = self
            .client
            .get(self.node_url(path))
            .query(&query)
            .send()
            .await?;

        let body = Self::parse_body(response).await?;
        match body {
            Value::Null => Ok(BTreeMap::new()),
            Value::Object(children) => Ok(children.into_iter().collect()),
            other => Err(StoreError::Malformed {
                path: path.to_string(),
                reason: format!("expected an object of children, got {}", other),
            }),
        }
    }
}
