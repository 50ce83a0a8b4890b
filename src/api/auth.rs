use std::sync::Arc;

use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use tracing::error;

use crate::api::middleware::{AuthKeys, Claims};
use crate::identity::{IdentityError, IdentityProvider};
use crate::records::{self, UserRecord};
use crate::store::DocumentStore;

#[derive(serde::Deserialize)]
pub struct RegisterRequest {
    email: String,
    password: String,
    name: String,
    phone: String,
}

pub async fn register(
    Extension(identity): Extension<Arc<dyn IdentityProvider>>,
    Extension(store): Extension<Arc<dyn DocumentStore>>,
    Extension(keys): Extension<AuthKeys>,
    Json(payload): Json<RegisterRequest>,
) -> Response {
    let uid = match identity
        .create_user(&payload.email, &payload.password, &payload.name)
        .await
    {
        Ok(uid) => uid,
        // The original treats every signUp failure alike: 400 with the
        // provider's message.
        Err(e) => {
            error!("Failed to create identity: {}", e);
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"success": false, "error": e.to_string()})),
            )
                .into_response();
        }
    };

    let profile = UserRecord {
        name: payload.name.clone(),
        email: payload.email.clone(),
        phone: payload.phone,
        created_at: records::now_millis(),
        role: "user".to_string(),
    };
    if let Err(e) = store
        .write(&format!("users/{}", uid), json!(profile))
        .await
    {
        error!("Failed to write user profile: {}", e);
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"success": false, "error": e.to_string()})),
        )
            .into_response();
    }

    let token = match keys.issue_token(&uid, &payload.email) {
        Ok(token) => token,
        Err(e) => {
            error!("Failed to sign token: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"success": false, "error": "Failed to issue token"})),
            )
                .into_response();
        }
    };

    tracing::Span::current()
        .record("user_id", uid.as_str())
        .record("user_email", payload.email.as_str())
        .record("business_event", "User registered successfully");
    crate::metrics::increment_users_registered();

    (
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "user": {"uid": uid, "email": payload.email, "name": payload.name},
            "token": token,
        })),
    )
        .into_response()
}

#[derive(serde::Deserialize)]
pub struct LoginRequest {
    email: String,
    password: String,
}

pub async fn login(
    Extension(identity): Extension<Arc<dyn IdentityProvider>>,
    Extension(store): Extension<Arc<dyn DocumentStore>>,
    Extension(keys): Extension<AuthKeys>,
    Json(payload): Json<LoginRequest>,
) -> Response {
    let verified = match identity
        .verify_password(&payload.email, &payload.password)
        .await
    {
        Ok(v) => v,
        Err(IdentityError::InvalidCredentials) => {
            tracing::Span::current().record("error", "invalid_credentials");
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({"success": false, "error": "Invalid credentials"})),
            )
                .into_response();
        }
        Err(e) => {
            error!("Identity lookup failed: {}", e);
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({"success": false, "error": "Invalid credentials"})),
            )
                .into_response();
        }
    };

    let user_path = format!("users/{}", verified.uid);
    let profile: Option<UserRecord> = match store.read(&user_path).await {
        Ok(Some(snapshot)) => match records::from_snapshot(&user_path, snapshot) {
            Ok(profile) => Some(profile),
            Err(e) => {
                error!("Rejecting malformed user document: {}", e);
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({"success": false, "error": e.to_string()})),
                )
                    .into_response();
            }
        },
        Ok(None) => None,
        Err(e) => {
            error!("Failed to read user profile: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"success": false, "error": e.to_string()})),
            )
                .into_response();
        }
    };

    let token = match keys.issue_token(&verified.uid, &verified.email) {
        Ok(token) => token,
        Err(e) => {
            error!("Failed to sign token: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"success": false, "error": "Failed to issue token"})),
            )
                .into_response();
        }
    };

    tracing::Span::current()
        .record("user_id", verified.uid.as_str())
        .record("user_email", verified.email.as_str())
        .record("business_event", "User logged in successfully");

    (
        StatusCode::OK,
        Json(json!({
            "success": true,
            "user": {
                "uid": verified.uid,
                "email": verified.email,
                "name": profile.map(|p| p.name),
            },
            "token": token,
        })),
    )
        .into_response()
}

pub async fn profile(
    Extension(store): Extension<Arc<dyn DocumentStore>>,
    Extension(claims): Extension<Claims>,
) -> Response {
    match store.read(&format!("users/{}", claims.uid)).await {
        Ok(snapshot) => (
            StatusCode::OK,
            Json(json!({"success": true, "user": snapshot.unwrap_or(Value::Null)})),
        )
            .into_response(),
        Err(e) => {
            error!("Failed to read user profile: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": e.to_string()})),
            )
                .into_response()
        }
    }
}
