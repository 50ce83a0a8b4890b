use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{error, info};

use crate::records::{self, EmergencyContact};
use crate::store::DocumentStore;

fn store_failure(e: crate::store::StoreError) -> Response {
    error!("Contact store operation failed: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"error": e.to_string()})),
    )
        .into_response()
}

// GET /api/contacts/:userId - map of contactId -> contact
pub async fn list_contacts(
    Extension(store): Extension<Arc<dyn DocumentStore>>,
    Path(user_id): Path<String>,
) -> Response {
    let path = format!("users/{}/emergencyContacts", user_id);
    let snapshot = match store.read(&path).await {
        Ok(snapshot) => snapshot,
        Err(e) => return store_failure(e),
    };

    let contacts: BTreeMap<String, EmergencyContact> = match snapshot {
        Some(snapshot) => match records::from_snapshot(&path, snapshot) {
            Ok(contacts) => contacts,
            Err(e) => return store_failure(e),
        },
        None => BTreeMap::new(),
    };

    (
        StatusCode::OK,
        Json(json!({"success": true, "contacts": contacts})),
    )
        .into_response()
}

#[derive(serde::Deserialize)]
pub struct AddContactRequest {
    pub name: String,
    pub phone: String,
    pub relation: String,
}

// POST /api/contacts/:userId
pub async fn add_contact(
    Extension(store): Extension<Arc<dyn DocumentStore>>,
    Path(user_id): Path<String>,
    Json(payload): Json<AddContactRequest>,
) -> Response {
    if payload.name.is_empty() || payload.phone.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"success": false, "error": "Contact name and phone are required"})),
        )
            .into_response();
    }

    let contact = EmergencyContact {
        name: payload.name,
        phone: payload.phone,
        relation: payload.relation,
        added_at: records::now_millis(),
    };

    match store
        .push(
            &format!("users/{}/emergencyContacts", user_id),
            json!(contact),
        )
        .await
    {
        Ok(contact_id) => {
            info!("Added emergency contact {} for user {}", contact_id, user_id);
            (
                StatusCode::CREATED,
                Json(json!({"success": true, "contactId": contact_id})),
            )
                .into_response()
        }
        Err(e) => store_failure(e),
    }
}

// DELETE /api/contacts/:userId/:contactId
pub async fn delete_contact(
    Extension(store): Extension<Arc<dyn DocumentStore>>,
    Path((user_id, contact_id)): Path<(String, String)>,
) -> Response {
    let path = format!("users/{}/emergencyContacts/{}", user_id, contact_id);
    match store.write(&path, serde_json::Value::Null).await {
        Ok(()) => {
            info!("Deleted emergency contact {} for user {}", contact_id, user_id);
            (StatusCode::OK, Json(json!({"success": true}))).into_response()
        }
        Err(e) => store_failure(e),
    }
}
