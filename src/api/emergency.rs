use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::error;

use crate::records::Incident;
use crate::sos::{PanicOutcome, RawLocation, SosError, SosService};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PanicRequest {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub location: Option<RawLocation>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PanicResponse {
    success: bool,
    incident_id: String,
    total_contacts: usize,
    message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    contacts_notified: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sms_failed: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warning: Option<&'static str>,
}

impl From<PanicOutcome> for PanicResponse {
    fn from(outcome: PanicOutcome) -> Self {
        Self {
            success: true,
            incident_id: outcome.incident_id,
            total_contacts: outcome.total_contacts,
            message: "Emergency alert sent successfully",
            contacts_notified: outcome.contacts_notified,
            sms_failed: outcome.sms_failed,
            warning: outcome
                .sms_skipped
                .then_some("SMS not configured - alerts saved to database only"),
        }
    }
}

impl IntoResponse for SosError {
    fn into_response(self) -> Response {
        let status = match &self {
            SosError::MissingUserId
            | SosError::InvalidLocation
            | SosError::NoContacts
            | SosError::MissingIncidentId => StatusCode::BAD_REQUEST,
            SosError::UserNotFound | SosError::IncidentNotFound => StatusCode::NOT_FOUND,
            SosError::Store(e) => {
                error!("Emergency workflow store failure: {}", e);
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({
                        "success": false,
                        "error": "Failed to process panic alert",
                        "details": e.to_string(),
                    })),
                )
                    .into_response();
            }
        };

        (
            status,
            Json(json!({"success": false, "error": self.to_string()})),
        )
            .into_response()
    }
}

fn incident_listing(incidents: Vec<Incident>) -> Response {
    (
        StatusCode::OK,
        Json(json!({
            "success": true,
            "count": incidents.len(),
            "incidents": incidents,
        })),
    )
        .into_response()
}

// POST /api/emergency/panic
pub async fn trigger_panic(
    Extension(sos): Extension<Arc<SosService>>,
    Json(payload): Json<PanicRequest>,
) -> Response {
    match sos.trigger_panic(payload.user_id, payload.location).await {
        Ok(outcome) => (StatusCode::OK, Json(PanicResponse::from(outcome))).into_response(),
        Err(e) => e.into_response(),
    }
}

// GET /api/emergency/incidents/:userId - newest first, capped at 20
pub async fn list_incidents(
    Extension(sos): Extension<Arc<SosService>>,
    Path(user_id): Path<String>,
) -> Response {
    match sos.list_incidents(Some(&user_id)).await {
        Ok(incidents) => incident_listing(incidents),
        Err(e) => e.into_response(),
    }
}

// POST /api/emergency/resolve/:incidentId
pub async fn resolve_incident(
    Extension(sos): Extension<Arc<SosService>>,
    Path(incident_id): Path<String>,
) -> Response {
    match sos.resolve_incident(Some(&incident_id)).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({"success": true, "message": "Incident resolved successfully"})),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

// GET /api/emergency/active - operator view across all users
pub async fn list_active_incidents(Extension(sos): Extension<Arc<SosService>>) -> Response {
    match sos.list_active_incidents().await {
        Ok(incidents) => incident_listing(incidents),
        Err(e) => e.into_response(),
    }
}
