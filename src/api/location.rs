use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use tracing::error;

use crate::geocode::Geocoder;
use crate::records::{self, GeoPoint, UserLocation};
use crate::store::DocumentStore;

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLocationRequest {
    pub user_id: String,
    pub lat: f64,
    pub lng: f64,
}

// POST /api/location/update - reverse-geocode and store the latest position
pub async fn update_location(
    Extension(store): Extension<Arc<dyn DocumentStore>>,
    Extension(geocoder): Extension<Arc<Geocoder>>,
    Json(payload): Json<UpdateLocationRequest>,
) -> Response {
    if payload.user_id.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"success": false, "error": "Missing userId"})),
        )
            .into_response();
    }

    let address = match geocoder.reverse(payload.lat, payload.lng).await {
        Ok(address) => address,
        Err(e) => {
            error!("Reverse geocoding failed: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": e})),
            )
                .into_response();
        }
    };

    let location = UserLocation {
        lat: payload.lat,
        lng: payload.lng,
        address: address.clone(),
        timestamp: records::now_millis(),
    };

    match store
        .write(
            &format!("users/{}/location", payload.user_id),
            json!(location),
        )
        .await
    {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({"success": true, "address": address})),
        )
            .into_response(),
        Err(e) => {
            error!("Failed to store location: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": e.to_string()})),
            )
                .into_response()
        }
    }
}

// GET /api/location/:userId
pub async fn get_location(
    Extension(store): Extension<Arc<dyn DocumentStore>>,
    Path(user_id): Path<String>,
) -> Response {
    match store.read(&format!("users/{}/location", user_id)).await {
        Ok(snapshot) => (
            StatusCode::OK,
            Json(json!({"success": true, "location": snapshot.unwrap_or(Value::Null)})),
        )
            .into_response(),
        Err(e) => {
            error!("Failed to read location: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": e.to_string()})),
            )
                .into_response()
        }
    }
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareLocationRequest {
    pub user_id: String,
    pub location: GeoPoint,
}

// POST /api/location/share - append to the user's share log
pub async fn share_location(
    Extension(store): Extension<Arc<dyn DocumentStore>>,
    Json(payload): Json<ShareLocationRequest>,
) -> Response {
    if payload.user_id.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"success": false, "error": "Missing userId"})),
        )
            .into_response();
    }

    match store
        .push(
            &format!("users/{}/locationShares", payload.user_id),
            json!({"location": payload.location, "timestamp": records::now_millis()}),
        )
        .await
    {
        Ok(_) => (StatusCode::OK, Json(json!({"success": true}))).into_response(),
        Err(e) => {
            error!("Failed to record location share: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": e.to_string()})),
            )
                .into_response()
        }
    }
}
