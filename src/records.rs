use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::store::StoreError;

/// A pair of WGS84 coordinates. Zero is a valid value for either axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

/// Profile document stored at `users/{uid}`.
///
/// All fields are required; a user document missing any of them is rejected
/// at the store boundary instead of flowing through as absent values.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub created_at: i64,
    pub role: String,
}

/// One entry under `users/{uid}/emergencyContacts`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyContact {
    pub name: String,
    pub phone: String,
    pub relation: String,
    pub added_at: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncidentStatus {
    Active,
    Resolved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncidentKind {
    Panic,
}

/// Incident document stored under the top-level `incidents` collection.
/// `user_name` and `user_email` are snapshots taken at creation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentRecord {
    pub user_id: String,
    pub user_name: String,
    pub user_email: String,
    pub location: GeoPoint,
    pub timestamp: i64,
    pub status: IncidentStatus,
    #[serde(rename = "type")]
    pub kind: IncidentKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<i64>,
}

/// An incident together with its store-generated id.
#[derive(Debug, Clone, Serialize)]
pub struct Incident {
    pub id: String,
    #[serde(flatten)]
    pub record: IncidentRecord,
}

/// Append-only notification summary under `users/{uid}/sosAlerts`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SosAlert {
    pub location: GeoPoint,
    pub contacts_notified: usize,
    pub sms_attempted: bool,
    pub sms_sent: usize,
    pub timestamp: i64,
    pub incident_id: String,
}

/// Last known position written at `users/{uid}/location`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserLocation {
    pub lat: f64,
    pub lng: f64,
    pub address: String,
    pub timestamp: i64,
}

/// Decodes a raw store snapshot into a typed record, turning any missing or
/// mistyped field into a malformed-document error carrying the source path.
pub fn from_snapshot<T: DeserializeOwned>(path: &str, value: Value) -> Result<T, StoreError> {
    serde_json::from_value(value).map_err(|e| StoreError::Malformed {
        path: path.to_string(),
        reason: e.to_string(),
    })
}

pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn incident_round_trips_with_wire_names() {
        let record = IncidentRecord {
            user_id: "u1".into(),
            user_name: "Asha".into(),
            user_email: "asha@example.com".into(),
            location: GeoPoint { lat: 12.9, lng: 77.6 },
            timestamp: 1_700_000_000_000,
            status: IncidentStatus::Active,
            kind: IncidentKind::Panic,
            resolved_at: None,
        };

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["userId"], "u1");
        assert_eq!(value["status"], "active");
        assert_eq!(value["type"], "panic");
        assert!(value.get("resolvedAt").is_none());
    }

    #[test]
    fn user_document_missing_required_field_is_malformed() {
        let snapshot = json!({"name": "Asha", "email": "asha@example.com"});
        let err = from_snapshot::<UserRecord>("users/u1", snapshot).unwrap_err();
        assert!(matches!(err, StoreError::Malformed { .. }));
    }
}
