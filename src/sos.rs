use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::join_all;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::{info, warn};

use crate::notifications::{NotificationTemplates, SmsGateway};
use crate::records::{
    self, EmergencyContact, GeoPoint, Incident, IncidentKind, IncidentRecord, IncidentStatus,
    SosAlert, UserRecord,
};
use crate::store::{DocumentStore, StoreError};

/// How many historical incidents a user query returns at most.
const HISTORY_LIMIT: usize = 20;

#[derive(Debug, Error)]
pub enum SosError {
    #[error("Missing userId")]
    MissingUserId,
    #[error("Missing or invalid location data")]
    InvalidLocation,
    #[error("User not found")]
    UserNotFound,
    #[error("No emergency contacts found. Please add at least one emergency contact.")]
    NoContacts,
    #[error("Missing incidentId")]
    MissingIncidentId,
    #[error("Incident not found")]
    IncidentNotFound,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Raw location as received from the client. Both coordinates must be
/// present; presence is what is validated, so 0.0 is a legal coordinate.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct RawLocation {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

/// Result of a panic trigger. The notified/failed counts are only present
/// when the gateway was configured and sends were actually attempted.
#[derive(Debug)]
pub struct PanicOutcome {
    pub incident_id: String,
    pub total_contacts: usize,
    pub contacts_notified: Option<usize>,
    pub sms_failed: Option<usize>,
    pub sms_skipped: bool,
}

/// The panic/incident workflow. Request-scoped and stateless: all durable
/// state lives in the document store, notifications go out through the
/// gateway, and neither write is transactional with the other.
pub struct SosService {
    store: Arc<dyn DocumentStore>,
    sms: Arc<dyn SmsGateway>,
}

impl SosService {
    pub fn new(store: Arc<dyn DocumentStore>, sms: Arc<dyn SmsGateway>) -> Self {
        Self { store, sms }
    }

    /// Validates preconditions, records an incident, broadcasts SMS to every
    /// emergency contact, and appends the alert summary to the user's log.
    ///
    /// Precondition failures are terminal and side-effect free. Once the
    /// incident is written there is no rollback: a later failure leaves the
    /// incident queryable without its alert-log entry.
    pub async fn trigger_panic(
        &self,
        user_id: Option<String>,
        location: Option<RawLocation>,
    ) -> Result<PanicOutcome, SosError> {
        let user_id = user_id
            .filter(|id| !id.is_empty())
            .ok_or(SosError::MissingUserId)?;

        let raw = location.ok_or(SosError::InvalidLocation)?;
        let location = match (raw.lat, raw.lng) {
            (Some(lat), Some(lng)) => GeoPoint { lat, lng },
            _ => return Err(SosError::InvalidLocation),
        };

        let user_path = format!("users/{}", user_id);
        let user: UserRecord = match self.store.read(&user_path).await? {
            Some(snapshot) => records::from_snapshot(&user_path, snapshot)?,
            None => return Err(SosError::UserNotFound),
        };

        let contacts = self.load_contacts(&user_id).await?;
        if contacts.is_empty() {
            return Err(SosError::NoContacts);
        }

        let incident = IncidentRecord {
            user_id: user_id.clone(),
            user_name: user.name.clone(),
            user_email: user.email.clone(),
            location,
            timestamp: records::now_millis(),
            status: IncidentStatus::Active,
            kind: IncidentKind::Panic,
            resolved_at: None,
        };
        let incident_id = self
            .store
            .push("incidents", encode("incidents", &incident)?)
            .await?;

        info!(
            user_id = %user_id,
            incident_id = %incident_id,
            lat = location.lat,
            lng = location.lng,
            "panic alert triggered by {}",
            user.name
        );
        crate::metrics::increment_panic_alerts();
        metrics::gauge!("safeping_incidents_active").increment(1.0);

        // Fan-out. Every contact gets an independent attempt; all attempts
        // run concurrently and all are awaited before the summary is logged.
        // A failed send is recorded and never retried.
        let mut sms_sent = 0;
        let mut sms_failed = 0;
        let sms_attempted = self.sms.is_configured();
        if sms_attempted {
            let body = NotificationTemplates::sos_sms(&user.name, &location);
            let sends = contacts
                .values()
                .map(|contact| self.sms.send_sms(&contact.phone, &body));
            for result in join_all(sends).await {
                match result {
                    Ok(_) => sms_sent += 1,
                    Err(reason) => {
                        warn!("SOS SMS failed: {}", reason);
                        sms_failed += 1;
                    }
                }
            }
            info!("SOS SMS sent: {}/{}", sms_sent, contacts.len());
        } else {
            warn!("SMS gateway not configured - SOS alert saved without notifications");
        }

        let alert = SosAlert {
            location,
            contacts_notified: contacts.len(),
            sms_attempted,
            sms_sent,
            timestamp: records::now_millis(),
            incident_id: incident_id.clone(),
        };
        let alerts_path = format!("users/{}/sosAlerts", user_id);
        self.store
            .push(&alerts_path, encode(&alerts_path, &alert)?)
            .await?;

        Ok(PanicOutcome {
            incident_id,
            total_contacts: contacts.len(),
            contacts_notified: sms_attempted.then_some(sms_sent),
            sms_failed: sms_attempted.then_some(sms_failed),
            sms_skipped: !sms_attempted,
        })
    }

    /// Returns the user's most recent incidents, newest first, capped at 20.
    pub async fn list_incidents(&self, user_id: Option<&str>) -> Result<Vec<Incident>, SosError> {
        let user_id = user_id
            .filter(|id| !id.is_empty())
            .ok_or(SosError::MissingUserId)?;

        let children = self
            .store
            .query_children_equal("incidents", "userId", json!(user_id), Some(HISTORY_LIMIT))
            .await?;

        Ok(Self::sorted_incidents(children)?)
    }

    /// Marks an incident resolved. The overwrite is unconditional: resolving
    /// an already-resolved incident succeeds and refreshes `resolvedAt`.
    pub async fn resolve_incident(&self, incident_id: Option<&str>) -> Result<(), SosError> {
        let incident_id = incident_id
            .filter(|id| !id.is_empty())
            .ok_or(SosError::MissingIncidentId)?;

        let path = format!("incidents/{}", incident_id);
        let incident: IncidentRecord = match self.store.read(&path).await? {
            Some(snapshot) => records::from_snapshot(&path, snapshot)?,
            None => return Err(SosError::IncidentNotFound),
        };

        self.store
            .update(
                &path,
                json!({
                    "status": IncidentStatus::Resolved,
                    "resolvedAt": records::now_millis(),
                }),
            )
            .await?;

        if incident.status == IncidentStatus::Active {
            metrics::gauge!("safeping_incidents_active").decrement(1.0);
        }
        crate::metrics::increment_incidents_resolved();
        info!("incident {} resolved", incident_id);
        Ok(())
    }

    /// All currently active incidents across all users, newest first.
    pub async fn list_active_incidents(&self) -> Result<Vec<Incident>, SosError> {
        let children = self
            .store
            .query_children_equal("incidents", "status", json!("active"), None)
            .await?;

        Ok(Self::sorted_incidents(children)?)
    }

    async fn load_contacts(
        &self,
        user_id: &str,
    ) -> Result<BTreeMap<String, EmergencyContact>, SosError> {
        let path = format!("users/{}/emergencyContacts", user_id);
        match self.store.read(&path).await? {
            Some(snapshot) => Ok(records::from_snapshot(&path, snapshot)?),
            None => Ok(BTreeMap::new()),
        }
    }

    fn sorted_incidents(
        children: BTreeMap<String, serde_json::Value>,
    ) -> Result<Vec<Incident>, StoreError> {
        let mut incidents = children
            .into_iter()
            .map(|(id, snapshot)| {
                let record = records::from_snapshot(&format!("incidents/{}", id), snapshot)?;
                Ok(Incident { id, record })
            })
            .collect::<Result<Vec<_>, StoreError>>()?;

        incidents.sort_by(|a, b| b.record.timestamp.cmp(&a.record.timestamp));
        Ok(incidents)
    }
}

fn encode<T: serde::Serialize>(path: &str, value: &T) -> Result<serde_json::Value, StoreError> {
    serde_json::to_value(value).map_err(|e| StoreError::Malformed {
        path: path.to_string(),
        reason: e.to_string(),
    })
}
