use std::sync::Arc;

use serde_json::json;

use crate::store::DocumentStore;

/// Seeds gauges from the store so restarts don't zero the dashboard.
pub async fn init_metrics(store: &Arc<dyn DocumentStore>) {
    let active = store
        .query_children_equal("incidents", "status", json!("active"), None)
        .await
        .map(|children| children.len())
        .unwrap_or(0);
    metrics::gauge!("safeping_incidents_active").set(active as f64);

    tracing::info!("Initialized metrics: active incidents={}", active);
}

pub fn increment_users_registered() {
    metrics::counter!("safeping_users_registered_total").increment(1);
}

pub fn increment_panic_alerts() {
    metrics::counter!("safeping_panic_alerts_total").increment(1);
}

pub fn increment_incidents_resolved() {
    metrics::counter!("safeping_incidents_resolved_total").increment(1);
}

pub fn increment_sms_sent() {
    metrics::counter!("safeping_sms_sent_total").increment(1);
}

pub fn increment_sms_failed() {
    metrics::counter!("safeping_sms_failed_total").increment(1);
}
