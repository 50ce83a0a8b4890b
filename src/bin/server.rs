use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use safeping_server::api::middleware::AuthKeys;
use safeping_server::app::{router, AppContext};
use safeping_server::geocode::Geocoder;
use safeping_server::identity::{FirebaseAuth, IdentityProvider};
use safeping_server::notifications::{SmsGateway, TwilioSms};
use safeping_server::store::{DocumentStore, FirebaseRtdb};

#[tokio::main]
async fn main() {
    // Load .env if present (dotenvy)
    dotenvy::dotenv().ok();

    safeping_server::telemetry::init_telemetry("safeping-server");

    let (prometheus_layer, metric_handle) = axum_prometheus::PrometheusMetricLayer::pair();

    let store: Arc<dyn DocumentStore> = Arc::new(FirebaseRtdb::from_env());
    let identity: Arc<dyn IdentityProvider> = Arc::new(FirebaseAuth::from_env());
    let geocoder = Arc::new(Geocoder::from_env());
    let sms: Arc<dyn SmsGateway> = Arc::new(TwilioSms::from_env());
    let auth_keys = AuthKeys::from_env();

    safeping_server::metrics::init_metrics(&store).await;

    let app = app(
        AppContext {
            store,
            identity,
            geocoder,
            sms,
            auth_keys,
        },
        prometheus_layer,
        metric_handle,
    );

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(5000);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}

fn app(
    ctx: AppContext,
    prometheus_layer: axum_prometheus::PrometheusMetricLayer<'static>,
    metric_handle: metrics_exporter_prometheus::PrometheusHandle,
) -> Router {
    router(ctx)
        .route("/metrics", get(|| async move { metric_handle.render() }))
        .layer(prometheus_layer)
}
