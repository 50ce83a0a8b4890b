use std::sync::Arc;

use axum::{
    routing::{delete, get, post},
    Extension, Router,
};
use serde_json::json;

use crate::api;
use crate::api::middleware::AuthKeys;
use crate::geocode::Geocoder;
use crate::identity::IdentityProvider;
use crate::notifications::SmsGateway;
use crate::sos::SosService;
use crate::store::DocumentStore;

/// Everything the router needs. Collaborators are trait objects so tests can
/// swap in local fakes for the hosted services.
#[derive(Clone)]
pub struct AppContext {
    pub store: Arc<dyn DocumentStore>,
    pub identity: Arc<dyn IdentityProvider>,
    pub geocoder: Arc<Geocoder>,
    pub sms: Arc<dyn SmsGateway>,
    pub auth_keys: AuthKeys,
}

async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(json!({
        "status": "OK",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

pub fn router(ctx: AppContext) -> Router {
    let sos = Arc::new(SosService::new(ctx.store.clone(), ctx.sms.clone()));

    let auth_routes = Router::new()
        .route("/api/auth/register", post(api::auth::register))
        .route("/api/auth/login", post(api::auth::login));

    let protected_routes = Router::new()
        .route("/api/auth/profile", get(api::auth::profile))
        .route_layer(axum::middleware::from_fn(api::middleware::auth_middleware));

    let contact_routes = Router::new()
        .route(
            "/api/contacts/:user_id",
            get(api::contacts::list_contacts).post(api::contacts::add_contact),
        )
        .route(
            "/api/contacts/:user_id/:contact_id",
            delete(api::contacts::delete_contact),
        );

    let location_routes = Router::new()
        .route("/api/location/update", post(api::location::update_location))
        .route("/api/location/share", post(api::location::share_location))
        .route("/api/location/:user_id", get(api::location::get_location));

    let emergency_routes = Router::new()
        .route("/api/emergency/panic", post(api::emergency::trigger_panic))
        .route(
            "/api/emergency/incidents/:user_id",
            get(api::emergency::list_incidents),
        )
        .route(
            "/api/emergency/resolve/:incident_id",
            post(api::emergency::resolve_incident),
        )
        .route(
            "/api/emergency/active",
            get(api::emergency::list_active_incidents),
        );

    Router::new()
        .route("/health", get(health_check))
        .merge(auth_routes)
        .merge(protected_routes)
        .merge(contact_routes)
        .merge(location_routes)
        .merge(emergency_routes)
        .layer(Extension(ctx.store))
        .layer(Extension(ctx.identity))
        .layer(Extension(ctx.geocoder))
        .layer(Extension(sos))
        .layer(Extension(ctx.auth_keys))
        .layer(
            tower_http::trace::TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<axum::body::Body>| {
                    let matched_path = request
                        .extensions()
                        .get::<axum::extract::MatchedPath>()
                        .map(|matched| matched.as_str());

                    // Span name "METHOD /path" so traces group by route.
                    let span_name = if let Some(path) = matched_path {
                        format!("{} {}", request.method(), path)
                    } else {
                        format!("{} {}", request.method(), request.uri().path())
                    };

                    tracing::info_span!(
                        "request",
                        "otel.name" = span_name,
                        method = ?request.method(),
                        uri = ?request.uri(),
                        // Filled in by handlers.
                        user_id = tracing::field::Empty,
                        user_email = tracing::field::Empty,
                        business_event = tracing::field::Empty,
                        error = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency = tracing::field::Empty,
                    )
                })
                .on_request(
                    |_request: &axum::http::Request<axum::body::Body>, _span: &tracing::Span| {
                        // Suppress the default per-request log line.
                    },
                )
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        span.record("status", tracing::field::display(response.status()));
                        span.record("latency", tracing::field::debug(latency));
                        tracing::info!("request completed");
                    },
                ),
        )
        .layer(cors_layer())
}

fn cors_layer() -> tower_http::cors::CorsLayer {
    use tower_http::cors::{Any, CorsLayer};

    match std::env::var("FRONTEND_URL") {
        Ok(origin) => CorsLayer::new()
            .allow_origin(
                origin
                    .parse::<axum::http::HeaderValue>()
                    .expect("FRONTEND_URL is not a valid origin"),
            )
            .allow_methods([
                axum::http::Method::GET,
                axum::http::Method::POST,
                axum::http::Method::DELETE,
            ])
            .allow_headers([
                axum::http::header::CONTENT_TYPE,
                axum::http::header::AUTHORIZATION,
            ])
            .allow_credentials(true),
        Err(_) => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    }
}
