//! # Routes
//!
//! Axum router configuration for the payment bridge.

use crate::handlers;
use crate::state::AppState;
use axum::{
    extract::Request,
    http::{header, Method, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::{get, post, MethodRouter},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use vaq_core::WebhookUrls;

/// POST endpoint that rejects other methods with the JSON error body the app
/// expects. Preflight OPTIONS requests are answered by the CORS layer.
fn post_only<H, T>(handler: H) -> MethodRouter<AppState>
where
    H: axum::handler::Handler<T, AppState>,
    T: 'static,
{
    post(handler).fallback(handlers::method_not_allowed)
}

/// The CORS layer answers every OPTIONS request itself with an empty 200;
/// the app expects 204 for those.
async fn preflight_no_content(request: Request, next: Next) -> Response {
    let is_options = request.method() == Method::OPTIONS;
    let mut response = next.run(request).await;
    if is_options && response.status() == StatusCode::OK {
        *response.status_mut() = StatusCode::NO_CONTENT;
    }
    response
}

/// Create the main application router
///
/// Routes:
///   - POST /start-checkout        - Signed payload for the hosted checkout
///   - POST /charge-appointment    - Direct card charge
///   - ANY  /payment-response      - Browser return from ePayco (deep link page)
///   - ANY  /payment-confirmation  - Server-to-server notification
///   - GET  /health                - Health check
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/", get(handlers::health))
        .route("/start-checkout", post_only(handlers::start_checkout))
        .route("/charge-appointment", post_only(handlers::charge_appointment))
        // ePayco calls these with GET or POST depending on the environment
        .route(
            WebhookUrls::RESPONSE_PATH,
            get(handlers::payment_response).post(handlers::payment_response),
        )
        .route(
            WebhookUrls::CONFIRMATION_PATH,
            get(handlers::payment_confirmation).post(handlers::payment_confirmation),
        )
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::from_fn(preflight_no_content))
                .layer(cors),
        )
        .with_state(state)
}
