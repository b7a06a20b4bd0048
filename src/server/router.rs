use axum::Router;
use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use subtle::ConstantTimeEq;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::{info_span, warn};
use uuid::Uuid;

use super::handlers::{error_response, health_handler, run_handler};
use super::{AppState, RUN_PATH};

#[derive(Clone)]
struct AuthConfig {
    token: String,
}

pub(crate) fn build_router(state: AppState, team_token: String, max_body_size: usize) -> Router {
    let auth_cfg = AuthConfig { token: team_token };

    let protected = Router::new()
        .route(RUN_PATH, post(run_handler))
        .layer(middleware::from_fn_with_state(auth_cfg, auth_middleware))
        .layer(RequestBodyLimitLayer::new(max_body_size));

    Router::new()
        .route("/", get(health_handler))
        .merge(protected)
        .layer(
            TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
                info_span!(
                    "request",
                    id = %Uuid::new_v4(),
                    method = %req.method(),
                    uri = %req.uri(),
                )
            }),
        )
        .with_state(state)
}

/// `Authorization: Bearer <token>`; a missing or malformed header is 401, a
/// wrong token 403
async fn auth_middleware(
    State(cfg): State<AuthConfig>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let Some(header) = req
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
    else {
        return error_response(StatusCode::UNAUTHORIZED, "Authorization header is missing");
    };

    let mut parts = header.split_whitespace();
    let token = match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(token), None) if scheme.eq_ignore_ascii_case("bearer") => token,
        _ => {
            return error_response(
                StatusCode::UNAUTHORIZED,
                "Invalid authorization scheme. Expected 'Bearer <token>'",
            );
        }
    };

    // Fixed-length digests so the comparison does not leak the token length
    let token_hash = blake3::hash(token.as_bytes());
    let expected_hash = blake3::hash(cfg.token.as_bytes());
    if !bool::from(token_hash.as_bytes().ct_eq(expected_hash.as_bytes())) {
        warn!("Rejected request with an invalid team token");
        return error_response(StatusCode::FORBIDDEN, "Invalid or expired Team Token");
    }

    next.run(req).await
}
