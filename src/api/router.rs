use axum::{
    body::Body,
    http::header::{HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE, ORIGIN},
    http::{HeaderName, Method, Request, Response},
    routing::get,
    Router,
};
use std::time::Duration;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    normalize_path::NormalizePathLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::Span;

use crate::api::{
    auth, categories, handlers, invoices, leaderboard, question_attempts, questions,
    quiz_attempts, quizzes, results, schools, settings, students, teachers, teams,
};
use crate::core::{config::Settings, state::AppState};

const REQUEST_ID_HEADER: &str = "x-request-id";

pub(crate) fn router(state: AppState) -> Router {
    let api_v1_prefix = state.settings().api().api_v1_str.clone();
    let request_id_header = HeaderName::from_static(REQUEST_ID_HEADER);

    let mut router: Router<AppState> = Router::new()
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::healthz).head(handlers::healthz))
        .nest(&api_v1_prefix, api_v1());

    if state.settings().telemetry().prometheus_enabled {
        router = router.route("/metrics", get(handlers::metrics));
    }

    router
        .layer(NormalizePathLayer::trim_trailing_slash())
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        .layer(TraceLayer::new_for_http().make_span_with(request_span).on_response(record_response))
        .layer(build_cors_layer(state.settings()))
        .with_state(state)
}

fn api_v1() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/schools", schools::router())
        .nest("/students", students::router())
        .nest("/teachers", teachers::router())
        .nest("/teams", teams::router())
        .nest("/categories", categories::router())
        .nest("/questions", questions::router())
        .nest("/quizzes", quizzes::router())
        .nest("/quiz-attempts", quiz_attempts::router())
        .nest("/question-attempts", question_attempts::router())
        .nest("/leaderboard", leaderboard::router())
        .nest("/results", results::router())
        .nest("/settings", settings::router())
        .nest("/invoices", invoices::router())
}

fn request_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("-");
    tracing::info_span!(
        "request",
        method = %request.method(),
        uri = %request.uri(),
        request_id = %request_id
    )
}

fn record_response(response: &Response<Body>, latency: Duration, _span: &Span) {
    let status = response.status().as_u16().to_string();
    metrics::counter!("http_requests_total", "status" => status.clone()).increment(1);
    metrics::histogram!("http_request_duration_seconds", "status" => status)
        .record(latency.as_secs_f64());
}

/// Credentials are only allowed with an explicit origin list.
fn build_cors_layer(settings: &Settings) -> CorsLayer {
    let origins: Vec<HeaderValue> = settings
        .cors()
        .origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();
    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT, ORIGIN, request_id.clone()])
        .expose_headers([request_id, axum::http::header::CONTENT_DISPOSITION])
        .max_age(Duration::from_secs(3600));

    if origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_credentials(true).allow_origin(AllowOrigin::list(origins))
    }
}

#[cfg(test)]
mod tests {
    use super::router;
    use axum::{body::Body, http::Request, http::StatusCode, response::Response};
    use tokio::sync::OwnedMutexGuard;
    use tower::ServiceExt;

    use crate::core::redis::RedisHandle;
    use crate::core::state::AppState;
    use crate::core::{config::Settings, metrics};
    use crate::test_support;

    /// Routes one request through an app backed by a lazy pool; no database is touched
    /// unless a handler queries it.
    async fn send(uri: &str, prometheus: bool) -> (Response, OwnedMutexGuard<()>) {
        let guard = test_support::env_lock().await;
        test_support::set_test_env();
        std::env::remove_var("PROJECT_NAME");
        std::env::set_var("PROMETHEUS_ENABLED", if prometheus { "1" } else { "0" });

        let settings = Settings::load().expect("settings");
        if prometheus {
            metrics::init(&settings).expect("metrics init");
        }
        let db =
            sqlx::PgPool::connect_lazy(&settings.database().database_url()).expect("lazy pool");
        let redis = RedisHandle::new(settings.redis().redis_url());
        let app = router(AppState::new(settings, db, redis));

        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).expect("request"))
            .await
            .expect("response");
        (response, guard)
    }

    #[tokio::test]
    async fn root_returns_project_name() {
        let (response, _guard) = send("/", false).await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = test_support::read_json(response).await;
        assert_eq!(json["message"], "Quizcomp API");
        assert_eq!(json["docs_url"], "/api/v1/docs");
    }

    #[tokio::test]
    async fn metrics_route_follows_the_flag() {
        let (response, _guard) = send("/metrics", false).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        drop(_guard);

        let (response, _guard) = send("/metrics", true).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn protected_routes_require_a_token() {
        let (response, _guard) = send("/api/v1/students", false).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()["www-authenticate"], "Bearer");
    }

    #[tokio::test]
    async fn responses_carry_a_request_id() {
        let (response, _guard) = send("/", false).await;
        assert!(response.headers().contains_key("x-request-id"));
    }
}
