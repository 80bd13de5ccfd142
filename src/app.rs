use crate::handlers::{self, AppState};
use axum::{
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Serves the OpenAPI specification YAML file.
///
/// Reads `openapi.yml` from the working directory; 404 when it is missing.
async fn serve_openapi_spec() -> impl IntoResponse {
    match tokio::fs::read_to_string("openapi.yml").await {
        Ok(content) => (StatusCode::OK, [(header::CONTENT_TYPE, "text/yaml")], content).into_response(),
        Err(_) => (StatusCode::NOT_FOUND, "OpenAPI spec not found").into_response(),
    }
}

/// Serves the Swagger UI HTML page, pointed at `/api-docs/openapi.yml`.
async fn serve_swagger_ui() -> impl IntoResponse {
    let html = r#"
<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Argentina Dashboard API - Swagger UI</title>
    <link rel="stylesheet" type="text/css" href="https://unpkg.com/swagger-ui-dist@5/swagger-ui.css">
    <style>
        body { margin: 0; padding: 0; }
    </style>
</head>
<body>
    <div id="swagger-ui"></div>
    <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-bundle.js"></script>
    <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-standalone-preset.js"></script>
    <script>
        window.onload = function() {
            window.ui = SwaggerUIBundle({
                url: "/api-docs/openapi.yml",
                dom_id: '#swagger-ui',
                deepLinking: true,
                presets: [
                    SwaggerUIBundle.presets.apis,
                    SwaggerUIStandalonePreset
                ],
                layout: "StandaloneLayout"
            });
        };
    </script>
</body>
</html>
"#;
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
        html,
    )
}

/// Dashboard page, data routes and API docs. Every route answers GET only;
/// other methods get 405 with `{"error":"Method not allowed"}`.
pub fn routes() -> Router<Arc<AppState>> {
    let not_allowed = handlers::method_not_allowed;

    Router::new()
        // Dashboard page
        .route("/", get(handlers::dashboard_page).fallback(not_allowed))
        // API Documentation
        .route("/docs", get(serve_swagger_ui))
        .route("/api-docs/openapi.yml", get(serve_openapi_spec))
        // ArgenStats aggregation
        .route(
            "/api/argenstats",
            get(handlers::dashboard_data).fallback(not_allowed),
        )
        .route(
            "/api/argenstats/historical",
            get(handlers::historical).fallback(not_allowed),
        )
        .route(
            "/api/argenstats/debug",
            get(handlers::debug).fallback(not_allowed),
        )
        // BCRA
        .route("/api/bcra", get(handlers::bcra).fallback(not_allowed))
        .route(
            "/api/bcra/exchange-history",
            get(handlers::bcra_exchange_history).fallback(not_allowed),
        )
        // Series de Tiempo
        .route(
            "/api/series",
            get(handlers::series_inflation).fallback(not_allowed),
        )
        .route(
            "/api/series/inflation-history",
            get(handlers::series_inflation_history).fallback(not_allowed),
        )
        // Budget execution
        .route(
            "/api/presupuesto",
            get(handlers::presupuesto).fallback(not_allowed),
        )
        .route(
            "/api/presupuesto/execution",
            get(handlers::presupuesto_execution).fallback(not_allowed),
        )
}

/// Adds the health check, state, tracing and CORS around `routes`.
///
/// The health check is merged outside `routes` so that layers applied to
/// `routes` (rate limiting in the binary) do not cover it.
pub fn finish(routes: Router<Arc<AppState>>, state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .merge(routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Full application router without rate limiting.
pub fn build_router(state: Arc<AppState>) -> Router {
    finish(routes(), state)
}
