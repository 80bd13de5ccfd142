/// Router tests driven through `tower::ServiceExt::oneshot`
/// Upstreams are either unreachable or served by wiremock
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use rust_argentina_dashboard::app::build_router;
use rust_argentina_dashboard::config::Config;
use rust_argentina_dashboard::handlers::AppState;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use wiremock::matchers::{method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const UNREACHABLE: &str = "http://127.0.0.1:1";

/// Helper function to create test config
fn create_test_config(base_url: &str) -> Config {
    Config {
        port: 0,
        argenstats_base_url: base_url.to_string(),
        argenstats_api_key: None,
        bcra_base_url: base_url.to_string(),
        series_base_url: base_url.to_string(),
        presupuesto_base_url: None,
        presupuesto_api_token: None,
        upstream_timeout_ms: 2_000,
        refresh_interval_secs: 300,
    }
}

fn app_for(config: Config) -> Router {
    build_router(Arc::new(AppState::new(config).unwrap()))
}

async fn send(app: Router, http_method: &str, uri: &str) -> (StatusCode, Option<String>, Vec<u8>) {
    let response = app
        .oneshot(
            Request::builder()
                .method(http_method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let cache_control = response
        .headers()
        .get(header::CACHE_CONTROL)
        .map(|v| v.to_str().unwrap().to_string());
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, cache_control, bytes.to_vec())
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, Option<String>, Value) {
    let (status, cache_control, bytes) = send(app, "GET", uri).await;
    (status, cache_control, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_total_fallback_dashboard_data() {
    let app = app_for(create_test_config(UNREACHABLE));
    let (status, cache_control, body) = get_json(app, "/api/argenstats").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(cache_control.as_deref(), Some("no-cache"));

    let metadata = &body["metadata"];
    assert_eq!(metadata["failed_apis"], 8);
    assert_eq!(metadata["successful_apis"], 0);
    assert!(metadata["source"].as_str().unwrap().contains("Fallback"));
    assert!(metadata["error"].is_string());
    assert_eq!(metadata["api_status"]["dollar"], "fallback: network");

    assert_eq!(body["exchangeRates"]["oficial"], 1290.0);
    assert_eq!(body["exchangeRates"]["blue"], 1325.0);
    assert_eq!(body["exchangeRates"]["mep"], 1310.0);
    assert_eq!(body["exchangeRates"]["ccl"], 1320.0);
    assert_eq!(body["exchangeRates"]["tarjeta"], 1677.0);
    assert_eq!(body["inflation"]["monthly"], 2.2);
    assert_eq!(body["inflation"]["annual"], 84.5);
    assert_eq!(body["emae"]["annual"], 4.98);
    assert_eq!(body["riesgoPais"]["value"], 850);
    assert_eq!(body["laborMarket"]["unemployment"], 5.2);
    assert_eq!(body["poverty"]["poverty_rate"], 41.7);
    assert_eq!(body["calendar"].as_array().unwrap().len(), 2);
    assert_eq!(body["emaeSectors"].as_array().unwrap().len(), 14);
    assert!(body["exchangeRates"]["date"].is_string());
}

#[tokio::test]
async fn test_disallowed_methods_return_405() {
    for (http_method, uri) in [
        ("POST", "/api/argenstats"),
        ("DELETE", "/api/bcra"),
        ("PUT", "/api/series/inflation-history"),
        ("PATCH", "/api/presupuesto"),
        ("POST", "/api/argenstats/historical"),
    ] {
        let app = app_for(create_test_config(UNREACHABLE));
        let (status, _, bytes) = send(app, http_method, uri).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED, "{} {}", http_method, uri);
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, json!({"error": "Method not allowed"}));
    }
}

#[tokio::test]
async fn test_historical_synthetic_dollar_series() {
    let app = app_for(create_test_config(UNREACHABLE));
    let (status, cache_control, body) =
        get_json(app, "/api/argenstats/historical?type=dollar&days=30").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(cache_control.as_deref(), Some("public, max-age=300"));

    let history = body["dollarHistory"].as_array().unwrap();
    assert_eq!(history.len(), 30);
    let mut previous = String::new();
    for point in history {
        let date = point["date"].as_str().unwrap();
        assert!(chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d").is_ok());
        assert!(date > previous.as_str());
        previous = date.to_string();
        assert!(point["oficial"].as_f64().unwrap() < point["blue"].as_f64().unwrap());
    }
    assert!(body["inflationHistory"].as_array().unwrap().is_empty());
    assert_eq!(body["metadata"]["source"], "Fallback data");
}

#[tokio::test]
async fn test_historical_inflation_reference_months() {
    let app = app_for(create_test_config(UNREACHABLE));
    let (_, _, body) = get_json(app, "/api/argenstats/historical?type=inflation&months=6").await;

    let values: Vec<f64> = body["inflationHistory"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["value"].as_f64().unwrap())
        .collect();
    assert_eq!(values, vec![4.0, 4.2, 3.5, 2.7, 2.4, 2.5]);
    assert_eq!(body["inflationHistory"][0]["month"], "Jul 24");
    assert!(body["dollarHistory"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_historical_lenient_query() {
    let app = app_for(create_test_config(UNREACHABLE));
    let (status, _, body) =
        get_json(app, "/api/argenstats/historical?type=bogus&days=abc&months=99").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["dollarHistory"].as_array().unwrap().len(), 30);
    assert_eq!(body["inflationHistory"].as_array().unwrap().len(), 12);
    assert_eq!(body["metadata"]["failed_apis"], 2);
}

#[tokio::test]
async fn test_repeated_query_keys_keep_first_value() {
    let app = app_for(create_test_config(UNREACHABLE));
    let (status, _, body) =
        get_json(app.clone(), "/api/argenstats/historical?type=dollar&days=30&days=10").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["dollarHistory"].as_array().unwrap().len(), 30);
    assert_eq!(body["metadata"]["days"], 30);

    let (status, _, body) =
        get_json(app.clone(), "/api/bcra/exchange-history?days=5&days=20").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 5);

    let (status, _, body) = get_json(app.clone(), "/api/presupuesto?year=2024&year=2025").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["year"], 2024);

    let (status, _, body) =
        get_json(app, "/api/presupuesto/execution?year=2024&year=abc").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["metadata"]["year"], 2024);
}

#[tokio::test]
async fn test_oversized_days_clamps_to_maximum() {
    let app = app_for(create_test_config(UNREACHABLE));
    let (status, _, body) = get_json(
        app,
        "/api/argenstats/historical?type=dollar&days=99999999999999999999",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["dollarHistory"].as_array().unwrap().len(), 365);
}

#[tokio::test]
async fn test_bcra_fallback() {
    let app = app_for(create_test_config(UNREACHABLE));
    let (status, _, body) = get_json(app, "/api/bcra").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["exchangeRate"]["oficial"], 1290.0);
    assert_eq!(body["exchangeRate"]["blue"], 1325.0);
    assert_eq!(body["interestRate"]["rate"], 35.0);
    assert_eq!(body["metadata"]["source"], "Fallback data");
    assert_eq!(body["metadata"]["failed_apis"], 2);
}

#[tokio::test]
async fn test_bcra_live_rates() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/Metadatos"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": 200,
            "results": [
                {"idVariable": 1, "descripcion": "Reservas Internacionales del BCRA"},
                {"idVariable": 4, "descripcion": "Tipo de Cambio Minorista ($ por USD) Comunicación B 9791"},
                {"idVariable": 6, "descripcion": "Tasa de Política Monetaria (en % n.a.)"}
            ]
        })))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/Datos/4/\d{4}-\d{2}-\d{2}/\d{4}-\d{2}-\d{2}$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"results": [
            {"idVariable": 4, "fecha": "2026-10-16", "valor": 1400.0},
            {"idVariable": 4, "fecha": "2026-10-17", "valor": 1420.0}
        ]})))
        .mount(&mock_server)
        .await;

    let app = app_for(create_test_config(&mock_server.uri()));
    let (_, _, body) = get_json(app, "/api/bcra").await;

    assert_eq!(body["exchangeRate"]["oficial"], 1420.0);
    assert_eq!(body["exchangeRate"]["blue"], 2059.0);
    assert_eq!(body["exchangeRate"]["date"], "2026-10-17");
    assert_eq!(body["interestRate"]["rate"], 35.0);
    assert_eq!(body["metadata"]["usdVariableId"], 4);
    assert_eq!(body["metadata"]["rateVariableId"], 6);
    assert_eq!(body["metadata"]["api_status"]["exchangeRate"], "success");
    assert_eq!(body["metadata"]["api_status"]["interestRate"], "fallback: http");
    assert_eq!(body["metadata"]["source"], "BCRA API v3 + Fallback");
}

#[tokio::test]
async fn test_bcra_exchange_history_fallback_length() {
    let app = app_for(create_test_config(UNREACHABLE));
    let (_, cache_control, body) = get_json(app, "/api/bcra/exchange-history?days=10").await;

    assert_eq!(cache_control.as_deref(), Some("public, max-age=300"));
    assert_eq!(body["data"].as_array().unwrap().len(), 10);
}

#[tokio::test]
async fn test_series_fallback_reference() {
    let app = app_for(create_test_config(UNREACHABLE));
    let (_, _, body) = get_json(app, "/api/series").await;

    assert_eq!(body["inflation"]["monthly"], 2.5);
    assert_eq!(body["inflation"]["annual"], 81.7);
    assert_eq!(body["metadata"]["source"], "Fallback data");
}

#[tokio::test]
async fn test_series_tries_candidate_ids_in_order() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/series"))
        .and(query_param("ids", "148.3_INIVELNAL_DICI_M_19"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [["2026-07-01", 1.9], ["2026-08-01", 1.9], ["2026-09-01", 2.1]],
            "meta": [{"frequency": "month"}, {"field": {"description": "IPC Nivel General Nacional"}}]
        })))
        .mount(&mock_server)
        .await;

    let app = app_for(create_test_config(&mock_server.uri()));
    let (_, _, body) = get_json(app.clone(), "/api/series").await;
    assert_eq!(body["inflation"]["monthly"], 2.1);
    assert_eq!(body["inflation"]["annual"], 5.9);
    assert_eq!(body["metadata"]["seriesId"], "148.3_INIVELNAL_DICI_M_19");
    assert_eq!(body["metadata"]["source"], "Series de Tiempo API");

    let (_, _, history) = get_json(app, "/api/series/inflation-history").await;
    let data = history["data"].as_array().unwrap();
    assert_eq!(data.len(), 12);
    assert_eq!(data[0]["month"], "Jul 26");
    assert_eq!(data[3]["month"], "Mes 4");
}

#[tokio::test]
async fn test_series_history_fallback_has_twelve_points() {
    let app = app_for(create_test_config(UNREACHABLE));
    let (_, _, body) = get_json(app, "/api/series/inflation-history").await;
    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 12);
    assert_eq!(data[0]["month"], "Ene 24");
    assert_eq!(data[11]["value"], 2.5);
}

#[tokio::test]
async fn test_presupuesto_unconfigured_fallback() {
    let app = app_for(create_test_config(UNREACHABLE));
    let (_, _, body) = get_json(app.clone(), "/api/presupuesto?year=2025").await;
    assert_eq!(body["total"], 50_000_000_000_000.0);
    assert_eq!(body["percentage"], 65.0);
    assert_eq!(body["year"], 2025);
    assert_eq!(body["metadata"]["api_status"]["budget"], "fallback: not_configured");

    let (_, _, execution) = get_json(app, "/api/presupuesto/execution").await;
    let areas = execution["areas"].as_array().unwrap();
    assert_eq!(areas.len(), 5);
    assert_eq!(areas[0]["name"], "Salud");
}

#[tokio::test]
async fn test_presupuesto_live_with_bearer_token() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ejecucion"))
        .and(query_param("ejercicio", "2025"))
        .and(wiremock::matchers::header("authorization", "Bearer secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"credito_vigente": 1000.0, "devengado": 400.0}
        })))
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(UNREACHABLE);
    config.presupuesto_base_url = Some(mock_server.uri());
    config.presupuesto_api_token = Some("secret".to_string());

    let (_, _, body) = get_json(app_for(config), "/api/presupuesto?year=2025").await;
    assert_eq!(body["executed"], 400.0);
    assert_eq!(body["percentage"], 40.0);
    assert_eq!(body["metadata"]["source"], "Presupuesto Abierto API");
}

#[tokio::test]
async fn test_debug_report_lists_probes() {
    let app = app_for(create_test_config(UNREACHABLE));
    let (status, _, body) = get_json(app, "/api/argenstats/debug").await;

    assert_eq!(status, StatusCode::OK);
    let tests = body["tests"].as_array().unwrap();
    assert_eq!(tests.len(), 7);
    assert!(tests.iter().all(|t| t["success"] == false));
    assert_eq!(body["summary"]["failed"], 7);
    assert_eq!(body["summary"]["api_key_available"], false);
}

#[tokio::test]
async fn test_health_and_dashboard_page() {
    let app = app_for(create_test_config(UNREACHABLE));
    let (status, _, body) = get_json(app.clone(), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, cache_control, bytes) = send(app, "GET", "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cache_control.as_deref(), Some("no-cache"));
    let html = String::from_utf8(bytes).unwrap();
    assert!(html.contains("Dashboard Económico Argentina"));
    assert!(html.contains("$ 1.290,00"));
}
