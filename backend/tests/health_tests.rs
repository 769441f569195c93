mod common;

use clinic_backend::types::Environment;
use common::*;
use http::StatusCode;

#[tokio::test]
async fn test_health() {
    let setup = TestSetup::new();

    let response = setup.send_get_request("/health").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_response_body(response).await;

    assert_eq!(body["status"], "ok");
    assert_eq!(body["semver"], env!("CARGO_PKG_VERSION"));
    assert_eq!(body["storage"], "ok");
}

#[tokio::test]
async fn test_docs_outside_production() {
    let setup = TestSetup::new();

    let response = setup.send_get_request("/openapi.json").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_response_body(response).await;
    assert!(body["paths"]["/api/news"].is_object());
    assert!(body["paths"]["/api/patients/{id}"].is_object());

    let response = setup.send_get_request("/docs").await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_no_docs_in_production() {
    let setup = TestSetup::with_options(TestOptions {
        environment: Environment::Production,
        ..TestOptions::default()
    });

    let response = setup.send_get_request("/openapi.json").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = setup.send_get_request("/docs").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
