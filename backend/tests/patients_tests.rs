mod common;

use clinic_storage::blob::{BlobStore, IN_MEMORY_BASE_URL};
use clinic_storage::patient_image::PATIENTS_DOCUMENT_PATH;
use common::*;
use http::StatusCode;
use serde_json::json;

const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nfake image data";

async fn upload_image(setup: &TestSetup, file_name: &str) -> serde_json::Value {
    let response = setup
        .send_multipart_request(
            "/api/patients",
            multipart_body("file", file_name, "image/png", PNG_BYTES),
            Some(TEST_ADMIN_TOKEN),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    parse_response_body(response).await
}

fn pathname_of(url: &serde_json::Value) -> String {
    url.as_str()
        .unwrap()
        .strip_prefix(&format!("{IN_MEMORY_BASE_URL}/"))
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn test_list_patient_images_when_missing() {
    let setup = TestSetup::new();

    let response = setup.send_get_request("/api/patients").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(parse_response_body(response).await, json!([]));

    // Nothing is written for a missing gallery
    assert!(!setup.store.contains(PATIENTS_DOCUMENT_PATH));
    assert_eq!(setup.store.put_attempts(), 0);
}

#[tokio::test]
async fn test_upload_patient_image() {
    let setup = TestSetup::new();

    let created = upload_image(&setup, "Cat.PNG").await;
    let id = created["id"].as_str().unwrap();
    assert!(id.chars().all(|c| c.is_ascii_digit()));
    assert!(created["createdAt"].is_string());

    let pathname = pathname_of(&created["url"]);
    assert!(pathname.starts_with("patients/patient-"));
    assert!(pathname.ends_with(".png"));
    assert_eq!(setup.store.raw(&pathname), Some(PNG_BYTES.to_vec()));

    let fetched =
        parse_response_body(setup.send_get_request(&format!("/api/patients/{id}")).await).await;
    assert_eq!(fetched, created);
}

#[tokio::test]
async fn test_uploads_are_listed_newest_first() {
    let setup = TestSetup::new();

    let first = upload_image(&setup, "first.jpg").await;
    let second = upload_image(&setup, "second.jpg").await;

    let list = parse_response_body(setup.send_get_request("/api/patients").await).await;
    let ids: Vec<&str> = list
        .as_array()
        .unwrap()
        .iter()
        .map(|image| image["id"].as_str().unwrap())
        .collect();
    assert_eq!(
        ids,
        vec![second["id"].as_str().unwrap(), first["id"].as_str().unwrap()]
    );

    let limited =
        parse_response_body(setup.send_get_request("/api/patients?limit=1").await).await;
    assert_eq!(limited.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_upload_requires_file_field() {
    let setup = TestSetup::new();

    let response = setup
        .send_multipart_request(
            "/api/patients",
            multipart_text_body("description", "no file here"),
            Some(TEST_ADMIN_TOKEN),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = parse_response_body(response).await;
    assert_eq!(body["error"], "No file provided");

    let response = setup
        .send_multipart_request(
            "/api/patients",
            multipart_body("file", "empty.png", "image/png", b""),
            Some(TEST_ADMIN_TOKEN),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_failed_metadata_write_removes_uploaded_file() {
    let setup = TestSetup::new();

    setup.store.fail_next_puts_under("data/", 3);
    let response = setup
        .send_multipart_request(
            "/api/patients",
            multipart_body("file", "cat.png", "image/png", PNG_BYTES),
            Some(TEST_ADMIN_TOKEN),
        )
        .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let binaries = setup.store.list("patients/").await.unwrap();
    assert!(binaries.is_empty());
    assert!(!setup.store.contains(PATIENTS_DOCUMENT_PATH));
}

#[tokio::test]
async fn test_delete_patient_image() {
    let setup = TestSetup::new();

    let created = upload_image(&setup, "dog.png").await;
    let id = created["id"].as_str().unwrap();
    let pathname = pathname_of(&created["url"]);

    let response = setup
        .send_delete_request(&format!("/api/patients/{id}"), Some(TEST_ADMIN_TOKEN))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(parse_response_body(response).await, json!({ "success": true }));

    assert!(!setup.store.contains(&pathname));
    let response = setup.send_get_request(&format!("/api/patients/{id}")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_succeeds_when_file_delete_fails() {
    let setup = TestSetup::new();

    let created = upload_image(&setup, "dog.png").await;
    let id = created["id"].as_str().unwrap();
    let pathname = pathname_of(&created["url"]);

    setup.store.fail_next_deletes(1);
    let response = setup
        .send_delete_request(&format!("/api/patients/{id}"), Some(TEST_ADMIN_TOKEN))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    // Metadata is gone even though the file stayed behind
    assert!(setup.store.contains(&pathname));
    let list = parse_response_body(setup.send_get_request("/api/patients").await).await;
    assert_eq!(list, json!([]));
}

#[tokio::test]
async fn test_delete_unknown_patient_image() {
    let setup = TestSetup::new();
    upload_image(&setup, "dog.png").await;
    let before = setup.store.raw(PATIENTS_DOCUMENT_PATH);

    let response = setup
        .send_delete_request("/api/patients/404", Some(TEST_ADMIN_TOKEN))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(setup.store.raw(PATIENTS_DOCUMENT_PATH), before);
}

#[tokio::test]
async fn test_upload_file() {
    let setup = TestSetup::new();

    let response = setup
        .send_multipart_request(
            "/api/upload",
            multipart_body("file", "report.pdf", "application/pdf", b"%PDF-1.4"),
            Some(TEST_ADMIN_TOKEN),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_response_body(response).await;

    let pathname = body["pathname"].as_str().unwrap();
    assert!(pathname.starts_with("patients/patient-"));
    assert!(pathname.ends_with(".pdf"));
    assert_eq!(body["contentType"], "application/pdf");
    assert_eq!(body["url"], format!("{IN_MEMORY_BASE_URL}/{pathname}"));
    assert_eq!(setup.store.raw(pathname), Some(b"%PDF-1.4".to_vec()));

    // Plain uploads are not part of the gallery
    let list = parse_response_body(setup.send_get_request("/api/patients").await).await;
    assert_eq!(list, json!([]));
}
