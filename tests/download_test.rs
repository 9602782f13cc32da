use httpmock::prelude::*;
use invoice_courier::core::engine::cleanup_temp_file;
use invoice_courier::core::retriever::{fetch_with_cookies, persist_invoice, USER_AGENT};

#[tokio::test]
async fn fallback_download_sends_cookies_and_user_agent() {
    let server = MockServer::start();
    let body = b"%PDF-1.4 invoice bytes".to_vec();

    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/files/invoice123.pdf")
            .header("cookie", "session=abc123; csrf=xyz")
            .header("user-agent", USER_AGENT);
        then.status(200)
            .header("Content-Type", "application/pdf")
            .body(&body);
    });

    let client = reqwest::Client::new();
    let result = fetch_with_cookies(
        &client,
        &server.url("/files/invoice123.pdf"),
        "session=abc123; csrf=xyz",
    )
    .await
    .unwrap();

    mock.assert();
    assert_eq!(result.unwrap(), body);
}

#[tokio::test]
async fn non_success_status_yields_none_not_an_error() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/files/gone.pdf");
        then.status(404);
    });

    let client = reqwest::Client::new();
    let result = fetch_with_cookies(&client, &server.url("/files/gone.pdf"), "session=abc")
        .await
        .unwrap();
    assert!(result.is_none());
}

#[tokio::test]
async fn server_error_also_yields_none() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/files/broken.pdf");
        then.status(502);
    });

    let client = reqwest::Client::new();
    let result = fetch_with_cookies(&client, &server.url("/files/broken.pdf"), "")
        .await
        .unwrap();
    assert!(result.is_none());
}

#[test]
fn persisted_invoice_is_a_unique_pdf_temp_file() {
    let first = persist_invoice(b"first run").unwrap();
    let second = persist_invoice(b"second run").unwrap();

    assert_ne!(first.path, second.path);
    assert!(first.file_name.starts_with("invoice-"));
    assert!(first.file_name.ends_with(".pdf"));
    assert_eq!(std::fs::read(&first.path).unwrap(), b"first run");

    cleanup_temp_file(&first.path);
    cleanup_temp_file(&second.path);
    assert!(!first.path.exists());
}

#[test]
fn cleanup_is_idempotent() {
    let invoice = persist_invoice(b"bytes").unwrap();
    cleanup_temp_file(&invoice.path);
    assert!(!invoice.path.exists());
    // Deleting an already-deleted path must not panic or error the run.
    cleanup_temp_file(&invoice.path);
}
