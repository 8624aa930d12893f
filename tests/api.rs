use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use invoicegen::auth::TokenKeys;
use invoicegen::db::pool::create_lazy_pool;
use invoicegen::render::FontSet;
use invoicegen::{build_router, AppConfig, AppState};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

const HEADER: &str = "Serial Number,Invoice Number,Date,Client NTN,Client Name,Importer NTN,Importer Name,Particulars of Goods,GD Number,HS Code,FBR Code,QTY Units,Value,GST,Value Added Tax,Unit Price";

struct TestApp {
    router: Router,
    tokens: Arc<TokenKeys>,
}

impl TestApp {
    /// The pool never connects; these paths must not reach the database
    fn new() -> Self {
        let mut config = AppConfig::default();
        config.auth.jwt_secret = "integration-secret".to_string();
        let pool = create_lazy_pool(&config.database).unwrap();
        let state = AppState::new(pool, config, Arc::new(FontSet::empty()));
        let tokens = state.tokens.clone();
        Self {
            router: build_router(state),
            tokens,
        }
    }

    fn token(&self, team: i64) -> String {
        self.tokens.issue(1, "tester", team, "admin").unwrap()
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec();
        (status, headers, body)
    }

    fn authed(&self, method: &str, uri: &str, team: i64, body: impl Into<Body>) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.token(team)))
            .body(body.into())
            .unwrap()
    }
}

fn json(body: &[u8]) -> Value {
    serde_json::from_slice(body).unwrap()
}

fn upload(rows: &[&str]) -> String {
    let mut text = HEADER.to_string();
    for row in rows {
        text.push('\n');
        text.push_str(row);
    }
    text
}

fn two_invoices_and_a_gap() -> String {
    upload(&[
        "1,INV-001,2024-03-01,1234567,Acme Traders,7654321,Lahore Imports,Cotton yarn,GD-1,5205.1100,FBR-1,10,10000,17,250,1000",
        "2,INV-002,2024-03-02,1234567,Acme Traders,7654321,,Cotton yarn,GD-2,5205.1100,FBR-2,5,5000,17,0,1000",
        "3,INV-003,2024-03-03,1234567,Acme Traders,7654321,Lahore Imports,Denim,GD-3,5209.4200,FBR-3,2,2400,17,0,1200",
    ])
}

#[tokio::test]
async fn health_needs_no_token() {
    let app = TestApp::new();
    let request = Request::get("/health").body(Body::empty()).unwrap();
    let (status, _, body) = app.send(request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"OK");
}

#[tokio::test]
async fn missing_token_is_rejected() {
    let app = TestApp::new();
    let request = Request::get("/api/client").body(Body::empty()).unwrap();
    let (status, _, body) = app.send(request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json(&body)["message"], "Unauthorized: No token provided");
}

#[tokio::test]
async fn foreign_token_is_rejected() {
    let app = TestApp::new();
    let forged = TokenKeys::new("other-secret", 12).issue(1, "x", 1, "admin").unwrap();
    let request = Request::get("/api/invoice")
        .header(header::AUTHORIZATION, format!("Bearer {}", forged))
        .body(Body::empty())
        .unwrap();
    let (status, _, body) = app.send(request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json(&body)["message"], "Unauthorized: Invalid token");
}

#[tokio::test]
async fn client_update_without_name_is_a_bad_request() {
    let app = TestApp::new();
    let body = r#"{"bussinessName":"Acme","cnic":"35202-1234567-1","ntn":"1234567","address":"Lahore","phone":"0300","type":"client"}"#;
    let (status, _, body) = app.send(app.authed("PUT", "/api/client?id=5", 1, body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let body = json(&body);
    assert_eq!(body["message"], "Invalid request");
    assert!(body["errors"][0].as_str().unwrap().contains("name"));
}

#[tokio::test]
async fn client_with_malformed_cnic_is_a_bad_request() {
    let app = TestApp::new();
    let body = r#"[{"name":"Jane","bussinessName":"Acme","cnic":"3520212345671","ntn":"1234567","address":"Lahore","phone":"0300","type":"client"}]"#;
    let (status, _, body) = app.send(app.authed("POST", "/api/client", 1, body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json(&body)["errors"][0].as_str().unwrap().contains("cnic"));
}

#[tokio::test]
async fn client_update_without_id_is_a_bad_request() {
    let app = TestApp::new();
    let (status, _, body) = app.send(app.authed("PUT", "/api/client", 1, "{}")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json(&body)["errors"], "Missing Id");
}

#[tokio::test]
async fn invoice_create_rejects_unknown_fields() {
    let app = TestApp::new();
    let body = r#"[{"invoiceNumber":"INV-1","colour":"red"}]"#;
    let (status, _, _) = app.send(app.authed("POST", "/api/invoice", 1, body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn bundled_templates_are_listed() {
    let app = TestApp::new();
    let (status, _, body) = app
        .send(app.authed("GET", "/api/templates/bundled", 1, Body::empty()))
        .await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<String> = json(&body)["templates"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(
        ids,
        ["standard", "modern", "minimal", "professional", "classic", "business", "elegant"]
    );
}

#[tokio::test]
async fn parse_reports_records_and_skipped_rows() {
    let app = TestApp::new();
    let (status, _, body) = app
        .send(app.authed("POST", "/api/invoices/parse", 1, two_invoices_and_a_gap()))
        .await;
    assert_eq!(status, StatusCode::OK);
    let body = json(&body);
    assert_eq!(body["records"].as_array().unwrap().len(), 2);
    assert_eq!(body["records"][1]["invoiceNumber"], "INV-003");
    assert_eq!(body["skipped"][0]["line"], 3);
    assert_eq!(body["skipped"][0]["invoiceNumber"], "INV-002");
}

#[tokio::test]
async fn generate_returns_one_page_per_record() {
    let app = TestApp::new();
    let (status, headers, body) = app
        .send(app.authed(
            "POST",
            "/api/invoices/generate?template=modern",
            1,
            two_invoices_and_a_gap(),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "application/pdf");
    let disposition = headers[header::CONTENT_DISPOSITION].to_str().unwrap();
    assert!(disposition.starts_with("attachment; filename=\"invoices-modern-"));
    assert!(disposition.ends_with(".pdf\""));
    assert_eq!(headers["x-skipped-rows"], "1");

    let pdf = lopdf::Document::load_mem(&body).unwrap();
    assert_eq!(pdf.get_pages().len(), 2);
}

#[tokio::test]
async fn unknown_template_is_a_bad_request() {
    let app = TestApp::new();
    let (status, _, body) = app
        .send(app.authed(
            "POST",
            "/api/invoices/generate?template=fancy",
            1,
            two_invoices_and_a_gap(),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json(&body)["message"], "Template 'fancy' not found");
}

#[tokio::test]
async fn upload_without_valid_rows_is_a_bad_request() {
    let app = TestApp::new();
    let (status, _, _) = app
        .send(app.authed("POST", "/api/invoices/generate", 1, HEADER))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn job_lifecycle_is_scoped_to_the_team() {
    let app = TestApp::new();
    let (status, _, body) = app
        .send(app.authed(
            "POST",
            "/api/invoices/jobs?template=classic",
            4,
            two_invoices_and_a_gap(),
        ))
        .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let job_id = json(&body)["jobId"].as_str().unwrap().to_string();
    let status_uri = format!("/api/invoices/jobs/{}", job_id);

    let (status, _, _) = app.send(app.authed("GET", &status_uri, 5, Body::empty())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let mut finished = Value::Null;
    for _ in 0..500 {
        let (_, _, body) = app.send(app.authed("GET", &status_uri, 4, Body::empty())).await;
        let body = json(&body);
        if body["status"] != "running" {
            finished = body;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(finished["status"], "completed");
    assert_eq!(finished["progress"], 100);
    assert_eq!(finished["pages"], 2);

    let download = format!("{}/download", status_uri);
    let (status, headers, body) = app.send(app.authed("GET", &download, 4, Body::empty())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "application/pdf");
    assert_eq!(lopdf::Document::load_mem(&body).unwrap().get_pages().len(), 2);
}

#[tokio::test]
async fn share_composes_links() {
    let app = TestApp::new();
    let request = serde_json::json!({
        "record": {
            "serialNumber": "1",
            "invoiceNumber": "INV-001",
            "date": "2024-03-01",
            "client": {"name": "Acme Traders", "ntn": "1234567"},
            "importer": {"name": "Lahore Imports", "ntn": "7654321"},
            "particularsOfGoods": "Cotton yarn",
            "gdNumber": "GD-1",
            "hsCode": "5205.1100",
            "fbrCode": "FBR-1",
            "qtyUnits": "10",
            "unitPrice": "1000",
            "value": "10000",
            "gst": "0.17",
            "valueAddedTax": "250",
            "currency": null,
            "paymentTerms": null,
            "dueDate": null,
            "remarks": null
        },
        "phone": "+92 300 1234567",
        "email": "jane@example.com"
    });
    let (status, _, body) = app
        .send(app.authed("POST", "/api/invoices/share", 1, request.to_string()))
        .await;
    assert_eq!(status, StatusCode::OK);
    let body = json(&body);
    assert!(body["whatsapp"].as_str().unwrap().starts_with("https://wa.me/923001234567?text="));
    assert!(body["email"].as_str().unwrap().starts_with("mailto:jane@example.com?subject="));
}

#[tokio::test]
async fn login_with_malformed_body_is_a_bad_request() {
    let app = TestApp::new();
    let request = Request::post("/api/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"username": "a"}"#))
        .unwrap();
    let (status, _, _) = app.send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
