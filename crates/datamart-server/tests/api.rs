use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE, LOCATION};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use chrono::Utc;
use datamart_client::{LogMailer, MockPaymentGateway, PageFetcher};
use datamart_core::{AdminAuth, AuthConfig, HttpConfig, MailerConfig, StorefrontConfig};
use datamart_db::MemoryStore;
use datamart_server::{router, AppState};
use serde_json::{json, Value};
use tower::ServiceExt;

const PASSCODE: &str = "letmein";

fn app() -> Router {
    let store = MemoryStore::new();
    let state = AppState {
        datasets: Arc::new(store.clone()),
        posts: Arc::new(store),
        fetcher: PageFetcher::new(&HttpConfig {
            timeout: Duration::from_secs(2),
            ..HttpConfig::default()
        })
        .unwrap(),
        payments: Arc::new(MockPaymentGateway),
        mailer: Arc::new(LogMailer::new(MailerConfig {
            simulated_delay: Duration::ZERO,
        })),
        auth: AdminAuth::new(PASSCODE, None, AuthConfig::default()),
        storefront: StorefrontConfig::default(),
    };
    router(Arc::new(state))
}

fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(body) => builder
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn call(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

async fn login(app: &Router) -> String {
    let (status, body) = call(
        app,
        request(
            Method::POST,
            "/api/admin/verify",
            None,
            Some(json!({ "code": PASSCODE })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    body["token"].as_str().unwrap().to_string()
}

async fn save(app: &Router, token: &str, name: &str, rows: Value) -> String {
    let (status, body) = call(
        app,
        request(
            Method::POST,
            "/api/admin/save",
            Some(token),
            Some(json!({ "name": name, "dataRows": rows })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body["datasetId"].as_str().unwrap().to_string()
}

async fn publish(app: &Router, token: &str, id: &str, price: i64) {
    let (status, _) = call(
        app,
        request(
            Method::PATCH,
            &format!("/api/admin/dataset/{id}"),
            Some(token),
            Some(json!({ "isPublished": true, "price": price })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

fn numbered_rows(n: usize) -> Value {
    Value::Array((1..=n).map(|i| json!({ "n": i.to_string() })).collect())
}

#[tokio::test]
async fn health_check() {
    let (status, body) = call(&app(), request(Method::GET, "/api/health", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn wrong_passcode_is_rejected() {
    let (status, body) = call(
        &app(),
        request(
            Method::POST,
            "/api/admin/verify",
            None,
            Some(json!({ "code": "guess" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({ "success": false }));
}

#[tokio::test]
async fn admin_routes_require_valid_token() {
    let app = app();

    let (status, body) = call(&app, request(Method::GET, "/api/admin/datasets", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());

    let (status, _) = call(
        &app,
        request(Method::GET, "/api/admin/datasets", Some("forged"), None),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let expired = AdminAuth::new(PASSCODE, None, AuthConfig::default())
        .issue(Utc::now() - chrono::Duration::days(1));
    let (status, _) = call(
        &app,
        request(
            Method::GET,
            "/api/admin/datasets",
            Some(&expired.token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let token = login(&app).await;
    let (status, body) = call(
        &app,
        request(Method::GET, "/api/admin/datasets", Some(&token), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn scrape_without_url_is_bad_request() {
    let app = app();
    let token = login(&app).await;

    for body in [json!({}), json!({ "url": "   " })] {
        let (status, body) = call(
            &app,
            request(Method::POST, "/api/admin/scrape", Some(&token), Some(body)),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("url"));
    }
}

#[tokio::test]
async fn scrape_unreachable_host_is_bad_gateway() {
    let app = app();
    let token = login(&app).await;

    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let (status, body) = call(
        &app,
        request(
            Method::POST,
            "/api/admin/scrape",
            Some(&token),
            Some(json!({ "url": format!("http://{addr}/") })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn save_validates_input() {
    let app = app();
    let token = login(&app).await;

    let (status, _) = call(
        &app,
        request(
            Method::POST,
            "/api/admin/save",
            Some(&token),
            Some(json!({ "name": "", "dataRows": [] })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(
        &app,
        request(
            Method::POST,
            "/api/admin/save",
            Some(&token),
            Some(json!({ "name": "Rows", "dataRows": "not an array" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn replace_overwrites_rows() {
    let app = app();
    let token = login(&app).await;
    let id = save(&app, &token, "Q1", json!([{ "A": "1" }, { "A": "2" }])).await;

    let (status, _) = call(
        &app,
        request(
            Method::PUT,
            &format!("/api/admin/dataset/{id}"),
            Some(&token),
            Some(json!({ "name": "Q1", "dataRows": [{ "A": "9" }] })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(
        &app,
        request(
            Method::GET,
            &format!("/api/admin/dataset/{id}"),
            Some(&token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["rows"], json!([{ "A": "9" }]));
    assert_eq!(body["dataset"]["name"], "Q1");
}

#[tokio::test]
async fn save_without_columns_keeps_row_key_order() {
    let app = app();
    let token = login(&app).await;

    let req = Request::builder()
        .method(Method::POST)
        .uri("/api/admin/save")
        .header(AUTHORIZATION, format!("Bearer {token}"))
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(
            r#"{"name":"People","dataRows":[{"Name":"Ann","Age":"30"},{"Name":"Bo","Age":"41"}]}"#,
        ))
        .unwrap();
    let (status, body) = call(&app, req).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let id = body["datasetId"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(request(
            Method::GET,
            &format!("/api/admin/dataset/{id}"),
            Some(&token),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains(r#""columns":["Name","Age"]"#), "{text}");
    assert!(text.contains(r#"{"Name":"Ann","Age":"30"}"#), "{text}");
}

#[tokio::test]
async fn replace_unknown_dataset_is_not_found() {
    let app = app();
    let token = login(&app).await;

    let (status, _) = call(
        &app,
        request(
            Method::PUT,
            &format!("/api/admin/dataset/{}", uuid::Uuid::new_v4()),
            Some(&token),
            Some(json!({ "name": "Ghost", "dataRows": [] })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = call(
        &app,
        request(Method::GET, "/api/admin/datasets", Some(&token), None),
    )
    .await;
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn delete_is_idempotent() {
    let app = app();
    let token = login(&app).await;
    let id = save(&app, &token, "Gone", json!([{ "A": "1" }])).await;

    for _ in 0..2 {
        let (status, body) = call(
            &app,
            request(
                Method::DELETE,
                &format!("/api/admin/dataset/{id}"),
                Some(&token),
                None,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "success": true }));
    }
}

#[tokio::test]
async fn unpaid_view_shows_preview_only() {
    let app = app();
    let token = login(&app).await;
    let id = save(&app, &token, "Five", numbered_rows(5)).await;
    publish(&app, &token, &id, 50).await;

    let (status, body) = call(
        &app,
        request(Method::GET, &format!("/api/datasets/{id}"), None, None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["rows"].as_array().unwrap().len(), 3);
    assert_eq!(body["totalRows"], 5);
    assert_eq!(body["lockedCount"], 2);
    assert_eq!(body["isPaid"], false);
    assert_eq!(body["columns"], json!(["n"]));

    let (_, body) = call(
        &app,
        request(
            Method::GET,
            &format!("/api/datasets/{id}?paid=true"),
            None,
            None,
        ),
    )
    .await;
    assert_eq!(body["rows"].as_array().unwrap().len(), 5);
    assert_eq!(body["lockedCount"], 0);
}

#[tokio::test]
async fn drafts_are_hidden_from_storefront() {
    let app = app();
    let token = login(&app).await;
    let id = save(&app, &token, "Draft", numbered_rows(1)).await;

    let (status, _) = call(
        &app,
        request(Method::GET, &format!("/api/datasets/{id}"), None, None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = call(&app, request(Method::GET, "/api/datasets", None, None)).await;
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn save_can_publish_immediately() {
    let app = app();
    let token = login(&app).await;

    let (status, body) = call(
        &app,
        request(
            Method::POST,
            "/api/admin/save",
            Some(&token),
            Some(json!({ "name": "Live", "dataRows": numbered_rows(1), "isPublished": true })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let id = body["datasetId"].as_str().unwrap().to_string();

    let (status, body) = call(
        &app,
        request(Method::GET, &format!("/api/datasets/{id}"), None, None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["dataset"]["isPublished"], true);
}

#[tokio::test]
async fn catalogue_filters_by_search_and_price() {
    let app = app();
    let token = login(&app).await;
    let gdp = save(&app, &token, "World GDP", numbered_rows(1)).await;
    let rain = save(&app, &token, "Rainfall", numbered_rows(1)).await;
    publish(&app, &token, &gdp, 0).await;
    publish(&app, &token, &rain, 20).await;

    let (_, body) = call(
        &app,
        request(Method::GET, "/api/datasets?search=gdp", None, None),
    )
    .await;
    let names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["World GDP"]);

    let (_, body) = call(
        &app,
        request(Method::GET, "/api/datasets?price=paid", None, None),
    )
    .await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["name"], "Rainfall");
    assert_eq!(body[0]["rowCount"], 1);
}

#[tokio::test]
async fn checkout_redirects_with_paid_flag() {
    let app = app();
    let token = login(&app).await;
    let id = save(&app, &token, "Buyable", numbered_rows(1)).await;
    publish(&app, &token, &id, 50).await;

    let response = app
        .clone()
        .oneshot(request(
            Method::GET,
            &format!("/api/checkout?datasetId={id}"),
            None,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        response.headers()[LOCATION],
        format!("/dataset/{id}?paid=true").as_str()
    );

    let (status, _) = call(&app, request(Method::GET, "/api/checkout", None, None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn csv_download_requires_payment() {
    let app = app();
    let token = login(&app).await;
    let id = save(&app, &token, "Export", json!([{ "A": "1,5" }])).await;
    publish(&app, &token, &id, 50).await;

    let (status, _) = call(
        &app,
        request(Method::GET, &format!("/api/datasets/{id}/csv"), None, None),
    )
    .await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);

    let response = app
        .clone()
        .oneshot(request(
            Method::GET,
            &format!("/api/datasets/{id}/csv?paid=true"),
            None,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/csv"));
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(std::str::from_utf8(&bytes).unwrap(), "A\n\"1,5\"\n");
}

#[tokio::test]
async fn send_mail_validates_and_succeeds() {
    let app = app();
    let token = login(&app).await;
    let id = save(&app, &token, "Mailed", numbered_rows(1)).await;
    publish(&app, &token, &id, 50).await;

    let (status, _) = call(
        &app,
        request(
            Method::POST,
            "/api/send-mail",
            None,
            Some(json!({ "datasetId": id })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = call(
        &app,
        request(
            Method::POST,
            "/api/send-mail",
            None,
            Some(json!({ "email": "buyer@example.com", "datasetId": id })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
}

#[tokio::test]
async fn blog_slugs_are_unique_and_drafts_hidden() {
    let app = app();
    let token = login(&app).await;
    let post = json!({
        "title": "Launch",
        "slug": "launch",
        "description": "We launched",
        "content": "# Hello",
        "categories": ["news"],
        "tags": [],
        "isPublished": false
    });

    let (status, created) = call(
        &app,
        request(Method::POST, "/api/admin/blog", Some(&token), Some(post.clone())),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(created["publishedAt"].is_null());

    let (status, _) = call(
        &app,
        request(Method::POST, "/api/admin/blog", Some(&token), Some(post.clone())),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = call(&app, request(Method::GET, "/api/blog/launch", None, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let mut published = post;
    published["isPublished"] = json!(true);
    let id = created["id"].as_str().unwrap();
    let (status, updated) = call(
        &app,
        request(
            Method::PUT,
            &format!("/api/admin/blog/{id}"),
            Some(&token),
            Some(published),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(updated["publishedAt"].is_string());

    let (status, body) = call(&app, request(Method::GET, "/api/blog/launch", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Launch");
}

#[tokio::test]
async fn unknown_route_is_json_not_found() {
    let (status, body) = call(&app(), request(Method::GET, "/api/nope", None, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());
}
