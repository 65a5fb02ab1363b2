use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use estate_core::Database;
use estate_server::{build_router, AppState};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

struct TestApp {
    router: Router,
    _dir: TempDir,
}

impl TestApp {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::init(dir.path().join("estate.sqlite3")).unwrap();
        Self {
            router: build_router(AppState::new(db)),
            _dir: dir,
        }
    }

    async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn create_location(&self, city_name: &str) -> String {
        let (status, body) = self
            .send(
                Method::POST,
                "/api/location",
                Some(json!({ "cityName": city_name })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_str().unwrap().to_string()
    }

    async fn create_property(&self, body: Value) -> String {
        let (status, body) = self.send(Method::POST, "/api/properties", Some(body)).await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_str().unwrap().to_string()
    }
}

#[tokio::test]
async fn ping_reports_version() {
    let app = TestApp::new();
    let (status, body) = app.send(Method::GET, "/api/ping", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ping"], "pong");
    assert!(body["version"].as_str().is_some_and(|v| !v.is_empty()));
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let app = TestApp::new();
    let (status, _) = app.send(Method::GET, "/does-not-exist", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn assign_then_unassign_over_http() {
    let app = TestApp::new();

    let l1 = app.create_location("Pune").await;
    let p1 = app
        .create_property(json!({ "propertyName": "Villa A", "Location": l1 }))
        .await;

    let (status, body) = app
        .send(Method::GET, &format!("/api/location/{l1}"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cityName"], "Pune");
    assert_eq!(body["propertyRefs"].as_array().unwrap().len(), 1);
    assert_eq!(body["propertyRefs"][0]["id"], p1.as_str());
    assert_eq!(body["propertyRefs"][0]["propertyName"], "Villa A");

    let (status, body) = app
        .send(
            Method::PUT,
            &format!("/api/properties/{p1}"),
            Some(json!({ "Location": null })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert_eq!(body["id"], p1.as_str());

    let (_, body) = app
        .send(Method::GET, &format!("/api/location/{l1}"), None)
        .await;
    assert_eq!(body["propertyRefs"], json!([]));

    let (_, body) = app.send(Method::GET, "/api/integrity", None).await;
    assert_eq!(body["violations"], json!([]));
}

#[tokio::test]
async fn created_property_uses_defaults_and_wire_names() {
    let app = TestApp::new();
    let (status, body) = app
        .send(Method::POST, "/api/properties", Some(json!({})))
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["propertyName"], "");
    assert_eq!(body["propertyType"], "Flat");
    assert!(body["propertyPoster"]
        .as_str()
        .unwrap()
        .starts_with("https://"));
    assert!(body["Location"].is_null());
    assert!(body["propertyPrice"].is_null());
}

#[tokio::test]
async fn property_reads_populate_location_unless_disabled() {
    let app = TestApp::new();
    let l1 = app.create_location("Pune").await;
    let p1 = app
        .create_property(json!({
            "propertyName": "Villa A",
            "propertyType": "Independent Home",
            "propertyPrice": "2500000",
            "Location": l1,
        }))
        .await;

    let (status, body) = app.send(Method::GET, "/api/properties", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["Location"]["cityName"], "Pune");
    assert_eq!(body[0]["propertyType"], "Independent Home");
    assert_eq!(body[0]["propertyPrice"], 2_500_000.0);

    let (_, body) = app
        .send(Method::GET, "/api/properties?populate=false", None)
        .await;
    assert_eq!(body[0]["Location"], l1.as_str());

    let (_, body) = app
        .send(Method::GET, &format!("/api/properties/{p1}"), None)
        .await;
    assert_eq!(body["Location"]["id"], l1.as_str());

    let (_, body) = app
        .send(
            Method::GET,
            &format!("/api/properties/{p1}?populate=false"),
            None,
        )
        .await;
    assert_eq!(body["Location"], l1.as_str());
}

#[tokio::test]
async fn reassign_over_http_moves_back_reference() {
    let app = TestApp::new();
    let l1 = app.create_location("Pune").await;
    let l2 = app.create_location("Mumbai").await;
    let p1 = app.create_property(json!({ "Location": l1 })).await;

    let (status, _) = app
        .send(
            Method::PUT,
            &format!("/api/properties/{p1}"),
            Some(json!({ "Location": l2 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = app.send(Method::GET, "/api/location", None).await;
    let locations = body.as_array().unwrap();
    assert_eq!(locations.len(), 2);
    assert_eq!(locations[0]["propertyRefs"], json!([]));
    assert_eq!(locations[1]["propertyRefs"][0]["id"], p1.as_str());
}

#[tokio::test]
async fn duplicate_city_name_is_conflict() {
    let app = TestApp::new();
    app.create_location("Pune").await;

    let (status, body) = app
        .send(
            Method::POST,
            "/api/location",
            Some(json!({ "cityName": "Pune" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["ok"], false);
    assert_eq!(body["error"]["kind"], "DuplicateKey");

    let (_, body) = app.send(Method::GET, "/api/location", None).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn dangling_location_reference_is_unprocessable() {
    let app = TestApp::new();
    let (status, body) = app
        .send(
            Method::POST,
            "/api/properties",
            Some(json!({ "Location": uuid::Uuid::new_v4() })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["kind"], "DanglingReference");

    let (_, body) = app.send(Method::GET, "/api/properties", None).await;
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn validation_failures_are_bad_request() {
    let app = TestApp::new();

    let (status, body) = app
        .send(Method::POST, "/api/location", Some(json!({ "cityName": " " })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["kind"], "ValidationError");

    let l1 = app.create_location("Pune").await;
    let (status, body) = app
        .send(
            Method::PUT,
            &format!("/api/location/{l1}"),
            Some(json!({ "propertyRefs": [] })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["kind"], "ValidationError");

    let (status, body) = app
        .send(Method::GET, "/api/location/not-a-uuid", None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["kind"], "ValidationError");

    let (status, _) = app
        .send(
            Method::DELETE,
            &format!("/api/location/{l1}?policy=vaporize"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn missing_records_are_not_found() {
    let app = TestApp::new();
    let missing = uuid::Uuid::new_v4();

    for (method, uri, body) in [
        (Method::GET, format!("/api/location/{missing}"), None),
        (
            Method::PUT,
            format!("/api/location/{missing}"),
            Some(json!({ "streetName": "X" })),
        ),
        (Method::DELETE, format!("/api/location/{missing}"), None),
        (Method::GET, format!("/api/properties/{missing}"), None),
        (
            Method::PUT,
            format!("/api/properties/{missing}"),
            Some(json!({ "propertyName": "X" })),
        ),
        (Method::DELETE, format!("/api/properties/{missing}"), None),
    ] {
        let (status, response) = app.send(method, &uri, body).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
        assert_eq!(response["error"]["kind"], "NotFound");
    }
}

#[tokio::test]
async fn delete_location_defaults_to_orphan_policy() {
    let app = TestApp::new();
    let l1 = app.create_location("Pune").await;
    let p1 = app.create_property(json!({ "Location": l1 })).await;

    let (status, body) = app
        .send(Method::DELETE, &format!("/api/location/{l1}"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);

    let (status, body) = app
        .send(
            Method::GET,
            &format!("/api/properties/{p1}?populate=false"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["Location"].is_null());
}

#[tokio::test]
async fn delete_location_with_cascade_removes_properties() {
    let app = TestApp::new();
    let l1 = app.create_location("Pune").await;
    let p1 = app.create_property(json!({ "Location": l1 })).await;

    let (status, _) = app
        .send(
            Method::DELETE,
            &format!("/api/location/{l1}?policy=cascade"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .send(Method::GET, &format!("/api/properties/{p1}"), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = app.send(Method::GET, "/api/integrity", None).await;
    assert_eq!(body["propertiesChecked"], 0);
    assert_eq!(body["violations"], json!([]));
}

#[tokio::test]
async fn delete_property_removes_it_from_location() {
    let app = TestApp::new();
    let l1 = app.create_location("Pune").await;
    let p1 = app.create_property(json!({ "Location": l1 })).await;

    let (status, body) = app
        .send(Method::DELETE, &format!("/api/properties/{p1}"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "property deleted");

    let (_, body) = app
        .send(Method::GET, &format!("/api/location/{l1}"), None)
        .await;
    assert_eq!(body["propertyRefs"], json!([]));
}

#[tokio::test]
async fn cors_preflight_allows_any_origin() {
    let app = TestApp::new();
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/location")
        .header(header::ORIGIN, "http://localhost:3000")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap();

    let response = app.router.clone().oneshot(request).await.unwrap();
    assert!(response.status().is_success());
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        "*"
    );
}
