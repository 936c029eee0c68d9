mod common;

use std::net::SocketAddr;

use axum::body::{to_bytes, Body};
use axum::extract::ConnectInfo;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use common::*;
use transfer_booking_backend::entities::trip::TripStatus;
use transfer_booking_backend::entities::user::UserRole;
use transfer_booking_backend::routes::create_router;
use transfer_booking_backend::utils::jwt::create_token;

fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let body = match body {
        Some(value) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };

    let mut request = builder.body(body).unwrap();
    // The per-IP limiter keys on the peer address.
    request
        .extensions_mut()
        .insert(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 40000))));
    request
}

async fn call(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

async fn register(router: &Router, email: &str) -> String {
    let (status, body) = call(
        router,
        request(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({
                "email": email,
                "password": "correct horse",
                "name": "Ana García",
                "phone": "+34 600 111 222"
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_register_login_and_me() {
    let app = setup().await;
    let router = create_router(app.state.clone());

    register(&router, "Ana@Example.com").await;

    let (status, _) = call(
        &router,
        request(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({ "email": "ana@example.com", "password": "another one", "name": "Ana" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = call(
        &router,
        request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": "ana@example.com", "password": "wrong password" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = call(
        &router,
        request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": "ana@example.com", "password": "correct horse" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["role"], "client");
    let token = body["token"].as_str().unwrap().to_string();

    let (status, body) = call(&router, request("GET", "/api/auth/me", Some(&token), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "ana@example.com");
}

#[tokio::test]
async fn test_client_books_and_admin_confirms() {
    let app = setup().await;
    let router = create_router(app.state.clone());
    let trip = insert_trip(app.db(), TripStatus::Available).await;

    let admin = insert_user(app.db(), UserRole::Admin, "boss@transfers.test").await;
    let admin_token = create_token(&admin, &app.state.config.jwt_secret, 1).unwrap();
    let client_token = register(&router, "traveller@example.com").await;
    let other_token = register(&router, "someone-else@example.com").await;

    let (status, body) = call(&router, request("GET", "/api/trips", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().map(Vec::len), Some(1));

    let (status, body) = call(
        &router,
        request(
            "POST",
            "/api/reservations",
            Some(&client_token),
            Some(json!({
                "trip_id": trip.id,
                "passenger_count": 2,
                "passenger_names": ["Ana García", "Pablo García"],
                "pickup_location": "Terminal 3",
                "dropoff_location": "Hotel Puente Romano",
                "contact_phone": "+34 600 111 222",
                "flight_number": "IB3456"
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["status"], "pending");
    let reservation_id = body["id"].as_str().unwrap().to_string();

    // Booked trips leave the public catalogue
    let (_, body) = call(&router, request("GET", "/api/trips", None, None)).await;
    assert_eq!(body.as_array().map(Vec::len), Some(0));

    // Warm the cache before the status change
    let uri = format!("/api/reservations/{reservation_id}");
    let (status, _) = call(&router, request("GET", &uri, Some(&client_token), None)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = call(&router, request("GET", &uri, Some(&other_token), None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = call(&router, request("GET", "/api/admin/trips", Some(&client_token), None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let confirm = format!("/api/admin/reservations/{reservation_id}/confirm");
    let (status, body) = call(&router, request("POST", &confirm, Some(&admin_token), None)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["status"], "confirmed");

    let (status, body) = call(&router, request("POST", &confirm, Some(&admin_token), None)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].is_string());

    let (_, body) = call(&router, request("GET", &uri, Some(&client_token), None)).await;
    assert_eq!(body["status"], "confirmed");

    let rating_uri = format!("/api/ratings/{reservation_id}");
    let (status, body) = call(&router, request("GET", &rating_uri, None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["can_rate"], false);
}

#[tokio::test]
async fn test_admin_exports_workbook() {
    let app = setup().await;
    let router = create_router(app.state.clone());
    let client = insert_client(app.db()).await;
    let trip = insert_trip(app.db(), TripStatus::Booked).await;
    insert_reservation(
        app.db(),
        &trip,
        &client,
        transfer_booking_backend::entities::reservation::ReservationStatus::Pending,
    )
    .await;
    insert_driver(app.db(), 6, true).await;

    let admin = insert_user(app.db(), UserRole::Admin, "boss@transfers.test").await;
    let token = create_token(&admin, &app.state.config.jwt_secret, 1).unwrap();

    let response = router
        .clone()
        .oneshot(request("GET", "/api/admin/reports/export", Some(&token), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
    );
    assert!(response.headers()[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .starts_with("attachment;"));

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..2], b"PK");
}
