use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use uuid::Uuid;
use villa_api::middleware::SessionClaims;
use villa_api::{app, AppState, AuthConfig};
use villa_booking::testing::RecordingNotifier;
use villa_booking::{
    Aggregator, AvailabilityCalculator, BookingLedger, DispatchPolicy, LedgerRules,
    NotificationDispatcher, OtpTtls, Stores, VerificationService,
};
use villa_core::clock::ManualClock;
use villa_core::models::{Place, Role, User};
use villa_core::notify::Notification;
use villa_store::app_config::RateLimitConfig;
use villa_store::MemoryStore;

const SECRET: &str = "test-secret";

struct TestApp {
    router: Router,
    store: Arc<MemoryStore>,
    recorder: Arc<RecordingNotifier>,
    clock: Arc<ManualClock>,
    guest: User,
    owner: User,
    admin: User,
    place: Place,
}

fn user(name: &str, role: Role, verified: bool) -> User {
    User {
        id: Uuid::new_v4(),
        name: name.to_string(),
        email: format!("{}@example.com", name.to_lowercase()),
        role,
        verified,
    }
}

async fn setup() -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let recorder = Arc::new(RecordingNotifier::new());
    let clock = Arc::new(ManualClock::new(Utc::now()));

    let guest = user("Jane", Role::User, false);
    let owner = user("Olive", Role::VillaOwner, true);
    let admin = user("Ada", Role::Admin, true);
    for u in [&guest, &owner, &admin] {
        store.insert_user(u.clone()).await;
    }
    let place = Place {
        id: Uuid::new_v4(),
        owner_id: owner.id,
        title: "Cliff House".to_string(),
        price: Decimal::from(150),
        max_guests: 4,
    };
    store.insert_place(place.clone()).await;

    let stores = Stores {
        bookings: store.clone(),
        places: store.clone(),
        users: store.clone(),
        verifications: store.clone(),
    };
    let dispatcher = NotificationDispatcher::new(
        recorder.clone(),
        DispatchPolicy::Inline { timeout: Duration::from_secs(1) },
    );

    let state = AppState {
        ledger: Arc::new(BookingLedger::new(
            stores.clone(),
            dispatcher.clone(),
            clock.clone(),
            LedgerRules::default(),
        )),
        availability: Arc::new(AvailabilityCalculator::new(store.clone())),
        verification: Arc::new(VerificationService::new(
            stores.clone(),
            dispatcher,
            clock.clone(),
            OtpTtls::default(),
        )),
        aggregator: Arc::new(Aggregator::new(stores)),
        redis: None,
        rate_limit: RateLimitConfig::default(),
        auth: AuthConfig { secret: SECRET.to_string() },
    };

    TestApp { router: app(state), store, recorder, clock, guest, owner, admin, place }
}

fn token_for(u: &User) -> String {
    let claims = SessionClaims {
        sub: u.id.to_string(),
        email: u.email.clone(),
        role: u.role,
        exp: (Utc::now() + ChronoDuration::hours(1)).timestamp() as usize,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET.as_bytes())).unwrap()
}

async fn send(router: &Router, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, json)
}

fn booking_body(place: &Place, check_in: &str, check_out: &str, nights: i64) -> Value {
    json!({
        "place": place.id,
        "checkIn": check_in,
        "checkOut": check_out,
        "numberOfGuests": 2,
        "name": "Jane",
        "phone": "+15550100",
        "price": (place.price * Decimal::from(nights)).to_string(),
        "paymentId": "pay_123",
    })
}

async fn book(t: &TestApp, check_in: &str, check_out: &str, nights: i64) -> Value {
    let token = token_for(&t.guest);
    let (status, body) = send(
        &t.router,
        "POST",
        "/bookings",
        Some(&token),
        Some(booking_body(&t.place, check_in, check_out, nights)),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    body
}

#[tokio::test]
async fn test_health() {
    let t = setup().await;
    let (status, body) = send(&t.router, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn test_booking_shows_in_availability() {
    let t = setup().await;
    let booking = book(&t, "2024-06-10T00:00:00.000Z", "2024-06-12", 2).await;
    assert_eq!(booking["checkIn"], "2024-06-10");
    assert_eq!(booking["place"], json!(t.place.id));

    let (status, dates) = send(&t.router, "GET", &format!("/bookings/{}", t.place.id), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dates, json!(["2024-06-10", "2024-06-11", "2024-06-12"]));

    let sent = t.recorder.sent();
    assert!(matches!(&sent[..], [Notification::BookingConfirmed { to, .. }] if to == &t.guest.email));
}

#[tokio::test]
async fn test_create_requires_session_and_payment() {
    let t = setup().await;
    let body = booking_body(&t.place, "2024-06-10", "2024-06-12", 2);

    let (status, _) = send(&t.router, "POST", "/bookings", None, Some(body.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&t.router, "POST", "/bookings", Some("not-a-jwt"), Some(body.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let mut unpaid = body;
    unpaid.as_object_mut().unwrap().remove("paymentId");
    let token = token_for(&t.guest);
    let (status, err) = send(&t.router, "POST", "/bookings", Some(&token), Some(unpaid)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(err["error"].is_string());
    assert_eq!(t.store.booking_count().await, 0);
}

#[tokio::test]
async fn test_malformed_body_uses_error_shape() {
    let t = setup().await;
    let token = token_for(&t.guest);
    let (status, err) = send(&t.router, "POST", "/bookings", Some(&token), Some(json!({ "place": "nope" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(err["error"].is_string());

    let (status, _) = send(&t.router, "GET", "/bookings/not-a-uuid", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_overlap_and_price_checks() {
    let t = setup().await;
    book(&t, "2024-06-10", "2024-06-12", 2).await;
    let token = token_for(&t.guest);

    let (status, _) = send(
        &t.router,
        "POST",
        "/bookings",
        Some(&token),
        Some(booking_body(&t.place, "2024-06-12", "2024-06-14", 2)),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let mut cheap = booking_body(&t.place, "2024-07-01", "2024-07-03", 2);
    cheap["price"] = json!(1);
    let (status, _) = send(&t.router, "POST", "/bookings", Some(&token), Some(cheap)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(t.store.booking_count().await, 1);
}

#[tokio::test]
async fn test_cookie_session() {
    let t = setup().await;
    book(&t, "2024-06-10", "2024-06-12", 2).await;

    let request = Request::builder()
        .uri("/bookings")
        .header(header::COOKIE, format!("token={}", token_for(&t.guest)))
        .body(Body::empty())
        .unwrap();
    let response = t.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let listed: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["place"]["title"], "Cliff House");
}

#[tokio::test]
async fn test_direct_delete() {
    let t = setup().await;
    let booking = book(&t, "2024-06-10", "2024-06-12", 2).await;
    let id = booking["id"].as_str().unwrap().to_string();

    let (status, _) = send(&t.router, "DELETE", &format!("/bookings/{}", id), Some(&token_for(&t.owner)), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&t.router, "DELETE", &format!("/bookings/{}", id), Some(&token_for(&t.guest)), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].is_string());
    assert_eq!(t.store.booking_count().await, 0);
}

#[tokio::test]
async fn test_cancellation_with_otp() {
    let t = setup().await;
    let booking = book(&t, "2024-06-10", "2024-06-12", 2).await;
    let token = token_for(&t.guest);
    let id = booking["id"].clone();

    let (status, body) = send(&t.router, "POST", "/request-cancel-booking", Some(&token), Some(json!({ "bookingId": id }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "OTP sent");
    let code = t.recorder.last_code_for(&t.guest.email).unwrap();
    let wrong = if code == 999_999 { 100_000 } else { code + 1 };

    let (status, body) = send(&t.router, "POST", "/verify-cancel-booking", Some(&token), Some(json!({ "bookingId": id, "otp": wrong }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid OTP");

    let (status, _) = send(
        &t.router,
        "POST",
        "/verify-cancel-booking",
        Some(&token),
        Some(json!({ "bookingId": id, "otp": code.to_string() })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(t.store.booking_count().await, 0);

    let last = t.recorder.sent().pop().unwrap();
    assert!(matches!(last, Notification::BookingCancelled { ref to, .. } if to == &t.guest.email));

    let (_, dates) = send(&t.router, "GET", &format!("/bookings/{}", t.place.id), None, None).await;
    assert_eq!(dates, json!([]));
}

#[tokio::test]
async fn test_cancellation_code_expires() {
    let t = setup().await;
    let booking = book(&t, "2024-06-10", "2024-06-12", 2).await;
    let token = token_for(&t.guest);
    let id = booking["id"].clone();

    send(&t.router, "POST", "/request-cancel-booking", Some(&token), Some(json!({ "bookingId": id }))).await;
    let code = t.recorder.last_code_for(&t.guest.email).unwrap();

    t.clock.advance(ChronoDuration::seconds(31));
    let (status, body) = send(&t.router, "POST", "/verify-cancel-booking", Some(&token), Some(json!({ "bookingId": id, "otp": code }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "OTP has expired");
    assert_eq!(t.store.booking_count().await, 1);

    let (status, _) = send(&t.router, "POST", "/resend-cancel-otp", Some(&token), Some(json!({ "bookingId": id }))).await;
    assert_eq!(status, StatusCode::OK);
    let fresh = t.recorder.last_code_for(&t.guest.email).unwrap();
    let (status, _) = send(&t.router, "POST", "/verify-cancel-booking", Some(&token), Some(json!({ "bookingId": id, "otp": fresh }))).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_concurrent_cancel_verification() {
    let t = setup().await;
    let booking = book(&t, "2024-06-10", "2024-06-12", 2).await;
    let token = token_for(&t.guest);
    let id = booking["id"].clone();

    send(&t.router, "POST", "/request-cancel-booking", Some(&token), Some(json!({ "bookingId": id }))).await;
    let code = t.recorder.last_code_for(&t.guest.email).unwrap();
    let body = json!({ "bookingId": id, "otp": code });

    let (a, b) = tokio::join!(
        send(&t.router, "POST", "/verify-cancel-booking", Some(&token), Some(body.clone())),
        send(&t.router, "POST", "/verify-cancel-booking", Some(&token), Some(body.clone())),
    );
    let mut statuses = vec![a.0, b.0];
    statuses.sort();
    assert_eq!(statuses, vec![StatusCode::OK, StatusCode::NOT_FOUND]);
    assert_eq!(t.store.booking_count().await, 0);
}

#[tokio::test]
async fn test_cancel_by_non_owner_is_forbidden() {
    let t = setup().await;
    let booking = book(&t, "2024-06-10", "2024-06-12", 2).await;

    let (status, _) = send(
        &t.router,
        "POST",
        "/request-cancel-booking",
        Some(&token_for(&t.admin)),
        Some(json!({ "bookingId": booking["id"] })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(t.store.booking_count().await, 1);
}

#[tokio::test]
async fn test_email_verification() {
    let t = setup().await;

    let (status, _) = send(&t.router, "POST", "/verify-otp", None, Some(json!({ "email": t.guest.email, "otp": 123456 }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&t.router, "POST", "/resend-otp", None, Some(json!({ "email": t.guest.email }))).await;
    assert_eq!(status, StatusCode::OK);
    let code = t.recorder.last_code_for(&t.guest.email).unwrap();

    let (status, body) = send(
        &t.router,
        "POST",
        "/verify-otp",
        None,
        Some(json!({ "email": t.guest.email, "otp": code.to_string() })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);

    let (status, _) = send(&t.router, "POST", "/resend-otp", None, Some(json!({ "email": t.guest.email }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&t.router, "POST", "/resend-otp", None, Some(json!({ "email": "ghost@example.com" }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_role_gates() {
    let t = setup().await;
    let guest = token_for(&t.guest);

    let (status, _) = send(&t.router, "GET", "/admin/stats", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = send(&t.router, "GET", "/admin/stats", Some(&guest), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&t.router, "GET", "/villa-owner/stats", Some(&token_for(&t.admin)), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&t.router, "GET", "/owner-customers", Some(&guest), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_owner_dashboard() {
    let t = setup().await;
    let owner = token_for(&t.owner);

    let (status, stats) = send(&t.router, "GET", "/villa-owner/stats", Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["totalVillas"], 1);
    assert_eq!(stats["totalUsers"], 0);
    assert_eq!(stats["totalEarnings"], "0");

    for (from, to) in [("2024-06-01", "2024-06-02"), ("2024-06-05", "2024-06-06"), ("2024-06-09", "2024-06-10"), ("2024-06-13", "2024-06-14")] {
        book(&t, from, to, 1).await;
    }

    let (_, stats) = send(&t.router, "GET", "/villa-owner/stats", Some(&owner), None).await;
    assert_eq!(stats["totalBookings"], 4);
    assert_eq!(stats["totalUsers"], 1);

    let (status, recent) = send(&t.router, "GET", "/owner-bookings?type=recent", Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);
    let recent = recent.as_array().unwrap();
    assert_eq!(recent.len(), 3);
    assert_eq!(recent[0]["checkIn"], "2024-06-13");
    assert_eq!(recent[0]["villa"], "Cliff House");
    assert_eq!(recent[0]["user"], "Jane");

    let (_, all) = send(&t.router, "GET", "/owner-bookings?type=all", Some(&owner), None).await;
    assert_eq!(all.as_array().unwrap().len(), 4);

    let (_, customers) = send(&t.router, "GET", "/owner-customers", Some(&owner), None).await;
    assert_eq!(customers["customers"], json!([{ "_id": t.guest.id, "name": "Jane", "phone": "+15550100" }]));
}

#[tokio::test]
async fn test_admin_dashboard() {
    let t = setup().await;
    let admin = token_for(&t.admin);
    for day in 1..=6 {
        let from = format!("2024-08-{:02}", day * 3);
        let to = format!("2024-08-{:02}", day * 3 + 1);
        book(&t, &from, &to, 1).await;
    }
    t.store.remove_place(t.place.id).await;

    let (status, stats) = send(&t.router, "GET", "/admin/stats", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["totalVillas"], 0);
    assert_eq!(stats["totalBookings"], 6);
    assert_eq!(stats["totalUsers"], 3);

    let (_, recent) = send(&t.router, "GET", "/admin/bookings/recent", Some(&admin), None).await;
    let recent = recent.as_array().unwrap();
    assert_eq!(recent.len(), 5);
    assert_eq!(recent[0]["checkIn"], "2024-08-18");
    assert_eq!(recent[0]["villa"], "N/A");

    let (_, all) = send(&t.router, "GET", "/admin/bookings", Some(&admin), None).await;
    assert_eq!(all.as_array().unwrap().len(), 6);
}
