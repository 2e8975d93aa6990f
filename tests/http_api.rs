//! Drives the router end to end with an in-memory store.

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use testresult::TestResult;
use tower::ServiceExt;
use uuid::Uuid;

use kars::api::auth::{AuthError, Authenticator, Principal, Role};
use kars::api::{router, AppState};
use kars::domain::aggregates::User;
use kars::services::{EventBus, Services};
use kars::store::MemoryStore;

const USER_TOKEN: &str = "user-token";
const ADMIN_TOKEN: &str = "admin-token";

struct FixedTokens(HashMap<String, Principal>);

#[async_trait]
impl Authenticator for FixedTokens {
    async fn authenticate(&self, token: &str) -> Result<Principal, AuthError> {
        self.0.get(token).copied().ok_or(AuthError::InvalidToken)
    }
}

async fn app() -> Router {
    let store = Arc::new(MemoryStore::new());
    let user = User::register("tara", "tara@example.com");
    store.insert_user(user.clone()).await;

    let tokens = FixedTokens(HashMap::from([
        (USER_TOKEN.to_string(), Principal { subject_id: user.id, role: Role::User }),
        (ADMIN_TOKEN.to_string(), Principal { subject_id: Uuid::now_v7(), role: Role::Admin }),
    ]));
    let services = Services::new(store, EventBus::default());
    router(AppState::new(services, Arc::new(tokens)))
}

async fn call(app: &Router, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> TestResult<(StatusCode, Value)> {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        request = request.header("authorization", format!("Bearer {token}"));
    }
    let body = match body {
        Some(json) => {
            request = request.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = app.clone().oneshot(request.body(body)?).await?;
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes)? };
    Ok((status, value))
}

fn decimal(value: &Value) -> Decimal {
    match value {
        Value::String(s) => s.parse().unwrap(),
        other => other.to_string().parse().unwrap(),
    }
}

/// Catalog with one product and a user with one address. Returns
/// `(product_id, address_id)`.
async fn seed(app: &Router, price: u32) -> TestResult<(String, String)> {
    let (status, category) = call(app, "POST", "/api/v1/admin/categories", Some(ADMIN_TOKEN), Some(json!({ "name": "Audio" }))).await?;
    assert_eq!(status, StatusCode::CREATED);

    let product = json!({
        "name": "Earbuds",
        "description": "Wireless",
        "price": price,
        "quantity": 10,
        "category_id": category["id"],
    });
    let (status, product) = call(app, "POST", "/api/v1/admin/products", Some(ADMIN_TOKEN), Some(product)).await?;
    assert_eq!(status, StatusCode::CREATED, "{product}");

    let address = json!({
        "name": "Tara",
        "phone_no": "9811122233",
        "address_line1": "7 Park Street",
        "city": "Kolkata",
        "state": "West Bengal",
        "postal_code": "700016",
        "country": "India",
        "type": "shipping",
    });
    let (status, address) = call(app, "POST", "/api/v1/addresses", Some(USER_TOKEN), Some(address)).await?;
    assert_eq!(status, StatusCode::CREATED, "{address}");

    let id = |v: &Value| v["id"].as_str().unwrap_or_default().to_string();
    Ok((id(&product), id(&address)))
}

#[tokio::test]
async fn test_health() -> TestResult {
    let (status, body) = call(&app().await, "GET", "/health", None, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "healthy", "service": "kars" }));
    Ok(())
}

#[tokio::test]
async fn test_authentication_and_roles() -> TestResult {
    let app = app().await;

    let (status, body) = call(&app, "GET", "/api/v1/cart", None, None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());

    let (status, _) = call(&app, "GET", "/api/v1/cart", Some("stolen"), None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = call(&app, "GET", "/api/v1/admin/orders", Some(USER_TOKEN), None).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = call(&app, "GET", "/api/v1/wallet", Some(ADMIN_TOKEN), None).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn test_checkout_and_admin_shipping() -> TestResult {
    let app = app().await;
    let (product_id, address_id) = seed(&app, 600).await?;

    let (status, cart) = call(&app, "POST", &format!("/api/v1/cart/{product_id}"), Some(USER_TOKEN), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cart["total_items"], 1);

    let request = json!({ "address_id": address_id, "payment_method": "cash on delivery" });
    let (status, order) = call(&app, "POST", "/api/v1/orders", Some(USER_TOKEN), Some(request)).await?;
    assert_eq!(status, StatusCode::CREATED, "{order}");
    assert_eq!(decimal(&order["final_price"]), Decimal::new(630, 0));
    assert_eq!(order["status"], "placed");
    assert_eq!(order["address"]["city"], "Kolkata");
    let order_id = order["id"].as_str().unwrap_or_default().to_string();

    let (status, orders) = call(&app, "GET", "/api/v1/orders", Some(USER_TOKEN), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(orders.as_array().map(Vec::len), Some(1));

    let (status, _) = call(&app, "GET", "/api/v1/cart", Some(USER_TOKEN), None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, shipped) = call(&app, "POST", &format!("/api/v1/admin/orders/{order_id}/ship"), Some(ADMIN_TOKEN), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(shipped["status"], "shipped");

    let (status, body) = call(&app, "POST", &format!("/api/v1/orders/{order_id}/cancel"), Some(USER_TOKEN), None).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "order already shipped");
    Ok(())
}

#[tokio::test]
async fn test_rejected_inputs() -> TestResult {
    let app = app().await;
    let (product_id, address_id) = seed(&app, 100).await?;

    let (status, _) = call(&app, "POST", "/api/v1/admin/categories", Some(ADMIN_TOKEN), Some(json!({ "name": "audio" }))).await?;
    assert_eq!(status, StatusCode::CONFLICT);

    let bad_phone = json!({
        "name": "Tara", "phone_no": "123", "address_line1": "7 Park Street", "city": "Kolkata",
        "state": "West Bengal", "postal_code": "700016", "country": "India", "type": "billing",
    });
    let (status, body) = call(&app, "POST", "/api/v1/addresses", Some(USER_TOKEN), Some(bad_phone)).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    call(&app, "POST", &format!("/api/v1/cart/{product_id}"), Some(USER_TOKEN), None).await?;
    let request = json!({ "address_id": address_id, "payment_method": "cheque" });
    let (status, body) = call(&app, "POST", "/api/v1/orders", Some(USER_TOKEN), Some(request)).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid payment method: 'cheque'");

    let (status, _) = call(&app, "GET", &format!("/api/v1/orders/{}", Uuid::now_v7()), Some(USER_TOKEN), None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = call(&app, "GET", "/api/v1/wallet", Some(USER_TOKEN), None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "wallet not found");
    Ok(())
}

#[tokio::test]
async fn test_coupon_admin_and_reports() -> TestResult {
    let app = app().await;
    let coupon = json!({
        "name": "WELCOME",
        "code": "WELCOME50",
        "discount_type": "fixed",
        "discount_value": 50,
        "minimum_amount": 200,
        "usage_limit": 1,
        "start_date": "2020-01-01",
        "expiry_date": "2999-01-01",
    });
    let (status, created) = call(&app, "POST", "/api/v1/admin/coupons", Some(ADMIN_TOKEN), Some(coupon.clone())).await?;
    assert_eq!(status, StatusCode::CREATED, "{created}");

    let (status, _) = call(&app, "POST", "/api/v1/admin/coupons", Some(ADMIN_TOKEN), Some(coupon)).await?;
    assert_eq!(status, StatusCode::CONFLICT);

    let coupon_id = created["id"].as_str().unwrap_or_default();
    let (status, edited) = call(&app, "PATCH", &format!("/api/v1/admin/coupons/{coupon_id}"), Some(ADMIN_TOKEN), Some(json!({ "is_active": false }))).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(edited["is_active"], false);

    let (status, report) = call(&app, "GET", "/api/v1/admin/reports/sales?period=weekly", Some(ADMIN_TOKEN), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["orders"]["total"], 0);

    let (status, _) = call(&app, "GET", "/api/v1/admin/reports/sales?period=hourly", Some(ADMIN_TOKEN), None).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, top) = call(&app, "GET", "/api/v1/admin/reports/top-selling", Some(ADMIN_TOKEN), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(top["products"], json!([]));
    Ok(())
}
