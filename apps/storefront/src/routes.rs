//! # HTTP Routes
//!
//! JSON routes over the command functions. Handlers only extract, call and
//! wrap; every rule lives in `commands/`.
//!
//! ## Route Table
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  GET    /api/health                    health                          │
//! │  GET    /api/products?limit=           catalog::list_products          │
//! │  GET    /api/products/{id}/options     catalog::get_product_options    │
//! │                                                                         │
//! │  GET    /api/cart                      cart::get_cart                  │
//! │  DELETE /api/cart                      cart::clear_cart                │
//! │  POST   /api/cart/items                cart::add_to_cart               │
//! │  PUT    /api/cart/items/{id}           cart::update_cart_item          │
//! │  DELETE /api/cart/items/{id}           cart::remove_from_cart          │
//! │  POST   /api/cart/refresh              cart::refresh_cart              │
//! │                                                                         │
//! │  POST   /api/checkout                  checkout::open_checkout         │
//! │  GET    /api/checkout                  checkout::get_checkout          │
//! │  DELETE /api/checkout                  checkout::close_checkout        │
//! │  POST   /api/checkout/delivery         checkout::choose_delivery       │
//! │  PUT    /api/checkout/customer         checkout::update_customer       │
//! │  POST   /api/checkout/advance          checkout::advance_checkout      │
//! │  POST   /api/checkout/back             checkout::back_checkout         │
//! │  POST   /api/checkout/payment-method   checkout::choose_payment_method │
//! │  PUT    /api/checkout/proof?fileName=  checkout::attach_proof (raw)    │
//! │  POST   /api/checkout/submit           checkout::submit_checkout       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, Path, Query, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing::instrument;

use crate::commands::cart::{AddToCartRequest, CartView, RefreshResponse};
use crate::commands::checkout::{AdvanceResponse, CheckoutResponse, SubmitResponse};
use crate::commands::{cart, catalog, checkout};
use crate::error::ApiError;
use crate::state::{AppState, CartState, CheckoutState, ConfigState, DbState, PaymentsState};
use layerline_core::payment::ProofFile;
use layerline_core::selection::ProductOptions;
use layerline_core::{CustomerForm, DeliveryMethod, PaymentMethod, Product, MAX_PROOF_BYTES};

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Builds the storefront router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/products", get(list_products))
        .route("/api/products/{id}/options", get(product_options))
        .route("/api/cart", get(get_cart).delete(clear_cart))
        .route("/api/cart/items", post(add_item))
        .route("/api/cart/items/{id}", put(update_item).delete(remove_item))
        .route("/api/cart/refresh", post(refresh_cart))
        .route(
            "/api/checkout",
            post(open_checkout).get(get_checkout).delete(close_checkout),
        )
        .route("/api/checkout/delivery", post(choose_delivery))
        .route("/api/checkout/customer", put(update_customer))
        .route("/api/checkout/advance", post(advance_checkout))
        .route("/api/checkout/back", post(back_checkout))
        .route("/api/checkout/payment-method", post(choose_payment_method))
        .route(
            "/api/checkout/proof",
            put(attach_proof).layer(DefaultBodyLimit::max(MAX_PROOF_BYTES + 64 * 1024)),
        )
        .route("/api/checkout/submit", post(submit_checkout))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// Bodies
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    database: bool,
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct QuantityBody {
    quantity: i64,
}

#[derive(Debug, Deserialize)]
struct DeliveryBody {
    method: DeliveryMethod,
}

#[derive(Debug, Deserialize)]
struct PaymentMethodBody {
    method: PaymentMethod,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProofQuery {
    file_name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ClosedResponse {
    closed: bool,
}

// =============================================================================
// Catalog
// =============================================================================

#[instrument(skip_all)]
async fn health(State(db): State<Arc<DbState>>) -> (StatusCode, Json<HealthResponse>) {
    let database = db.inner().health_check().await;
    let status = if database {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (
        status,
        Json(HealthResponse {
            status: if database { "ok" } else { "degraded" },
            database,
        }),
    )
}

#[instrument(skip_all)]
async fn list_products(
    State(db): State<Arc<DbState>>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<Product>> {
    catalog::list_products(&db, query.limit).await.map(Json)
}

#[instrument(skip_all)]
async fn product_options(
    State(db): State<Arc<DbState>>,
    Path(id): Path<String>,
) -> ApiResult<ProductOptions> {
    catalog::get_product_options(&db, &id).await.map(Json)
}

// =============================================================================
// Cart
// =============================================================================

#[instrument(skip_all)]
async fn get_cart(State(cart_state): State<Arc<CartState>>) -> Json<CartView> {
    Json(cart::get_cart(&cart_state))
}

#[instrument(skip_all)]
async fn clear_cart(State(cart_state): State<Arc<CartState>>) -> ApiResult<CartView> {
    cart::clear_cart(&cart_state).map(Json)
}

#[instrument(skip_all)]
async fn add_item(
    State(db): State<Arc<DbState>>,
    State(cart_state): State<Arc<CartState>>,
    Json(request): Json<AddToCartRequest>,
) -> ApiResult<CartView> {
    cart::add_to_cart(&db, &cart_state, request).await.map(Json)
}

#[instrument(skip_all)]
async fn update_item(
    State(cart_state): State<Arc<CartState>>,
    Path(id): Path<String>,
    Json(body): Json<QuantityBody>,
) -> ApiResult<CartView> {
    cart::update_cart_item(&cart_state, &id, body.quantity).map(Json)
}

#[instrument(skip_all)]
async fn remove_item(
    State(cart_state): State<Arc<CartState>>,
    Path(id): Path<String>,
) -> ApiResult<CartView> {
    cart::remove_from_cart(&cart_state, &id).map(Json)
}

#[instrument(skip_all)]
async fn refresh_cart(
    State(db): State<Arc<DbState>>,
    State(cart_state): State<Arc<CartState>>,
) -> ApiResult<RefreshResponse> {
    cart::refresh_cart(&db, &cart_state).await.map(Json)
}

// =============================================================================
// Checkout
// =============================================================================

#[instrument(skip_all)]
async fn open_checkout(
    State(cart_state): State<Arc<CartState>>,
    State(session): State<Arc<CheckoutState>>,
    State(config): State<Arc<ConfigState>>,
) -> ApiResult<CheckoutResponse> {
    checkout::open_checkout(&cart_state, &session, &config).map(Json)
}

#[instrument(skip_all)]
async fn get_checkout(
    State(cart_state): State<Arc<CartState>>,
    State(session): State<Arc<CheckoutState>>,
    State(config): State<Arc<ConfigState>>,
) -> ApiResult<CheckoutResponse> {
    checkout::get_checkout(&cart_state, &session, &config).map(Json)
}

#[instrument(skip_all)]
async fn close_checkout(State(session): State<Arc<CheckoutState>>) -> ApiResult<ClosedResponse> {
    checkout::close_checkout(&session).map(|closed| Json(ClosedResponse { closed }))
}

#[instrument(skip_all)]
async fn choose_delivery(
    State(cart_state): State<Arc<CartState>>,
    State(session): State<Arc<CheckoutState>>,
    State(config): State<Arc<ConfigState>>,
    Json(body): Json<DeliveryBody>,
) -> ApiResult<CheckoutResponse> {
    checkout::choose_delivery(&cart_state, &session, &config, body.method).map(Json)
}

#[instrument(skip_all)]
async fn update_customer(
    State(cart_state): State<Arc<CartState>>,
    State(session): State<Arc<CheckoutState>>,
    State(config): State<Arc<ConfigState>>,
    Json(form): Json<CustomerForm>,
) -> ApiResult<CheckoutResponse> {
    checkout::update_customer(&cart_state, &session, &config, form).map(Json)
}

#[instrument(skip_all)]
async fn advance_checkout(
    State(db): State<Arc<DbState>>,
    State(cart_state): State<Arc<CartState>>,
    State(session): State<Arc<CheckoutState>>,
    State(config): State<Arc<ConfigState>>,
) -> ApiResult<AdvanceResponse> {
    checkout::advance_checkout(&db, &cart_state, &session, &config)
        .await
        .map(Json)
}

#[instrument(skip_all)]
async fn back_checkout(
    State(cart_state): State<Arc<CartState>>,
    State(session): State<Arc<CheckoutState>>,
    State(config): State<Arc<ConfigState>>,
) -> ApiResult<CheckoutResponse> {
    checkout::back_checkout(&cart_state, &session, &config).map(Json)
}

#[instrument(skip_all)]
async fn choose_payment_method(
    State(cart_state): State<Arc<CartState>>,
    State(session): State<Arc<CheckoutState>>,
    State(config): State<Arc<ConfigState>>,
    Json(body): Json<PaymentMethodBody>,
) -> ApiResult<CheckoutResponse> {
    checkout::choose_payment_method(&cart_state, &session, &config, body.method).map(Json)
}

/// The receipt is the raw request body; its type comes from `Content-Type`.
#[instrument(skip_all)]
async fn attach_proof(
    State(cart_state): State<Arc<CartState>>,
    State(session): State<Arc<CheckoutState>>,
    State(config): State<Arc<ConfigState>>,
    Query(query): Query<ProofQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<CheckoutResponse> {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream");
    let proof = ProofFile::new(query.file_name, content_type, body.to_vec());

    checkout::attach_proof(&cart_state, &session, &config, proof).map(Json)
}

#[instrument(skip_all)]
async fn submit_checkout(
    State(cart_state): State<Arc<CartState>>,
    State(session): State<Arc<CheckoutState>>,
    State(payments): State<Arc<PaymentsState>>,
) -> ApiResult<SubmitResponse> {
    checkout::submit_checkout(&cart_state, &session, &payments)
        .await
        .map(Json)
}
