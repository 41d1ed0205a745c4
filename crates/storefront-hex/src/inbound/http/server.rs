use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{delete, get, patch, post},
    serve, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::application::auth::AdminAuthorizer;
use crate::application::cart_store::{CartChanged, CartStore};
use crate::application::order_service::OrderService;
use crate::application::recommendation_service::RecommendationService;
use crate::errors::AppError;
use storefront_types::domain::cart::{CartItem, CartLine, ReAddPolicy};
use storefront_types::domain::food::Food;
use storefront_types::domain::order::{filter_orders_in, FilterScope, Order};
use storefront_types::domain::recommendation::ScoredFood;
use storefront_types::domain::status::{OrderStatus, StatusFilter, TransitionPolicy, UnknownStatus};
use storefront_types::ports::cart_storage::CartStorage;
use storefront_types::ports::food_catalog::FoodCatalog;
use storefront_types::ports::order_repository::OrderRepository;
use storefront_types::ports::purchase_history::PurchaseHistory;

pub const SESSION_HEADER: &str = "x-session-id";
pub const CUSTOMER_HEADER: &str = "x-customer-id";
pub const ADMIN_AUTH_HEADER: &str = "authorization";

const CART_EVENT_CAPACITY: usize = 256;

/// Everything the HTTP adapter needs from storage.
pub trait StorefrontRepo:
    OrderRepository + FoodCatalog + PurchaseHistory + CartStorage + Clone
{
}

impl<T> StorefrontRepo for T where
    T: OrderRepository + FoodCatalog + PurchaseHistory + CartStorage + Clone
{
}

#[derive(Clone)]
pub struct HttpServerConfig {
    pub port: String,
    pub admin_token: Option<String>,
    pub status_policy: TransitionPolicy,
}

#[derive(Clone)]
struct AppState<R: StorefrontRepo> {
    repo: R,
    orders: Arc<OrderService<R>>,
    recommendations: Arc<RecommendationService<R>>,
    auth: AdminAuthorizer,
    cart_events: broadcast::Sender<CartChanged>,
}

#[derive(Clone)]
pub struct HttpServer<R: StorefrontRepo> {
    state: AppState<R>,
    pub config: HttpServerConfig,
}

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
}

#[derive(Deserialize)]
pub struct OrderQuery {
    pub q: Option<String>,
    pub status: Option<String>,
}

impl OrderQuery {
    fn status_filter(&self) -> Result<StatusFilter, AppError> {
        self.status
            .as_deref()
            .unwrap_or("all")
            .parse()
            .map_err(|e: UnknownStatus| AppError::BadRequest(e.to_string()))
    }

    fn apply(&self, orders: Vec<Order>, scope: FilterScope) -> Result<Vec<Order>, AppError> {
        let status = self.status_filter()?;
        Ok(filter_orders_in(
            &orders,
            self.q.as_deref().unwrap_or(""),
            status,
            scope,
        ))
    }
}

#[derive(Deserialize)]
pub struct AddCartItemRequest {
    pub item: CartItem,
    #[serde(default)]
    pub re_add: ReAddPolicy,
}

#[derive(Deserialize)]
pub struct CheckoutRequest {
    pub customer_name: String,
    pub customer_phone: String,
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
}

#[derive(Serialize)]
struct CartView {
    lines: Vec<CartLine>,
    total: i64,
    item_count: u32,
}

impl<S: CartStorage> From<&CartStore<S>> for CartView {
    fn from(store: &CartStore<S>) -> Self {
        Self {
            lines: store.lines().to_vec(),
            total: store.total(),
            item_count: store.item_count(),
        }
    }
}

#[derive(Serialize)]
struct CheckoutResponse {
    id: String,
    status: OrderStatus,
    total_price: i64,
}

impl From<Order> for CheckoutResponse {
    fn from(o: Order) -> Self {
        Self {
            id: o.id.to_string(),
            status: o.status,
            total_price: o.total_price,
        }
    }
}

impl<R: StorefrontRepo> HttpServer<R> {
    pub async fn new(repo: R, config: HttpServerConfig) -> anyhow::Result<Self> {
        let state = AppState {
            orders: Arc::new(OrderService::with_policy(repo.clone(), config.status_policy)),
            recommendations: Arc::new(RecommendationService::new(repo.clone())),
            auth: AdminAuthorizer::new(config.admin_token.clone()),
            cart_events: broadcast::channel(CART_EVENT_CAPACITY).0,
            repo,
        };
        Ok(Self { state, config })
    }

    /// Every cart mutation served by this server, across all sessions.
    pub fn cart_events(&self) -> broadcast::Receiver<CartChanged> {
        self.state.cart_events.subscribe()
    }

    pub fn router(&self) -> Router {
        let trace_layer = TraceLayer::new_for_http()
            .make_span_with(|request: &axum::extract::Request<_>| {
                let uri = request.uri().to_string();
                let request_id = Uuid::new_v4();
                tracing::info_span!(
                    "http_request",
                    %request_id,
                    method = %request.method(),
                    uri
                )
            })
            .on_request(
                |request: &axum::extract::Request<_>, span: &tracing::Span| {
                    tracing::info!(
                        parent: span,
                        method = %request.method(),
                        uri = %request.uri(),
                        "request"
                    );
                },
            )
            .on_response(
                |response: &axum::response::Response, latency: Duration, span: &tracing::Span| {
                    tracing::info!(
                        parent: span,
                        status = %response.status(),
                        latency_ms = %latency.as_millis(),
                        "response"
                    );
                },
            );

        Router::new()
            .route("/health", get(health))
            .route("/foods", get(list_foods::<R>))
            .route("/foods/{id}", get(get_food::<R>))
            .route("/cart", get(get_cart::<R>).delete(clear_cart::<R>))
            .route("/cart/items", post(add_cart_item::<R>))
            .route("/cart/items/{id}", delete(remove_cart_item::<R>))
            .route("/checkout", post(checkout::<R>))
            .route("/customers/{id}/orders", get(customer_orders::<R>))
            .route("/customers/{id}/recommendations", get(recommendations::<R>))
            .route("/admin/orders", get(admin_list_orders::<R>))
            .route("/admin/orders/{id}/status", patch(admin_update_status::<R>))
            .layer(trace_layer)
            .layer(CorsLayer::permissive())
            .with_state(self.state.clone())
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let app = self.router();
        let addr: SocketAddr = format!("0.0.0.0:{}", self.config.port).parse()?;
        tracing::info!(policy = ?self.config.status_policy, "starting server on {}", addr);
        let listener = tokio::net::TcpListener::bind(addr).await?;
        serve(listener, app.into_make_service()).await?;
        Ok(())
    }
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn required_header(headers: &HeaderMap, name: &str) -> Result<String, AppError> {
    header(headers, name)
        .map(str::to_string)
        .ok_or_else(|| AppError::BadRequest(format!("missing {name} header")))
}

fn parse_id(id: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(id).map_err(|e| AppError::BadRequest(e.to_string()))
}

async fn open_cart<R: StorefrontRepo>(
    state: &AppState<R>,
    headers: &HeaderMap,
) -> Result<CartStore<R>, AppError> {
    let session = required_header(headers, SESSION_HEADER)?;
    Ok(CartStore::open(state.repo.clone(), session)
        .await?
        .with_notifier(state.cart_events.clone()))
}

async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

async fn list_foods<R: StorefrontRepo>(
    State(state): State<AppState<R>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<Food>>, AppError> {
    let foods = match params.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        Some(q) => state.repo.search_foods(q).await?,
        None => state.repo.list_foods().await?,
    };
    Ok(Json(foods))
}

async fn get_food<R: StorefrontRepo>(
    State(state): State<AppState<R>>,
    Path(id): Path<String>,
) -> Result<Json<Food>, AppError> {
    match state.repo.get_food(&id).await? {
        Some(food) => Ok(Json(food)),
        None => Err(AppError::NotFound(format!("food {}", id))),
    }
}

async fn get_cart<R: StorefrontRepo>(
    State(state): State<AppState<R>>,
    headers: HeaderMap,
) -> Result<Json<CartView>, AppError> {
    let cart = open_cart(&state, &headers).await?;
    Ok(Json(CartView::from(&cart)))
}

async fn add_cart_item<R: StorefrontRepo>(
    State(state): State<AppState<R>>,
    headers: HeaderMap,
    Json(payload): Json<AddCartItemRequest>,
) -> Result<Json<CartView>, AppError> {
    let mut cart = open_cart(&state, &headers)
        .await?
        .with_re_add_policy(payload.re_add);
    cart.add_item(payload.item).await?;
    Ok(Json(CartView::from(&cart)))
}

async fn remove_cart_item<R: StorefrontRepo>(
    State(state): State<AppState<R>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<CartView>, AppError> {
    let mut cart = open_cart(&state, &headers).await?;
    cart.remove_item(&id).await?;
    Ok(Json(CartView::from(&cart)))
}

async fn clear_cart<R: StorefrontRepo>(
    State(state): State<AppState<R>>,
    headers: HeaderMap,
) -> Result<Json<CartView>, AppError> {
    let mut cart = open_cart(&state, &headers).await?;
    cart.clear().await?;
    Ok(Json(CartView::from(&cart)))
}

async fn checkout<R: StorefrontRepo>(
    State(state): State<AppState<R>>,
    headers: HeaderMap,
    Json(payload): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<CheckoutResponse>), AppError> {
    let customer_id = required_header(&headers, CUSTOMER_HEADER)?;
    let mut cart = open_cart(&state, &headers).await?;
    let order = state
        .orders
        .checkout(
            &mut cart,
            customer_id,
            payload.customer_name,
            payload.customer_phone,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(order.into())))
}

async fn customer_orders<R: StorefrontRepo>(
    State(state): State<AppState<R>>,
    Path(customer_id): Path<String>,
    Query(query): Query<OrderQuery>,
) -> Result<Json<Vec<Order>>, AppError> {
    let orders = state.orders.list_for_customer(&customer_id).await?;
    Ok(Json(query.apply(orders, FilterScope::Customer)?))
}

async fn recommendations<R: StorefrontRepo>(
    State(state): State<AppState<R>>,
    Path(customer_id): Path<String>,
) -> Result<Json<Vec<ScoredFood>>, AppError> {
    let ranked = state.recommendations.recommend_scored(&customer_id).await?;
    Ok(Json(ranked))
}

async fn admin_list_orders<R: StorefrontRepo>(
    State(state): State<AppState<R>>,
    headers: HeaderMap,
    Query(query): Query<OrderQuery>,
) -> Result<Json<Vec<Order>>, AppError> {
    let grant = state.auth.authorize(header(&headers, ADMIN_AUTH_HEADER))?;
    let orders = state.orders.list_all(&grant).await?;
    Ok(Json(query.apply(orders, FilterScope::Admin)?))
}

async fn admin_update_status<R: StorefrontRepo>(
    State(state): State<AppState<R>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<Json<Order>, AppError> {
    let grant = state.auth.authorize(header(&headers, ADMIN_AUTH_HEADER))?;
    let id = parse_id(&id)?;
    let updated = state.orders.set_status(&grant, id, payload.status).await?;
    Ok(Json(updated))
}
