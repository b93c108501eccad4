//! JSON HTTP API.
//!
//! Catalog routes are stateless. Cart and auth routes are keyed by a visitor
//! session id. Only state-changing routes create a session; reads of an
//! unknown id answer as for an empty one. Sessions end explicitly, after
//! going idle, or when the oldest has to make room under the session cap.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::RwLock;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, error, info};

use crate::auth::{AuthError, AuthProvider, OAuthProvider, SignInForm, SignUpForm};
use crate::catalog::{Catalog, ALL_CATEGORIES};
use crate::domain::aggregates::{CartLine, Product};
use crate::domain::events::DomainEvent;
use crate::domain::value_objects::{Money, ProductId};
use crate::filter::{FilterError, FilterState, GridState, GridView, PriceRange, SortKey};
use crate::session::{SessionHandle, ShopSession};
use crate::{Result, StorefrontError};

/// Number of products in the deals strip when no limit is given.
pub const DEFAULT_DEALS_LIMIT: usize = 3;

/// Bounds on the in-memory session table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionLimits {
    /// At least one session is always kept.
    pub max_sessions: usize,
    pub idle_timeout: Duration,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self { max_sessions: 10_000, idle_timeout: Duration::from_secs(30 * 60) }
    }
}

type SessionMap<P> = HashMap<String, Arc<SessionHandle<P>>>;

pub struct AppState<P> {
    pub catalog: Arc<Catalog>,
    provider: Arc<P>,
    limits: SessionLimits,
    sessions: Arc<RwLock<SessionMap<P>>>,
}

impl<P> Clone for AppState<P> {
    fn clone(&self) -> Self {
        Self {
            catalog: self.catalog.clone(),
            provider: self.provider.clone(),
            limits: self.limits,
            sessions: self.sessions.clone(),
        }
    }
}

impl<P: AuthProvider> AppState<P> {
    pub fn new(catalog: Catalog, provider: Arc<P>) -> Self {
        Self::with_limits(catalog, provider, SessionLimits::default())
    }

    pub fn with_limits(catalog: Catalog, provider: Arc<P>, limits: SessionLimits) -> Self {
        Self { catalog: Arc::new(catalog), provider, limits, sessions: Arc::default() }
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Live session for `id`, never creating one. Idle sessions count as gone.
    pub async fn existing_session(&self, id: &str) -> Option<Arc<SessionHandle<P>>> {
        let sessions = self.sessions.read().await;
        let handle = sessions.get(id).filter(|h| h.idle_for() < self.limits.idle_timeout)?;
        handle.touch();
        Some(handle.clone())
    }

    /// Live session for `id`, or a fresh one.
    pub async fn session(&self, id: &str) -> Arc<SessionHandle<P>> {
        if let Some(handle) = self.existing_session(id).await {
            return handle;
        }
        let mut sessions = self.sessions.write().await;
        self.purge_idle(&mut sessions);
        if let Some(handle) = sessions.get(id) {
            handle.touch();
            return handle.clone();
        }
        while sessions.len() >= self.limits.max_sessions.max(1) {
            let Some(oldest) = sessions.iter().min_by_key(|(_, h)| h.last_seen()).map(|(k, _)| k.clone()) else { break };
            sessions.remove(&oldest);
            info!(session = %oldest, "Session evicted to make room");
        }
        info!(session = id, "Session started");
        let handle = Arc::new(SessionHandle::new(&self.catalog, self.provider.clone()));
        sessions.insert(id.to_string(), handle.clone());
        handle
    }

    fn purge_idle(&self, sessions: &mut SessionMap<P>) {
        let before = sessions.len();
        sessions.retain(|_, h| h.idle_for() < self.limits.idle_timeout);
        let purged = before - sessions.len();
        if purged > 0 {
            info!(purged, "Expired idle sessions");
        }
    }

    pub async fn end_session(&self, id: &str) -> bool {
        let ended = self.sessions.write().await.remove(id).is_some();
        if ended {
            info!(session = id, "Session ended");
        }
        ended
    }
}

pub fn router<P: AuthProvider + 'static>(state: AppState<P>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/products", get(list_products::<P>))
        .route("/api/v1/products/:id", get(get_product::<P>))
        .route("/api/v1/categories", get(list_categories::<P>))
        .route("/api/v1/deals", get(list_deals::<P>))
        .route("/api/v1/sessions/:session", delete(end_session::<P>))
        .route("/api/v1/cart/:session", get(get_cart::<P>).post(add_to_cart::<P>).delete(clear_cart::<P>))
        .route("/api/v1/cart/:session/items/:product_id", put(set_quantity::<P>).delete(remove_item::<P>))
        .route("/api/v1/auth/:session/sign-up", post(sign_up::<P>))
        .route("/api/v1/auth/:session/sign-in", post(sign_in::<P>))
        .route("/api/v1/auth/:session/sign-out", post(sign_out::<P>))
        .route("/api/v1/auth/:session/oauth/:provider", post(oauth_sign_in::<P>))
        .route("/api/v1/auth/:session/me", get(current_user::<P>))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

impl IntoResponse for StorefrontError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::ProductNotFound(_) => StatusCode::NOT_FOUND,
            Self::Filter(_) | Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
                AuthError::UserAlreadyExists | AuthError::RequestInFlight => StatusCode::CONFLICT,
                AuthError::OAuthUnavailable(_) => StatusCode::NOT_IMPLEMENTED,
                AuthError::UnknownOAuthProvider(_) => StatusCode::BAD_REQUEST,
                AuthError::Provider(_) => StatusCode::BAD_GATEWAY,
                AuthError::Hashing(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Catalog(_) | Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            error!(error = %self, "Request error");
        }

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

fn log_events(session: &str, events: Vec<DomainEvent>) {
    for event in events {
        debug!(session, event = event.name(), details = ?event, "Domain event");
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({"status": "healthy", "service": "shoplux-storefront"}))
}

// =============================================================================
// Catalog
// =============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductQuery {
    pub search: Option<String>,
    pub category: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub sort: Option<String>,
}

impl ProductQuery {
    /// Missing fields fall back to the reset state for `catalog`.
    pub fn into_filter(self, catalog: &Catalog) -> Result<FilterState> {
        let bounds = catalog.price_bounds();
        let min = parse_price("minPrice", self.min_price)?.unwrap_or(bounds.min());
        let max = parse_price("maxPrice", self.max_price)?.unwrap_or(bounds.max());
        Ok(FilterState {
            search_query: self.search.unwrap_or_default(),
            selected_category: self.category.unwrap_or_else(|| ALL_CATEGORIES.to_string()),
            price_range: PriceRange::new(min, max)?,
            sort_key: self.sort.as_deref().map(SortKey::from_str).transpose()?.unwrap_or_default(),
        })
    }
}

fn parse_price(field: &'static str, value: Option<String>) -> Result<Option<Decimal>> {
    value
        .map(|raw| Decimal::from_str(raw.trim()).map_err(|_| FilterError::InvalidPrice { field, value: raw }))
        .transpose()
        .map_err(StorefrontError::from)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProductView<'a> {
    #[serde(flatten)]
    product: &'a Product,
    discount: u32,
}

impl<'a> From<&'a Product> for ProductView<'a> {
    fn from(product: &'a Product) -> Self {
        Self { product, discount: product.discount_percent() }
    }
}

#[derive(Serialize)]
struct GridResponse<'a> {
    products: Vec<ProductView<'a>>,
    showing: usize,
    total: usize,
    state: GridState,
}

async fn list_products<P: AuthProvider>(State(s): State<AppState<P>>, Query(q): Query<ProductQuery>) -> Result<Response> {
    let filter = q.into_filter(&s.catalog)?;
    let view = GridView::new(&s.catalog, &filter);
    let body = GridResponse {
        showing: view.products.len(),
        total: view.catalog_size,
        state: view.state(),
        products: view.products.iter().copied().map(ProductView::from).collect(),
    };
    Ok(Json(body).into_response())
}

async fn get_product<P: AuthProvider>(State(s): State<AppState<P>>, Path(id): Path<ProductId>) -> Result<Response> {
    let product = s.catalog.get(id).ok_or(StorefrontError::ProductNotFound(id))?;
    Ok(Json(ProductView::from(product)).into_response())
}

async fn list_categories<P: AuthProvider>(State(s): State<AppState<P>>) -> impl IntoResponse {
    Json(s.catalog.categories())
}

#[derive(Debug, Deserialize)]
pub struct DealsQuery {
    pub limit: Option<usize>,
}

async fn list_deals<P: AuthProvider>(State(s): State<AppState<P>>, Query(q): Query<DealsQuery>) -> Response {
    let deals: Vec<ProductView> = s
        .catalog
        .deals(q.limit.unwrap_or(DEFAULT_DEALS_LIMIT))
        .into_iter()
        .map(ProductView::from)
        .collect();
    Json(deals).into_response()
}

async fn end_session<P: AuthProvider>(State(s): State<AppState<P>>, Path(session): Path<String>) -> StatusCode {
    if s.end_session(&session).await { StatusCode::NO_CONTENT } else { StatusCode::NOT_FOUND }
}

// =============================================================================
// Cart
// =============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CartLineView<'a> {
    #[serde(flatten)]
    line: &'a CartLine,
    line_total: Money,
    /// False when the product has since left the catalog.
    available: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CartView<'a> {
    lines: Vec<CartLineView<'a>>,
    total_items: u64,
    total_price: &'a Money,
}

fn empty_cart_response(catalog: &Catalog) -> Response {
    cart_response(&ShopSession::new(catalog), catalog)
}

fn cart_response(shop: &ShopSession, catalog: &Catalog) -> Response {
    let lines = shop
        .hydrated_cart(catalog)
        .into_iter()
        .map(|h| CartLineView { line: h.line, line_total: h.line.line_total(), available: h.product.is_some() })
        .collect();
    let view = CartView { lines, total_items: shop.cart().total_items(), total_price: shop.cart().total_price() };
    Json(view).into_response()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    pub product_id: ProductId,
}

#[derive(Debug, Deserialize)]
pub struct SetQuantityRequest {
    pub quantity: i64,
}

async fn get_cart<P: AuthProvider>(State(s): State<AppState<P>>, Path(session): Path<String>) -> Response {
    let Some(handle) = s.existing_session(&session).await else { return empty_cart_response(&s.catalog) };
    let shop = handle.shop();
    cart_response(&shop, &s.catalog)
}

async fn add_to_cart<P: AuthProvider>(
    State(s): State<AppState<P>>,
    Path(session): Path<String>,
    Json(r): Json<AddItemRequest>,
) -> Result<Response> {
    if !s.catalog.contains(r.product_id) {
        return Err(StorefrontError::ProductNotFound(r.product_id));
    }
    let handle = s.session(&session).await;
    let mut shop = handle.shop();
    shop.add_to_cart(&s.catalog, r.product_id)?;
    log_events(&session, shop.cart_mut().take_events());
    Ok((StatusCode::CREATED, cart_response(&shop, &s.catalog)).into_response())
}

async fn set_quantity<P: AuthProvider>(
    State(s): State<AppState<P>>,
    Path((session, product_id)): Path<(String, ProductId)>,
    Json(r): Json<SetQuantityRequest>,
) -> Response {
    let Some(handle) = s.existing_session(&session).await else { return empty_cart_response(&s.catalog) };
    let mut shop = handle.shop();
    shop.cart_mut().set_quantity(product_id, r.quantity);
    log_events(&session, shop.cart_mut().take_events());
    cart_response(&shop, &s.catalog)
}

async fn remove_item<P: AuthProvider>(
    State(s): State<AppState<P>>,
    Path((session, product_id)): Path<(String, ProductId)>,
) -> Response {
    let Some(handle) = s.existing_session(&session).await else { return empty_cart_response(&s.catalog) };
    let mut shop = handle.shop();
    shop.cart_mut().remove_item(product_id);
    log_events(&session, shop.cart_mut().take_events());
    cart_response(&shop, &s.catalog)
}

async fn clear_cart<P: AuthProvider>(State(s): State<AppState<P>>, Path(session): Path<String>) -> StatusCode {
    let Some(handle) = s.existing_session(&session).await else { return StatusCode::NO_CONTENT };
    let mut shop = handle.shop();
    shop.cart_mut().clear();
    log_events(&session, shop.cart_mut().take_events());
    StatusCode::NO_CONTENT
}

// =============================================================================
// Auth
// =============================================================================

async fn sign_up<P: AuthProvider>(
    State(s): State<AppState<P>>,
    Path(session): Path<String>,
    Json(form): Json<SignUpForm>,
) -> Result<Response> {
    let request = form.validate()?;
    let handle = s.session(&session).await;
    let user = handle.auth.sign_up(request).await?;
    log_events(&session, handle.auth.take_events());
    Ok((StatusCode::CREATED, Json(user)).into_response())
}

async fn sign_in<P: AuthProvider>(
    State(s): State<AppState<P>>,
    Path(session): Path<String>,
    Json(form): Json<SignInForm>,
) -> Result<Response> {
    let request = form.validate()?;
    let handle = s.session(&session).await;
    let user = handle.auth.sign_in(request).await?;
    log_events(&session, handle.auth.take_events());
    Ok(Json(user).into_response())
}

async fn sign_out<P: AuthProvider>(State(s): State<AppState<P>>, Path(session): Path<String>) -> Result<StatusCode> {
    let Some(handle) = s.existing_session(&session).await else { return Ok(StatusCode::NO_CONTENT) };
    handle.auth.sign_out().await?;
    log_events(&session, handle.auth.take_events());
    Ok(StatusCode::NO_CONTENT)
}

async fn oauth_sign_in<P: AuthProvider>(
    State(s): State<AppState<P>>,
    Path((session, provider)): Path<(String, String)>,
) -> Result<Response> {
    let provider: OAuthProvider = provider.parse()?;
    let handle = s.session(&session).await;
    let user = handle.auth.sign_in_with_oauth(provider).await?;
    log_events(&session, handle.auth.take_events());
    Ok(Json(user).into_response())
}

async fn current_user<P: AuthProvider>(State(s): State<AppState<P>>, Path(session): Path<String>) -> Response {
    let user = match s.existing_session(&session).await {
        Some(handle) => handle.auth.current_user(),
        None => None,
    };
    Json(user).into_response()
}
