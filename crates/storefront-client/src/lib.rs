use std::time::Duration;

use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use storefront_types::domain::cart::{CartItem, CartLine, ReAddPolicy};
use storefront_types::domain::food::Food;
use storefront_types::domain::order::Order;
use storefront_types::domain::recommendation::ScoredFood;
use storefront_types::domain::status::{OrderStatus, StatusFilter};
use uuid::Uuid;

const SESSION_HEADER: &str = "x-session-id";
const CUSTOMER_HEADER: &str = "x-customer-id";

#[derive(Clone)]
pub struct StorefrontClientBuilder {
    base: Url,
    headers: HeaderMap,
    timeout: Option<Duration>,
    client: Option<reqwest::Client>,
    session_id: Option<String>,
    admin_token: Option<String>,
}

/// Talks to the storefront HTTP adapter on behalf of one browsing session.
#[derive(Clone)]
pub struct StorefrontClient {
    base: Url,
    client: reqwest::Client,
    session_id: String,
    admin_token: Option<String>,
}

impl StorefrontClient {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        Self::builder(base_url)?.build()
    }

    pub fn builder(base_url: &str) -> anyhow::Result<StorefrontClientBuilder> {
        let base = Url::parse(base_url).context("invalid base url")?;
        Ok(StorefrontClientBuilder {
            base,
            headers: HeaderMap::new(),
            timeout: None,
            client: None,
            session_id: None,
            admin_token: None,
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    fn url(&self, path: &str) -> anyhow::Result<Url> {
        self.base.join(path).context("failed to join url")
    }

    fn admin_token(&self) -> anyhow::Result<&str> {
        self.admin_token
            .as_deref()
            .context("client was built without an admin token")
    }

    pub async fn health(&self) -> anyhow::Result<bool> {
        let res = self.client.get(self.url("health")?).send().await?;
        Ok(res.status().is_success())
    }

    pub async fn list_foods(&self) -> anyhow::Result<Vec<Food>> {
        let res = self
            .client
            .get(self.url("foods")?)
            .send()
            .await?
            .error_for_status()?;
        Ok(res.json().await?)
    }

    pub async fn search_foods(&self, text: &str) -> anyhow::Result<Vec<Food>> {
        let res = self
            .client
            .get(self.url("foods")?)
            .query(&[("q", text)])
            .send()
            .await?
            .error_for_status()?;
        Ok(res.json().await?)
    }

    pub async fn get_food(&self, id: &str) -> anyhow::Result<Food> {
        let res = self
            .client
            .get(self.url(&format!("foods/{id}"))?)
            .send()
            .await?
            .error_for_status()?;
        Ok(res.json().await?)
    }

    pub async fn get_cart(&self) -> anyhow::Result<CartView> {
        let res = self
            .client
            .get(self.url("cart")?)
            .header(SESSION_HEADER, &self.session_id)
            .send()
            .await?
            .error_for_status()?;
        Ok(res.json().await?)
    }

    pub async fn add_to_cart(&self, item: CartItem) -> anyhow::Result<CartView> {
        self.add_to_cart_with(item, ReAddPolicy::default()).await
    }

    pub async fn add_to_cart_with(
        &self,
        item: CartItem,
        re_add: ReAddPolicy,
    ) -> anyhow::Result<CartView> {
        let res = self
            .client
            .post(self.url("cart/items")?)
            .header(SESSION_HEADER, &self.session_id)
            .json(&AddCartItemRequest { item, re_add })
            .send()
            .await?
            .error_for_status()?;
        Ok(res.json().await?)
    }

    pub async fn remove_from_cart(&self, id: &str) -> anyhow::Result<CartView> {
        let res = self
            .client
            .delete(self.url(&format!("cart/items/{id}"))?)
            .header(SESSION_HEADER, &self.session_id)
            .send()
            .await?
            .error_for_status()?;
        Ok(res.json().await?)
    }

    pub async fn clear_cart(&self) -> anyhow::Result<CartView> {
        let res = self
            .client
            .delete(self.url("cart")?)
            .header(SESSION_HEADER, &self.session_id)
            .send()
            .await?
            .error_for_status()?;
        Ok(res.json().await?)
    }

    pub async fn checkout(
        &self,
        customer_id: &str,
        req: CheckoutRequest,
    ) -> anyhow::Result<CheckoutResponse> {
        let res = self
            .client
            .post(self.url("checkout")?)
            .header(SESSION_HEADER, &self.session_id)
            .header(CUSTOMER_HEADER, customer_id)
            .json(&req)
            .send()
            .await?
            .error_for_status()?;
        tracing::debug!(customer_id, "checkout accepted");
        Ok(res.json().await?)
    }

    pub async fn customer_orders(
        &self,
        customer_id: &str,
        query: &str,
        status: StatusFilter,
    ) -> anyhow::Result<Vec<Order>> {
        let res = self
            .client
            .get(self.url(&format!("customers/{customer_id}/orders"))?)
            .query(&[("q", query.to_string()), ("status", status.to_string())])
            .send()
            .await?
            .error_for_status()?;
        Ok(res.json().await?)
    }

    pub async fn recommendations(&self, customer_id: &str) -> anyhow::Result<Vec<ScoredFood>> {
        let res = self
            .client
            .get(self.url(&format!("customers/{customer_id}/recommendations"))?)
            .send()
            .await?
            .error_for_status()?;
        Ok(res.json().await?)
    }

    pub async fn admin_orders(&self, query: &str, status: StatusFilter) -> anyhow::Result<Vec<Order>> {
        let res = self
            .client
            .get(self.url("admin/orders")?)
            .bearer_auth(self.admin_token()?)
            .query(&[("q", query.to_string()), ("status", status.to_string())])
            .send()
            .await?
            .error_for_status()?;
        Ok(res.json().await?)
    }

    pub async fn update_status(&self, id: &str, status: OrderStatus) -> anyhow::Result<Order> {
        let res = self
            .client
            .patch(self.url(&format!("admin/orders/{id}/status"))?)
            .bearer_auth(self.admin_token()?)
            .json(&UpdateStatusRequest { status })
            .send()
            .await?
            .error_for_status()?;
        Ok(res.json().await?)
    }
}

impl StorefrontClientBuilder {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_header(
        mut self,
        key: impl AsRef<str>,
        value: impl AsRef<str>,
    ) -> anyhow::Result<Self> {
        let header_name =
            HeaderName::from_bytes(key.as_ref().as_bytes()).context("invalid header name")?;
        let header_value = HeaderValue::from_str(value.as_ref()).context("invalid header value")?;
        self.headers.insert(header_name, header_value);
        Ok(self)
    }

    /// Resumes an existing session; a fresh id is generated otherwise.
    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_admin_token(mut self, token: impl Into<String>) -> Self {
        self.admin_token = Some(token.into());
        self
    }

    pub fn with_reqwest_client(mut self, client: reqwest::Client) -> Self {
        self.client = Some(client);
        self
    }

    pub fn build(self) -> anyhow::Result<StorefrontClient> {
        let session_id = self
            .session_id
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        if let Some(client) = self.client {
            return Ok(StorefrontClient {
                base: self.base,
                client,
                session_id,
                admin_token: self.admin_token,
            });
        }

        let mut builder = reqwest::Client::builder();
        if !self.headers.is_empty() {
            builder = builder.default_headers(self.headers);
        }
        if let Some(t) = self.timeout {
            builder = builder.timeout(t);
        }
        let client = builder.build()?;
        Ok(StorefrontClient {
            base: self.base,
            client,
            session_id,
            admin_token: self.admin_token,
        })
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CartView {
    pub lines: Vec<CartLine>,
    pub total: i64,
    pub item_count: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CheckoutRequest {
    pub customer_name: String,
    pub customer_phone: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CheckoutResponse {
    pub id: String,
    pub status: OrderStatus,
    pub total_price: i64,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct AddCartItemRequest {
    item: CartItem,
    re_add: ReAddPolicy,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct UpdateStatusRequest {
    status: OrderStatus,
}
