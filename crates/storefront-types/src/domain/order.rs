use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::cart::{Cart, CartLine};
use crate::domain::status::{OrderStatus, StatusFilter};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("customer name is required")]
    MissingCustomerName,
    #[error("customer phone is required")]
    MissingCustomerPhone,
    #[error("line for {0} has zero quantity")]
    ZeroQuantity(String),
    #[error("cart is empty")]
    EmptyCart,
}

/// One ordered food, with the unit price captured when the order was placed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderLine {
    pub food_id: String,
    pub name: String,
    pub quantity: u32,
    pub unit_price: i64,
}

impl From<&CartLine> for OrderLine {
    fn from(line: &CartLine) -> Self {
        Self {
            food_id: line.id.clone(),
            name: line.name.clone(),
            quantity: line.quantity,
            unit_price: line.unit_price(),
        }
    }
}

/// Snapshot of a cart as order lines, in cart order.
pub fn lines_from_cart(cart: &Cart) -> Vec<OrderLine> {
    cart.lines().iter().map(OrderLine::from).collect()
}

/// A placed order. `total_price` and `lines` never change after creation;
/// `status` is the only mutable part.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    pub id: Uuid,
    pub customer_id: String,
    pub customer_name: String,
    pub customer_phone: String,
    pub total_price: i64,
    pub status: OrderStatus,
    pub lines: Vec<OrderLine>,
    pub created_at: DateTime<Utc>,
}

impl Order {
    pub fn new(
        customer_id: String,
        customer_name: String,
        customer_phone: String,
        total_price: i64,
        lines: Vec<OrderLine>,
    ) -> Result<Self, ValidationError> {
        if customer_name.trim().is_empty() {
            return Err(ValidationError::MissingCustomerName);
        }
        if customer_phone.trim().is_empty() {
            return Err(ValidationError::MissingCustomerPhone);
        }
        if let Some(line) = lines.iter().find(|l| l.quantity == 0) {
            return Err(ValidationError::ZeroQuantity(line.food_id.clone()));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            customer_id,
            customer_name,
            customer_phone,
            total_price,
            status: OrderStatus::Processing,
            lines,
            created_at: Utc::now(),
        })
    }

    pub fn update_status(&mut self, status: OrderStatus) {
        self.status = status;
    }

    fn matches_query(&self, needle: &str, scope: FilterScope) -> bool {
        self.id.to_string().to_lowercase().contains(needle)
            || self
                .lines
                .iter()
                .any(|l| l.name.to_lowercase().contains(needle))
            || (scope == FilterScope::Admin && self.customer_name.to_lowercase().contains(needle))
    }
}

/// Which fields a text query searches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FilterScope {
    /// Order id and item names: a customer browsing their own history.
    #[default]
    Customer,
    /// Also the customer name, for the operator console.
    Admin,
}

/// Newest first. Orders created at the same instant keep their relative order.
pub fn sort_newest_first(orders: &mut [Order]) {
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

/// Keeps orders matching both the text query and the status filter.
///
/// The query is a case-insensitive substring of the order id or any line's
/// item name; an empty query matches everything.
pub fn filter_orders(orders: &[Order], query: &str, status: StatusFilter) -> Vec<Order> {
    filter_orders_in(orders, query, status, FilterScope::Customer)
}

/// [`filter_orders`] for the admin view, where the query also matches the
/// customer name.
pub fn filter_admin_orders(orders: &[Order], query: &str, status: StatusFilter) -> Vec<Order> {
    filter_orders_in(orders, query, status, FilterScope::Admin)
}

pub fn filter_orders_in(
    orders: &[Order],
    query: &str,
    status: StatusFilter,
    scope: FilterScope,
) -> Vec<Order> {
    let needle = query.trim().to_lowercase();
    orders
        .iter()
        .filter(|o| needle.is_empty() || o.matches_query(&needle, scope))
        .filter(|o| status.accepts(o.status))
        .cloned()
        .collect()
}
