use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::order::Order;
use crate::domain::status::OrderStatus;

#[derive(thiserror::Error, Debug)]
pub enum RepoError {
    #[error("db error: {0}")]
    DbError(String),
}

/// Orders are written once and never deleted; `update_status` is the only
/// mutation a stored order accepts.
#[async_trait]
pub trait OrderRepository: Send + Sync + 'static {
    /// Persists the header and every line as one unit: either all commit or none do.
    async fn create(&self, order: Order) -> Result<Order, RepoError>;
    async fn get(&self, id: Uuid) -> Result<Option<Order>, RepoError>;
    async fn list(&self) -> Result<Vec<Order>, RepoError>;
    async fn list_for_customer(&self, customer_id: &str) -> Result<Vec<Order>, RepoError>;
    async fn update_status(
        &self,
        id: Uuid,
        status: OrderStatus,
    ) -> Result<Option<Order>, RepoError>;
}
